//! Re-openable byte sources.
//!
//! A load reads the same file several times (probe, waveform, clip, and every
//! MP3 playback restart), so a source hands out a fresh independent reader on
//! each `open()` instead of sharing one cursor.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub trait AudioSource: Send + Sync {
    /// File name used for format classification.
    fn name(&self) -> &str;

    /// Declared byte length.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a new reader positioned at byte 0.
    fn open(&self) -> io::Result<Box<dyn ReadSeek>>;

    /// Read up to `count` leading bytes for header sniffing.
    fn peek(&self, count: usize) -> io::Result<Vec<u8>> {
        let mut reader = self.open()?;
        let mut buf = Vec::with_capacity(count);
        reader.by_ref().take(count as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    len: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}

/// In-memory source, mostly for tests and for bytes handed over by a host.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl AudioSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_source_reopens_independently() {
        let source = MemorySource::new("clip.wav", vec![1u8, 2, 3, 4]);
        let mut first = source.open().unwrap();
        let mut second = source.open().unwrap();

        let mut a = [0u8; 2];
        first.read_exact(&mut a).unwrap();
        let mut b = [0u8; 4];
        second.read_exact(&mut b).unwrap();

        assert_eq!(a, [1, 2]);
        assert_eq!(b, [1, 2, 3, 4]);
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn test_peek_short_source() {
        let source = MemorySource::new("x.au", vec![9u8; 3]);
        assert_eq!(source.peek(12).unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn test_file_source_metadata() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF0000WAVE").unwrap();

        let source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 12);
        assert_eq!(source.peek(4).unwrap(), b"RIFF");
        assert!(!source.name().is_empty());
    }

    #[test]
    fn test_file_source_missing() {
        assert!(FileSource::open(Path::new("/nonexistent/file.wav")).is_err());
    }
}
