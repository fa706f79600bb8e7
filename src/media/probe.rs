//! Cheap format classification that runs before any decode attempt.

use std::path::Path;

use crate::constants::SUPPORTED_EXTENSIONS;
use crate::error::AudioError;

/// Container layouts handled by the PCM decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Wav,
    Aiff,
    Au,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Pcm(ContainerKind),
    Mp3,
    Unsupported,
}

impl Classification {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Classification::Unsupported)
    }
}

/// Lowercased extension of a file name, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Classify a file by its extension; the optional header bytes only pick
/// between PCM container parsers.
pub fn classify(filename: &str, first_bytes: Option<&[u8]>) -> Classification {
    let ext = extension_of(filename).unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Classification::Unsupported;
    }

    let by_extension = match ext.as_str() {
        "mp3" => return Classification::Mp3,
        "wav" => ContainerKind::Wav,
        "aiff" => ContainerKind::Aiff,
        _ => ContainerKind::Au,
    };

    match first_bytes.and_then(sniff_container) {
        Some(kind) if kind != by_extension => {
            log::warn!("{filename}: header says {kind:?}, extension says {by_extension:?}");
            Classification::Pcm(kind)
        }
        _ => Classification::Pcm(by_extension),
    }
}

/// Classify or fail with the supported-format list.
pub fn require_supported(
    filename: &str,
    first_bytes: Option<&[u8]>,
) -> Result<Classification, AudioError> {
    match classify(filename, first_bytes) {
        Classification::Unsupported => {
            let ext = extension_of(filename).unwrap_or_else(|| "no extension".to_string());
            Err(AudioError::UnsupportedFormat(ext))
        }
        supported => Ok(supported),
    }
}

fn sniff_container(header: &[u8]) -> Option<ContainerKind> {
    if header.len() < 4 {
        return None;
    }
    match &header[..4] {
        b"RIFF" => Some(ContainerKind::Wav),
        b"FORM" => Some(ContainerKind::Aiff),
        b".snd" => Some(ContainerKind::Au),
        _ => None,
    }
}
