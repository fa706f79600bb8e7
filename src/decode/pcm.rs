//! Container PCM decoding.
//!
//! `PcmDecoder` opens a container through its header parser and exposes the
//! sample data as a [`PcmStream`] of raw frames. Samples of any supported
//! width (1 to 4 bytes), byte order and encoding convert to normalized `f32`
//! through [`decode_sample`]. Every `open_*` call opens a fresh reader on the
//! source, so the waveform pass and the playback clip never share a cursor.

use std::io::Read;
use std::sync::Arc;

use crate::error::AudioError;
use crate::media::format::{AudioFormatDescriptor, EncodingKind};
use crate::media::probe::ContainerKind;
use crate::media::source::{AudioSource, ReadSeek};

use super::container::{self, ContainerInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Signed,
    Unsigned,
    Float,
}

/// Byte-level layout of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub width: usize,
    pub big_endian: bool,
    pub encoding: SampleEncoding,
}

impl SampleLayout {
    pub fn from_format(format: &AudioFormatDescriptor) -> Result<Self, AudioError> {
        let width = format.bytes_per_sample();
        let encoding = match &format.encoding_kind {
            EncodingKind::PcmSigned => SampleEncoding::Signed,
            EncodingKind::PcmUnsigned => SampleEncoding::Unsigned,
            EncodingKind::PcmFloat => SampleEncoding::Float,
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{other} is not linear PCM"
                )));
            }
        };

        let supported = match encoding {
            SampleEncoding::Signed => (1..=4).contains(&width),
            SampleEncoding::Unsigned => width == 1,
            SampleEncoding::Float => width == 4,
        };
        if !supported {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit {:?} samples",
                format.bits_per_sample, encoding
            )));
        }

        Ok(Self {
            width,
            big_endian: format.big_endian,
            encoding,
        })
    }
}

/// Decode one sample to the range [-1.0, 1.0].
///
/// Signed integers are normalized by 2^(bits-1), so the most negative value
/// maps exactly to -1.0.
pub fn decode_sample(bytes: &[u8], layout: &SampleLayout) -> f32 {
    let bytes = &bytes[..layout.width];
    let raw = if layout.big_endian {
        bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
    } else {
        bytes.iter().rev().fold(0u32, |acc, &b| (acc << 8) | b as u32)
    };

    match layout.encoding {
        SampleEncoding::Signed => {
            let bits = 8 * layout.width as u32;
            let shift = 32 - bits;
            let value = ((raw << shift) as i32) >> shift;
            value as f32 / (1u64 << (bits - 1)) as f32
        }
        SampleEncoding::Unsigned => (raw as f32 - 128.0) / 128.0,
        SampleEncoding::Float => {
            let value = f32::from_bits(raw);
            if value.is_finite() {
                value.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }
    }
}

/// Forward-only reader over the sample data of an opened container.
pub struct PcmStream {
    reader: Box<dyn ReadSeek>,
    format: AudioFormatDescriptor,
    layout: SampleLayout,
    total_frames: u64,
    frames_read: u64,
    truncated: bool,
    scratch: Vec<u8>,
}

impl PcmStream {
    fn new(info: ContainerInfo, reader: Box<dyn ReadSeek>) -> Result<Self, AudioError> {
        let layout = SampleLayout::from_format(&info.format)?;
        Ok(Self {
            reader,
            format: info.format,
            layout,
            total_frames: info.total_frames,
            frames_read: 0,
            truncated: false,
            scratch: Vec::new(),
        })
    }

    pub fn format(&self) -> &AudioFormatDescriptor {
        &self.format
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Frame count declared by the header.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// True once the data ended before the declared frame count.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Read up to `frames` whole frames of raw bytes into `buf`, replacing its
    /// contents. Returns the number of frames read; 0 means end of data.
    pub fn read_frames(&mut self, frames: usize, buf: &mut Vec<u8>) -> Result<usize, AudioError> {
        buf.clear();
        let remaining = self.total_frames.saturating_sub(self.frames_read);
        let wanted = (frames as u64).min(remaining);
        if wanted == 0 || self.truncated {
            return Ok(0);
        }

        let frame_size = self.format.frame_size();
        let wanted_bytes = wanted * frame_size as u64;
        self.reader.by_ref().take(wanted_bytes).read_to_end(buf)?;

        let got = buf.len() / frame_size;
        buf.truncate(got * frame_size);
        if (got as u64) < wanted {
            log::warn!(
                "PCM data ended after {} of {} frames",
                self.frames_read + got as u64,
                self.total_frames
            );
            self.truncated = true;
        }

        self.frames_read += got as u64;
        Ok(got)
    }

    /// Read up to `frames` frames and append their samples, interleaved and
    /// normalized, to `out`. Returns the number of frames decoded.
    pub fn decode_frames(&mut self, frames: usize, out: &mut Vec<f32>) -> Result<usize, AudioError> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.read_frames(frames, &mut scratch);
        if let Ok(count) = result {
            let layout = self.layout;
            out.reserve(count * self.format.channel_count as usize);
            out.extend(
                scratch
                    .chunks_exact(layout.width)
                    .map(|sample| decode_sample(sample, &layout)),
            );
        }
        self.scratch = scratch;
        result
    }
}

/// A fully decoded, seekable clip: the backing store for low-latency playback.
#[derive(Debug, Clone)]
pub struct PcmClipHandle {
    format: AudioFormatDescriptor,
    samples: Arc<[f32]>,
    frames: u64,
}

impl PcmClipHandle {
    pub fn new(format: AudioFormatDescriptor, samples: Vec<f32>) -> Self {
        let channels = format.channel_count.max(1) as usize;
        let frames = (samples.len() / channels) as u64;
        Self {
            format,
            samples: samples.into(),
            frames,
        }
    }

    pub fn format(&self) -> &AudioFormatDescriptor {
        &self.format
    }

    /// Interleaved normalized samples.
    pub fn samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn frame_length(&self) -> u64 {
        self.frames
    }

    pub fn microsecond_length(&self) -> u64 {
        self.format.frames_to_micros(self.frames)
    }
}

pub struct PcmDecoder;

impl PcmDecoder {
    const CLIP_READ_FRAMES: usize = 16 * 1024;

    /// Open an independent frame stream over the container's sample data.
    pub fn open_stream(
        source: &dyn AudioSource,
        kind: ContainerKind,
    ) -> Result<PcmStream, AudioError> {
        let reader = source.open()?;
        let (info, reader) = container::read_header(kind, reader, source.len())?;
        log::info!(
            "{}: {:?} {} Hz, {} ch, {} bit, {} frames",
            source.name(),
            kind,
            info.format.sample_rate_hz,
            info.format.channel_count,
            info.format.bits_per_sample,
            info.total_frames
        );
        PcmStream::new(info, reader)
    }

    /// Open the source on a stream of its own and load it into a clip.
    pub fn open(
        source: &dyn AudioSource,
        kind: ContainerKind,
    ) -> Result<(AudioFormatDescriptor, PcmClipHandle), AudioError> {
        let mut stream = Self::open_stream(source, kind)?;
        let channels = stream.format().channel_count as usize;
        // headers can lie about length; the file size cannot
        let max_frames = source.len() / stream.format().frame_size() as u64;
        let capacity = stream.total_frames().min(max_frames) as usize * channels;
        let mut samples = Vec::with_capacity(capacity);

        while stream.decode_frames(Self::CLIP_READ_FRAMES, &mut samples)? > 0 {}

        let format = stream.format().clone();
        let clip = PcmClipHandle::new(format.clone(), samples);
        Ok((format, clip))
    }
}
