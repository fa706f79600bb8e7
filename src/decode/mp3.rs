//! Frame-by-frame MP3 decoding.
//!
//! There is no frame index to seek through, so the envelope is built while the
//! bitstream is walked once from the start: each decoded sample frame is folded
//! into a bounded bucket accumulator and its PCM is appended to a byte buffer
//! (16-bit little-endian) for optional re-synthesis as a clip.
//!
//! A frame that fails mid-stream ends the walk; whatever was collected up to
//! that point is kept. When nothing decodes at all, duration and format fall
//! back to file-size heuristics and the envelope to a placeholder.

use std::f64::consts::PI;

use crate::error::AudioError;
use crate::media::format::{AudioFormatDescriptor, DurationEstimate, EncodingKind};
use crate::media::source::{AudioSource, ReadSeek};

use super::PcmBlock;
use super::pcm::PcmClipHandle;

const I16_FULL_SCALE: f32 = i16::MAX as f32;

/// Why the frame walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mp3Stop {
    EndOfStream,
    Corrupt(String),
}

/// Pulls decoded sample blocks out of an MP3 bitstream, one frame at a time.
pub struct Mp3FrameReader {
    decoder: minimp3::Decoder<Box<dyn ReadSeek>>,
    shape: Option<(u16, u32)>,
}

impl Mp3FrameReader {
    pub fn open(source: &dyn AudioSource) -> Result<Self, AudioError> {
        Ok(Self {
            decoder: minimp3::Decoder::new(source.open()?),
            shape: None,
        })
    }

    /// Next decoded frame, `None` at end of stream.
    pub fn next_block(&mut self) -> Result<Option<PcmBlock>, AudioError> {
        loop {
            match self.decoder.next_frame() {
                Ok(frame) => {
                    if frame.data.is_empty() || frame.channels == 0 {
                        continue;
                    }
                    let channels = frame.channels as u16;
                    let sample_rate = frame.sample_rate as u32;

                    match self.shape {
                        None => self.shape = Some((channels, sample_rate)),
                        Some((c, r)) if c != channels || r != sample_rate => {
                            return Err(AudioError::DecodeCorruption(format!(
                                "stream changed from {c} ch / {r} Hz to {channels} ch / {sample_rate} Hz"
                            )));
                        }
                        Some(_) => {}
                    }

                    return Ok(Some(PcmBlock {
                        samples: frame.data,
                        channels,
                        sample_rate,
                        bitrate_kbps: frame.bitrate.max(0) as u32,
                    }));
                }
                Err(minimp3::Error::Eof) | Err(minimp3::Error::InsufficientData) => {
                    return Ok(None);
                }
                Err(minimp3::Error::SkippedData) => continue,
                Err(minimp3::Error::Io(e)) => {
                    return Err(AudioError::DecodeCorruption(e.to_string()));
                }
            }
        }
    }
}

/// Output of one full pass over an MP3 file.
#[derive(Debug, Clone)]
pub struct Mp3Decoded {
    pub envelope: Vec<f32>,
    /// Interleaved 16-bit little-endian PCM.
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames (per channel) decoded.
    pub frames_decoded: u64,
    pub mp3_frames: usize,
    pub bitrate_kbps: u32,
    pub stop: Mp3Stop,
}

impl Mp3Decoded {
    pub fn is_empty(&self) -> bool {
        self.frames_decoded == 0
    }

    /// Reached end of stream without a corrupt frame.
    pub fn completed(&self) -> bool {
        self.stop == Mp3Stop::EndOfStream
    }

    /// Format as read from the first frame.
    pub fn format(&self) -> Option<AudioFormatDescriptor> {
        if self.is_empty() {
            return None;
        }
        Some(AudioFormatDescriptor {
            sample_rate_hz: self.sample_rate as f64,
            channel_count: self.channels,
            bits_per_sample: 16,
            big_endian: false,
            encoding_kind: EncodingKind::Mp3,
            estimated: false,
        })
    }

    /// Exact duration from the decoded frame count, when the walk ran to the end.
    pub fn exact_duration(&self) -> Option<DurationEstimate> {
        if self.is_empty() || !self.completed() || self.sample_rate == 0 {
            return None;
        }
        let micros = self.frames_decoded * 1_000_000 / self.sample_rate as u64;
        Some(DurationEstimate::exact(micros))
    }

    /// Re-synthesize the decoded byte buffer as a seekable clip.
    pub fn into_clip(self) -> Option<PcmClipHandle> {
        let format = self.format()?;
        let samples = self
            .pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Some(PcmClipHandle::new(format, samples))
    }
}

pub struct Mp3FrameDecoder;

impl Mp3FrameDecoder {
    /// Walk every frame once, building a bounded envelope and the PCM buffer.
    ///
    /// Only a source that cannot be opened is an error; a corrupt frame ends
    /// the walk and is reported through [`Mp3Decoded::stop`].
    pub fn decode_frames(
        source: &dyn AudioSource,
        max_envelope_points: usize,
    ) -> Result<Mp3Decoded, AudioError> {
        let mut reader = Mp3FrameReader::open(source)?;
        let max_points = max_envelope_points.max(1);

        let mut accumulator: Option<EnvelopeAccumulator> = None;
        let mut pcm = Vec::new();
        let mut frames_decoded = 0u64;
        let mut mp3_frames = 0usize;
        let mut first: Option<(u16, u32, u32)> = None;

        let stop = loop {
            let block = match reader.next_block() {
                Ok(Some(block)) => block,
                Ok(None) => break Mp3Stop::EndOfStream,
                Err(e) => {
                    log::warn!(
                        "{}: stopping MP3 decode after {mp3_frames} frames: {e}",
                        source.name()
                    );
                    break Mp3Stop::Corrupt(e.to_string());
                }
            };

            let (channels, _, _) = *first.get_or_insert((
                block.channels,
                block.sample_rate,
                block.bitrate_kbps,
            ));
            let acc = accumulator.get_or_insert_with(|| {
                let width = bucket_width(source.len(), block.sample_rate, max_points);
                log::debug!("MP3 envelope bucket width: {width} frames");
                EnvelopeAccumulator::new(max_points, width)
            });

            for frame in block.samples.chunks_exact(channels as usize) {
                let sum: f32 = frame.iter().map(|&s| (s as f32).abs()).sum();
                acc.push((sum / channels as f32 / I16_FULL_SCALE).min(1.0));
            }

            pcm.reserve(block.samples.len() * 2);
            for sample in &block.samples {
                pcm.extend_from_slice(&sample.to_le_bytes());
            }

            frames_decoded += block.frame_count() as u64;
            mp3_frames += 1;
        };

        let envelope = accumulator.map(|acc| acc.finish()).unwrap_or_default();
        let (channels, sample_rate, bitrate_kbps) = first.unwrap_or((0, 0, 0));

        log::info!(
            "{}: decoded {mp3_frames} MP3 frames, {frames_decoded} sample frames, {} envelope points",
            source.name(),
            envelope.len()
        );

        Ok(Mp3Decoded {
            envelope,
            pcm,
            sample_rate,
            channels,
            frames_decoded,
            mp3_frames,
            bitrate_kbps,
            stop,
        })
    }
}

/// Highest MPEG-1 layer III bitrate; no real frame packs audio more densely.
const MAX_BITRATE_BPS: u64 = 320_000;

/// Sample frames per envelope bucket, fixed up front.
///
/// Sized from the fewest frames the file could hold, so the bucket count can
/// only overshoot the cap (which compaction halves), never fall short of it.
fn bucket_width(file_len: u64, sample_rate: u32, max_points: usize) -> u64 {
    let min_frames = file_len * 8 * sample_rate as u64 / MAX_BITRATE_BPS;
    (min_frames / max_points as u64).max(1)
}

/// Averages amplitudes into at most `max_points` equal-width buckets.
///
/// When a completed bucket would exceed the cap, neighbouring buckets merge
/// pairwise and the width doubles.
#[derive(Debug)]
pub(crate) struct EnvelopeAccumulator {
    max_points: usize,
    width: u64,
    buckets: Vec<f32>,
    sum: f64,
    count: u64,
}

impl EnvelopeAccumulator {
    pub(crate) fn new(max_points: usize, width: u64) -> Self {
        Self {
            max_points: max_points.max(1),
            width: width.max(1),
            buckets: Vec::with_capacity(max_points.max(1) + 1),
            sum: 0.0,
            count: 0,
        }
    }

    pub(crate) fn push(&mut self, amplitude: f32) {
        self.sum += amplitude as f64;
        self.count += 1;
        if self.count >= self.width {
            self.buckets.push((self.sum / self.count as f64) as f32);
            self.sum = 0.0;
            self.count = 0;
            if self.buckets.len() > self.max_points {
                self.compact();
            }
        }
    }

    fn compact(&mut self) {
        let tail = if self.buckets.len() % 2 == 1 {
            self.buckets.pop()
        } else {
            None
        };
        self.buckets = self
            .buckets
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();

        // an unpaired bucket becomes the first half of the next, wider one
        if let Some(tail) = tail {
            self.sum = tail as f64 * self.width as f64;
            self.count = self.width;
        }
        self.width *= 2;
    }

    pub(crate) fn finish(mut self) -> Vec<f32> {
        if self.count > 0 {
            if self.buckets.len() < self.max_points {
                self.buckets.push((self.sum / self.count as f64) as f32);
            } else if let Some(last) = self.buckets.last_mut() {
                let merged = (*last as f64 * self.width as f64 + self.sum)
                    / (self.width + self.count) as f64;
                *last = merged as f32;
            }
        }
        self.buckets
    }
}

/// Guess duration from file size using typical bitrate bands.
pub fn estimate_duration(file_len: u64) -> DurationEstimate {
    const MB: u64 = 1024 * 1024;
    let bytes_per_second = match file_len {
        len if len < MB => 8_000,       // ~64 kbps
        len if len < 5 * MB => 16_000,  // ~128 kbps
        len if len < 10 * MB => 20_000, // ~160 kbps
        _ => 24_000,                    // ~192 kbps
    };
    let seconds = (file_len / bytes_per_second).max(1);
    DurationEstimate::estimated(seconds * 1_000_000)
}

/// Guess the stream format from the bitrate implied by size and duration.
pub fn estimate_format(file_len: u64, duration: DurationEstimate) -> AudioFormatDescriptor {
    let seconds = (duration.microseconds / 1_000_000).max(1);
    let bitrate = file_len * 8 / seconds;

    let (sample_rate_hz, channel_count) = match bitrate {
        b if b < 64_000 => (22_050.0, 1),
        b if b < 128_000 => (44_100.0, 1),
        b if b < 320_000 => (44_100.0, 2),
        _ => (48_000.0, 2),
    };

    AudioFormatDescriptor {
        sample_rate_hz,
        channel_count,
        bits_per_sample: 16,
        big_endian: false,
        encoding_kind: EncodingKind::Mp3,
        estimated: true,
    }
}

/// Deterministic two-tone stand-in shown when no real amplitudes exist.
pub fn placeholder_envelope(points: usize) -> Vec<f32> {
    (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            let value = 0.3 + 0.4 * (t * PI * 4.0).sin() + 0.3 * (t * PI * 8.0).sin();
            value.clamp(0.0, 1.0) as f32
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::source::MemorySource;

    pub(crate) const SILENT_FRAME_LEN: usize = 417;
    pub(crate) const SAMPLES_PER_FRAME: u64 = 1152;

    /// MPEG-1 layer III, 128 kbps, 44.1 kHz, mono, no CRC, zeroed side info
    /// and main data: decodes to silence.
    pub(crate) fn silent_mp3(frames: usize) -> Vec<u8> {
        silent_frames([0xFF, 0xFB, 0x90, 0xC0], SILENT_FRAME_LEN, frames)
    }

    /// `count` copies of `header` padded with zeros to `frame_len` bytes.
    /// Byte 2 carries the bitrate index, byte 3 the channel mode.
    pub(crate) fn silent_frames(header: [u8; 4], frame_len: usize, count: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(count * frame_len);
        for _ in 0..count {
            out.extend_from_slice(&header);
            out.resize(out.len() + frame_len - header.len(), 0);
        }
        out
    }

    #[test]
    fn test_decode_silent_stream() {
        let source = MemorySource::new("quiet.mp3", silent_mp3(60));
        let decoded = Mp3FrameDecoder::decode_frames(&source, 100).unwrap();

        assert!(!decoded.is_empty());
        assert!(decoded.completed());
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.bitrate_kbps, 128);
        assert_eq!(decoded.frames_decoded % SAMPLES_PER_FRAME, 0);
        assert!(decoded.frames_decoded <= 60 * SAMPLES_PER_FRAME);
        assert_eq!(decoded.pcm.len() as u64, decoded.frames_decoded * 2);

        assert!(!decoded.envelope.is_empty());
        assert!(decoded.envelope.len() <= 100);
        assert!(decoded.envelope.iter().all(|&a| a == 0.0));

        let duration = decoded.exact_duration().unwrap();
        assert!(duration.exact);
        assert_eq!(
            duration.microseconds,
            decoded.frames_decoded * 1_000_000 / 44_100
        );
    }

    #[test]
    fn test_decoded_pcm_becomes_clip() {
        let source = MemorySource::new("quiet.mp3", silent_mp3(30));
        let decoded = Mp3FrameDecoder::decode_frames(&source, 50).unwrap();
        let frames = decoded.frames_decoded;

        let clip = decoded.into_clip().unwrap();
        assert_eq!(clip.frame_length(), frames);
        assert_eq!(clip.format().encoding_kind, EncodingKind::Mp3);
    }

    #[test]
    fn test_low_bitrate_first_frame_still_fills_envelope() {
        // 32 kbps lead-in frame, then 320 kbps audio
        let mut bytes = silent_frames([0xFF, 0xFB, 0x10, 0xC0], 104, 1);
        bytes.extend(silent_frames([0xFF, 0xFB, 0xE0, 0xC0], 1044, 300));
        let source = MemorySource::new("vbr.mp3", bytes);

        let decoded = Mp3FrameDecoder::decode_frames(&source, 1000).unwrap();
        assert!(decoded.completed());
        assert_eq!(decoded.bitrate_kbps, 32);
        assert!(decoded.frames_decoded >= 290 * SAMPLES_PER_FRAME);
        let points = decoded.envelope.len();
        assert!((500..=1000).contains(&points), "{points} points");
    }

    #[test]
    fn test_leading_padding_does_not_shrink_envelope() {
        // a large tag block inflates the byte count without adding audio
        let mut bytes = vec![0u8; 200_000];
        bytes.extend(silent_mp3(200));
        let source = MemorySource::new("tagged.mp3", bytes);

        let decoded = Mp3FrameDecoder::decode_frames(&source, 100).unwrap();
        assert!(decoded.mp3_frames >= 190);
        let points = decoded.envelope.len();
        assert!((50..=100).contains(&points), "{points} points");
    }

    #[test]
    fn test_channel_change_stops_with_partial_result() {
        let mut bytes = silent_mp3(40);
        // same bitrate and rate, stereo channel mode
        bytes.extend(silent_frames([0xFF, 0xFB, 0x90, 0x00], SILENT_FRAME_LEN, 20));
        let source = MemorySource::new("spliced.mp3", bytes);

        let decoded = Mp3FrameDecoder::decode_frames(&source, 100).unwrap();
        assert!(!decoded.completed());
        assert!(matches!(decoded.stop, Mp3Stop::Corrupt(_)));
        assert!(!decoded.is_empty());
        assert!(!decoded.envelope.is_empty());
        assert_eq!(decoded.channels, 1);
        assert!(decoded.frames_decoded <= 40 * SAMPLES_PER_FRAME);
        assert!(decoded.exact_duration().is_none());
    }

    #[test]
    fn test_garbage_decodes_nothing() {
        let source = MemorySource::new("broken.mp3", vec![0u8; 5000]);
        let decoded = Mp3FrameDecoder::decode_frames(&source, 100).unwrap();

        assert!(decoded.is_empty());
        assert!(decoded.envelope.is_empty());
        assert!(decoded.format().is_none());
        assert!(decoded.exact_duration().is_none());
        assert!(decoded.into_clip().is_none());
    }

    #[test]
    fn test_duration_heuristic_bands() {
        let est = estimate_duration(3_000_000);
        assert!(!est.exact);
        let secs = est.microseconds / 1_000_000;
        assert!((150..=190).contains(&secs), "got {secs}s");

        assert_eq!(estimate_duration(0).microseconds, 1_000_000);
        assert_eq!(estimate_duration(800_000).microseconds, 100_000_000);
        assert_eq!(estimate_duration(8 * 1024 * 1024).microseconds / 1_000_000, 419);
        assert_eq!(estimate_duration(24_000_000).microseconds, 1_000_000_000);
    }

    #[test]
    fn test_format_estimate_from_bitrate() {
        let est = estimate_duration(3_000_000);
        let format = estimate_format(3_000_000, est);
        assert!(format.estimated);
        // 187 s over 3 MB is just above 128 kbps
        assert_eq!(format.sample_rate_hz, 44_100.0);
        assert_eq!(format.channel_count, 2);

        let mono = estimate_format(1_000_000, estimate_duration(1_000_000));
        assert_eq!(mono.sample_rate_hz, 44_100.0);
        assert_eq!(mono.channel_count, 1);

        let slow = estimate_format(1_000, DurationEstimate::estimated(1_000_000));
        assert_eq!(slow.sample_rate_hz, 22_050.0);
        let fast = estimate_format(50_000, DurationEstimate::estimated(1_000_000));
        assert_eq!(fast.sample_rate_hz, 48_000.0);
    }

    #[test]
    fn test_placeholder_is_deterministic_and_bounded() {
        let a = placeholder_envelope(1000);
        let b = placeholder_envelope(1000);
        assert_eq!(a.len(), 1000);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((a[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_accumulator_exact_fit() {
        let mut acc = EnvelopeAccumulator::new(4, 2);
        for v in [0.1, 0.3, 0.5, 0.5, 1.0, 0.0, 0.2, 0.2] {
            acc.push(v);
        }
        let points = acc.finish();
        assert_eq!(points.len(), 4);
        assert!((points[0] - 0.2).abs() < 1e-6);
        assert!((points[1] - 0.5).abs() < 1e-6);
        assert!((points[2] - 0.5).abs() < 1e-6);
        assert!((points[3] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_accumulator_never_exceeds_cap() {
        // width badly underestimated: 10x more input than planned
        let mut acc = EnvelopeAccumulator::new(10, 1);
        for i in 0..100 {
            acc.push(if i < 50 { 1.0 } else { 0.0 });
        }
        let points = acc.finish();
        assert!(points.len() <= 10);
        assert!(points.len() >= 5);
        assert_eq!(points[0], 1.0);
        assert_eq!(*points.last().unwrap(), 0.0);
    }

    #[test]
    fn test_accumulator_partial_tail() {
        let mut acc = EnvelopeAccumulator::new(10, 4);
        for _ in 0..6 {
            acc.push(0.5);
        }
        assert_eq!(acc.finish(), vec![0.5, 0.5]);
    }
}
