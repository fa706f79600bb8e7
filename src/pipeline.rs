//! Everything a load does before playback: classify, decode, extract, measure.
//!
//! No output device is touched here. The result is read-only and can be shared
//! with a display layer while the player owns the playback media.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ENVELOPE_POINTS, END_OF_CONTENT_TOLERANCE, PROGRESS_TICK_INTERVAL};
use crate::decode::mp3::{self, Mp3FrameDecoder};
use crate::decode::pcm::{PcmClipHandle, PcmDecoder};
use crate::decode::Decoder;
use crate::error::AudioError;
use crate::media::format::{AudioFormatDescriptor, DurationEstimate};
use crate::media::probe::{self, ContainerKind};
use crate::media::source::AudioSource;
use crate::waveform::WaveformEnvelope;

/// Bytes read for container sniffing.
const SNIFF_LEN: usize = 12;

/// How MP3 files are played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mp3Playback {
    /// Decode on a worker thread while playing.
    #[default]
    Stream,
    /// Play the PCM buffer kept from the waveform pass.
    Clip,
}

impl std::str::FromStr for Mp3Playback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stream" => Ok(Mp3Playback::Stream),
            "clip" => Ok(Mp3Playback::Clip),
            other => Err(format!("Unknown MP3 playback mode '{other}' (expected stream or clip)")),
        }
    }
}

/// Tunables for a load, usually taken from the user's config.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub envelope_points: usize,
    pub progress_interval: Duration,
    pub end_tolerance: Duration,
    pub mp3_playback: Mp3Playback,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            envelope_points: DEFAULT_ENVELOPE_POINTS,
            progress_interval: PROGRESS_TICK_INTERVAL,
            end_tolerance: END_OF_CONTENT_TOLERANCE,
            mp3_playback: Mp3Playback::default(),
        }
    }
}

/// What the player is handed.
#[derive(Debug, Clone)]
pub enum PlaybackMedia {
    /// Fully decoded and seekable.
    Clip(PcmClipHandle),
    /// Forward-only MP3 decode, restarted from the source on every start.
    Stream { total_frames: u64, sample_rate: u32 },
}

impl PlaybackMedia {
    pub fn total_frames(&self) -> u64 {
        match self {
            PlaybackMedia::Clip(clip) => clip.frame_length(),
            PlaybackMedia::Stream { total_frames, .. } => *total_frames,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub decoder: Decoder,
    pub format: AudioFormatDescriptor,
    pub duration: DurationEstimate,
    pub envelope: Arc<WaveformEnvelope>,
    pub media: PlaybackMedia,
}

impl Analysis {
    pub fn total_frames(&self) -> u64 {
        self.media.total_frames()
    }
}

/// Classify and fully decode `source`.
///
/// Unsupported names fail before any byte is read.
pub fn analyze(source: &dyn AudioSource, options: &LoadOptions) -> Result<Analysis, AudioError> {
    probe::require_supported(source.name(), None)?;

    let header = source.peek(SNIFF_LEN)?;
    let decoder = Decoder::for_classification(probe::classify(source.name(), Some(&header)))
        .ok_or_else(|| AudioError::UnsupportedFormat(source.name().to_string()))?;
    log::info!("{}: using {decoder:?}", source.name());

    match decoder {
        Decoder::ContainerPcm(kind) => analyze_pcm(source, kind, options),
        Decoder::Mp3Frames => analyze_mp3(source, options),
    }
}

fn analyze_pcm(
    source: &dyn AudioSource,
    kind: ContainerKind,
    options: &LoadOptions,
) -> Result<Analysis, AudioError> {
    let envelope = {
        let mut stream = PcmDecoder::open_stream(source, kind)?;
        WaveformEnvelope::extract(&mut stream, options.envelope_points)
    };

    let (format, clip) = PcmDecoder::open(source, kind)?;
    let duration = DurationEstimate::exact(clip.microsecond_length());
    log::info!("{}: duration {duration}", source.name());

    Ok(Analysis {
        decoder: Decoder::ContainerPcm(kind),
        format,
        duration,
        envelope: Arc::new(envelope),
        media: PlaybackMedia::Clip(clip),
    })
}

fn analyze_mp3(source: &dyn AudioSource, options: &LoadOptions) -> Result<Analysis, AudioError> {
    let decoded = Mp3FrameDecoder::decode_frames(source, options.envelope_points)?;

    let (format, duration) = match (decoded.format(), decoded.exact_duration()) {
        (Some(format), Some(duration)) => (format, duration),
        (format, _) => {
            let duration = mp3::estimate_duration(source.len());
            log::warn!("{}: falling back to estimated duration {duration}", source.name());
            let format = format.unwrap_or_else(|| mp3::estimate_format(source.len(), duration));
            (format, duration)
        }
    };

    let envelope = if !decoded.is_empty() {
        WaveformEnvelope::from_mp3(&decoded)
    } else if duration.microseconds > 0 {
        log::warn!("{}: no MP3 frames decoded, showing placeholder waveform", source.name());
        WaveformEnvelope::placeholder(options.envelope_points)
    } else {
        WaveformEnvelope::placeholder(0)
    };

    let sample_rate = format.sample_rate_hz as u32;
    let total_frames = if decoded.is_empty() {
        format.micros_to_frames(duration.microseconds)
    } else {
        decoded.frames_decoded
    };

    let media = match options.mp3_playback {
        Mp3Playback::Clip => match decoded.into_clip() {
            Some(clip) => PlaybackMedia::Clip(clip),
            None => PlaybackMedia::Stream {
                total_frames,
                sample_rate,
            },
        },
        Mp3Playback::Stream => PlaybackMedia::Stream {
            total_frames,
            sample_rate,
        },
    };

    Ok(Analysis {
        decoder: Decoder::Mp3Frames,
        format,
        duration,
        envelope: Arc::new(envelope),
        media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::mp3::tests::{silent_frames, silent_mp3};
    use crate::error::ErrorKind;
    use crate::media::source::MemorySource;
    use crate::waveform::EnvelopeSource;
    use std::io::Cursor;

    fn wav_bytes(seconds: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..seconds * sample_rate {
                let t = i as f32 / sample_rate as f32;
                let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
                writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_unsupported_extension_fails_fast() {
        let source = MemorySource::new("notes.txt", b"RIFF not really".to_vec());
        let err = analyze(&source, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.is_fatal_to_playback());
    }

    #[test]
    fn test_wav_is_exact() {
        let source = MemorySource::new("tone.wav", wav_bytes(5, 8000));
        let analysis = analyze(&source, &LoadOptions::default()).unwrap();

        assert!(analysis.duration.exact);
        assert_eq!(analysis.duration.microseconds, 5_000_000);
        assert_eq!(analysis.envelope.len(), 1000);
        assert_eq!(analysis.envelope.source(), EnvelopeSource::Decoded);
        assert_eq!(analysis.total_frames(), 40_000);
        assert!(matches!(analysis.media, PlaybackMedia::Clip(_)));

        // half-scale sine: mean |x| is 0.5 * 2/pi
        let mean = analysis.envelope.points().iter().sum::<f32>() / 1000.0;
        assert!((mean - 0.318).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn test_mislabeled_container_is_sniffed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b".snd");
        for v in [24u32, 200, 3, 8000, 1] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.resize(24 + 200, 0);

        let source = MemorySource::new("really-au.wav", bytes);
        let analysis = analyze(&source, &LoadOptions::default()).unwrap();
        assert_eq!(analysis.decoder, Decoder::ContainerPcm(ContainerKind::Au));
        assert_eq!(analysis.total_frames(), 100);
    }

    #[test]
    fn test_mp3_clean_decode_is_exact() {
        let source = MemorySource::new("quiet.mp3", silent_mp3(60));
        let analysis = analyze(&source, &LoadOptions::default()).unwrap();

        assert_eq!(analysis.decoder, Decoder::Mp3Frames);
        assert!(analysis.duration.exact);
        assert!(!analysis.format.estimated);
        assert_eq!(analysis.envelope.source(), EnvelopeSource::Decoded);
        assert!(analysis.envelope.len() <= 1000);
        assert!(matches!(analysis.media, PlaybackMedia::Stream { sample_rate: 44_100, .. }));
    }

    #[test]
    fn test_mp3_format_change_keeps_partial_envelope() {
        let mut bytes = silent_mp3(40);
        bytes.extend(silent_frames([0xFF, 0xFB, 0x90, 0x00], 417, 20));
        let source = MemorySource::new("spliced.mp3", bytes);
        let analysis = analyze(&source, &LoadOptions::default()).unwrap();

        assert_eq!(analysis.envelope.source(), EnvelopeSource::Partial);
        assert!(!analysis.envelope.is_empty());
        assert!(!analysis.duration.exact);
        assert!(analysis.total_frames() > 0);
    }

    #[test]
    fn test_mp3_clip_mode() {
        let source = MemorySource::new("quiet.mp3", silent_mp3(20));
        let options = LoadOptions {
            mp3_playback: Mp3Playback::Clip,
            ..LoadOptions::default()
        };
        let analysis = analyze(&source, &options).unwrap();
        match &analysis.media {
            PlaybackMedia::Clip(clip) => assert!(clip.frame_length() > 0),
            other => panic!("expected clip, got {other:?}"),
        }
    }

    #[test]
    fn test_undecodable_mp3_degrades() {
        let source = MemorySource::new("broken.mp3", vec![0u8; 3_000]);
        let analysis = analyze(&source, &LoadOptions::default()).unwrap();

        assert!(!analysis.duration.exact);
        assert_eq!(analysis.duration.microseconds, 1_000_000);
        assert!(analysis.format.estimated);
        assert!(analysis.envelope.is_placeholder());
        assert_eq!(analysis.envelope.len(), 1000);
        assert!(analysis.total_frames() > 0);
    }

    #[test]
    fn test_mp3_playback_parse() {
        assert_eq!("Stream".parse::<Mp3Playback>(), Ok(Mp3Playback::Stream));
        assert_eq!("clip".parse::<Mp3Playback>(), Ok(Mp3Playback::Clip));
        assert!("tape".parse::<Mp3Playback>().is_err());
    }
}
