//! Amplitude envelopes for whole-file waveform display.
//!
//! An envelope is a fixed-length list of mean absolute amplitudes, one per
//! time bucket, computed once at load and shared read-only afterwards.

use serde::Serialize;

use crate::decode::mp3::{self, Mp3Decoded};
use crate::decode::pcm::PcmStream;

/// Where the envelope values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeSource {
    /// Every frame of the file was read.
    Decoded,
    /// Decoding stopped early; the tail of the file is missing.
    Partial,
    /// Synthesized stand-in, not derived from audio.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformEnvelope {
    points: Vec<f32>,
    source: EnvelopeSource,
}

impl WaveformEnvelope {
    pub fn new(points: Vec<f32>, source: EnvelopeSource) -> Self {
        Self { points, source }
    }

    /// Bucket a PCM stream into at most `target_points` points.
    ///
    /// With `n = min(target_points, total_frames)`, bucket `i` spans frames
    /// `[i*total/n, (i+1)*total/n)`. A read failure or short file ends the
    /// scan and yields a `Partial` envelope of what was read.
    pub fn extract(stream: &mut PcmStream, target_points: usize) -> Self {
        let total = stream.total_frames();
        let n = (target_points as u64).min(total);
        let mut points = Vec::with_capacity(n as usize);
        let mut samples = Vec::new();
        let mut source = EnvelopeSource::Decoded;

        for i in 0..n {
            let start = i * total / n;
            let end = (i + 1) * total / n;
            let wanted = (end - start) as usize;

            samples.clear();
            let got = match stream.decode_frames(wanted, &mut samples) {
                Ok(got) => got,
                Err(e) => {
                    log::warn!("Waveform scan stopped at frame {start}: {e}");
                    source = EnvelopeSource::Partial;
                    break;
                }
            };

            if got > 0 {
                points.push(mean_abs(&samples));
            }
            if got < wanted {
                source = EnvelopeSource::Partial;
                break;
            }
        }

        if source == EnvelopeSource::Partial {
            log::warn!(
                "Partial waveform: {} of {n} points ({} of {total} frames)",
                points.len(),
                stream.frames_read()
            );
        } else {
            log::info!("Extracted {}-point waveform from {total} frames", points.len());
        }

        Self { points, source }
    }

    /// Envelope accumulated by the MP3 frame walk.
    pub fn from_mp3(decoded: &Mp3Decoded) -> Self {
        let source = if decoded.completed() {
            EnvelopeSource::Decoded
        } else {
            EnvelopeSource::Partial
        };
        Self {
            points: decoded.envelope.clone(),
            source,
        }
    }

    pub fn placeholder(points: usize) -> Self {
        Self {
            points: mp3::placeholder_envelope(points),
            source: EnvelopeSource::Placeholder,
        }
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    pub fn source(&self) -> EnvelopeSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == EnvelopeSource::Placeholder
    }

    /// Re-bucket to `width` columns by averaging.
    ///
    /// Narrower than the envelope: each column averages its share of points.
    /// Wider: points repeat.
    pub fn display_points(&self, width: usize) -> Vec<f32> {
        if width == 0 {
            return Vec::new();
        }
        if self.points.is_empty() {
            return vec![0.0; width];
        }

        let len = self.points.len();
        (0..width)
            .map(|col| {
                let start = col * len / width;
                let end = ((col + 1) * len / width).max(start + 1).min(len);
                let slice = &self.points[start.min(len - 1)..end];
                slice.iter().sum::<f32>() / slice.len() as f32
            })
            .collect()
    }
}

fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s.abs() as f64).sum();
    ((sum / samples.len() as f64) as f32).min(1.0)
}

/// Convert amplitude to terminal block characters for visualization
pub fn amplitude_to_blocks(amplitude: f32) -> &'static str {
    let normalized = amplitude.abs().min(1.0);
    let index = (normalized * 8.0) as usize;

    match index {
        0 => " ",
        1 => "▁",
        2 => "▂",
        3 => "▃",
        4 => "▄",
        5 => "▅",
        6 => "▆",
        7 => "▇",
        _ => "█",
    }
}

/// Render one row of block glyphs, `width` columns wide.
pub fn render_blocks(envelope: &WaveformEnvelope, width: usize) -> String {
    envelope
        .display_points(width)
        .into_iter()
        .map(amplitude_to_blocks)
        .collect()
}
