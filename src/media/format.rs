use serde::Serialize;
use std::fmt;

/// Sample encoding of the decoded stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingKind {
    PcmSigned,
    /// 8-bit WAV data is stored offset-binary.
    PcmUnsigned,
    PcmFloat,
    Mp3,
    Other(String),
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingKind::PcmSigned => write!(f, "PCM signed"),
            EncodingKind::PcmUnsigned => write!(f, "PCM unsigned"),
            EncodingKind::PcmFloat => write!(f, "PCM float"),
            EncodingKind::Mp3 => write!(f, "MPEG layer III"),
            EncodingKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Format of a loaded file, derived once per load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFormatDescriptor {
    pub sample_rate_hz: f64,
    pub channel_count: u16,
    pub bits_per_sample: u16,
    pub big_endian: bool,
    pub encoding_kind: EncodingKind,
    /// Set when the values were guessed from the file size rather than read.
    pub estimated: bool,
}

impl AudioFormatDescriptor {
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * self.channel_count as usize
    }

    pub fn frames_to_micros(&self, frames: u64) -> u64 {
        if self.sample_rate_hz <= 0.0 {
            return 0;
        }
        (frames as f64 * 1_000_000.0 / self.sample_rate_hz) as u64
    }

    pub fn micros_to_frames(&self, micros: u64) -> u64 {
        (micros as f64 * self.sample_rate_hz / 1_000_000.0) as u64
    }

    pub fn channels_label(&self) -> String {
        let label = match self.channel_count {
            1 => "1 (Mono)".to_string(),
            2 => "2 (Stereo)".to_string(),
            n => n.to_string(),
        };
        self.mark_estimated(label)
    }

    pub fn sample_rate_label(&self) -> String {
        let label = if self.sample_rate_hz.fract() == 0.0 {
            format!("{:.0} Hz", self.sample_rate_hz)
        } else {
            format!("{:.2} Hz", self.sample_rate_hz)
        };
        self.mark_estimated(label)
    }

    pub fn bit_depth_label(&self) -> String {
        self.mark_estimated(format!("{} bit", self.bits_per_sample))
    }

    fn mark_estimated(&self, label: String) -> String {
        if self.estimated {
            format!("{label} (est.)")
        } else {
            label
        }
    }
}

/// Total duration plus whether it was measured or guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationEstimate {
    pub microseconds: u64,
    pub exact: bool,
}

impl DurationEstimate {
    pub fn exact(microseconds: u64) -> Self {
        Self {
            microseconds,
            exact: true,
        }
    }

    pub fn estimated(microseconds: u64) -> Self {
        Self {
            microseconds,
            exact: false,
        }
    }
}

impl fmt::Display for DurationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_time(self.microseconds))?;
        if !self.exact {
            write!(f, " (est.)")?;
        }
        Ok(())
    }
}

/// Format microseconds as `m:ss.mmm`.
pub fn format_time(microseconds: u64) -> String {
    let total_seconds = microseconds / 1_000_000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let millis = (microseconds % 1_000_000) / 1_000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.0} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd_quality() -> AudioFormatDescriptor {
        AudioFormatDescriptor {
            sample_rate_hz: 44_100.0,
            channel_count: 2,
            bits_per_sample: 16,
            big_endian: false,
            encoding_kind: EncodingKind::PcmSigned,
            estimated: false,
        }
    }

    #[test]
    fn test_frame_size() {
        let mut format = cd_quality();
        assert_eq!(format.frame_size(), 4);
        format.bits_per_sample = 24;
        assert_eq!(format.bytes_per_sample(), 3);
        assert_eq!(format.frame_size(), 6);
    }

    #[test]
    fn test_frames_to_micros() {
        let format = cd_quality();
        assert_eq!(format.frames_to_micros(44_100), 1_000_000);
        assert_eq!(format.micros_to_frames(500_000), 22_050);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00.000");
        assert_eq!(format_time(83_456_000), "1:23.456");
        assert_eq!(format_time(600_500_000), "10:00.500");
    }

    #[test]
    fn test_duration_display_marks_estimates() {
        assert_eq!(DurationEstimate::exact(5_000_000).to_string(), "0:05.000");
        assert_eq!(
            DurationEstimate::estimated(187_000_000).to_string(),
            "3:07.000 (est.)"
        );
    }

    #[test]
    fn test_labels() {
        let mut format = cd_quality();
        assert_eq!(format.channels_label(), "2 (Stereo)");
        assert_eq!(format.sample_rate_label(), "44100 Hz");
        format.estimated = true;
        format.channel_count = 1;
        assert_eq!(format.channels_label(), "1 (Mono) (est.)");
        assert_eq!(format.bit_depth_label(), "16 bit (est.)");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }
}
