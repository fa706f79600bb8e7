use std::sync::Arc;

use crate::error::ErrorKind;
use crate::media::format::{AudioFormatDescriptor, DurationEstimate};
use crate::waveform::WaveformEnvelope;

use super::state::PlaybackState;

/// Notifications pushed to the presentation layer.
#[derive(Debug, Clone)]
pub enum AudioEvent {
    MetadataReady {
        format: AudioFormatDescriptor,
        duration: DurationEstimate,
    },
    WaveformReady(Arc<WaveformEnvelope>),
    Progress {
        fraction: f64,
        position_micros: u64,
        total_micros: u64,
    },
    PlaybackStateChanged(PlaybackState),
    Error {
        kind: ErrorKind,
        message: String,
    },
}
