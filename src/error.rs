//! Error taxonomy for the ingestion pipeline and the playback controller.
//!
//! Every failure the library reports maps onto one [`ErrorKind`], which is what
//! the presentation layer receives through `AudioEvent::Error`. Whether a failure
//! disables playback controls or merely degrades the waveform is decided by the
//! kind, never by the message.

use thiserror::Error;

use crate::constants::SUPPORTED_FORMATS_LABEL;

/// Coarse classification carried by error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    IoFailure,
    LineUnavailable,
    DecodeCorruption,
    PlaybackRuntimeError,
    InvalidTransition,
    PlaybackUnavailable,
    Disposed,
}

#[derive(Error, Debug)]
pub enum AudioError {
    /// Extension or codec not recognized. Never retried.
    #[error("Unsupported format: {0}. Supported formats: {formats}", formats = SUPPORTED_FORMATS_LABEL)]
    UnsupportedFormat(String),

    /// The byte source could not be opened or read.
    #[error("Error reading file: {0}")]
    IoFailure(#[from] std::io::Error),

    /// No audio output device. Metadata and waveform are unaffected.
    #[error("Audio line unavailable: {0}")]
    LineUnavailable(String),

    /// A compressed frame could not be decoded mid-stream.
    #[error("Corrupt audio data: {0}")]
    DecodeCorruption(String),

    /// The background playback worker failed.
    #[error("Playback error: {0}")]
    PlaybackRuntimeError(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// A control was used on a session whose load disabled playback.
    #[error("Playback unavailable: {0}")]
    PlaybackUnavailable(String),

    #[error("Playback has been disposed")]
    Disposed,
}

impl AudioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AudioError::IoFailure(_) => ErrorKind::IoFailure,
            AudioError::LineUnavailable(_) => ErrorKind::LineUnavailable,
            AudioError::DecodeCorruption(_) => ErrorKind::DecodeCorruption,
            AudioError::PlaybackRuntimeError(_) => ErrorKind::PlaybackRuntimeError,
            AudioError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            AudioError::PlaybackUnavailable(_) => ErrorKind::PlaybackUnavailable,
            AudioError::Disposed => ErrorKind::Disposed,
        }
    }

    /// True when the failure leaves nothing to play.
    pub fn is_fatal_to_playback(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedFormat | ErrorKind::IoFailure | ErrorKind::LineUnavailable
        )
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::IoFailure(e),
            hound::Error::FormatError(msg) => AudioError::UnsupportedFormat(msg.to_string()),
            hound::Error::Unsupported => {
                AudioError::UnsupportedFormat("unsupported WAV encoding".to_string())
            }
            other => AudioError::UnsupportedFormat(other.to_string()),
        }
    }
}
