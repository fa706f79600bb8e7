//! Playback: the state machine, its audio backends, and the session facade.
//!
//! PCM files (and MP3 in clip mode) play from a fully decoded in-memory clip.
//! MP3 in stream mode decodes on a background worker that reports back over a
//! channel. Either way the [`controller::PlaybackController`] owns the backend
//! and is the only thing that starts, stops, or seeks it.

pub mod clip;
pub mod controller;
pub mod event;
pub mod output;
pub mod session;
pub mod state;
pub mod stream;
pub mod timer;

pub use event::AudioEvent;
pub use output::{AudioOutput, NullOutput, default_output};
pub use session::AudioSession;
pub use state::PlaybackState;

#[cfg(feature = "player")]
pub use output::RodioOutput;
