//! One loaded file: analysis results plus the controller that plays it.
//!
//! `AudioSession::load` never fails outright. Problems surface as
//! `AudioEvent::Error` and, when they leave nothing to play, disable the
//! playback controls while keeping whatever metadata and waveform were built.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use crate::error::AudioError;
use crate::media::format::{AudioFormatDescriptor, DurationEstimate};
use crate::media::source::AudioSource;
use crate::pipeline::{self, Analysis, LoadOptions, PlaybackMedia};
use crate::waveform::WaveformEnvelope;

use super::controller::{Backend, PlaybackController};
use super::event::AudioEvent;
use super::output::AudioOutput;
use super::state::PlaybackState;
use super::stream::StreamPlayer;

pub struct AudioSession {
    name: String,
    analysis: Option<Analysis>,
    controller: Option<PlaybackController>,
    /// Why playback is off, when it is.
    disabled: Option<String>,
    disposed: bool,
}

impl AudioSession {
    pub fn load(
        source: Arc<dyn AudioSource>,
        output: Arc<dyn AudioOutput>,
        options: &LoadOptions,
    ) -> (Self, Receiver<AudioEvent>) {
        let (events, receiver) = mpsc::channel();
        let name = source.name().to_string();

        let analysis = match pipeline::analyze(source.as_ref(), options) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::error!("{name}: load failed: {e}");
                let session = Self::disabled(name, None, &events, e);
                return (session, receiver);
            }
        };

        let _ = events.send(AudioEvent::MetadataReady {
            format: analysis.format.clone(),
            duration: analysis.duration,
        });
        let _ = events.send(AudioEvent::WaveformReady(Arc::clone(&analysis.envelope)));

        let backend = match &analysis.media {
            PlaybackMedia::Clip(clip) => output.open_clip(clip).map(Backend::Clip),
            PlaybackMedia::Stream { total_frames, .. } => output.probe().map(|()| {
                Backend::Stream(StreamPlayer::new(
                    Arc::clone(&source),
                    Arc::clone(&output),
                    *total_frames,
                ))
            }),
        };

        match backend {
            Ok(backend) => {
                let controller = PlaybackController::new(
                    backend,
                    analysis.format.sample_rate_hz,
                    options,
                    events,
                );
                let session = Self {
                    name,
                    analysis: Some(analysis),
                    controller: Some(controller),
                    disabled: None,
                    disposed: false,
                };
                (session, receiver)
            }
            Err(e) => {
                log::warn!("{name}: playback unavailable: {e}");
                let session = Self::disabled(name, Some(analysis), &events, e);
                (session, receiver)
            }
        }
    }

    fn disabled(
        name: String,
        analysis: Option<Analysis>,
        events: &Sender<AudioEvent>,
        error: AudioError,
    ) -> Self {
        let _ = events.send(AudioEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
        });
        Self {
            name,
            analysis,
            controller: None,
            disabled: Some(error.to_string()),
            disposed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn format(&self) -> Option<&AudioFormatDescriptor> {
        self.analysis.as_ref().map(|a| &a.format)
    }

    pub fn duration(&self) -> Option<DurationEstimate> {
        self.analysis.as_ref().map(|a| a.duration)
    }

    pub fn envelope(&self) -> Option<Arc<WaveformEnvelope>> {
        self.analysis.as_ref().map(|a| Arc::clone(&a.envelope))
    }

    pub fn playback_enabled(&self) -> bool {
        !self.disposed && self.controller.is_some()
    }

    /// Reason playback is disabled, if it is.
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled.as_deref()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller
            .as_ref()
            .map(|c| c.state())
            .unwrap_or_default()
    }

    /// Position and length in microseconds.
    pub fn progress_micros(&self) -> (u64, u64) {
        match &self.controller {
            Some(c) => (
                c.frames_to_micros(c.position()),
                c.frames_to_micros(c.total_frames()),
            ),
            None => (0, self.duration().map_or(0, |d| d.microseconds)),
        }
    }

    fn controller(&mut self) -> Result<&mut PlaybackController, AudioError> {
        if self.disposed {
            return Err(AudioError::Disposed);
        }
        match self.controller.as_mut() {
            Some(controller) => Ok(controller),
            None => Err(AudioError::PlaybackUnavailable(
                self.disabled
                    .clone()
                    .unwrap_or_else(|| "no playback backend".to_string()),
            )),
        }
    }

    pub fn play(&mut self) -> Result<(), AudioError> {
        self.controller()?.play()
    }

    pub fn pause(&mut self) -> Result<(), AudioError> {
        self.controller()?.pause()
    }

    /// Pause when playing, otherwise play.
    pub fn toggle(&mut self) -> Result<(), AudioError> {
        if self.state().is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.controller()?.stop()
    }

    pub fn seek(&mut self, fraction: f64) -> Result<(), AudioError> {
        self.controller()?.seek(fraction)
    }

    /// Seek relative to the current position by `delta` of the total length.
    pub fn seek_by(&mut self, delta: f64) -> Result<(), AudioError> {
        let controller = self.controller()?;
        let total = controller.total_frames();
        let current = if total > 0 {
            controller.position() as f64 / total as f64
        } else {
            0.0
        };
        controller.seek(current + delta)
    }

    pub fn poll(&mut self, now: Instant) {
        if let Ok(controller) = self.controller() {
            controller.poll(now);
        }
    }

    /// Stop, cancel ticking, close playback and decode handles. Idempotent,
    /// and safe on a session whose load failed.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(controller) = self.controller.as_mut() {
            controller.dispose();
        }
        self.controller = None;
        self.disposed = true;
        log::debug!("{}: session disposed", self.name);
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
