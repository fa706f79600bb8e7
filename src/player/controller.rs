//! The playback state machine bound to an audio backend.
//!
//! All state changes go through [`PlaybackState::next`]; the backend is only
//! touched once a transition has been accepted. Progress is sampled on a
//! caller-driven tick (`poll`), which is also where end of content and worker
//! failures are noticed.

use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::error::{AudioError, ErrorKind};
use crate::pipeline::LoadOptions;

use super::clip::Clip;
use super::event::AudioEvent;
use super::state::{PlaybackAction, PlaybackState};
use super::stream::{PlaybackEvent, StreamPlayer};
use super::timer::ProgressTimer;

pub enum Backend {
    Clip(Box<dyn Clip>),
    Stream(StreamPlayer),
}

pub struct PlaybackController {
    state: PlaybackState,
    backend: Backend,
    total_frames: u64,
    sample_rate: f64,
    tolerance_frames: u64,
    timer: ProgressTimer,
    events: Sender<AudioEvent>,
    closed: bool,
}

impl PlaybackController {
    /// `sample_rate` is used for stream backends; clips report their own.
    pub fn new(
        backend: Backend,
        sample_rate: f64,
        options: &LoadOptions,
        events: Sender<AudioEvent>,
    ) -> Self {
        let (total_frames, sample_rate) = match &backend {
            Backend::Clip(clip) => (clip.frame_length(), clip.sample_rate()),
            Backend::Stream(stream) => (stream.total_frames(), sample_rate),
        };
        let tolerance_frames = (options.end_tolerance.as_secs_f64() * sample_rate) as u64;

        Self {
            state: PlaybackState::Stopped,
            backend,
            total_frames,
            sample_rate,
            tolerance_frames,
            timer: ProgressTimer::new(options.progress_interval),
            events,
            closed: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current frame: the playing frame, or where the next `play` starts.
    pub fn position(&self) -> u64 {
        let frame = match &self.backend {
            Backend::Clip(clip) => clip.frame_position(),
            Backend::Stream(stream) => stream.position(),
        };
        frame.min(self.total_frames)
    }

    pub fn frames_to_micros(&self, frames: u64) -> u64 {
        if self.sample_rate <= 0.0 {
            return 0;
        }
        (frames as f64 * 1_000_000.0 / self.sample_rate) as u64
    }

    pub fn play(&mut self) -> Result<(), AudioError> {
        self.ensure_open()?;
        let next = self.transition(PlaybackAction::Play {
            from_frame: self.position(),
        })?;
        let from = match next {
            PlaybackState::Playing { started_at_frame } => started_at_frame,
            _ => self.position(),
        };

        match &mut self.backend {
            Backend::Clip(clip) => {
                clip.set_frame_position(from);
                clip.start();
            }
            Backend::Stream(stream) => stream.start(from)?,
        }

        log::info!("Playing from frame {from}");
        self.set_state(next);
        self.timer.start(Instant::now());
        self.emit_progress();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), AudioError> {
        self.ensure_open()?;
        self.settle_stream();
        self.transition(PlaybackAction::Pause {
            at_frame: self.position(),
        })?;

        let at_frame = match &mut self.backend {
            Backend::Clip(clip) => {
                clip.stop();
                clip.frame_position()
            }
            Backend::Stream(stream) => stream.position(),
        };

        log::info!("Paused at frame {at_frame}");
        self.timer.cancel();
        self.set_state(PlaybackState::Paused {
            paused_at_frame: at_frame,
        });
        self.emit_progress();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.ensure_open()?;
        self.settle_stream();
        let next = self.transition(PlaybackAction::Stop)?;
        self.rewind_backend();
        self.timer.cancel();
        self.set_state(next);
        self.emit_progress();
        Ok(())
    }

    /// Move to `fraction` of the content. Allowed in every state.
    pub fn seek(&mut self, fraction: f64) -> Result<(), AudioError> {
        self.ensure_open()?;
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let frame = ((self.total_frames as f64 * fraction).floor() as u64).min(self.total_frames);
        self.settle_stream();
        let next = self.transition(PlaybackAction::Seek { frame })?;

        match &mut self.backend {
            Backend::Clip(clip) => clip.set_frame_position(frame),
            Backend::Stream(stream) if self.state.is_playing() => stream.start(frame)?,
            Backend::Stream(stream) => stream.set_position(frame),
        }

        log::debug!("Seek to frame {frame} ({:.1}%)", fraction * 100.0);
        self.set_state(next);
        self.emit_progress();
        Ok(())
    }

    /// Run a progress tick if one is due.
    pub fn poll(&mut self, now: Instant) {
        if self.closed || !self.timer.fire(now) {
            return;
        }
        self.on_tick();
    }

    fn on_tick(&mut self) {
        // a tick can still arrive after a stop
        if !self.state.is_playing() {
            self.timer.cancel();
            return;
        }

        let ended = match &mut self.backend {
            Backend::Clip(clip) => {
                let end_window = clip.frame_length().saturating_sub(self.tolerance_frames);
                (clip.frame_position() >= end_window && !clip.is_running())
                    .then_some(PlaybackEvent::Finished)
            }
            Backend::Stream(stream) => stream
                .drain()
                .into_iter()
                .rev()
                .find(|event| !matches!(event, PlaybackEvent::Progress { .. })),
        };

        match ended {
            Some(event) => self.apply_end(event),
            None => self.emit_progress(),
        }
    }

    /// Join a playing stream worker, applying any end or failure it had
    /// already posted before the caller's own transition runs.
    fn settle_stream(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        if let Backend::Stream(stream) = &mut self.backend
            && let Some(event) = stream.halt()
        {
            self.apply_end(event);
        }
    }

    fn apply_end(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Progress { .. } => {}
            PlaybackEvent::Finished => {
                log::info!("Playback reached end of content");
                self.end_playback(PlaybackAction::Finished);
            }
            PlaybackEvent::Failed(message) => {
                let _ = self.events.send(AudioEvent::Error {
                    kind: ErrorKind::PlaybackRuntimeError,
                    message,
                });
                self.end_playback(PlaybackAction::Failed);
            }
        }
    }

    fn end_playback(&mut self, action: PlaybackAction) {
        let Some(next) = self.state.next(action) else {
            return;
        };
        self.rewind_backend();
        self.timer.cancel();
        self.set_state(next);
        self.emit_progress();
    }

    /// Halt output and move back to frame 0.
    fn rewind_backend(&mut self) {
        match &mut self.backend {
            Backend::Clip(clip) => {
                clip.stop();
                clip.set_frame_position(0);
            }
            Backend::Stream(stream) => {
                if let Some(event) = stream.halt() {
                    log::debug!("Dropping {event:?} on rewind");
                }
                stream.set_position(0);
            }
        }
    }

    /// Stop, cancel the tick, close the backend. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.stop() {
            log::warn!("Stop during dispose failed: {e}");
        }
        self.timer.cancel();
        match &mut self.backend {
            Backend::Clip(clip) => clip.close(),
            Backend::Stream(stream) => stream.close(),
        }
        self.closed = true;
        log::debug!("Playback controller disposed");
    }

    fn ensure_open(&self) -> Result<(), AudioError> {
        if self.closed {
            Err(AudioError::Disposed)
        } else {
            Ok(())
        }
    }

    fn transition(&self, action: PlaybackAction) -> Result<PlaybackState, AudioError> {
        self.state
            .next(action)
            .ok_or(AudioError::InvalidTransition {
                action: action.name(),
                state: self.state.name(),
            })
    }

    fn set_state(&mut self, next: PlaybackState) {
        if next != self.state {
            log::debug!("Playback state {:?} -> {:?}", self.state, next);
            self.state = next;
            let _ = self.events.send(AudioEvent::PlaybackStateChanged(next));
        }
    }

    fn emit_progress(&self) {
        let position = self.position();
        let fraction = if self.total_frames > 0 {
            position as f64 / self.total_frames as f64
        } else {
            0.0
        };
        let _ = self.events.send(AudioEvent::Progress {
            fraction,
            position_micros: self.frames_to_micros(position),
            total_micros: self.frames_to_micros(self.total_frames),
        });
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.dispose();
    }
}
