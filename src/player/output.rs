//! Audio output seam.
//!
//! The controller only ever talks to [`AudioOutput`], so the state machine runs
//! the same against a sound card, a build without device support, or a test
//! double.

use std::sync::Arc;

use crate::decode::PcmBlock;
use crate::decode::pcm::PcmClipHandle;
use crate::error::AudioError;

use super::clip::Clip;

/// Forward-only sink fed one decoded block at a time.
pub trait StreamSink {
    fn push(&mut self, block: PcmBlock);
    /// Blocks handed over but not yet fully played.
    fn queued_blocks(&self) -> usize;
    /// Sample frames the device has consumed since the sink opened.
    fn played_frames(&self) -> u64;
    fn stop(&mut self);
}

pub trait AudioOutput: Send + Sync {
    /// Check that an output line can be opened at all.
    fn probe(&self) -> Result<(), AudioError>;

    fn open_clip(&self, clip: &PcmClipHandle) -> Result<Box<dyn Clip>, AudioError>;

    /// Called on the streaming worker thread; the sink never leaves it.
    fn open_stream(&self) -> Result<Box<dyn StreamSink>, AudioError>;
}

/// Output for builds or hosts without a sound device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn probe(&self) -> Result<(), AudioError> {
        Err(AudioError::LineUnavailable("no audio output configured".to_string()))
    }

    fn open_clip(&self, _clip: &PcmClipHandle) -> Result<Box<dyn Clip>, AudioError> {
        Err(AudioError::LineUnavailable("no audio output configured".to_string()))
    }

    fn open_stream(&self) -> Result<Box<dyn StreamSink>, AudioError> {
        Err(AudioError::LineUnavailable("no audio output configured".to_string()))
    }
}

/// The device backend when built with it, otherwise [`NullOutput`].
pub fn default_output() -> Arc<dyn AudioOutput> {
    #[cfg(feature = "player")]
    {
        Arc::new(RodioOutput)
    }
    #[cfg(not(feature = "player"))]
    {
        Arc::new(NullOutput)
    }
}

#[cfg(feature = "player")]
pub use rodio_output::RodioOutput;

#[cfg(feature = "player")]
mod rodio_output {
    use rodio::{OutputStream, Sink, Source};
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };
    use std::time::Duration;

    use super::{AudioOutput, StreamSink};
    use crate::decode::PcmBlock;
    use crate::decode::pcm::PcmClipHandle;
    use crate::error::AudioError;
    use crate::player::clip::{Clip, RodioClip};

    fn line_unavailable(e: impl std::fmt::Display) -> AudioError {
        AudioError::LineUnavailable(e.to_string())
    }

    /// Default system output device via rodio.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RodioOutput;

    impl AudioOutput for RodioOutput {
        fn probe(&self) -> Result<(), AudioError> {
            OutputStream::try_default()
                .map(|_| ())
                .map_err(line_unavailable)
        }

        fn open_clip(&self, clip: &PcmClipHandle) -> Result<Box<dyn Clip>, AudioError> {
            Ok(Box::new(RodioClip::open(clip)?))
        }

        fn open_stream(&self) -> Result<Box<dyn StreamSink>, AudioError> {
            let (stream, handle) = OutputStream::try_default().map_err(line_unavailable)?;
            let sink = Sink::try_new(&handle).map_err(line_unavailable)?;
            Ok(Box::new(RodioStreamSink {
                _stream: stream,
                sink,
                played_samples: Arc::new(AtomicU64::new(0)),
                channels: 1,
            }))
        }
    }

    struct RodioStreamSink {
        _stream: OutputStream,
        sink: Sink,
        played_samples: Arc<AtomicU64>,
        channels: u16,
    }

    impl StreamSink for RodioStreamSink {
        fn push(&mut self, block: PcmBlock) {
            self.channels = block.channels.max(1);
            self.sink.append(BlockSource {
                samples: block.samples.into_iter(),
                channels: block.channels.max(1),
                sample_rate: block.sample_rate,
                played_samples: Arc::clone(&self.played_samples),
            });
        }

        fn queued_blocks(&self) -> usize {
            self.sink.len()
        }

        fn played_frames(&self) -> u64 {
            self.played_samples.load(Ordering::Relaxed) / self.channels as u64
        }

        fn stop(&mut self) {
            self.sink.stop();
        }
    }

    /// One decoded frame, counting samples as the device pulls them.
    struct BlockSource {
        samples: std::vec::IntoIter<i16>,
        channels: u16,
        sample_rate: u32,
        played_samples: Arc<AtomicU64>,
    }

    impl Iterator for BlockSource {
        type Item = i16;

        fn next(&mut self) -> Option<Self::Item> {
            let sample = self.samples.next()?;
            self.played_samples.fetch_add(1, Ordering::Relaxed);
            Some(sample)
        }
    }

    impl Source for BlockSource {
        fn current_frame_len(&self) -> Option<usize> {
            Some(self.samples.len())
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            let frames = self.samples.len() / self.channels as usize;
            Some(Duration::from_secs_f64(
                frames as f64 / self.sample_rate.max(1) as f64,
            ))
        }
    }
}

/// In-memory outputs for exercising the controller without hardware.
#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct ClipLog {
        pub running: bool,
        pub position: u64,
        pub length: u64,
        pub starts: usize,
        pub closed: bool,
    }

    pub(crate) struct FakeClip {
        pub log: Arc<Mutex<ClipLog>>,
        pub sample_rate: f64,
    }

    impl Clip for FakeClip {
        fn start(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.running = true;
            log.starts += 1;
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().running = false;
        }

        fn is_running(&self) -> bool {
            self.log.lock().unwrap().running
        }

        fn frame_position(&self) -> u64 {
            self.log.lock().unwrap().position
        }

        fn set_frame_position(&mut self, frame: u64) {
            let mut log = self.log.lock().unwrap();
            log.position = frame.min(log.length);
        }

        fn frame_length(&self) -> u64 {
            self.log.lock().unwrap().length
        }

        fn sample_rate(&self) -> f64 {
            self.sample_rate
        }

        fn close(&mut self) {
            self.log.lock().unwrap().closed = true;
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct StreamLog {
        pub opened: usize,
        pub frames: u64,
        pub first_samples: Vec<i16>,
        pub stopped: bool,
        /// Report a full queue so the worker waits until it is halted.
        pub hold: bool,
    }

    /// Plays instantly: every pushed frame counts as played.
    pub(crate) struct FakeStreamSink {
        log: Arc<Mutex<StreamLog>>,
        played: u64,
    }

    impl StreamSink for FakeStreamSink {
        fn push(&mut self, block: PcmBlock) {
            let mut log = self.log.lock().unwrap();
            if log.first_samples.is_empty() {
                log.first_samples = block.samples.iter().take(4).copied().collect();
            }
            let frames = block.frame_count() as u64;
            log.frames += frames;
            self.played += frames;
        }

        fn queued_blocks(&self) -> usize {
            if self.log.lock().unwrap().hold {
                usize::MAX
            } else {
                0
            }
        }

        fn played_frames(&self) -> u64 {
            self.played
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().stopped = true;
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeOutput {
        pub clip: Arc<Mutex<ClipLog>>,
        pub stream: Arc<Mutex<StreamLog>>,
        pub fail_streams: bool,
    }

    impl AudioOutput for FakeOutput {
        fn probe(&self) -> Result<(), AudioError> {
            Ok(())
        }

        fn open_clip(&self, clip: &PcmClipHandle) -> Result<Box<dyn Clip>, AudioError> {
            self.clip.lock().unwrap().length = clip.frame_length();
            Ok(Box::new(FakeClip {
                log: Arc::clone(&self.clip),
                sample_rate: clip.format().sample_rate_hz,
            }))
        }

        fn open_stream(&self) -> Result<Box<dyn StreamSink>, AudioError> {
            if self.fail_streams {
                return Err(AudioError::LineUnavailable("device unplugged".to_string()));
            }
            self.stream.lock().unwrap().opened += 1;
            Ok(Box::new(FakeStreamSink {
                log: Arc::clone(&self.stream),
                played: 0,
            }))
        }
    }
}
