//! Seekable in-memory playback for fully decoded audio.

/// A pre-loaded clip whose output runs in the background once started.
///
/// Positions are in sample frames. Setting the position while running takes
/// effect at the next frame boundary.
pub trait Clip {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn frame_position(&self) -> u64;
    fn set_frame_position(&mut self, frame: u64);
    fn frame_length(&self) -> u64;
    fn sample_rate(&self) -> f64;
    fn close(&mut self);
}

#[cfg(feature = "player")]
pub use rodio_clip::RodioClip;

#[cfg(feature = "player")]
mod rodio_clip {
    use rodio::{OutputStream, Sink, Source};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;

    use super::Clip;
    use crate::decode::pcm::PcmClipHandle;
    use crate::error::AudioError;

    const NO_SEEK: usize = usize::MAX;

    /// Shared between the clip and the source the device is pulling from.
    struct Cursor {
        /// Next sample index to play.
        position: AtomicUsize,
        /// Sample index to jump to at the next frame boundary.
        pending: AtomicUsize,
    }

    pub struct RodioClip {
        _stream: OutputStream,
        sink: Sink,
        samples: Arc<[f32]>,
        cursor: Arc<Cursor>,
        channels: u16,
        sample_rate: u32,
        frames: u64,
    }

    impl RodioClip {
        pub fn open(clip: &PcmClipHandle) -> Result<Self, AudioError> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| AudioError::LineUnavailable(e.to_string()))?;
            let sink =
                Sink::try_new(&handle).map_err(|e| AudioError::LineUnavailable(e.to_string()))?;
            sink.pause();

            let format = clip.format();
            log::info!(
                "Opened clip: {} frames, {} Hz, {} ch",
                clip.frame_length(),
                format.sample_rate_hz,
                format.channel_count
            );

            Ok(Self {
                _stream: stream,
                sink,
                samples: clip.samples(),
                cursor: Arc::new(Cursor {
                    position: AtomicUsize::new(0),
                    pending: AtomicUsize::new(NO_SEEK),
                }),
                channels: format.channel_count.max(1),
                sample_rate: format.sample_rate_hz as u32,
                frames: clip.frame_length(),
            })
        }
    }

    impl Clip for RodioClip {
        fn start(&mut self) {
            if self.sink.empty() {
                self.sink.append(ClipSource {
                    samples: Arc::clone(&self.samples),
                    cursor: Arc::clone(&self.cursor),
                    channels: self.channels,
                    sample_rate: self.sample_rate,
                    emitted: 0,
                });
            }
            self.sink.play();
        }

        fn stop(&mut self) {
            self.sink.pause();
        }

        fn is_running(&self) -> bool {
            !self.sink.is_paused() && !self.sink.empty()
        }

        fn frame_position(&self) -> u64 {
            let pending = self.cursor.pending.load(Ordering::Acquire);
            let sample = if pending != NO_SEEK {
                pending
            } else {
                self.cursor.position.load(Ordering::Acquire)
            };
            (sample / self.channels as usize) as u64
        }

        fn set_frame_position(&mut self, frame: u64) {
            let frame = frame.min(self.frames) as usize;
            self.cursor
                .pending
                .store(frame * self.channels as usize, Ordering::Release);
        }

        fn frame_length(&self) -> u64 {
            self.frames
        }

        fn sample_rate(&self) -> f64 {
            self.sample_rate as f64
        }

        fn close(&mut self) {
            self.sink.stop();
        }
    }

    struct ClipSource {
        samples: Arc<[f32]>,
        cursor: Arc<Cursor>,
        channels: u16,
        sample_rate: u32,
        emitted: usize,
    }

    impl Iterator for ClipSource {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            // only jump between frames so channels stay aligned
            if self.emitted % self.channels as usize == 0 {
                let pending = self.cursor.pending.swap(NO_SEEK, Ordering::AcqRel);
                if pending != NO_SEEK {
                    self.cursor.position.store(pending, Ordering::Release);
                }
            }

            let position = self.cursor.position.load(Ordering::Acquire);
            let sample = self.samples.get(position).copied()?;
            self.cursor.position.store(position + 1, Ordering::Release);
            self.emitted += 1;
            Some(sample)
        }
    }

    impl Source for ClipSource {
        fn current_frame_len(&self) -> Option<usize> {
            None
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
