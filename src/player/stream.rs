//! Streaming MP3 playback on a background worker.
//!
//! The worker owns the decoder and the output sink. It receives commands and
//! reports back only through channels, so the controller never shares mutable
//! state with it. Every start opens a fresh decode from byte 0 and discards
//! decoded frames up to the requested start frame.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::MAX_QUEUED_BLOCKS;
use crate::decode::mp3::Mp3FrameReader;
use crate::error::AudioError;
use crate::media::source::AudioSource;

use super::output::{AudioOutput, StreamSink};

const THROTTLE: Duration = Duration::from_millis(5);

/// Messages from the worker to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Progress { frame: u64 },
    Finished,
    Failed(String),
}

#[derive(Debug)]
enum Command {
    Stop,
}

enum StreamEnd {
    Finished,
    Stopped,
}

struct Worker {
    commands: Sender<Command>,
    events: Receiver<PlaybackEvent>,
    handle: JoinHandle<()>,
}

pub struct StreamPlayer {
    source: Arc<dyn AudioSource>,
    output: Arc<dyn AudioOutput>,
    total_frames: u64,
    position: u64,
    worker: Option<Worker>,
}

impl StreamPlayer {
    pub fn new(source: Arc<dyn AudioSource>, output: Arc<dyn AudioOutput>, total_frames: u64) -> Self {
        Self {
            source,
            output,
            total_frames,
            position: 0,
            worker: None,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Last frame reported by the worker, or the frame it was started from.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Stop any running worker and start a new one at `from_frame`.
    pub fn start(&mut self, from_frame: u64) -> Result<(), AudioError> {
        if let Some(ended) = self.halt() {
            log::debug!("Discarding {ended:?} from replaced MP3 worker");
        }

        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let output = Arc::clone(&self.output);

        let handle = thread::Builder::new()
            .name("wavetrace-mp3".to_string())
            .spawn(move || run_worker(source, output, from_frame, command_rx, event_tx))?;

        log::debug!("MP3 worker started at frame {from_frame}");
        self.position = from_frame;
        self.worker = Some(Worker {
            commands: command_tx,
            events: event_rx,
            handle,
        });
        Ok(())
    }

    /// Stop and join the worker, keeping its last reported position.
    ///
    /// Returns the `Finished` or `Failed` event if the worker had already
    /// ended on its own, so the caller can act on it.
    pub fn halt(&mut self) -> Option<PlaybackEvent> {
        let worker = self.worker.take()?;
        let _ = worker.commands.send(Command::Stop);
        if worker.handle.join().is_err() {
            log::error!("MP3 worker panicked");
            return Some(PlaybackEvent::Failed("playback worker panicked".to_string()));
        }

        let mut terminal = None;
        for event in worker.events.try_iter() {
            match event {
                PlaybackEvent::Progress { frame } => self.position = frame,
                ended => terminal = Some(ended),
            }
        }
        terminal
    }

    /// Events posted since the last drain, applying progress to the position.
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        let Some(worker) = &self.worker else {
            return Vec::new();
        };
        let events: Vec<PlaybackEvent> = worker.events.try_iter().collect();
        for event in &events {
            if let PlaybackEvent::Progress { frame } = event {
                self.position = *frame;
            }
        }
        events
    }

    /// Set the stored position without a running worker.
    pub fn set_position(&mut self, frame: u64) {
        self.position = frame.min(self.total_frames);
    }

    pub fn close(&mut self) {
        self.halt();
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        self.halt();
    }
}

fn run_worker(
    source: Arc<dyn AudioSource>,
    output: Arc<dyn AudioOutput>,
    start_frame: u64,
    commands: Receiver<Command>,
    events: Sender<PlaybackEvent>,
) {
    let event = match stream_frames(source.as_ref(), output.as_ref(), start_frame, &commands, &events) {
        Ok(StreamEnd::Stopped) => return,
        Ok(StreamEnd::Finished) => PlaybackEvent::Finished,
        Err(e) => {
            log::error!("MP3 playback failed: {e}");
            PlaybackEvent::Failed(e.to_string())
        }
    };
    let _ = events.send(event);
}

fn stop_requested(commands: &Receiver<Command>) -> bool {
    match commands.try_recv() {
        Ok(Command::Stop) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// Reports the played position whenever it moves.
struct Reporter<'a> {
    events: &'a Sender<PlaybackEvent>,
    start_frame: u64,
    last: Option<u64>,
}

impl Reporter<'_> {
    fn report(&mut self, sink: &dyn StreamSink) {
        let frame = self.start_frame + sink.played_frames();
        if self.last != Some(frame) {
            let _ = self.events.send(PlaybackEvent::Progress { frame });
            self.last = Some(frame);
        }
    }
}

fn stream_frames(
    source: &dyn AudioSource,
    output: &dyn AudioOutput,
    start_frame: u64,
    commands: &Receiver<Command>,
    events: &Sender<PlaybackEvent>,
) -> Result<StreamEnd, AudioError> {
    let mut sink = output.open_stream()?;
    let mut reader = Mp3FrameReader::open(source)?;
    let mut reporter = Reporter {
        events,
        start_frame,
        last: None,
    };
    let mut to_skip = start_frame;

    loop {
        if stop_requested(commands) {
            sink.stop();
            return Ok(StreamEnd::Stopped);
        }

        let mut block = match reader.next_block() {
            Ok(Some(block)) => block,
            Ok(None) => break,
            Err(AudioError::DecodeCorruption(msg)) => {
                log::warn!("Ending MP3 playback at corrupt frame: {msg}");
                break;
            }
            Err(e) => return Err(e),
        };

        if to_skip > 0 {
            let frames = block.frame_count() as u64;
            if frames <= to_skip {
                to_skip -= frames;
                continue;
            }
            block.skip_frames(to_skip as usize);
            to_skip = 0;
        }

        sink.push(block);
        reporter.report(sink.as_ref());

        while sink.queued_blocks() > MAX_QUEUED_BLOCKS {
            if stop_requested(commands) {
                sink.stop();
                return Ok(StreamEnd::Stopped);
            }
            thread::sleep(THROTTLE);
            reporter.report(sink.as_ref());
        }
    }

    while sink.queued_blocks() > 0 {
        if stop_requested(commands) {
            sink.stop();
            return Ok(StreamEnd::Stopped);
        }
        thread::sleep(THROTTLE);
        reporter.report(sink.as_ref());
    }
    reporter.report(sink.as_ref());
    Ok(StreamEnd::Finished)
}
