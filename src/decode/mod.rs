pub mod container;
pub mod mp3;
pub mod pcm;

pub use mp3::{Mp3Decoded, Mp3FrameDecoder, Mp3FrameReader, Mp3Stop};
pub use pcm::{PcmClipHandle, PcmDecoder, PcmStream};

use crate::media::probe::{Classification, ContainerKind};

/// Which decode path a classified file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Uncompressed samples behind a container header: random access, exact length.
    ContainerPcm(ContainerKind),
    /// MPEG layer III: walked frame by frame, no index.
    Mp3Frames,
}

impl Decoder {
    pub fn for_classification(classification: Classification) -> Option<Self> {
        match classification {
            Classification::Pcm(kind) => Some(Decoder::ContainerPcm(kind)),
            Classification::Mp3 => Some(Decoder::Mp3Frames),
            Classification::Unsupported => None,
        }
    }
}

/// One decoded frame of interleaved 16-bit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBlock {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

impl PcmBlock {
    /// Sample frames (per channel) in the block.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Drop the first `frames` sample frames.
    pub fn skip_frames(&mut self, frames: usize) {
        let samples = (frames * self.channels.max(1) as usize).min(self.samples.len());
        self.samples.drain(..samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_selection() {
        assert_eq!(
            Decoder::for_classification(Classification::Pcm(ContainerKind::Au)),
            Some(Decoder::ContainerPcm(ContainerKind::Au))
        );
        assert_eq!(
            Decoder::for_classification(Classification::Mp3),
            Some(Decoder::Mp3Frames)
        );
        assert_eq!(Decoder::for_classification(Classification::Unsupported), None);
    }

    #[test]
    fn test_block_skip_trims_whole_frames() {
        let mut block = PcmBlock {
            samples: (0..8).collect(),
            channels: 2,
            sample_rate: 8000,
            bitrate_kbps: 0,
        };
        assert_eq!(block.frame_count(), 4);
        block.skip_frames(3);
        assert_eq!(block.samples, vec![6, 7]);
        block.skip_frames(10);
        assert_eq!(block.frame_count(), 0);
    }
}
