pub mod config;
pub mod constants;
pub mod decode;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod player;
pub mod timeline;
pub mod utils;
pub mod waveform;
