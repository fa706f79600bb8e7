pub mod format;
pub mod probe;
pub mod source;

pub use format::{AudioFormatDescriptor, DurationEstimate, EncodingKind};
pub use probe::{Classification, ContainerKind, classify};
pub use source::{AudioSource, FileSource, MemorySource, ReadSeek};
