//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency between the decoders, the player and the CLI.

use std::time::Duration;

/// Spinner animation characters for progress indicators
pub const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Accepted audio file extensions (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "au", "aiff", "mp3"];

/// Human-readable list shown with "unsupported format" errors
pub const SUPPORTED_FORMATS_LABEL: &str = "WAV, AU, AIFF, MP3";

/// Default number of points in a waveform envelope
pub const DEFAULT_ENVELOPE_POINTS: usize = 1000;

/// Period of the playback progress tick
pub const PROGRESS_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Window before the end of a clip inside which a stopped output counts as finished
pub const END_OF_CONTENT_TOLERANCE: Duration = Duration::from_secs(1);

/// Desired number of timeline markers across the axis
pub const TARGET_TIMELINE_TICKS: u64 = 10;

/// Minimum horizontal distance between two timeline markers
pub const MIN_TICK_SPACING_PX: u32 = 50;

/// Graduated timeline step table, in seconds
pub const TIMELINE_STEPS_SECS: &[u64] = &[1, 2, 5, 10, 15, 30, 60, 120, 300, 600, 900, 1800];

/// Decoded blocks the streaming player keeps queued ahead of the device
pub const MAX_QUEUED_BLOCKS: usize = 8;
