//! Progress bar utilities for creating consistent progress indicators across commands.
//!
//! This module provides the spinner shown while a file is decoded and the bar
//! that tracks playback position.

use crate::constants::SPINNER_CHARS;
use crate::media::format::format_time;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a standard progress spinner with consistent styling.
///
/// # Example
///
/// ```ignore
/// use crate::utils::progress::create_progress_spinner;
///
/// let spinner = create_progress_spinner();
/// spinner.set_message("Decoding...");
/// // ... do work ...
/// spinner.finish_and_clear();
/// ```
pub fn create_progress_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_CHARS);
    spinner.set_style(style);
    spinner
}

/// Create a playback bar measured in milliseconds.
///
/// Position and length are shown through the message, set with
/// [`set_playback_position`].
pub fn create_playback_bar(total_micros: u64) -> ProgressBar {
    let pb = ProgressBar::new((total_micros / 1000).max(1));
    let style = ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb
}

pub fn set_playback_position(pb: &ProgressBar, position_micros: u64, total_micros: u64) {
    pb.set_position(position_micros / 1000);
    pb.set_message(format!(
        "{} / {}",
        format_time(position_micros),
        format_time(total_micros)
    ));
}
