pub mod config;
pub mod info;
pub mod play;
pub mod waveform;

use std::error::Error;
use std::path::Path;

use owo_colors::OwoColorize;
use wavetrace::config::Config;
use wavetrace::media::source::FileSource;
use wavetrace::pipeline::{self, Analysis};
use wavetrace::utils::progress::create_progress_spinner;

/// Open and analyze a file, with a spinner on the terminal unless output is JSON.
pub(crate) fn analyze_file(
    path: &Path,
    config: &Config,
    quiet: bool,
) -> Result<(FileSource, Analysis), Box<dyn Error>> {
    let source = FileSource::open(path)
        .map_err(|e| format!("Cannot open {}: {e}", path.display()))?;

    let spinner = (!quiet).then(|| {
        let spinner = create_progress_spinner();
        spinner.set_message(format!("Decoding {}", path.display().to_string().cyan()));
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let result = pipeline::analyze(&source, &config.load_options());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok((source, result?))
}
