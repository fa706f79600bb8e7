use owo_colors::OwoColorize;
use serde::Serialize;
use std::error::Error;
use std::path::Path;

use wavetrace::config::Config;
use wavetrace::timeline::{self, TimelineTick};
use wavetrace::waveform::{EnvelopeSource, render_blocks};

/// Assumed pixel width of one terminal column, for tick spacing.
const PX_PER_COLUMN: u32 = 8;

#[derive(Serialize)]
struct WaveformReport {
    duration_micros: u64,
    duration_exact: bool,
    source: EnvelopeSource,
    points: Vec<f32>,
    ticks: Vec<TimelineTick>,
}

/// Place tick labels on a row `width` columns wide, skipping any that would overlap.
fn label_row(ticks: &[TimelineTick], total_micros: u64, width: usize) -> String {
    let mut row = vec![' '; width];
    let mut next_free = 0;

    for tick in ticks {
        let col = if total_micros == 0 {
            0
        } else {
            (tick.time_microseconds as u128 * width as u128 / total_micros as u128) as usize
        };
        let label: Vec<char> = format!("|{}", tick.label).chars().collect();
        if col < next_free || col + label.len() > width {
            continue;
        }
        row[col..col + label.len()].copy_from_slice(&label);
        next_free = col + label.len() + 1;
    }

    row.into_iter().collect::<String>().trim_end().to_string()
}

pub fn handle_waveform(path: &Path, width: Option<usize>, json: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let width = width.unwrap_or(80).max(1);
    let (_source, analysis) = super::analyze_file(path, &config, json)?;

    let total = analysis.duration.microseconds;
    let ticks = timeline::ticks_with_spacing(
        total,
        width as u32 * PX_PER_COLUMN,
        config.min_tick_spacing_px,
    );

    if json {
        let report = WaveformReport {
            duration_micros: total,
            duration_exact: analysis.duration.exact,
            source: analysis.envelope.source(),
            points: analysis.envelope.display_points(width),
            ticks,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", render_blocks(&analysis.envelope, width).cyan());
    println!("{}", label_row(&ticks, total, width));

    match analysis.envelope.source() {
        EnvelopeSource::Decoded => {}
        EnvelopeSource::Partial => println!(
            "\n{} Decoding stopped early; the waveform covers part of the file.",
            "Note:".yellow()
        ),
        EnvelopeSource::Placeholder => println!(
            "\n{} No audio could be decoded; showing a placeholder shape.",
            "Note:".yellow()
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_row_skips_overlaps() {
        let ticks = timeline::ticks(125_000_000, 600);
        let row = label_row(&ticks, 125_000_000, 75);
        assert!(row.starts_with("|0:00.000"));
        assert!(row.chars().count() <= 75);
        assert!(!row.contains("||"));
    }

    #[test]
    fn test_label_row_empty() {
        assert_eq!(label_row(&[], 0, 10), "");
    }
}
