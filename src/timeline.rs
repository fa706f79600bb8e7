//! Time axis markers for a waveform of known duration.

use serde::Serialize;

use crate::constants::{MIN_TICK_SPACING_PX, TARGET_TIMELINE_TICKS, TIMELINE_STEPS_SECS};
use crate::media::format::format_time;

/// Steps past the end of the table grow in whole multiples of this.
const LONG_STEP_QUANTUM_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineTick {
    pub time_microseconds: u64,
    pub label: String,
}

impl TimelineTick {
    fn at(time_microseconds: u64) -> Self {
        Self {
            time_microseconds,
            label: format_time(time_microseconds),
        }
    }
}

/// Markers for `total_microseconds` laid across `pixel_width` pixels.
pub fn ticks(total_microseconds: u64, pixel_width: u32) -> Vec<TimelineTick> {
    ticks_with_spacing(total_microseconds, pixel_width, MIN_TICK_SPACING_PX)
}

pub fn ticks_with_spacing(
    total_microseconds: u64,
    pixel_width: u32,
    min_spacing_px: u32,
) -> Vec<TimelineTick> {
    if total_microseconds == 0 {
        return Vec::new();
    }
    let Some(step) = step_seconds(total_microseconds, pixel_width, min_spacing_px) else {
        return vec![TimelineTick::at(0)];
    };

    let step_micros = step * 1_000_000;
    (0..=total_microseconds / step_micros)
        .map(|i| TimelineTick::at(i * step_micros))
        .collect()
}

/// Chosen tick step in whole seconds, or `None` when the axis is too narrow
/// for more than the origin marker.
pub fn step_seconds(total_microseconds: u64, pixel_width: u32, min_spacing_px: u32) -> Option<u64> {
    if total_microseconds == 0 || pixel_width < min_spacing_px.max(1) {
        return None;
    }

    let total_secs = total_microseconds as f64 / 1_000_000.0;
    let width = pixel_width as f64;
    let min_spacing = min_spacing_px as f64;

    let mut step = snap_up(total_secs / TARGET_TIMELINE_TICKS as f64);
    if (step as f64) * width / total_secs < min_spacing {
        step = snap_up(total_secs * min_spacing / width);
    }
    Some(step)
}

/// Smallest table step at or above `seconds`.
fn snap_up(seconds: f64) -> u64 {
    TIMELINE_STEPS_SECS
        .iter()
        .copied()
        .find(|&step| step as f64 >= seconds)
        .unwrap_or_else(|| {
            let quanta = (seconds / LONG_STEP_QUANTUM_SECS as f64).ceil() as u64;
            quanta.max(1) * LONG_STEP_QUANTUM_SECS
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spacing_px(step: u64, total_secs: f64, width: u32) -> f64 {
        step as f64 * width as f64 / total_secs
    }

    #[test]
    fn test_125_seconds_at_600px() {
        let ticks = ticks(125_000_000, 600);
        let step = ticks[1].time_microseconds - ticks[0].time_microseconds;

        assert_eq!(step, 15_000_000);
        assert!(TIMELINE_STEPS_SECS.contains(&(step / 1_000_000)));
        assert!(spacing_px(15, 125.0, 600) >= 50.0);
        assert_eq!(ticks[0].time_microseconds, 0);
        assert_eq!(ticks.last().unwrap().time_microseconds, 120_000_000);
        assert!(ticks.iter().all(|t| t.time_microseconds <= 125_000_000));
    }

    #[test]
    fn test_labels() {
        let ticks = ticks(125_000_000, 600);
        assert_eq!(ticks[0].label, "0:00.000");
        assert_eq!(ticks[4].label, "1:00.000");
    }

    #[test]
    fn test_narrow_axis_widens_step() {
        // 10 minutes: base 60s, but at 200px that is only 20px apart
        let step = step_seconds(600_000_000, 200, 50).unwrap();
        assert_eq!(step, 300);
        assert!(spacing_px(step, 600.0, 200) >= 50.0);
    }

    #[test]
    fn test_spacing_holds_across_widths_and_lengths() {
        for total_secs in [1u64, 3, 59, 125, 600, 3599, 7200] {
            for width in [50u32, 120, 333, 600, 1920] {
                let step = step_seconds(total_secs * 1_000_000, width, 50).unwrap();
                let spacing = spacing_px(step, total_secs as f64, width);
                assert!(spacing >= 50.0, "{total_secs}s at {width}px: step {step}");
            }
        }
    }

    #[test]
    fn test_long_steps_round_to_five_minutes() {
        // 10 hours over 400px needs 4500s between markers
        let step = step_seconds(36_000_000_000, 400, 50).unwrap();
        assert_eq!(step % 300, 0);
        assert!(step > 1800);
        assert_eq!(step, 4500);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(ticks(0, 600).is_empty());

        let narrow = ticks(125_000_000, 40);
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow[0].time_microseconds, 0);

        let short = ticks(400_000, 600);
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].label, "0:00.000");
    }
}
