use serde::Serialize;

use crate::usage::UsageInterval;

use super::window::DayWindow;

/// Gridlines are fixed at every two hours of a single day, `0:00` through `24:00`.
pub const GRIDLINE_COUNT: usize = 13;
const GRIDLINE_STEP_HOURS: usize = 2;
const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gridline {
    pub fraction: f64,
    pub label: String,
}

/// Vertical placement of one interval inside the chart, both values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentGeometry {
    pub top_fraction: f64,
    pub height_fraction: f64,
}

/// Pointer-hover line: where it is and the clock time it stands for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverLine {
    pub fraction: f64,
    pub label: String,
}

/// Position of `t` inside `[start, end]`, clamped to `[0, 1]`. A window of zero or negative length
/// is treated as one millisecond long.
pub fn window_to_fraction(t: i64, start: i64, end: i64) -> f64 {
    let span = (end - start).max(1) as f64;
    ((t - start) as f64 / span).clamp(0., 1.)
}

/// Inverse of [window_to_fraction]. Fractions outside `[0, 1]` are clamped first.
pub fn fraction_to_time(fraction: f64, start: i64, end: i64) -> i64 {
    let span = (end - start).max(1) as f64;
    let fraction = if fraction.is_nan() {
        0.
    } else {
        fraction.clamp(0., 1.)
    };
    start + (fraction * span).round() as i64
}

/// Clock label of a moment relative to the window start, truncated to whole minutes so it lines
/// up with the gridlines.
pub fn time_label(t: i64, start: i64) -> String {
    let minutes = (t - start).max(0) / MS_PER_MINUTE;
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

pub fn gridlines() -> Vec<Gridline> {
    let last = (GRIDLINE_COUNT - 1) as f64;
    (0..GRIDLINE_COUNT)
        .map(|i| Gridline {
            fraction: i as f64 / last,
            label: format!("{}:00", i * GRIDLINE_STEP_HOURS),
        })
        .collect()
}

/// Chart geometry of an interval. Intervals that do not touch the window at all give `None`;
/// everything else is clipped to the window edges.
pub fn project_interval(interval: UsageInterval, window: &DayWindow) -> Option<SegmentGeometry> {
    let (start, end) = (window.start_ts(), window.end_ts());
    if interval.end_ms < start || interval.start_ms > end {
        return None;
    }
    let top_fraction = window_to_fraction(interval.start_ms, start, end);
    let bottom_fraction = window_to_fraction(interval.end_ms, start, end);
    Some(SegmentGeometry {
        top_fraction,
        height_fraction: bottom_fraction - top_fraction,
    })
}

pub fn hover_line(fraction: f64, window: &DayWindow) -> HoverLine {
    let time = fraction_to_time(fraction, window.start_ts(), window.end_ts());
    HoverLine {
        fraction: window_to_fraction(time, window.start_ts(), window.end_ts()),
        label: time_label(time, window.start_ts()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{timeline::window::DayWindow, usage::UsageInterval};

    use super::{
        fraction_to_time, gridlines, hover_line, project_interval, time_label, window_to_fraction,
    };

    const DAY_END: i64 = 86_399_000;

    fn close(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn projects_interval_inside_window() {
        let window = DayWindow::starting_at(0);
        let geometry = project_interval(UsageInterval::new(43_199_500, 47_000_000), &window)
            .expect("Interval is inside the window");
        assert!(close(geometry.top_fraction, 0.5, 1e-4), "{geometry:?}");
        assert!(close(geometry.height_fraction, 0.04398, 1e-5), "{geometry:?}");
    }

    #[test]
    fn clamps_intervals_crossing_the_window() {
        let window = DayWindow::starting_at(0);

        let before_midnight = project_interval(UsageInterval::new(-3_600_000, 3_600_000), &window)
            .expect("Interval overlaps the window");
        assert_eq!(before_midnight.top_fraction, 0.);
        assert!(close(before_midnight.height_fraction, 3_600_000. / DAY_END as f64, 1e-9));

        let after_midnight =
            project_interval(UsageInterval::new(DAY_END - 1_000, DAY_END + 50_000_000), &window)
                .expect("Interval overlaps the window");
        assert!(after_midnight.height_fraction >= 0.);
        assert!(after_midnight.top_fraction + after_midnight.height_fraction <= 1.);

        assert_eq!(project_interval(UsageInterval::new(DAY_END + 1, DAY_END + 10), &window), None);
        assert_eq!(project_interval(UsageInterval::new(-10, -1), &window), None);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(window_to_fraction(-5, 0, 100), 0.);
        assert_eq!(window_to_fraction(500, 0, 100), 1.);
        assert_eq!(window_to_fraction(50, 0, 100), 0.5);
    }

    #[test]
    fn degenerate_window_does_not_divide_by_zero() {
        assert_eq!(window_to_fraction(10, 10, 10), 0.);
        assert_eq!(window_to_fraction(11, 10, 10), 1.);
        assert_eq!(window_to_fraction(11, 10, 5), 1.);
        assert_eq!(fraction_to_time(1., 10, 10), 11);
    }

    #[test]
    fn inverse_round_trips_within_a_minute() {
        for t in (0..=DAY_END).step_by(997_123) {
            let back = fraction_to_time(window_to_fraction(t, 0, DAY_END), 0, DAY_END);
            assert!((back - t).abs() < 60_000, "{t} {back}");
            assert_eq!(time_label(back, 0), time_label(t, 0));
        }
    }

    #[test]
    fn labels_truncate_seconds() {
        assert_eq!(time_label(0, 0), "0:00");
        assert_eq!(time_label(59_999, 0), "0:00");
        assert_eq!(time_label(60_000, 0), "0:01");
        assert_eq!(time_label(13 * 3_600_000 + 5 * 60_000 + 59_000, 0), "13:05");
        assert_eq!(time_label(DAY_END, 0), "23:59");
    }

    #[test]
    fn hover_line_uses_window_start() {
        let window = DayWindow::starting_at(1_000_000);
        let line = hover_line(0.5, &window);
        assert_eq!(line.label, "11:59");
        assert!(close(line.fraction, 0.5, 1e-6));

        let outside = hover_line(1.7, &window);
        assert_eq!(outside.fraction, 1.);
        assert_eq!(outside.label, "23:59");
    }

    #[test]
    fn thirteen_fixed_gridlines() {
        let lines = gridlines();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0].label, "0:00");
        assert_eq!(lines[1].label, "2:00");
        assert_eq!(lines[12].label, "24:00");
        assert_eq!(lines[0].fraction, 0.);
        assert_eq!(lines[12].fraction, 1.);
        assert!(close(lines[6].fraction, 0.5, 1e-12));
    }
}
