use std::time::Duration;

use crate::interaction::hover::HOVER_RELEASE_DELAY;

/// Display colors, assigned by rank and cycled.
pub const PALETTE: [&str; 7] = [
    "#F8E629", "#9DBBD8", "#B28F18", "#0E50CA", "#EEEEEF", "#EE8505", "#EFCFB3",
];

/// Segment opacity at full emphasis.
pub const FULL_OPACITY: f64 = 0.75;
/// Segment opacity of applications outside a non-empty highlight.
pub const REDUCED_OPACITY: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub hover_release_delay: Duration,
    pub palette_len: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            hover_release_delay: HOVER_RELEASE_DELAY,
            palette_len: PALETTE.len(),
        }
    }
}
