use std::{io::Write, sync::Arc};

use ansi_term::{Colour, Style};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::{
    dashboard::{
        config::PALETTE,
        layout::{LayoutModel, ListEntry},
        presenter::Presenter,
        Command,
    },
    timeline::{
        projector::{time_label, GRIDLINE_COUNT},
        window::DayWindow,
    },
};

/// Terminal rows an expanded card takes per listed interval.
const DETAIL_LINE_HEIGHT: f64 = 1.;
const TIMELINE_WIDTH: usize = 24;

/// Draws layouts as plain text. Measurement requests are answered right away, since the natural
/// height of a card's detail is one line per interval.
pub struct TextPresenter<W: Write> {
    out: W,
    colored: bool,
    measurements: Option<mpsc::Sender<Command>>,
    last: Option<LayoutModel>,
}

impl TextPresenter<std::io::Stdout> {
    pub fn stdout(colored: bool) -> Self {
        Self::new(std::io::stdout(), colored)
    }
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self {
            out,
            colored,
            measurements: None,
            last: None,
        }
    }

    /// Measured heights are sent back through `commands`.
    pub fn with_measurements(self, commands: mpsc::Sender<Command>) -> Self {
        Self {
            measurements: Some(commands),
            ..self
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color_index: usize, text: &str) -> String {
        if self.colored {
            Style::new().fg(palette_colour(color_index)).paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn write_layout(&mut self, layout: &LayoutModel) -> std::io::Result<()> {
        let mut text = String::new();
        text.push_str(&format!("{}\n\n", layout.date_label));

        for row in 0..GRIDLINE_COUNT - 1 {
            let (from, to) = (
                layout.gridlines[row].fraction,
                layout.gridlines[row + 1].fraction,
            );
            let mut bar = String::new();
            for segment in layout.segments.iter().filter(|v| {
                v.top_fraction < to && v.top_fraction + v.height_fraction > from
            }) {
                let share = segment.top_fraction.max(from)
                    ..(segment.top_fraction + segment.height_fraction).min(to);
                let cells = ((share.end - share.start) / (to - from) * TIMELINE_WIDTH as f64)
                    .ceil() as usize;
                let glyph = if segment.opacity() > 0.5 { "█" } else { "░" };
                bar.push_str(&self.paint(segment.color_index, &glyph.repeat(cells.max(1))));
            }
            text.push_str(&format!("{:>6} │{}\n", layout.gridlines[row].label, bar));
        }
        text.push_str(&format!(
            "{:>6} │\n\n",
            layout.gridlines[GRIDLINE_COUNT - 1].label
        ));

        for entry in &layout.entries {
            text.push_str(&self.entry_text(entry, &layout.window));
        }

        if let Some(line) = &layout.hover_line {
            text.push_str(&format!("\nPointer at {}\n", line.label));
        }

        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    fn entry_text(&self, entry: &ListEntry, window: &DayWindow) -> String {
        let marker = if entry.highlighted { ">" } else { " " };
        let mut text = format!(
            "{marker}{} {:<24} {}\n",
            self.paint(entry.color_index, "●"),
            entry.identity,
            entry.formatted_duration
        );
        if entry.expanded {
            for interval in &entry.intervals {
                text.push_str(&format!(
                    "      {} - {}\n",
                    time_label(interval.start_ms, window.start_ts()),
                    time_label(interval.end_ms, window.start_ts())
                ));
            }
        }
        text
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn render(&mut self, layout: &LayoutModel) {
        if let Err(e) = self.write_layout(layout) {
            error!("Failed to print layout {e:?}");
        }
        self.last = Some(layout.clone());
    }

    fn request_measurement(&mut self, identities: &[Arc<str>]) {
        let Some(commands) = &self.measurements else {
            return;
        };
        let heights = identities
            .iter()
            .map(|identity| {
                let lines = self
                    .last
                    .as_ref()
                    .and_then(|v| v.entries.iter().find(|e| e.identity == *identity))
                    .map_or(0, |e| e.intervals.len());
                (identity.clone(), lines as f64 * DETAIL_LINE_HEIGHT)
            })
            .collect();
        if let Err(e) = commands.try_send(Command::HeightsMeasured(heights)) {
            warn!("Dropped measurement {e:?}");
        }
    }
}

/// Terminal colour of a palette slot.
pub fn palette_colour(color_index: usize) -> Colour {
    let hex = PALETTE[color_index % PALETTE.len()].trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|v| u8::from_str_radix(v, 16).ok())
            .unwrap_or(u8::MAX)
    };
    Colour::RGB(channel(0..2), channel(2..4), channel(4..6))
}
