use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    source::UsageDataSource,
    usage::UsageFeed,
    utils::{clock::Clock, time::day_start_ms},
};

/// Distance between the starts of two consecutive windows.
pub const DAY_MS: i64 = 86_400_000;
/// A window ends at 23:59:59.000, one second short of the next midnight.
pub const WINDOW_SPAN_MS: i64 = 86_399_000;

/// One calendar day of the chart, `[start_ts, end_ts]` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    start_ts: i64,
    end_ts: i64,
}

impl DayWindow {
    pub fn starting_at(start_ts: i64) -> Self {
        Self {
            start_ts,
            end_ts: start_ts + WINDOW_SPAN_MS,
        }
    }

    /// Window with arbitrary bounds. An empty or inverted range is widened to one millisecond.
    pub fn new(start_ts: i64, end_ts: i64) -> Self {
        if end_ts <= start_ts {
            warn!("Rejected window {start_ts}..{end_ts}, using a 1ms span instead");
            return Self {
                start_ts,
                end_ts: start_ts + 1,
            };
        }
        Self { start_ts, end_ts }
    }

    /// Window of the day containing `moment`, starting at midnight in the moment's timezone.
    pub fn containing<Tz: TimeZone>(moment: &DateTime<Tz>) -> Self {
        Self::starting_at(day_start_ms(moment))
    }

    pub fn start_ts(&self) -> i64 {
        self.start_ts
    }

    pub fn end_ts(&self) -> i64 {
        self.end_ts
    }

    pub fn shifted(&self, days: i64) -> Self {
        Self {
            start_ts: self.start_ts + days * DAY_MS,
            end_ts: self.end_ts + days * DAY_MS,
        }
    }

    pub fn date_label_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match tz.timestamp_millis_opt(self.start_ts).single() {
            Some(date) => date.format("%A, %B %-d, %Y").to_string(),
            None => String::from("Unknown date"),
        }
    }

    pub fn date_label(&self) -> String {
        self.date_label_in(&Local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

impl Direction {
    pub fn days(self) -> i64 {
        match self {
            Direction::Back => -1,
            Direction::Forward => 1,
        }
    }
}

/// Result of one fetch, tagged with the request it answers.
#[derive(Debug)]
pub struct FetchCompletion {
    pub seq: u64,
    pub window: DayWindow,
    pub result: Result<UsageFeed>,
}

/// Owns the displayed day and issues fetches for it. Fetches run as separate tasks and report
/// back through the completion channel; every fetch gets a sequence number so that only the
/// answer to the newest request is applied.
pub struct DayWindowController {
    window: DayWindow,
    source: Arc<dyn UsageDataSource>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    issued: u64,
}

impl DayWindowController {
    pub fn new(
        window: DayWindow,
        source: Arc<dyn UsageDataSource>,
        completions: mpsc::UnboundedSender<FetchCompletion>,
    ) -> Self {
        Self {
            window,
            source,
            completions,
            issued: 0,
        }
    }

    /// Starts at local midnight of the clock's current time.
    pub fn initial(
        clock: &dyn Clock,
        source: Arc<dyn UsageDataSource>,
        completions: mpsc::UnboundedSender<FetchCompletion>,
    ) -> Self {
        let now = clock.time().with_timezone(&Local);
        Self::new(DayWindow::containing(&now), source, completions)
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    /// Moves one day back or forward and fetches the new day. The window changes right away; the
    /// data for it arrives later through the completion channel.
    pub fn advance(&mut self, direction: Direction) -> u64 {
        self.window = self.window.shifted(direction.days());
        info!(
            "Moved to window {}..{}",
            self.window.start_ts, self.window.end_ts
        );
        self.issue_fetch()
    }

    /// Fetches the current window again without moving it.
    pub fn refresh_trigger(&mut self) -> u64 {
        self.issue_fetch()
    }

    /// Whether a completion answers the newest request. Anything older is stale.
    pub fn is_current(&self, completion: &FetchCompletion) -> bool {
        completion.seq == self.issued && completion.window == self.window
    }

    fn issue_fetch(&mut self) -> u64 {
        self.issued += 1;
        let seq = self.issued;
        let window = self.window;
        let source = self.source.clone();
        let completions = self.completions.clone();

        let span = info_span!("Fetching usage", seq, start = window.start_ts, end = window.end_ts);
        tokio::spawn(
            async move {
                let result = source.fetch(window.start_ts, window.end_ts).await;
                if completions
                    .send(FetchCompletion {
                        seq,
                        window,
                        result,
                    })
                    .is_err()
                {
                    debug!("Dashboard is gone, dropping fetch result");
                }
            }
            .instrument(span),
        );
        seq
    }
}
