//! Per-application usage data as it flows from a [UsageDataSource](crate::source::UsageDataSource)
//! into the ranked [AggregatedView](aggregator::AggregatedView).

pub mod aggregator;
pub mod format;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One continuous period an application was frontmost, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInterval {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl UsageInterval {
    /// Bounds are reordered if the feed hands them over reversed.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms: start_ms.min(end_ms),
            end_ms: start_ms.max(end_ms),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

impl From<(i64, i64)> for UsageInterval {
    fn from((start_ms, end_ms): (i64, i64)) -> Self {
        Self::new(start_ms, end_ms)
    }
}

/// Usage of one application before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAppUsage {
    pub identity: Arc<str>,
    pub path: Arc<str>,
    pub intervals: Vec<UsageInterval>,
}

impl RawAppUsage {
    pub fn new(
        identity: impl Into<Arc<str>>,
        path: impl Into<Arc<str>>,
        intervals: impl IntoIterator<Item = UsageInterval>,
    ) -> Self {
        Self {
            identity: identity.into(),
            path: path.into(),
            intervals: intervals.into_iter().collect(),
        }
    }
}

/// Aggregated record of an application. `total_secs` is always derived from `intervals` and
/// recomputed on every change to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUsageRecord {
    identity: Arc<str>,
    path: Arc<str>,
    intervals: Vec<UsageInterval>,
    total_secs: u64,
}

impl AppUsageRecord {
    pub fn new(
        identity: impl Into<Arc<str>>,
        path: impl Into<Arc<str>>,
        intervals: Vec<UsageInterval>,
    ) -> Self {
        let total_secs = total_secs(&intervals);
        Self {
            identity: identity.into(),
            path: path.into(),
            intervals,
            total_secs,
        }
    }

    pub fn identity(&self) -> &Arc<str> {
        &self.identity
    }

    pub fn path(&self) -> &Arc<str> {
        &self.path
    }

    pub fn intervals(&self) -> &[UsageInterval] {
        &self.intervals
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn push_interval(&mut self, interval: UsageInterval) {
        self.intervals.push(interval);
        self.total_secs = total_secs(&self.intervals);
    }

    pub fn extend_intervals(&mut self, intervals: impl IntoIterator<Item = UsageInterval>) {
        self.intervals.extend(intervals);
        self.total_secs = total_secs(&self.intervals);
    }
}

impl From<RawAppUsage> for AppUsageRecord {
    fn from(RawAppUsage { identity, path, intervals }: RawAppUsage) -> Self {
        AppUsageRecord::new(identity, path, intervals)
    }
}

/// `round(sum(end - start) / 1000)`, rounding half up.
fn total_secs(intervals: &[UsageInterval]) -> u64 {
    let total_ms: i64 = intervals.iter().map(UsageInterval::duration_ms).sum();
    (total_ms.max(0) as u64 + 500) / 1000
}

/// What a data source hands back for a window.
#[derive(Debug, Clone)]
pub enum UsageFeed {
    /// Identity to interval list, in the order the source first saw each identity. This is the
    /// canonical form; duplicate identities are merged by the aggregator.
    Raw(Vec<RawAppUsage>),
    /// Records a source already aggregated. Their totals are recomputed from the intervals.
    Aggregated(Vec<AppUsageRecord>),
}

impl Default for UsageFeed {
    fn default() -> Self {
        UsageFeed::Raw(vec![])
    }
}
