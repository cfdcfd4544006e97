use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::{debug, instrument};

use super::{AppUsageRecord, RawAppUsage, UsageFeed};

/// Records ranked by total active time, longest first. Records with equal totals keep the order
/// the feed delivered them in.
///
/// The rank is only used to pick a display color, so colors follow position rather than
/// identity and an application may change color between windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedView {
    records: Vec<AppUsageRecord>,
}

impl AggregatedView {
    pub fn records(&self) -> &[AppUsageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records together with their rank.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &AppUsageRecord)> {
        self.records.iter().enumerate()
    }

    pub fn get(&self, identity: &str) -> Option<&AppUsageRecord> {
        self.records.iter().find(|v| &*v.identity == identity)
    }

    pub fn total_secs(&self) -> u64 {
        self.records.iter().map(AppUsageRecord::total_secs).sum()
    }

    /// Earliest interval start over every record. `None` for an empty view or when no record has
    /// an interval.
    pub fn earliest_start(&self) -> Option<i64> {
        self.records
            .iter()
            .flat_map(|v| v.intervals())
            .map(|v| v.start_ms)
            .min()
    }

    pub fn latest_end(&self) -> Option<i64> {
        self.records
            .iter()
            .flat_map(|v| v.intervals())
            .map(|v| v.end_ms)
            .max()
    }
}

/// Cyclic palette position for a rank.
pub fn color_index(rank: usize, palette_len: usize) -> usize {
    rank % palette_len.max(1)
}

/// Builds a ranked view out of whatever the data source returned.
#[instrument(skip(feed))]
pub fn aggregate(feed: UsageFeed) -> AggregatedView {
    let records = match feed {
        UsageFeed::Raw(raw) => merge_raw(raw),
        // Rebuilding recomputes the total, so a stale total from the source can't drift.
        UsageFeed::Aggregated(records) => records
            .into_iter()
            .map(|v| AppUsageRecord::new(v.identity, v.path, v.intervals))
            .collect(),
    };
    rank(records)
}

/// Merges entries sharing an identity into the first one, keeping first-appearance order.
fn merge_raw(raw: Vec<RawAppUsage>) -> Vec<AppUsageRecord> {
    let mut positions = HashMap::<Arc<str>, usize>::new();
    let mut records: Vec<AppUsageRecord> = Vec::with_capacity(raw.len());

    for usage in raw {
        match positions.get(&usage.identity) {
            Some(&position) => {
                debug!("Merging repeated identity {}", usage.identity);
                records[position].extend_intervals(usage.intervals);
            }
            None => {
                positions.insert(usage.identity.clone(), records.len());
                records.push(usage.into());
            }
        }
    }
    records
}

fn rank(mut records: Vec<AppUsageRecord>) -> AggregatedView {
    // sort_by is stable, which keeps ties in input order.
    records.sort_by(|a, b| b.total_secs().cmp(&a.total_secs()));
    debug!("Aggregated {} applications", records.len());
    AggregatedView { records }
}
