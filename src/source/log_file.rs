use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone};
use fs4::tokio::AsyncFileExt;
use futures::{stream, StreamExt, TryStreamExt};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::{debug, instrument, warn};

use crate::{
    usage::{RawAppUsage, UsageFeed, UsageInterval},
    utils::time::date_to_log_name,
};

use super::{app_name::app_name_from_path, UsageDataSource};

const UNKNOWN_APP: &str = "Unknown";
const LOCK_ATTEMPTS: u32 = 40;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// One line of a tracker day log: `<event>,<timestamp ms>[,<path>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogEvent {
    /// `0`: an application became frontmost.
    CameToFront { timestamp: i64, path: String },
    /// `1`: the machine slept or the tracker missed its checks.
    ShutDown { timestamp: i64 },
    /// `2`: monitoring was stopped.
    StopMonitoring { timestamp: i64 },
}

impl LogEvent {
    fn parse(line: &str) -> Option<LogEvent> {
        let mut parts = line.splitn(3, ',');
        let kind = parts.next()?.trim();
        let timestamp = parts.next()?.trim().parse::<i64>().ok()?;
        match kind {
            "0" => Some(LogEvent::CameToFront {
                timestamp,
                path: parts.next()?.to_string(),
            }),
            "1" => Some(LogEvent::ShutDown { timestamp }),
            "2" => Some(LogEvent::StopMonitoring { timestamp }),
            _ => None,
        }
    }

    fn timestamp(&self) -> i64 {
        match self {
            LogEvent::CameToFront { timestamp, .. }
            | LogEvent::ShutDown { timestamp }
            | LogEvent::StopMonitoring { timestamp } => *timestamp,
        }
    }
}

/// Rebuilds per-application intervals by replaying front-window switches in order.
#[derive(Default)]
struct Replay {
    usages: Vec<RawAppUsage>,
    positions: HashMap<Arc<str>, usize>,
    current: Option<usize>,
}

impl Replay {
    fn apply(&mut self, event: LogEvent) {
        let timestamp = event.timestamp();
        self.close_current(timestamp);

        if let LogEvent::CameToFront { path, .. } = event {
            let identity: Arc<str> = app_name_from_path(&path)
                .unwrap_or_else(|| UNKNOWN_APP.to_string())
                .into();
            let position = match self.positions.get(&identity) {
                Some(&position) => position,
                None => {
                    self.positions.insert(identity.clone(), self.usages.len());
                    self.usages.push(RawAppUsage::new(identity, path, Vec::new()));
                    self.usages.len() - 1
                }
            };
            self.usages[position]
                .intervals
                .push(UsageInterval::new(timestamp, timestamp));
            self.current = Some(position);
        }
    }

    fn close_current(&mut self, timestamp: i64) {
        let Some(position) = self.current.take() else {
            return;
        };
        if let Some(interval) = self.usages[position].intervals.last_mut() {
            *interval = UsageInterval::new(interval.start_ms, timestamp.max(interval.start_ms));
        }
    }
}

/// Reads the tracker's day logs (`YYYYMMDD.log`, one per local day) from a directory.
pub struct LogFileSource {
    log_dir: PathBuf,
}

impl LogFileSource {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(date_to_log_name(date))
    }

    async fn read_lines(path: PathBuf) -> Result<Vec<String>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<String>, std::io::Error> {
            debug!("Reading {path:?}");
            let file = File::open(path).await?;
            lock_shared_polling(&file, path).await?;
            let mut reader = BufReader::new(file);
            let mut collected = vec![];
            let mut buffer = vec![];
            while reader.read_until(b'\n', &mut buffer).await? > 0 {
                match std::str::from_utf8(&buffer) {
                    Ok(line) => collected.push(line.trim_end_matches(['\n', '\r']).to_string()),
                    // A crash mid-write can leave a torn line behind.
                    Err(e) => warn!("Skipping undecodable line in {path:?}: {e}"),
                }
                buffer.clear();
            }
            reader.into_inner().unlock_async().await?;
            Ok(collected)
        }

        match extract(&path).await {
            Ok(lines) => Ok(lines),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No log for {path:?}");
                Ok(vec![])
            }
            Err(e) => Err(anyhow!(e).context(format!("Failed to read {path:?}"))),
        }
    }
}

#[async_trait]
impl UsageDataSource for LogFileSource {
    #[instrument(skip(self))]
    async fn fetch(&self, start_ts: i64, end_ts: i64) -> Result<UsageFeed> {
        let first_day = local_date(start_ts)?;
        let last_day = local_date(end_ts)?;
        let paths = first_day
            .iter_days()
            .take_while(|day| *day <= last_day)
            .map(|day| self.day_file(day))
            .collect::<Vec<_>>();

        let files = stream::iter(paths)
            .map(Self::read_lines)
            .buffered(2)
            .try_collect::<Vec<_>>()
            .await?;

        let mut replay = Replay::default();
        for line in files.iter().flatten() {
            let Some(event) = LogEvent::parse(line) else {
                warn!("Skipping malformed log line {line:?}");
                continue;
            };
            if event.timestamp() < start_ts || event.timestamp() > end_ts {
                continue;
            }
            replay.apply(event);
        }

        debug!("Replayed {} applications", replay.usages.len());
        Ok(UsageFeed::Raw(replay.usages))
    }
}

/// Takes the shared lock without blocking the runtime thread while the tracker holds the file.
async fn lock_shared_polling(file: &File, path: &Path) -> std::io::Result<()> {
    let contended = fs4::lock_contended_error().raw_os_error();
    for _ in 0..LOCK_ATTEMPTS {
        match file.try_lock_shared() {
            Ok(()) => return Ok(()),
            Err(e) if e.raw_os_error() == contended => {
                debug!("{path:?} is locked, retrying");
                tokio::time::sleep(LOCK_RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::WouldBlock,
        format!("{path:?} stayed locked"),
    ))
}

fn local_date(timestamp: i64) -> Result<NaiveDate> {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|v| v.date_naive())
        .ok_or_else(|| anyhow!("Timestamp {timestamp} is out of range"))
}
