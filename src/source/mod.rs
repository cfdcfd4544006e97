//! Where usage comes from and how the dashboard learns that it changed.
//!
//! [UsageDataSource] is fetched once per window. [refresh_channel] is the push side: the tracker
//! (or anything else holding a [RefreshSender]) signals that the current window should be fetched
//! again.

pub mod app_name;
pub mod log_file;

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::usage::UsageFeed;

/// Provides the usage intervals that fall into `[start_ts, end_ts]` (epoch milliseconds).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageDataSource: Send + Sync {
    async fn fetch(&self, start_ts: i64, end_ts: i64) -> Result<UsageFeed>;
}

/// Creates a coalescing notification channel. Several notifications sent before the dashboard
/// gets to them collapse into one refetch.
pub fn refresh_channel() -> (RefreshSender, RefreshReceiver) {
    let (sender, receiver) = mpsc::channel(1);
    (RefreshSender(sender), RefreshReceiver(receiver))
}

#[derive(Clone, Debug)]
pub struct RefreshSender(mpsc::Sender<()>);

impl RefreshSender {
    /// Returns false once the receiving side is gone.
    pub fn notify(&self) -> bool {
        match self.0.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                trace!("Refresh already pending");
                true
            }
            Err(TrySendError::Closed(())) => false,
        }
    }
}

#[derive(Debug)]
pub struct RefreshReceiver(mpsc::Receiver<()>);

impl RefreshReceiver {
    /// `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}
