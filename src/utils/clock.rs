use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Provides wall time and sleeping for the dashboard. Debounce timers and the initial day window
/// go through it so tests can drive them with a paused tokio clock.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock pinned to a fixed wall time. Sleeping still uses tokio time, so paused tests advance it.
#[derive(Clone)]
pub struct FixedClock(pub DateTime<Utc>);

#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
