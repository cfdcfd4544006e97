use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::utils::clock::Clock;

/// How long an identity stays highlighted after the pointer leaves it.
pub const HOVER_RELEASE_DELAY: Duration = Duration::from_millis(70);

/// Sent when a pending removal's delay elapsed. The generation ties it to the `leave` that
/// scheduled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverExpiry {
    pub identity: Arc<str>,
    pub generation: u64,
}

/// How strongly a chart segment is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Emphasis {
    Full,
    Reduced,
}

struct PendingRemoval {
    generation: u64,
    cancel: CancellationToken,
}

/// Applications currently highlighted by the pointer.
///
/// Entering adds an identity right away. Leaving only schedules the removal: a timer task sends
/// a [HoverExpiry] after the delay and the owner feeds it back through [expire](Self::expire).
/// Entering again before that cancels the timer, so moving across neighbouring rows never drops
/// the highlight for a frame.
pub struct HoverSelectionState {
    active: HashSet<Arc<str>>,
    pending: HashMap<Arc<str>, PendingRemoval>,
    next_generation: u64,
    delay: Duration,
    clock: Arc<dyn Clock>,
    expiries: mpsc::UnboundedSender<HoverExpiry>,
}

impl HoverSelectionState {
    pub fn new(
        delay: Duration,
        clock: Arc<dyn Clock>,
        expiries: mpsc::UnboundedSender<HoverExpiry>,
    ) -> Self {
        Self {
            active: HashSet::new(),
            pending: HashMap::new(),
            next_generation: 0,
            delay,
            clock,
            expiries,
        }
    }

    pub fn enter(&mut self, identity: &Arc<str>) {
        if let Some(pending) = self.pending.remove(identity) {
            trace!("Cancelled pending removal of {identity}");
            pending.cancel.cancel();
        }
        if self.active.insert(identity.clone()) {
            debug!("Highlighting {identity}");
        }
    }

    pub fn leave(&mut self, identity: &Arc<str>) {
        if !self.active.contains(identity) {
            return;
        }
        if let Some(previous) = self.pending.remove(identity) {
            previous.cancel.cancel();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();
        self.pending.insert(
            identity.clone(),
            PendingRemoval {
                generation,
                cancel: cancel.clone(),
            },
        );

        let clock = self.clock.clone();
        let delay = self.delay;
        let expiries = self.expiries.clone();
        let identity = identity.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = clock.sleep(delay) => {
                    let _ = expiries.send(HoverExpiry { identity, generation });
                }
            }
        });
    }

    /// Applies an elapsed removal. Returns whether the active set changed; expiries of a
    /// cancelled or superseded removal change nothing.
    pub fn expire(&mut self, expiry: &HoverExpiry) -> bool {
        match self.pending.get(&expiry.identity) {
            Some(pending) if pending.generation == expiry.generation => {
                self.pending.remove(&expiry.identity);
                debug!("Releasing highlight of {}", expiry.identity);
                self.active.remove(&expiry.identity)
            }
            _ => {
                trace!("Ignoring stale expiry {expiry:?}");
                false
            }
        }
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.active.contains(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = &Arc<str>> {
        self.active.iter()
    }

    /// Segments of highlighted applications, or all segments when nothing is highlighted, keep
    /// full emphasis.
    pub fn emphasis(&self, identity: &str) -> Emphasis {
        if self.active.is_empty() || self.active.contains(identity) {
            Emphasis::Full
        } else {
            Emphasis::Reduced
        }
    }
}

impl Drop for HoverSelectionState {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.cancel.cancel();
        }
    }
}
