use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::{debug, trace};

/// Opacity of an expanded card's detail content.
pub const EXPANDED_OPACITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Disclosure {
    pub expanded: bool,
    pub measured_height_px: f64,
}

/// Where a card's detail content animates to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnimationTarget {
    pub height_px: f64,
    pub opacity: f64,
}

/// Open/closed state of the list cards plus the natural height the presenter measured for each.
///
/// Changing the state is a two step exchange. [toggle](Self::toggle) commits the flag and returns
/// the identities whose content has to be measured; the presenter measures them after its next
/// layout pass and hands the heights to [apply_measurements](Self::apply_measurements), which is
/// when the animation targets settle.
#[derive(Debug, Default)]
pub struct ExpandableCardState {
    entries: HashMap<Arc<str>, Disclosure>,
}

impl ExpandableCardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the card of `identity` and returns every identity that needs a fresh measurement.
    pub fn toggle(&mut self, identity: &Arc<str>) -> Vec<Arc<str>> {
        let entry = self.entries.entry(identity.clone()).or_default();
        entry.expanded = !entry.expanded;
        debug!("Card {identity} expanded: {}", entry.expanded);
        self.measurement_request()
    }

    /// Identities with an entry in the map, sorted for a stable request order.
    pub fn measurement_request(&self) -> Vec<Arc<str>> {
        let mut identities = self.entries.keys().cloned().collect::<Vec<_>>();
        identities.sort();
        identities
    }

    /// Stores measured natural heights. Heights for identities without an entry are ignored.
    pub fn apply_measurements(&mut self, heights: impl IntoIterator<Item = (Arc<str>, f64)>) {
        for (identity, height) in heights {
            match self.entries.get_mut(&identity) {
                Some(entry) => {
                    entry.measured_height_px = if height.is_finite() { height.max(0.) } else { 0. };
                }
                None => trace!("Ignoring measurement for {identity}"),
            }
        }
    }

    pub fn is_expanded(&self, identity: &str) -> bool {
        self.state(identity).expanded
    }

    /// Current state; identities never toggled are collapsed with zero height.
    pub fn state(&self, identity: &str) -> Disclosure {
        self.entries.get(identity).copied().unwrap_or_default()
    }

    pub fn animation_target(&self, identity: &str) -> AnimationTarget {
        let state = self.state(identity);
        if state.expanded {
            AnimationTarget {
                height_px: state.measured_height_px,
                opacity: EXPANDED_OPACITY,
            }
        } else {
            AnimationTarget::default()
        }
    }
}
