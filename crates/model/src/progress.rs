use std::collections::HashSet;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{geo::UserPosition, site::Site};

/// Durable traversal state of one itinerary for one identity.
///
/// `visited` is always a subset of `optimized_order`, and `current_index` is
/// either a valid index into `optimized_order` or equal to its length once the
/// itinerary is complete.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub optimized_order: Vec<Id<Site>>,
    pub current_index: usize,
    pub visited: IndexSet<Id<Site>>,
    pub skipped: IndexSet<Id<Site>>,
    pub last_position: Option<UserPosition>,
}

impl ProgressState {
    pub fn new(optimized_order: Vec<Id<Site>>) -> Self {
        Self {
            optimized_order,
            ..Default::default()
        }
    }

    /// Whether a resume prompt is warranted.
    pub fn has_progress(&self) -> bool {
        self.current_index > 0 || !self.visited.is_empty() || !self.skipped.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.optimized_order.is_empty()
            && (self.current_index >= self.optimized_order.len()
                || self.all_visited())
    }

    pub fn all_visited(&self) -> bool {
        self.optimized_order
            .iter()
            .all(|id| self.visited.contains(id))
    }

    pub fn current_site(&self) -> Option<&Id<Site>> {
        self.optimized_order.get(self.current_index)
    }

    /// Visited and skipped sites, in that order.
    pub fn excluded(&self) -> IndexSet<Id<Site>> {
        self.visited
            .iter()
            .chain(self.skipped.iter())
            .cloned()
            .collect()
    }

    /// Repairs a state that came from an untrusted store so the invariants hold
    /// for the given set of site ids. An order that is not a permutation of
    /// `site_ids` is dropped entirely, which forces a fresh optimization.
    pub fn normalized(mut self, site_ids: &[Id<Site>]) -> Self {
        let known = site_ids.iter().collect::<HashSet<_>>();
        let ordered = self.optimized_order.iter().collect::<HashSet<_>>();
        let is_permutation = ordered.len() == self.optimized_order.len()
            && ordered.len() == known.len()
            && ordered.iter().all(|id| known.contains(id));
        if !is_permutation {
            self.optimized_order.clear();
            self.current_index = 0;
        }
        self.visited.retain(|id| known.contains(id));
        self.skipped.retain(|id| known.contains(id));
        let visited = &self.visited;
        self.skipped.retain(|id| !visited.contains(id));
        self.current_index = self.current_index.min(self.optimized_order.len());
        self
    }
}
