//! Process-wide traffic state store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::traffic::types::{IntersectionId, SnapshotUpdate, TrafficSnapshot};

/// Latest traffic snapshot per intersection.
///
/// Cheap to clone; all clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct TrafficStateStore {
    inner: Arc<DashMap<IntersectionId, TrafficSnapshot>>,
}

impl TrafficStateStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the snapshot for an intersection.
    pub fn get(&self, id: &IntersectionId) -> Option<TrafficSnapshot> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    /// Replace the snapshot for an intersection wholesale.
    pub fn set(&self, id: IntersectionId, snapshot: TrafficSnapshot) {
        self.inner.insert(id, snapshot);
        metrics::record_store_size(self.inner.len());
    }

    /// Merge a partial update into the snapshot for an intersection.
    pub fn merge(&self, id: IntersectionId, update: &SnapshotUpdate) -> TrafficSnapshot {
        let merged = match self.inner.entry(id) {
            Entry::Occupied(mut entry) => {
                let next = update.apply_to(Some(entry.get()));
                entry.insert(next.clone());
                next
            }
            Entry::Vacant(entry) => {
                let next = update.apply_to(None);
                entry.insert(next.clone());
                next
            }
        };
        metrics::record_store_size(self.inner.len());
        merged
    }

    /// Merge a batch of updates in order. Returns how many were applied.
    pub fn merge_all<I>(&self, updates: I) -> usize
    where
        I: IntoIterator<Item = (IntersectionId, SnapshotUpdate)>,
    {
        let mut applied = 0;
        for (id, update) in updates {
            self.merge(id, &update);
            applied += 1;
        }
        applied
    }

    /// Forget an intersection that is no longer part of the known set.
    pub fn remove(&self, id: &IntersectionId) -> Option<TrafficSnapshot> {
        let removed = self.inner.remove(id).map(|(_, snapshot)| snapshot);
        metrics::record_store_size(self.inner.len());
        removed
    }

    /// Current congestion for an intersection; unknown intersections read as 0.
    pub fn congestion_at(&self, id: &IntersectionId) -> f64 {
        self.inner
            .get(id)
            .map(|r| r.value().congestion_percentage)
            .unwrap_or(0.0)
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> HashMap<IntersectionId, TrafficSnapshot> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
