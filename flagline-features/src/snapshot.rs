//! Evaluation snapshot and its publication.
//!
//! A [`Snapshot`] is the complete, immutable set of features the evaluator reads.
//! It is never modified after construction: a refresher builds a replacement and
//! publishes it through a [`SnapshotHolder`], which swaps the `Arc` in one atomic
//! pointer update. Loads take no lock, so readers never block the publisher or each
//! other and always see a whole snapshot.

use crate::flag::Feature;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Immutable `project -> feature key -> feature` index.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    projects: HashMap<Uuid, HashMap<String, Arc<Feature>>>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Index fully-resolved features by project and key.
    ///
    /// A later feature with the same project and key replaces an earlier one.
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut projects: HashMap<Uuid, HashMap<String, Arc<Feature>>> = HashMap::new();
        for feature in features {
            projects
                .entry(feature.project_id)
                .or_default()
                .insert(feature.key.clone(), Arc::new(feature));
        }
        Self { projects }
    }

    /// Look up a feature by project and key
    pub fn get(&self, project_id: Uuid, key: &str) -> Option<&Arc<Feature>> {
        self.projects.get(&project_id)?.get(key)
    }

    /// Features of one project, in no particular order.
    pub fn project(&self, project_id: Uuid) -> impl Iterator<Item = &Arc<Feature>> {
        self.projects
            .get(&project_id)
            .into_iter()
            .flat_map(|features| features.values())
    }

    /// Number of projects with at least one feature
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Number of features across all projects
    pub fn feature_count(&self) -> usize {
        self.projects.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_count() == 0
    }
}

impl FromIterator<Feature> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::from_features(iter)
    }
}

/// Publication point for the current snapshot.
#[derive(Debug, Default)]
pub struct SnapshotHolder {
    current: ArcSwap<Snapshot>,
    version: AtomicU64,
}

impl SnapshotHolder {
    /// Create a holder publishing `snapshot` as version 0
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            version: AtomicU64::new(0),
        }
    }

    /// Current snapshot.
    ///
    /// The returned `Arc` stays valid (and unchanged) across later publishes.
    #[inline]
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot, returning the previous one.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.publish_arc(Arc::new(snapshot))
    }

    /// Replace the snapshot with an already shared one, returning the previous one.
    pub fn publish_arc(&self, snapshot: Arc<Snapshot>) -> Arc<Snapshot> {
        let features = snapshot.feature_count();
        let previous = self.current.swap(snapshot);
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(version, features, "Published evaluation snapshot");
        previous
    }

    /// Number of publishes since creation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn feature(project: Uuid, key: &str) -> Feature {
        Feature::boolean(project, key)
    }

    #[test]
    fn test_lookup_by_project_and_key() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let snapshot = Snapshot::from_features(vec![
            feature(a, "search"),
            feature(a, "checkout"),
            feature(b, "search"),
        ]);

        assert_eq!(snapshot.project_count(), 2);
        assert_eq!(snapshot.feature_count(), 3);
        assert!(snapshot.get(a, "checkout").is_some());
        assert!(snapshot.get(b, "checkout").is_none());
        assert!(snapshot.get(Uuid::new_v4(), "search").is_none());
        assert_eq!(snapshot.project(a).count(), 2);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let project = Uuid::new_v4();
        let snapshot: Snapshot = vec![
            feature(project, "search"),
            feature(project, "search").with_enabled(false),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.feature_count(), 1);
        assert!(!snapshot.get(project, "search").unwrap().enabled);
    }

    #[test]
    fn test_publish_swaps_whole_snapshot() {
        let project = Uuid::new_v4();
        let holder = SnapshotHolder::new(Snapshot::from_features(vec![feature(project, "old")]));
        let before = holder.load();

        let previous = holder.publish(Snapshot::from_features(vec![feature(project, "new")]));
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(holder.version(), 1);

        // Readers holding the old snapshot keep seeing it unchanged
        assert!(before.get(project, "old").is_some());
        assert!(before.get(project, "new").is_none());

        let after = holder.load();
        assert!(after.get(project, "new").is_some());
        assert!(after.get(project, "old").is_none());
    }

    #[test]
    fn test_publish_does_not_wait_for_pinned_readers() {
        let project = Uuid::new_v4();
        let holder = SnapshotHolder::new(Snapshot::from_features(vec![feature(project, "old")]));

        // A reader still holding its view must not hold up the publisher
        let pinned = holder.current.load();
        holder.publish(Snapshot::from_features(vec![feature(project, "new")]));

        assert!(pinned.get(project, "old").is_some());
        assert!(holder.load().get(project, "new").is_some());
        assert_eq!(holder.version(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let project = Uuid::new_v4();
        let holder = Arc::new(SnapshotHolder::default());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let holder = Arc::clone(&holder);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let snapshot = holder.load();
                        // Each published snapshot holds either zero or exactly three features
                        let count = snapshot.feature_count();
                        assert!(count == 0 || count == 3, "partial snapshot: {count}");
                    }
                })
            })
            .collect();

        for i in 0..50 {
            holder.publish(Snapshot::from_features(
                (0..3).map(|n| feature(project, &format!("flag-{i}-{n}"))),
            ));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(holder.version(), 50);
    }
}
