//! The status projector.
//!
//! Every read path goes through here. Stored entries are joined with
//! placements computed by the [`PositionEngine`] over one snapshot read
//! from the entry store, so a projection is always consistent with itself.
//! Entries not in `Waiting` are reported with a null position and wait.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use queueless_db::{DbError, EntryStore};
use queueless_types::{
    EntryFilter, QueueEntry, QueueEntryId, QueueEntryView, QueueStats, QueueStatus,
    WaitTimeEstimate,
};

use crate::config::Grouping;
use crate::error::{ENTRY_NOT_FOUND, QueueError};
use crate::position::{Placement, PositionEngine};

/// Read-side view of the queue.
#[derive(Debug, Clone)]
pub struct StatusProjector {
    store: EntryStore,
    engine: PositionEngine,
}

impl StatusProjector {
    /// Create a projector over `store`.
    pub const fn new(store: EntryStore, engine: PositionEngine) -> Self {
        Self { store, engine }
    }

    /// One entry with its live position and wait.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for an unknown id and
    /// [`QueueError::Store`] if the store fails.
    pub async fn entry(&self, id: QueueEntryId) -> Result<QueueEntryView, QueueError> {
        let entry = self
            .store
            .find_entry(id)
            .await?
            .ok_or(QueueError::NotFound(ENTRY_NOT_FOUND))?;
        snapshot_view(&self.store, &self.engine, &entry)
            .await?
            .ok_or(QueueError::NotFound(ENTRY_NOT_FOUND))
    }

    /// Position, wait, and status only.
    ///
    /// # Errors
    ///
    /// Same as [`StatusProjector::entry`].
    pub async fn wait_time(&self, id: QueueEntryId) -> Result<WaitTimeEstimate, QueueError> {
        let view = self.entry(id).await?;
        Ok(WaitTimeEstimate {
            position: view.position,
            estimated_wait_time: view.estimated_wait_time,
            status: view.entry.status,
        })
    }

    /// All entries matching `filter`, each with its live position.
    ///
    /// Ordered by service type, then waiting entries by position, then
    /// everything else by join time.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] if the store fails.
    pub async fn roster(&self, filter: &EntryFilter) -> Result<Vec<QueueEntryView>, QueueError> {
        // Placements need the whole group, not just the filtered rows.
        let scope = EntryFilter {
            status: None,
            service_type: match self.engine.grouping() {
                Grouping::PerService => filter.service_type.clone(),
                Grouping::Global => None,
            },
        };
        let snapshot = self.store.list_entries(&scope).await?;
        let placements = self.engine.compute(&snapshot);

        let mut views: Vec<QueueEntryView> = snapshot
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .map(|entry| project(entry, &placements))
            .collect();
        views.sort_by(|a, b| roster_key(a).cmp(&roster_key(b)));
        Ok(views)
    }

    /// Dashboard counters over the whole queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] if the store fails.
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let entries = self.store.list_entries(&EntryFilter::default()).await?;

        let mut stats = QueueStats::default();
        let mut services = BTreeSet::new();
        for entry in &entries {
            let counter = match entry.status {
                QueueStatus::Waiting => {
                    services.insert(entry.service_type.as_str());
                    &mut stats.waiting
                }
                QueueStatus::InProgress => &mut stats.in_progress,
                QueueStatus::Completed => &mut stats.completed,
                QueueStatus::Cancelled => &mut stats.cancelled,
            };
            *counter = counter.saturating_add(1);
        }
        stats.active_services = u32::try_from(services.len()).unwrap_or(u32::MAX);

        // Estimate for someone joining the longest line right now.
        let longest = self
            .engine
            .group_sizes(&entries)
            .into_values()
            .max()
            .unwrap_or(0);
        stats.longest_wait_time = self.engine.wait_for(longest.saturating_add(1));
        Ok(stats)
    }
}

type RosterKey<'a> = (&'a str, bool, u32, DateTime<Utc>, QueueEntryId);

/// Service, then waiting by position, then the rest by join time.
fn roster_key(view: &QueueEntryView) -> RosterKey<'_> {
    (
        view.entry.service_type.as_str(),
        view.position.is_none(),
        view.position.unwrap_or(u32::MAX),
        view.entry.joined_at,
        view.entry.id,
    )
}

/// Attach a placement, if any, to an entry.
pub(crate) fn project(
    entry: QueueEntry,
    placements: &BTreeMap<QueueEntryId, Placement>,
) -> QueueEntryView {
    let placement = placements.get(&entry.id);
    QueueEntryView {
        position: placement.map(|p| p.position),
        estimated_wait_time: placement.map(|p| p.estimated_wait_time),
        entry,
    }
}

/// Re-read the group `entry` belongs to and project it from that
/// snapshot. `None` when the entry vanished between reads.
pub(crate) async fn snapshot_view(
    store: &EntryStore,
    engine: &PositionEngine,
    entry: &QueueEntry,
) -> Result<Option<QueueEntryView>, DbError> {
    let scope = EntryFilter {
        status: None,
        service_type: engine.group_key(entry).map(str::to_owned),
    };
    let snapshot = store.list_entries(&scope).await?;
    let placements = engine.compute(&snapshot);
    Ok(snapshot
        .into_iter()
        .find(|candidate| candidate.id == entry.id)
        .map(|current| project(current, &placements)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn seed(
        store: &EntryStore,
        name: &str,
        service: &str,
        offset: i64,
        status: QueueStatus,
    ) -> QueueEntry {
        let joined_at = Utc::now() + Duration::seconds(offset);
        let entry = QueueEntry {
            id: QueueEntryId::new(),
            student_name: name.to_owned(),
            service_type: service.to_owned(),
            contact_number: String::from("0412345678"),
            status,
            joined_at,
            updated_at: joined_at,
        };
        store.create_entry(&entry).await.unwrap();
        entry
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let projector = StatusProjector::new(EntryStore::in_memory(), PositionEngine::default());
        let err = projector.entry(QueueEntryId::new()).await.unwrap_err();
        assert_eq!(err.reason(), "not_found");
        assert_eq!(err.to_string(), "Queue entry not found");
    }

    #[tokio::test]
    async fn non_waiting_entry_has_null_position() {
        let store = EntryStore::in_memory();
        let done = seed(&store, "Done", "IT Support", 0, QueueStatus::Completed).await;
        let projector = StatusProjector::new(store, PositionEngine::default());

        let estimate = projector.wait_time(done.id).await.unwrap();
        assert_eq!(estimate.status, QueueStatus::Completed);
        assert!(estimate.position.is_none());
        assert!(estimate.estimated_wait_time.is_none());
    }

    #[tokio::test]
    async fn roster_filters_but_positions_use_whole_group() {
        let store = EntryStore::in_memory();
        seed(&store, "Alice", "IT Support", 0, QueueStatus::Waiting).await;
        seed(&store, "Bob", "IT Support", 1, QueueStatus::InProgress).await;
        let carol = seed(&store, "Carol", "IT Support", 2, QueueStatus::Waiting).await;
        let projector = StatusProjector::new(store, PositionEngine::default());

        let filter = EntryFilter {
            status: Some(QueueStatus::Waiting),
            service_type: Some(String::from("IT Support")),
        };
        let roster = projector.roster(&filter).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[1].entry.id, carol.id);
        assert_eq!(roster[1].position, Some(2));
        assert_eq!(roster[1].estimated_wait_time, Some(30));
    }

    #[tokio::test]
    async fn global_roster_numbers_across_services() {
        let store = EntryStore::in_memory();
        let a = seed(&store, "A", "IT Support", 0, QueueStatus::Waiting).await;
        seed(&store, "B", "Library", 1, QueueStatus::Waiting).await;
        let c = seed(&store, "C", "IT Support", 2, QueueStatus::Waiting).await;
        let projector = StatusProjector::new(store, PositionEngine::new(15, Grouping::Global));

        let filter = EntryFilter {
            status: None,
            service_type: Some(String::from("IT Support")),
        };
        let roster = projector.roster(&filter).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].entry.id, a.id);
        assert_eq!(roster[0].position, Some(1));
        assert_eq!(roster[0].estimated_wait_time, Some(15));
        assert_eq!(roster[1].entry.id, c.id);
        assert_eq!(roster[1].position, Some(3));
        assert_eq!(roster[1].estimated_wait_time, Some(45));

        let single = projector.entry(c.id).await.unwrap();
        assert_eq!(single.position, Some(3));
    }

    #[tokio::test]
    async fn roster_orders_waiting_before_others_within_service() {
        let store = EntryStore::in_memory();
        seed(&store, "Served", "IT Support", 0, QueueStatus::InProgress).await;
        seed(&store, "Next", "IT Support", 1, QueueStatus::Waiting).await;
        seed(&store, "Librarian", "Library", 2, QueueStatus::Waiting).await;
        let projector = StatusProjector::new(store, PositionEngine::default());

        let names: Vec<String> = projector
            .roster(&EntryFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.entry.student_name)
            .collect();
        assert_eq!(names, vec!["Next", "Served", "Librarian"]);
    }

    #[tokio::test]
    async fn stats_count_statuses_and_longest_line() {
        let store = EntryStore::in_memory();
        seed(&store, "A", "IT Support", 0, QueueStatus::Waiting).await;
        seed(&store, "B", "IT Support", 1, QueueStatus::Waiting).await;
        seed(&store, "C", "Library", 2, QueueStatus::Waiting).await;
        seed(&store, "D", "Library", 3, QueueStatus::InProgress).await;
        seed(&store, "E", "Library", 4, QueueStatus::Completed).await;
        seed(&store, "F", "Library", 5, QueueStatus::Cancelled).await;
        let projector = StatusProjector::new(store, PositionEngine::default());

        let stats = projector.stats().await.unwrap();
        assert_eq!(stats.waiting, 3);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.active_services, 2);
        assert_eq!(stats.longest_wait_time, 45);
    }

    #[tokio::test]
    async fn empty_queue_stats() {
        let projector = StatusProjector::new(EntryStore::in_memory(), PositionEngine::default());
        let stats = projector.stats().await.unwrap();
        assert_eq!(stats.waiting, 0);
        assert_eq!(stats.active_services, 0);
        assert_eq!(stats.longest_wait_time, 15);
    }
}
