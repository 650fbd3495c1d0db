//! The queue lifecycle manager.
//!
//! Owns every state change a queue entry goes through: join, status
//! transition, and leave. Each operation is a single-record mutation in
//! the entry store; positions of other entries are never written, they
//! shift on the next read because the [`PositionEngine`] recomputes them.
//!
//! Transitions are permissive: any status may move to any other, and each
//! change is logged with its previous and new value.

use std::collections::BTreeMap;

use chrono::Utc;
use queueless_db::EntryStore;
use queueless_types::{JoinQueueRequest, QueueEntry, QueueEntryId, QueueEntryView, QueueStatus};
use tokio::sync::Mutex;
use tracing::{info, warn};
use validator::Validate;

use crate::config::QueueConfig;
use crate::error::{ENTRY_NOT_FOUND, QueueError};
use crate::position::PositionEngine;
use crate::projector::{project, snapshot_view};

/// Applies joins, transitions, and leaves to the entry store.
#[derive(Debug)]
pub struct QueueManager {
    store: EntryStore,
    engine: PositionEngine,
    /// Held across insert-then-read when joins are serialized.
    join_gate: Option<Mutex<()>>,
}

impl QueueManager {
    /// Create a manager with the given policy.
    pub fn new(store: EntryStore, config: &QueueConfig) -> Self {
        Self {
            store,
            engine: PositionEngine::from_config(config),
            join_gate: config.serialize_joins.then(|| Mutex::new(())),
        }
    }

    /// Add a student to the queue.
    ///
    /// Input is sanitized, then validated. The new entry starts in
    /// `Waiting`; its position is computed from the snapshot read right
    /// after the insert, so it includes the new entry itself.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] when a required field is empty
    /// after sanitization and [`QueueError::Store`] if the store fails.
    pub async fn join(&self, request: JoinQueueRequest) -> Result<QueueEntryView, QueueError> {
        let request = request.sanitized();
        request.validate()?;

        let _guard = match &self.join_gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        let now = Utc::now();
        let entry = QueueEntry {
            id: QueueEntryId::new(),
            student_name: request.student_name,
            service_type: request.service_type,
            contact_number: request.contact_number,
            status: QueueStatus::Waiting,
            joined_at: now,
            updated_at: now,
        };
        self.store.create_entry(&entry).await?;

        let view = match snapshot_view(&self.store, &self.engine, &entry).await? {
            Some(view) => view,
            None => {
                warn!(entry_id = %entry.id, "Entry vanished before its position was read");
                project(entry, &BTreeMap::new())
            }
        };

        info!(
            entry_id = %view.entry.id,
            service_type = %view.entry.service_type,
            position = ?view.position,
            "Student joined queue"
        );
        Ok(view)
    }

    /// Move an entry to `status`.
    ///
    /// Only the status and `updated_at` change. The returned view carries
    /// the entry's live position after the change.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for an unknown id and
    /// [`QueueError::Store`] if the store fails.
    pub async fn transition(
        &self,
        id: QueueEntryId,
        status: QueueStatus,
    ) -> Result<QueueEntryView, QueueError> {
        let previous = self
            .store
            .find_entry(id)
            .await?
            .ok_or(QueueError::NotFound(ENTRY_NOT_FOUND))?;

        let updated = self
            .store
            .update_entry_status(id, status, Utc::now())
            .await?
            .ok_or(QueueError::NotFound(ENTRY_NOT_FOUND))?;

        info!(
            entry_id = %id,
            from = %previous.status,
            to = %updated.status,
            closed = updated.status.is_terminal(),
            "Queue entry status changed"
        );

        snapshot_view(&self.store, &self.engine, &updated)
            .await?
            .ok_or(QueueError::NotFound(ENTRY_NOT_FOUND))
    }

    /// Remove an entry from the queue entirely.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for an unknown id and
    /// [`QueueError::Store`] if the store fails.
    pub async fn leave(&self, id: QueueEntryId) -> Result<(), QueueError> {
        if self.store.delete_entry(id).await? {
            info!(entry_id = %id, "Student left queue");
            Ok(())
        } else {
            Err(QueueError::NotFound(ENTRY_NOT_FOUND))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn request(name: &str, service: &str) -> JoinQueueRequest {
        JoinQueueRequest {
            student_name: name.to_owned(),
            service_type: service.to_owned(),
            contact_number: String::from("0412345678"),
        }
    }

    fn manager() -> QueueManager {
        QueueManager::new(EntryStore::in_memory(), &QueueConfig::default())
    }

    #[tokio::test]
    async fn join_sanitizes_and_starts_waiting() {
        let manager = manager();
        let view = manager
            .join(request("  <b>Alice</b> ", "IT Support"))
            .await
            .unwrap();
        assert_eq!(view.entry.student_name, "bAlice/b");
        assert_eq!(view.entry.status, QueueStatus::Waiting);
        assert_eq!(view.position, Some(1));
        assert_eq!(view.estimated_wait_time, Some(15));
    }

    #[tokio::test]
    async fn join_rejects_markup_only_name() {
        let manager = manager();
        let err = manager.join(request("<>", "IT Support")).await.unwrap_err();
        assert_eq!(err.reason(), "validation_error");
        assert!(err.to_string().contains("studentName is required"));
    }

    #[tokio::test]
    async fn transition_of_unknown_entry_is_not_found() {
        let manager = manager();
        let err = manager
            .transition(QueueEntryId::new(), QueueStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "not_found");
    }

    #[tokio::test]
    async fn transitions_are_permissive() {
        let manager = manager();
        let view = manager.join(request("Alice", "IT Support")).await.unwrap();
        let id = view.entry.id;

        let done = manager.transition(id, QueueStatus::Completed).await.unwrap();
        assert_eq!(done.entry.status, QueueStatus::Completed);
        assert!(done.position.is_none());

        let back = manager.transition(id, QueueStatus::Waiting).await.unwrap();
        assert_eq!(back.entry.status, QueueStatus::Waiting);
        assert_eq!(back.position, Some(1));
        assert_eq!(back.entry.joined_at, view.entry.joined_at);
    }

    #[tokio::test]
    async fn leave_twice_is_not_found() {
        let manager = manager();
        let view = manager.join(request("Alice", "IT Support")).await.unwrap();
        assert!(manager.leave(view.entry.id).await.is_ok());
        let err = manager.leave(view.entry.id).await.unwrap_err();
        assert_eq!(err.reason(), "not_found");
    }

    #[tokio::test]
    async fn serialized_joins_get_distinct_positions() {
        let config = QueueConfig {
            serialize_joins: true,
            ..QueueConfig::default()
        };
        let manager = Arc::new(QueueManager::new(EntryStore::in_memory(), &config));

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager
                    .join(request(&format!("Student {i}"), "IT Support"))
                    .await
                    .unwrap()
                    .position
            }));
        }
        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap().unwrap());
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=8).collect::<Vec<u32>>());
    }
}
