//! The position engine.
//!
//! A pure function of the current set of waiting entries: position is
//! never stored, so every read observes the queue as it is now. Entries
//! are grouped (per service type, or one global line), ordered within a
//! group by `(joined_at, id)`, and numbered from 1. The estimated wait is
//! the position multiplied by the configured per-person cost.
//!
//! Non-waiting entries passed in are ignored, which is what makes the
//! next entry in line move up when someone ahead is served, cancelled,
//! or leaves.

use std::collections::BTreeMap;

use queueless_types::{QueueEntry, QueueEntryId};

use crate::config::{Grouping, QueueConfig};

/// Position and wait estimate for one waiting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// 1-based rank within the entry's group.
    pub position: u32,
    /// Minutes until service, `position * per_person_minutes`.
    pub estimated_wait_time: u32,
}

/// Computes placements from a snapshot of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEngine {
    per_person_minutes: u32,
    grouping: Grouping,
}

impl Default for PositionEngine {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

impl PositionEngine {
    /// Create an engine with an explicit cost and grouping.
    pub const fn new(per_person_minutes: u32, grouping: Grouping) -> Self {
        Self {
            per_person_minutes,
            grouping,
        }
    }

    /// Create an engine from the queue section of the service config.
    pub const fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.per_person_minutes, config.grouping)
    }

    /// The configured grouping.
    pub const fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Group key for an entry: its service type, or `None` for the single
    /// global line.
    pub fn group_key<'a>(&self, entry: &'a QueueEntry) -> Option<&'a str> {
        match self.grouping {
            Grouping::PerService => Some(entry.service_type.as_str()),
            Grouping::Global => None,
        }
    }

    /// Wait estimate for a given position.
    pub const fn wait_for(&self, position: u32) -> u32 {
        position.saturating_mul(self.per_person_minutes)
    }

    /// Compute placements for every waiting entry in `entries`.
    ///
    /// Deterministic for a given input regardless of input order. Entries
    /// in any other status receive no placement.
    pub fn compute<'a, I>(&self, entries: I) -> BTreeMap<QueueEntryId, Placement>
    where
        I: IntoIterator<Item = &'a QueueEntry>,
    {
        let mut groups: BTreeMap<Option<&str>, Vec<&QueueEntry>> = BTreeMap::new();
        for entry in entries {
            if entry.status.is_waiting() {
                groups.entry(self.group_key(entry)).or_default().push(entry);
            }
        }

        let mut placements = BTreeMap::new();
        for members in groups.values_mut() {
            members.sort_by_key(|e| (e.joined_at, e.id));
            for (ahead, entry) in members.iter().enumerate() {
                let position = u32::try_from(ahead).unwrap_or(u32::MAX).saturating_add(1);
                placements.insert(
                    entry.id,
                    Placement {
                        position,
                        estimated_wait_time: self.wait_for(position),
                    },
                );
            }
        }
        placements
    }

    /// Number of waiting entries in each group.
    pub fn group_sizes<'a, I>(&self, entries: I) -> BTreeMap<Option<&'a str>, u32>
    where
        I: IntoIterator<Item = &'a QueueEntry>,
    {
        let mut sizes: BTreeMap<Option<&'a str>, u32> = BTreeMap::new();
        for entry in entries {
            if entry.status.is_waiting() {
                let count = sizes.entry(self.group_key(entry)).or_default();
                *count = count.saturating_add(1);
            }
        }
        sizes
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use queueless_types::QueueStatus;

    use super::*;

    fn entry(service: &str, joined_at: DateTime<Utc>, status: QueueStatus) -> QueueEntry {
        QueueEntry {
            id: QueueEntryId::new(),
            student_name: String::from("Student"),
            service_type: service.to_owned(),
            contact_number: String::from("0412345678"),
            status,
            joined_at,
            updated_at: joined_at,
        }
    }

    fn waiting(service: &str, offset_secs: i64) -> QueueEntry {
        entry(
            service,
            Utc::now() + Duration::seconds(offset_secs),
            QueueStatus::Waiting,
        )
    }

    #[test]
    fn empty_input_yields_no_placements() {
        let engine = PositionEngine::default();
        assert!(engine.compute(&Vec::<QueueEntry>::new()).is_empty());
    }

    #[test]
    fn positions_are_dense_from_one_in_join_order() {
        let engine = PositionEngine::default();
        let entries = vec![
            waiting("IT Support", 20),
            waiting("IT Support", 0),
            waiting("IT Support", 10),
        ];
        let placements = engine.compute(&entries);

        assert_eq!(placements[&entries[1].id].position, 1);
        assert_eq!(placements[&entries[2].id].position, 2);
        assert_eq!(placements[&entries[0].id].position, 3);
    }

    #[test]
    fn wait_is_position_times_cost() {
        let engine = PositionEngine::new(15, Grouping::PerService);
        let entries = vec![
            waiting("IT Support", 0),
            waiting("IT Support", 1),
            waiting("IT Support", 2),
        ];
        for placement in engine.compute(&entries).values() {
            assert_eq!(placement.estimated_wait_time, placement.position * 15);
        }
    }

    #[test]
    fn terminal_and_in_progress_entries_are_not_placed() {
        let engine = PositionEngine::default();
        let now = Utc::now();
        let served = entry("IT Support", now, QueueStatus::InProgress);
        let done = entry("IT Support", now, QueueStatus::Completed);
        let gone = entry("IT Support", now, QueueStatus::Cancelled);
        let next = entry("IT Support", now + Duration::seconds(1), QueueStatus::Waiting);
        let entries = vec![served.clone(), done.clone(), gone.clone(), next.clone()];

        let placements = engine.compute(&entries);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[&next.id].position, 1);
        assert!(!placements.contains_key(&served.id));
    }

    #[test]
    fn services_are_numbered_independently() {
        let engine = PositionEngine::new(15, Grouping::PerService);
        let entries = vec![
            waiting("IT Support", 0),
            waiting("Student Services", 1),
            waiting("IT Support", 2),
        ];
        let placements = engine.compute(&entries);
        assert_eq!(placements[&entries[0].id].position, 1);
        assert_eq!(placements[&entries[1].id].position, 1);
        assert_eq!(placements[&entries[2].id].position, 2);
    }

    #[test]
    fn global_grouping_is_one_line() {
        let engine = PositionEngine::new(10, Grouping::Global);
        let entries = vec![
            waiting("IT Support", 0),
            waiting("Student Services", 1),
            waiting("IT Support", 2),
        ];
        let placements = engine.compute(&entries);
        assert_eq!(placements[&entries[1].id].position, 2);
        assert_eq!(placements[&entries[2].id].position, 3);
        assert_eq!(placements[&entries[2].id].estimated_wait_time, 30);
    }

    #[test]
    fn equal_join_times_break_ties_by_id() {
        let engine = PositionEngine::default();
        let now = Utc::now();
        let a = entry("IT Support", now, QueueStatus::Waiting);
        let b = entry("IT Support", now, QueueStatus::Waiting);
        let (first, second) = if a.id < b.id { (&a, &b) } else { (&b, &a) };

        let placements = engine.compute([second, first]);
        assert_eq!(placements[&first.id].position, 1);
        assert_eq!(placements[&second.id].position, 2);
    }

    #[test]
    fn result_does_not_depend_on_input_order() {
        let engine = PositionEngine::default();
        let entries = vec![
            waiting("IT Support", 3),
            waiting("Library", 1),
            waiting("IT Support", 0),
            waiting("Library", 2),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();
        assert_eq!(engine.compute(&entries), engine.compute(&reversed));
    }

    #[test]
    fn group_sizes_count_only_waiting() {
        let engine = PositionEngine::default();
        let now = Utc::now();
        let entries = vec![
            entry("IT Support", now, QueueStatus::Waiting),
            entry("IT Support", now, QueueStatus::Completed),
            entry("Library", now, QueueStatus::Waiting),
            entry("Library", now, QueueStatus::Waiting),
        ];
        let sizes = engine.group_sizes(&entries);
        assert_eq!(sizes.get(&Some("IT Support")), Some(&1));
        assert_eq!(sizes.get(&Some("Library")), Some(&2));
    }
}
