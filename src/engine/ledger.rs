//! engine::ledger
//!
//! In-memory record of merge outcomes.
//!
//! # Architecture
//!
//! Every merger stage that closes leaves one event behind: a committed
//! publish, a rejection by a strategy, or an explicit discard. The ledger is
//! bounded; once full, the oldest event is dropped for each new one.
//!
//! The ledger is evidence, not authority. The committed snapshot is the only
//! source of truth for the catalog's contents.
//!
//! # Example
//!
//! ```
//! use docpart_catalog::engine::ledger::{MergeEvent, MergeLedger};
//! use uuid::Uuid;
//!
//! let ledger = MergeLedger::new(8);
//! ledger.append(MergeEvent::discarded(Uuid::new_v4(), 0));
//! assert_eq!(ledger.len(), 1);
//! ```

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events retained when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// The outcome of one merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeEvent {
    /// The merged snapshot was published.
    Committed {
        /// Overlay id.
        merge_id: Uuid,
        /// Committed version the overlay was opened on.
        base_version: u64,
        /// Version assigned to the published snapshot.
        version: u64,
        /// Number of change records in the overlay.
        changes: usize,
        timestamp: DateTime<Utc>,
    },

    /// A strategy rejected the overlay.
    Rejected {
        merge_id: Uuid,
        base_version: u64,
        /// Identity of the rejecting strategy, or `verify`.
        strategy: String,
        /// Rendered conflict description.
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The stage was closed without publishing.
    Discarded {
        merge_id: Uuid,
        base_version: u64,
        timestamp: DateTime<Utc>,
    },
}

impl MergeEvent {
    /// Create a Committed event.
    pub fn committed(merge_id: Uuid, base_version: u64, version: u64, changes: usize) -> Self {
        MergeEvent::Committed {
            merge_id,
            base_version,
            version,
            changes,
            timestamp: Utc::now(),
        }
    }

    /// Create a Rejected event.
    pub fn rejected(
        merge_id: Uuid,
        base_version: u64,
        strategy: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MergeEvent::Rejected {
            merge_id,
            base_version,
            strategy: strategy.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a Discarded event.
    pub fn discarded(merge_id: Uuid, base_version: u64) -> Self {
        MergeEvent::Discarded {
            merge_id,
            base_version,
            timestamp: Utc::now(),
        }
    }

    /// The overlay id this event is about.
    pub fn merge_id(&self) -> Uuid {
        match self {
            MergeEvent::Committed { merge_id, .. }
            | MergeEvent::Rejected { merge_id, .. }
            | MergeEvent::Discarded { merge_id, .. } => *merge_id,
        }
    }

    /// Get a short description of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            MergeEvent::Committed { .. } => "committed",
            MergeEvent::Rejected { .. } => "rejected",
            MergeEvent::Discarded { .. } => "discarded",
        }
    }
}

/// Bounded, thread-safe list of merge events, oldest first.
#[derive(Debug)]
pub struct MergeLedger {
    capacity: usize,
    events: Mutex<VecDeque<MergeEvent>>,
}

impl MergeLedger {
    /// Create a ledger keeping at most `capacity` events.
    ///
    /// A capacity of zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        }
    }

    /// Record an event, evicting the oldest one when full.
    pub fn append(&self, event: MergeEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<MergeEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<MergeEvent> {
        self.events.lock().back().cloned()
    }

    /// Version of the most recent publish still in the ledger.
    pub fn last_committed_version(&self) -> Option<u64> {
        self.events.lock().iter().rev().find_map(|event| match event {
            MergeEvent::Committed { version, .. } => Some(*version),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MergeLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_events_are_evicted() {
        let ledger = MergeLedger::new(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (version, id) in ids.iter().enumerate() {
            ledger.append(MergeEvent::committed(*id, version as u64, version as u64 + 1, 1));
        }

        let events = ledger.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].merge_id(), ids[1]);
        assert_eq!(events[1].merge_id(), ids[2]);
        assert_eq!(ledger.last_committed_version(), Some(3));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let ledger = MergeLedger::new(0);
        ledger.append(MergeEvent::discarded(Uuid::new_v4(), 0));
        assert!(ledger.is_empty());
        assert!(ledger.last().is_none());
    }

    #[test]
    fn last_committed_skips_other_events() {
        let ledger = MergeLedger::default();
        ledger.append(MergeEvent::committed(Uuid::new_v4(), 0, 1, 4));
        ledger.append(MergeEvent::discarded(Uuid::new_v4(), 1));
        assert_eq!(ledger.last_committed_version(), Some(1));
        assert_eq!(ledger.last().map(|e| e.event_type()), Some("discarded"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = MergeEvent::discarded(Uuid::nil(), 7);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "discarded");
        assert_eq!(json["base_version"], 7);

        let parsed: MergeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}
