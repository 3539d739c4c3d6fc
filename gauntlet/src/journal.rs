//! Bounded run-event journal.
//!
//! The journal is an explicitly owned store injected into the components
//! that record diagnostics, never ambient global state. It keeps the most
//! recent events up to a fixed capacity, dropping the oldest beyond it, and
//! serializes to JSON for the diagnostics surface. The run itself persists
//! nothing; the journal lives and dies with the caller.

use std::collections::VecDeque;

use serde::Serialize;

use crate::core::types::{KillConfirmation, ObjectId};

/// One recorded event with its journal sequence number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub detail: EventDetail,
}

/// Structured diagnostic events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventDetail {
    RunStarted,
    PhaseStarted { phase: String },
    /// The gating object was found already consumed; no command was issued.
    ObjectAlreadyResolved { object: ObjectId },
    ObjectResolved { object: ObjectId, attempts: u32 },
    InteractionRetry { object: ObjectId, attempt: u32 },
    GuardianSighted { guardian: String },
    GuardianAlreadyDead { guardian: String },
    GuardianConfirmed {
        guardian: String,
        attempts: u32,
        confirmation: KillConfirmation,
    },
    GuardianAbsenceTolerated { guardian: String },
    /// Kill failure swallowed for a tolerant guardian at the sequencer.
    GuardianSkipped { guardian: String, reason: String },
    RecoveryUsed { health_fraction: f64 },
    RunCompleted { phases: u32 },
}

/// Bounded event store with drop-oldest eviction.
#[derive(Debug)]
pub struct RunJournal {
    capacity: usize,
    next_seq: u64,
    events: VecDeque<RunEvent>,
}

impl RunJournal {
    /// A journal retaining at most `capacity` events. A zero capacity
    /// records nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: 1,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an event, evicting the oldest beyond capacity.
    ///
    /// Returns the assigned sequence number. Sequence numbers keep growing
    /// across evictions, so gaps at the front reveal dropped history.
    pub fn push(&mut self, detail: EventDetail) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.capacity == 0 {
            return seq;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(RunEvent { seq, detail });
        seq
    }

    pub fn events(&self) -> impl Iterator<Item = &RunEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_monotonic_sequence_numbers() {
        let mut journal = RunJournal::with_capacity(8);
        assert_eq!(journal.push(EventDetail::RunStarted), 1);
        assert_eq!(
            journal.push(EventDetail::PhaseStarted {
                phase: "tempest".to_string()
            }),
            2
        );
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn eviction_drops_oldest_first() {
        let mut journal = RunJournal::with_capacity(2);
        journal.push(EventDetail::RunStarted);
        journal.push(EventDetail::PhaseStarted {
            phase: "tempest".to_string(),
        });
        journal.push(EventDetail::PhaseStarted {
            phase: "revenant".to_string(),
        });

        let seqs: Vec<u64> = journal.events().map(|event| event.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn events_serialize_with_tag_and_seq() {
        let mut journal = RunJournal::with_capacity(4);
        journal.push(EventDetail::ObjectResolved {
            object: ObjectId(401),
            attempts: 2,
        });
        let event = journal.events().next().expect("event");
        let json = serde_json::to_string(event).expect("serialize");
        assert!(json.contains("\"event\":\"object_resolved\""));
        assert!(json.contains("\"seq\":1"));
        assert!(json.contains("\"attempts\":2"));
    }
}
