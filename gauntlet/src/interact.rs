//! Bounded interaction retry engine.
//!
//! Engages an interactive object until a caller-supplied success predicate
//! holds or the attempt budget runs out. The engine assumes nothing about
//! *why* an attempt can fail — timing, occlusion, or the object having been
//! resolved by someone else — so every attempt re-resolves the object from a
//! fresh snapshot and an already-consumed object is success, not an error.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::core::types::{ObjectId, Position, WorldSnapshot};
use crate::journal::{EventDetail, RunJournal};
use crate::pause::PauseGate;
use crate::world::{MovePolicy, Pilot, WorldView};

/// Budgets for one interaction protocol run.
#[derive(Debug, Clone)]
pub struct InteractionOptions {
    /// Maximum interaction commands to issue.
    pub max_attempts: u32,
    /// How long to poll the success predicate after each command.
    pub grace: Duration,
    /// Poll cadence within the grace period.
    pub poll: Duration,
}

impl InteractionOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            max_attempts: config.max_gate_attempts,
            grace: config.interaction_grace(),
            poll: config.poll_interval(),
        }
    }
}

/// Successful termination of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// The object was already consumed; no command was issued.
    AlreadyResolved,
    /// The predicate held after `attempts` commands.
    Resolved { attempts: u32 },
}

/// The attempt budget ran out with the object still pending.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("object {object} still pending after {attempts} interaction attempts")]
pub struct ExhaustedInteractionRetries {
    pub object: ObjectId,
    pub attempts: u32,
}

/// Drive `object` toward resolution.
///
/// Before each attempt the object is re-resolved from a fresh snapshot; an
/// object that is no longer selectable (or has dropped out of the snapshot
/// entirely) short-circuits to success, even after a failed final attempt.
/// Each attempt issues one [`Pilot::interact_with`] command and then polls
/// `success` for the grace period. Failed attempts trigger a small
/// randomized positional adjustment to break sticking conditions before the
/// next try.
pub fn attempt_interaction<W, P, F>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    object: ObjectId,
    success: F,
    opts: &InteractionOptions,
) -> Result<InteractionOutcome>
where
    W: WorldView,
    P: Pilot,
    F: Fn(&WorldSnapshot) -> bool,
{
    let mut attempts = 0u32;
    loop {
        gate.wait_if_paused();
        let snapshot = world.refresh()?;
        let resolved = snapshot
            .find_object(object)
            .is_none_or(|current| !current.selectable);
        if resolved {
            if attempts == 0 {
                debug!(%object, "object already resolved, skipping interaction");
                journal.push(EventDetail::ObjectAlreadyResolved { object });
                return Ok(InteractionOutcome::AlreadyResolved);
            }
            journal.push(EventDetail::ObjectResolved { object, attempts });
            return Ok(InteractionOutcome::Resolved { attempts });
        }
        if attempts >= opts.max_attempts {
            warn!(%object, attempts, "interaction attempts exhausted");
            return Err(ExhaustedInteractionRetries { object, attempts }.into());
        }

        attempts += 1;
        let mut succeeded = false;
        match pilot.interact_with(object) {
            Ok(()) => {
                let deadline = Instant::now() + opts.grace;
                loop {
                    let current = world.refresh()?;
                    if success(&current) {
                        succeeded = true;
                        break;
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                    thread::sleep(opts.poll);
                }
            }
            Err(err) => {
                warn!(%object, attempt = attempts, error = %err, "interaction command failed");
            }
        }

        if succeeded {
            journal.push(EventDetail::ObjectResolved { object, attempts });
            return Ok(InteractionOutcome::Resolved { attempts });
        }

        warn!(%object, attempt = attempts, "interaction did not resolve, adjusting position");
        journal.push(EventDetail::InteractionRetry {
            object,
            attempt: attempts,
        });
        sidestep(pilot, snapshot.actor.position);
    }
}

/// Small random offset to break a plausible sticking/occlusion condition.
fn sidestep<P: Pilot>(pilot: &mut P, from: Position) {
    let mut rng = rand::thread_rng();
    let target = from.offset(random_step(&mut rng), random_step(&mut rng));
    if let Err(err) = pilot.move_to(target, &MovePolicy::direct()) {
        warn!(%target, error = %err, "sidestep failed");
    }
}

fn random_step<R: Rng>(rng: &mut R) -> i32 {
    let magnitude = rng.gen_range(1..=3);
    if rng.gen_bool(0.5) { magnitude } else { -magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{QueueWorld, RecordingPilot, object, snapshot_with_objects};

    fn fast_options(max_attempts: u32) -> InteractionOptions {
        InteractionOptions {
            max_attempts,
            grace: Duration::ZERO,
            poll: Duration::from_millis(1),
        }
    }

    const WARD: ObjectId = ObjectId(401);

    /// Already-consumed objects succeed without any interaction command.
    #[test]
    fn unselectable_object_short_circuits_without_commands() {
        let mut world = QueueWorld::new(vec![snapshot_with_objects(vec![object(
            WARD, false,
        )])]);
        let mut pilot = RecordingPilot::default();
        let gate = PauseGate::new();
        let mut journal = RunJournal::with_capacity(16);

        let outcome = attempt_interaction(
            &mut world,
            &mut pilot,
            &gate,
            &mut journal,
            WARD,
            |snapshot| snapshot.find_object(WARD).is_none_or(|o| !o.selectable),
            &fast_options(3),
        )
        .expect("interaction");

        assert_eq!(outcome, InteractionOutcome::AlreadyResolved);
        assert_eq!(pilot.interactions, 0);
    }

    /// An object missing from the snapshot is treated as consumed.
    #[test]
    fn missing_object_short_circuits() {
        let mut world = QueueWorld::new(vec![snapshot_with_objects(Vec::new())]);
        let mut pilot = RecordingPilot::default();
        let gate = PauseGate::new();
        let mut journal = RunJournal::with_capacity(16);

        let outcome = attempt_interaction(
            &mut world,
            &mut pilot,
            &gate,
            &mut journal,
            WARD,
            |_| true,
            &fast_options(3),
        )
        .expect("interaction");

        assert_eq!(outcome, InteractionOutcome::AlreadyResolved);
        assert_eq!(pilot.interactions, 0);
    }

    /// Snapshot order: pre-check (pending), grace poll (pending, attempt 1
    /// fails), pre-check (pending), grace poll (resolved, attempt 2 wins).
    #[test]
    fn resolves_on_second_attempt_after_sidestep() {
        let pending = snapshot_with_objects(vec![object(WARD, true)]);
        let resolved = snapshot_with_objects(vec![object(WARD, false)]);
        let mut world = QueueWorld::new(vec![
            pending.clone(),
            pending.clone(),
            pending,
            resolved,
        ]);
        let mut pilot = RecordingPilot::default();
        let gate = PauseGate::new();
        let mut journal = RunJournal::with_capacity(16);

        let outcome = attempt_interaction(
            &mut world,
            &mut pilot,
            &gate,
            &mut journal,
            WARD,
            |snapshot| snapshot.find_object(WARD).is_none_or(|o| !o.selectable),
            &fast_options(3),
        )
        .expect("interaction");

        assert_eq!(outcome, InteractionOutcome::Resolved { attempts: 2 });
        assert_eq!(pilot.interactions, 2);
        assert_eq!(pilot.moves.len(), 1, "one sidestep after the failed attempt");
    }

    /// At most `max_attempts` commands are issued before the typed error.
    #[test]
    fn exhaustion_reports_object_and_attempt_budget() {
        let pending = snapshot_with_objects(vec![object(WARD, true)]);
        let mut world = QueueWorld::new(vec![pending]);
        let mut pilot = RecordingPilot::default();
        let gate = PauseGate::new();
        let mut journal = RunJournal::with_capacity(16);

        let err = attempt_interaction(
            &mut world,
            &mut pilot,
            &gate,
            &mut journal,
            WARD,
            |snapshot| snapshot.find_object(WARD).is_none_or(|o| !o.selectable),
            &fast_options(3),
        )
        .expect_err("should exhaust");

        let exhausted = err
            .downcast_ref::<ExhaustedInteractionRetries>()
            .expect("typed error");
        assert_eq!(exhausted.object, WARD);
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(pilot.interactions, 3);
    }
}
