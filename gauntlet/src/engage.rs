//! Guardian acquisition and kill-confirmation loop.
//!
//! The loop never trusts a single observation. The snapshot is a sampled,
//! possibly-missing view of a continuously changing world: a tracked handle
//! can vanish without a death event, corpses can decay or fall outside the
//! reachable set, and a guardian killed by a concurrent actor leaves nothing
//! but a corpse behind. Every terminal transition therefore requires either
//! direct corpse evidence or a structured absence inference.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::core::filter::ThreatFilter;
use crate::core::phases::GuardianSpec;
use crate::core::types::{Entity, EntityId, KillConfirmation, TypeId, WorldSnapshot};
use crate::journal::{EventDetail, RunJournal};
use crate::pause::{ActiveTimer, PauseGate};
use crate::world::{Pilot, TargetSelector, WorldView};

/// Budgets for one hunt.
#[derive(Debug, Clone)]
pub struct EngageOptions {
    /// Detection window before the last-resort sweep.
    pub detection_timeout: Duration,
    /// Counted engagement attempts before the hunt fails.
    pub max_attempts: u32,
    /// Consecutive unresolved cycles tolerated for a tracked handle.
    pub miss_tolerance: u32,
    pub engage_radius: u32,
    pub sweep_radius: u32,
    /// Health fraction below which a recovery item is used.
    pub recovery_threshold: f64,
    /// Maximum staleness of the last sighting for absence inference.
    pub absence_window: Duration,
    pub poll: Duration,
}

impl EngageOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            detection_timeout: config.detection_timeout(),
            max_attempts: config.max_engage_attempts,
            miss_tolerance: config.miss_tolerance,
            engage_radius: config.engage_radius,
            sweep_radius: config.sweep_radius,
            recovery_threshold: config.recovery_health_fraction,
            absence_window: config.absence_window(),
            poll: config.poll_interval(),
        }
    }
}

/// Successful hunt termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillOutcome {
    pub confirmation: KillConfirmation,
    /// Engagement attempts counted before confirmation.
    pub attempts: u32,
}

/// No live sighting and no corpse evidence within the budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("guardian archetype {archetype} not found after {searched:?} of active search")]
pub struct GuardianNotFound {
    pub archetype: TypeId,
    /// Active (unpaused) time spent hunting.
    pub searched: Duration,
}

/// The guardian outlived the engagement attempt budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("guardian archetype {archetype} survived {attempts} engagement attempts")]
pub struct ExhaustedEngagementAttempts {
    pub archetype: TypeId,
    pub attempts: u32,
}

enum HuntState {
    Searching,
    Engaging,
}

/// Hunt `guardian` until its death is confirmed.
///
/// `clear_trash` selects the engagement style: everything within the radius
/// for builds that benefit from clearing, or only the tracked entity
/// otherwise. The `filter` decides which entities count as reachable when
/// scanning and re-scanning.
#[allow(clippy::too_many_arguments)]
pub fn confirm_kill<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    guardian: &GuardianSpec,
    filter: &ThreatFilter,
    clear_trash: bool,
    opts: &EngageOptions,
) -> Result<KillOutcome>
where
    W: WorldView,
    P: Pilot,
{
    info!(guardian = guardian.name, "hunting guardian");
    let mut state = HuntState::Searching;
    let mut hunt_clock = ActiveTimer::new(opts.detection_timeout);
    let mut tracked = EntityId::NONE;
    let mut attempts = 0u32;
    let mut misses = 0u32;
    let mut last_sighting = ActiveTimer::new(opts.absence_window);

    loop {
        match state {
            HuntState::Searching => {
                hunt_clock.credit(gate.wait_if_paused());
                let snapshot = world.refresh()?;

                if let Some(found) = find_guardian(&snapshot, filter, guardian.archetype) {
                    debug!(guardian = guardian.name, entity = %found.id, "guardian sighted");
                    tracked = found.id;
                    last_sighting = ActiveTimer::new(opts.absence_window);
                    journal.push(EventDetail::GuardianSighted {
                        guardian: guardian.name.to_string(),
                    });
                    state = HuntState::Engaging;
                    continue;
                }

                if snapshot.corpse_of(guardian.archetype).is_some() {
                    debug!(guardian = guardian.name, "corpse present before engagement");
                    journal.push(EventDetail::GuardianAlreadyDead {
                        guardian: guardian.name.to_string(),
                    });
                    return Ok(KillOutcome {
                        confirmation: KillConfirmation::AlreadyDead,
                        attempts: 0,
                    });
                }

                if hunt_clock.expired() {
                    return last_resort_sweep(world, pilot, journal, guardian, &snapshot, opts);
                }

                thread::sleep(opts.poll);
            }

            HuntState::Engaging => {
                let paused = gate.wait_if_paused();
                hunt_clock.credit(paused);
                last_sighting.credit(paused);
                let snapshot = world.refresh()?;

                // A forced recall puts the actor in the safe area mid-fight;
                // waiting there must not consume the attempt budget.
                if snapshot.actor.area.is_safe() {
                    debug!("actor in safe area, holding without counting an attempt");
                    thread::sleep(opts.poll);
                    continue;
                }

                let target = match snapshot.find_entity(tracked) {
                    Some(current) => Some(current.clone()),
                    None => find_guardian(&snapshot, filter, guardian.archetype),
                };
                let Some(target) = target else {
                    if snapshot.corpse_of(guardian.archetype).is_some() {
                        return confirmed(journal, guardian, KillConfirmation::CorpseEvidence, attempts);
                    }
                    misses += 1;
                    if misses > opts.miss_tolerance {
                        warn!(
                            guardian = guardian.name,
                            misses, "guardian lost after detection"
                        );
                        return Err(GuardianNotFound {
                            archetype: guardian.archetype,
                            searched: hunt_clock.elapsed(),
                        }
                        .into());
                    }
                    debug!(
                        guardian = guardian.name,
                        misses, "guardian missing from snapshot, tolerating jitter"
                    );
                    thread::sleep(opts.poll);
                    continue;
                };
                misses = 0;
                tracked = target.id;
                last_sighting = ActiveTimer::new(opts.absence_window);

                if attempts >= opts.max_attempts {
                    warn!(guardian = guardian.name, attempts, "engagement budget exhausted");
                    return Err(ExhaustedEngagementAttempts {
                        archetype: guardian.archetype,
                        attempts,
                    }
                    .into());
                }
                attempts += 1;

                if snapshot.actor.health_fraction < opts.recovery_threshold {
                    journal.push(EventDetail::RecoveryUsed {
                        health_fraction: snapshot.actor.health_fraction,
                    });
                    if let Err(err) = pilot.use_recovery_item() {
                        warn!(error = %err, "recovery item failed");
                    }
                }

                let selector = if clear_trash {
                    TargetSelector::Everything
                } else {
                    TargetSelector::Focus(target.id)
                };
                if let Err(err) =
                    pilot.clear_area(target.position, opts.engage_radius, selector, filter)
                {
                    // The attempt stays counted; a pathless engage must not
                    // extend the budget.
                    warn!(
                        guardian = guardian.name,
                        attempt = attempts,
                        error = %err,
                        "engage action failed"
                    );
                    thread::sleep(opts.poll);
                    continue;
                }

                let after = world.refresh()?;
                if after.corpse_of(guardian.archetype).is_some() {
                    return confirmed(journal, guardian, KillConfirmation::CorpseEvidence, attempts);
                }
                let still_alive = filter
                    .live(&after)
                    .iter()
                    .any(|entity| entity.type_id == guardian.archetype);
                if !still_alive && !last_sighting.expired() {
                    debug!(
                        guardian = guardian.name,
                        "no corpse and no live sighting after a confirmed sighting, inferring death"
                    );
                    return confirmed(
                        journal,
                        guardian,
                        KillConfirmation::AbsenceInference,
                        attempts,
                    );
                }

                thread::sleep(opts.poll);
            }
        }
    }
}

fn find_guardian(
    snapshot: &WorldSnapshot,
    filter: &ThreatFilter,
    archetype: TypeId,
) -> Option<Entity> {
    filter
        .live(snapshot)
        .into_iter()
        .find(|entity| entity.type_id == archetype)
}

fn confirmed(
    journal: &mut RunJournal,
    guardian: &GuardianSpec,
    confirmation: KillConfirmation,
    attempts: u32,
) -> Result<KillOutcome> {
    info!(guardian = guardian.name, attempts, ?confirmation, "guardian confirmed dead");
    journal.push(EventDetail::GuardianConfirmed {
        guardian: guardian.name.to_string(),
        attempts,
        confirmation,
    });
    Ok(KillOutcome {
        confirmation,
        attempts,
    })
}

/// Detection timed out: sweep the immediate area once, then accept corpse
/// evidence, tolerated absence, or fail.
fn last_resort_sweep<W, P>(
    world: &mut W,
    pilot: &mut P,
    journal: &mut RunJournal,
    guardian: &GuardianSpec,
    snapshot: &WorldSnapshot,
    opts: &EngageOptions,
) -> Result<KillOutcome>
where
    W: WorldView,
    P: Pilot,
{
    debug!(guardian = guardian.name, "detection window elapsed, sweeping");
    if let Err(err) = pilot.clear_area(
        snapshot.actor.position,
        opts.sweep_radius,
        TargetSelector::Everything,
        &ThreatFilter::permissive(),
    ) {
        warn!(error = %err, "last-resort sweep failed");
    }

    let after = world.refresh()?;
    if after.corpse_of(guardian.archetype).is_some() {
        return confirmed(journal, guardian, KillConfirmation::CorpseEvidence, 0);
    }

    if guardian.tolerant {
        warn!(
            guardian = guardian.name,
            "guardian not detected but marked tolerant of absence, continuing"
        );
        journal.push(EventDetail::GuardianAbsenceTolerated {
            guardian: guardian.name.to_string(),
        });
        return Ok(KillOutcome {
            confirmation: KillConfirmation::AbsenceTolerated,
            attempts: 0,
        });
    }

    Err(GuardianNotFound {
        archetype: guardian.archetype,
        searched: opts.detection_timeout,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        QueueWorld, RecordingPilot, elite, entity, snapshot, snapshot_with_entities, with_area,
        with_health,
    };
    use crate::core::types::{AreaKind, Position};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    const ARCHETYPE: TypeId = TypeId(301);

    fn guardian_spec(tolerant: bool) -> GuardianSpec {
        GuardianSpec {
            name: "Tempest",
            archetype: ARCHETYPE,
            tolerant,
        }
    }

    fn fast_options() -> EngageOptions {
        EngageOptions {
            detection_timeout: Duration::from_millis(40),
            max_attempts: 4,
            miss_tolerance: 2,
            engage_radius: 30,
            sweep_radius: 25,
            recovery_threshold: 0.5,
            absence_window: Duration::from_secs(30),
            poll: Duration::from_millis(1),
        }
    }

    fn alive() -> WorldSnapshot {
        snapshot_with_entities(vec![elite(9, ARCHETYPE, Position::new(5, 5))])
    }

    fn empty() -> WorldSnapshot {
        snapshot_with_entities(Vec::new())
    }

    fn corpse_only() -> WorldSnapshot {
        snapshot(
            Vec::new(),
            vec![elite(9, ARCHETYPE, Position::new(5, 5))],
            Vec::new(),
        )
    }

    fn hunt(
        world: &mut QueueWorld,
        pilot: &mut RecordingPilot,
        spec: &GuardianSpec,
        opts: &EngageOptions,
    ) -> Result<KillOutcome> {
        let gate = PauseGate::new();
        let mut journal = RunJournal::with_capacity(64);
        confirm_kill(
            world,
            pilot,
            &gate,
            &mut journal,
            spec,
            &ThreatFilter::permissive(),
            false,
            opts,
        )
    }

    /// A pre-existing corpse short-circuits the hunt before any engagement.
    #[test]
    fn pre_existing_corpse_returns_already_dead() {
        let mut world = QueueWorld::new(vec![corpse_only()]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.confirmation, KillConfirmation::AlreadyDead);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(pilot.clears, 0, "no engagement commands");
    }

    /// Corpse evidence after an engagement confirms the kill.
    ///
    /// Snapshot order: search (alive) → cycle start (alive) → post-engage
    /// (corpse).
    #[test]
    fn corpse_after_engagement_confirms() {
        let mut world = QueueWorld::new(vec![alive(), alive(), corpse_only()]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.confirmation, KillConfirmation::CorpseEvidence);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(pilot.clears, 1);
    }

    /// No corpse and no live re-sighting after a confirmed sighting is
    /// accepted as a death proxy.
    #[test]
    fn vanished_target_after_engagement_infers_death() {
        let mut world = QueueWorld::new(vec![alive(), alive(), empty()]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.confirmation, KillConfirmation::AbsenceInference);
        assert_eq!(outcome.attempts, 1);
    }

    /// A single missing cycle is snapshot jitter, not a loss.
    ///
    /// Snapshot order: search (alive) → cycle 1 (alive, engage, still alive)
    /// → cycle 2 (missing, tolerated) → cycle 3 (alive, engage, corpse).
    #[test]
    fn one_cycle_miss_is_tolerated() {
        let mut world = QueueWorld::new(vec![
            alive(),
            alive(),
            alive(),
            empty(),
            alive(),
            corpse_only(),
        ]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt must survive a one-cycle miss");

        assert_eq!(outcome.confirmation, KillConfirmation::CorpseEvidence);
        assert_eq!(outcome.attempts, 2);
    }

    /// Misses beyond the tolerance fail the hunt with the typed error.
    #[test]
    fn persistent_loss_fails_with_guardian_not_found() {
        // After the first sighting the guardian never reappears and no
        // corpse is ever produced. The absence window is zeroed so the
        // post-engage absence check cannot fire first.
        let opts = EngageOptions {
            absence_window: Duration::ZERO,
            ..fast_options()
        };
        let mut world = QueueWorld::new(vec![alive(), alive(), empty()]);
        let mut pilot = RecordingPilot::default();

        let err = hunt(&mut world, &mut pilot, &guardian_spec(false), &opts)
            .expect_err("hunt should fail");

        let lost = err.downcast_ref::<GuardianNotFound>().expect("typed error");
        assert_eq!(lost.archetype, ARCHETYPE);
    }

    /// Exactly `max_attempts` attempts are counted against an unkillable
    /// target, then the typed exhaustion error is returned.
    #[test]
    fn unkillable_target_exhausts_exact_attempt_budget() {
        let mut world = QueueWorld::new(vec![alive()]);
        let mut pilot = RecordingPilot::default();

        let err = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect_err("hunt should exhaust");

        let exhausted = err
            .downcast_ref::<ExhaustedEngagementAttempts>()
            .expect("typed error");
        assert_eq!(exhausted.attempts, 4);
        assert_eq!(pilot.clears, 4, "one engage command per counted attempt");
    }

    /// Cycles spent in the safe area do not consume the attempt budget.
    ///
    /// Snapshot order: search (alive) → two cycles recalled to the haven →
    /// cycle back in the fight (engage) → post-engage (corpse).
    #[test]
    fn safe_area_cycles_do_not_count_attempts() {
        let recalled = with_area(
            snapshot_with_entities(vec![elite(9, ARCHETYPE, Position::new(5, 5))]),
            AreaKind::Haven,
        );
        let mut world = QueueWorld::new(vec![
            alive(),
            recalled.clone(),
            recalled,
            alive(),
            corpse_only(),
        ]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.attempts, 1);
        assert_eq!(pilot.clears, 1);
    }

    /// Never-appearing archetype without tolerance fails after the window.
    #[test]
    fn absent_guardian_fails_with_not_found() {
        let mut world = QueueWorld::new(vec![empty()]);
        let mut pilot = RecordingPilot::default();

        let err = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect_err("hunt should fail");

        let not_found = err.downcast_ref::<GuardianNotFound>().expect("typed error");
        assert_eq!(not_found.archetype, ARCHETYPE);
        assert_eq!(not_found.searched, fast_options().detection_timeout);
        assert_eq!(pilot.clears, 1, "one last-resort sweep");
    }

    /// The tolerant archetype degrades non-detection to a logged success.
    #[test]
    fn absent_tolerant_guardian_terminates_successfully() {
        let mut world = QueueWorld::new(vec![empty()]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(true), &fast_options())
            .expect("tolerant hunt");

        assert_eq!(outcome.confirmation, KillConfirmation::AbsenceTolerated);
        assert_eq!(outcome.attempts, 0);
    }

    /// A corpse surfaced by the last-resort sweep still confirms the kill.
    #[test]
    fn sweep_surfacing_a_corpse_confirms() {
        let swept = Arc::new(AtomicBool::new(false));
        let mut world = QueueWorld::new(vec![empty()]);
        world.reveal_when(swept.clone(), corpse_only());
        let mut pilot = RecordingPilot::default();
        pilot.raise_on_clear(swept);

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.confirmation, KillConfirmation::CorpseEvidence);
        assert_eq!(outcome.attempts, 0);
    }

    /// Health below the threshold triggers exactly one recovery per cycle.
    #[test]
    fn low_health_triggers_recovery() {
        let hurt = with_health(
            snapshot_with_entities(vec![entity(9, ARCHETYPE, Position::new(5, 5))]),
            0.3,
        );
        let mut world = QueueWorld::new(vec![hurt.clone(), hurt, corpse_only()]);
        let mut pilot = RecordingPilot::default();

        let outcome = hunt(&mut world, &mut pilot, &guardian_spec(false), &fast_options())
            .expect("hunt");

        assert_eq!(outcome.attempts, 1);
        assert_eq!(pilot.recoveries, 1);
    }
}
