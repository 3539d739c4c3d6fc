//! Phase sequencer and run orchestrator.
//!
//! Walks the fixed objective graph strictly in order: staging travel, the
//! warded guardian phases, and the terminal encounter. Each phase blocks
//! until resolved and propagates its first hard failure upward wrapped with
//! phase context; only the tolerant guardian's kill failure is downgraded to
//! a logged skip. Item pickup is re-enabled on every exit path.

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::core::filter::ThreatFilter;
use crate::core::phases::{
    FIRST_WARD_APPROACH, GateSpec, GuardianSpec, Phase, RunMode, RunParameters, SANCTUM_CENTER,
    guardian_types, objective_graph, terminal_guardian,
};
use crate::core::types::AreaKind;
use crate::engage::{EngageOptions, KillOutcome, confirm_kill};
use crate::interact::{InteractionOptions, attempt_interaction};
use crate::journal::{EventDetail, RunJournal};
use crate::pause::PauseGate;
use crate::world::{MovePolicy, Pilot, TargetSelector, WorldView};

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub phases_completed: u32,
    pub guardians_confirmed: u32,
    pub terminal_engaged: bool,
}

/// Execute one full run.
///
/// The single entry point of the engine. The caller owns the collaborators,
/// the pause gate, and the journal; the run owns nothing past its return.
/// No whole-run retry happens here — a failed run is reported upward for the
/// caller to decide.
pub fn execute_run<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    params: &RunParameters,
) -> Result<RunSummary>
where
    W: WorldView,
    P: Pilot,
{
    journal.push(EventDetail::RunStarted);
    let result = drive_run(world, pilot, gate, journal, config, params);
    // Pickup must come back on no matter which branch exited the run.
    pilot.set_item_pickup(true);
    if let Ok(summary) = &result {
        journal.push(EventDetail::RunCompleted {
            phases: summary.phases_completed,
        });
    }
    result
}

fn drive_run<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    params: &RunParameters,
) -> Result<RunSummary>
where
    W: WorldView,
    P: Pilot,
{
    let phases = objective_graph();
    let filter = travel_filter(config, params, &phases);

    stage(pilot, config, params, &filter).context("staging")?;

    let mut summary = RunSummary {
        phases_completed: 0,
        guardians_confirmed: 0,
        terminal_engaged: false,
    };

    for phase in &phases {
        run_guardian_phase(
            world,
            pilot,
            gate,
            journal,
            config,
            params,
            &filter,
            phase,
            &mut summary,
        )
        .with_context(|| format!("phase '{}'", phase.name))?;
        summary.phases_completed += 1;
    }

    if params.engage_terminal {
        run_terminal_phase(world, pilot, gate, journal, config, params, &filter, &mut summary)
            .context("terminal phase")?;
        summary.phases_completed += 1;
    }

    Ok(summary)
}

/// Threat filter shared by travel policies and the hunts.
fn travel_filter(config: &RunConfig, params: &RunParameters, phases: &[Phase]) -> ThreatFilter {
    ThreatFilter {
        elite_only: config.focus_elites || params.mode == RunMode::ObjectiveOnly,
        guardian_types: guardian_types(phases),
    }
}

/// Travel to the staging ground and position for the first phase.
fn stage<P: Pilot>(
    pilot: &mut P,
    config: &RunConfig,
    params: &RunParameters,
    filter: &ThreatFilter,
) -> Result<()> {
    pilot.waypoint_to(AreaKind::Passage)?;
    pilot.enter_area(AreaKind::Sanctum)?;
    if params.capabilities.is_leveling_build {
        buff(pilot);
    }

    let clearing = MovePolicy::clearing(config.path_clear_radius, filter.clone());
    if params.start_at_center {
        if params.capabilities.can_teleport {
            pilot.move_to(SANCTUM_CENTER, &MovePolicy::direct())?;
        } else {
            pilot.move_to(SANCTUM_CENTER, &clearing)?;
            // A non-teleporter still has to fight its way out of the center.
            pilot.move_to(FIRST_WARD_APPROACH, &clearing)?;
        }
    } else {
        pilot.move_to(FIRST_WARD_APPROACH, &clearing)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_guardian_phase<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    params: &RunParameters,
    filter: &ThreatFilter,
    phase: &Phase,
    summary: &mut RunSummary,
) -> Result<()>
where
    W: WorldView,
    P: Pilot,
{
    info!(phase = phase.name, "entering phase");
    journal.push(EventDetail::PhaseStarted {
        phase: phase.name.to_string(),
    });

    let mut engaged = false;
    for gate_spec in &phase.gates {
        open_gate(world, pilot, gate, journal, config, filter, gate_spec)
            .with_context(|| format!("gating object {}", gate_spec.object))?;

        // Consuming a spawn-flagged gate is what makes the guardian
        // manifest; hunt it down before touching the next gate.
        if gate_spec.spawns_guardian {
            if let Some(guardian) = &phase.guardian {
                kill_guardian(world, pilot, gate, journal, config, params, filter, guardian, summary)?;
                engaged = true;
            }
        }
    }

    if !engaged {
        if let Some(guardian) = &phase.guardian {
            kill_guardian(world, pilot, gate, journal, config, params, filter, guardian, summary)?;
        }
    }

    Ok(())
}

/// Move to a gating object, clear the vicinity, and consume it.
fn open_gate<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    filter: &ThreatFilter,
    spec: &GateSpec,
) -> Result<()>
where
    W: WorldView,
    P: Pilot,
{
    let snapshot = world.refresh()?;
    let object = snapshot
        .find_object(spec.object)
        .ok_or_else(|| anyhow!("object {} not present in snapshot", spec.object))?;

    let approach_policy = MovePolicy::clearing(config.approach_clear_radius, filter.clone());
    pilot.move_to(object.position, &approach_policy)?;
    if let Some(approach) = spec.approach {
        pilot.move_to(approach, &approach_policy)?;
    }

    let snapshot = world.refresh()?;
    if let Err(err) = pilot.clear_area(
        snapshot.actor.position,
        config.vicinity_radius,
        TargetSelector::Everything,
        &ThreatFilter::permissive(),
    ) {
        warn!(object = %spec.object, error = %err, "vicinity clear failed");
    }

    if spec.buff_before {
        buff(pilot);
    }

    let object_id = spec.object;
    attempt_interaction(
        world,
        pilot,
        gate,
        journal,
        object_id,
        move |snap| {
            snap.find_object(object_id)
                .is_none_or(|current| !current.selectable)
        },
        &InteractionOptions::from_config(config),
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn kill_guardian<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    params: &RunParameters,
    filter: &ThreatFilter,
    guardian: &GuardianSpec,
    summary: &mut RunSummary,
) -> Result<Option<KillOutcome>>
where
    W: WorldView,
    P: Pilot,
{
    let clear_trash = params.capabilities.is_leveling_build;
    match confirm_kill(
        world,
        pilot,
        gate,
        journal,
        guardian,
        filter,
        clear_trash,
        &EngageOptions::from_config(config),
    ) {
        Ok(outcome) => {
            summary.guardians_confirmed += 1;
            Ok(Some(outcome))
        }
        Err(err) if guardian.tolerant => {
            warn!(
                guardian = guardian.name,
                error = %err,
                "kill failed for tolerant guardian, skipping"
            );
            journal.push(EventDetail::GuardianSkipped {
                guardian: guardian.name.to_string(),
                reason: format!("{err:#}"),
            });
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("guardian '{}'", guardian.name)),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_terminal_phase<W, P>(
    world: &mut W,
    pilot: &mut P,
    gate: &PauseGate,
    journal: &mut RunJournal,
    config: &RunConfig,
    params: &RunParameters,
    filter: &ThreatFilter,
    summary: &mut RunSummary,
) -> Result<()>
where
    W: WorldView,
    P: Pilot,
{
    let guardian = terminal_guardian();
    info!(guardian = guardian.name, "entering terminal phase");
    journal.push(EventDetail::PhaseStarted {
        phase: "terminal".to_string(),
    });

    buff(pilot);
    // No path clearing on the final approach; the spawn area is cramped and
    // detours cost more than they save.
    pilot.move_to(SANCTUM_CENTER, &MovePolicy::guarded(filter.clone()))?;

    if config.disable_pickup_during_terminal {
        pilot.set_item_pickup(false);
    }

    let clear_trash = params.capabilities.is_leveling_build;
    confirm_kill(
        world,
        pilot,
        gate,
        journal,
        &guardian,
        filter,
        clear_trash,
        &EngageOptions::from_config(config),
    )
    .with_context(|| format!("guardian '{}'", guardian.name))?;
    summary.guardians_confirmed += 1;
    summary.terminal_engaged = true;

    pilot.set_item_pickup(true);
    if let Err(err) = pilot.collect_loot(config.loot_radius) {
        warn!(error = %err, "loot sweep failed");
    }
    Ok(())
}

fn buff<P: Pilot>(pilot: &mut P) {
    if let Err(err) = pilot.apply_buffs() {
        warn!(error = %err, "buff refresh failed");
    }
}
