//! Deterministic scripted world.
//!
//! [`SimWorld`] implements both collaborator seams over a small scripted
//! state machine: objects open after a scripted number of interaction
//! attempts, guardians manifest when their spawn gate is consumed and fall
//! after a scripted number of engagements, optionally leaving a corpse.
//! It backs the `simulate` CLI command and the integration tests, replaying
//! the same world behavior the engines are built to tolerate.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::filter::ThreatFilter;
use crate::core::types::{
    ActorState, AreaKind, Entity, EntityId, InteractiveObject, ObjectId, Position, TypeId,
    WorldSnapshot,
};
use crate::world::{MovePolicy, NavigationFailure, Pilot, TargetSelector, WorldView};

/// Scripted initial actor state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimActor {
    pub position: Position,
    #[serde(default = "full_health")]
    pub health_fraction: f64,
    #[serde(default = "sanctum")]
    pub area: AreaKind,
}

/// Scripted interactive object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimObject {
    pub id: ObjectId,
    pub position: Position,
    /// Interaction attempts before the object opens; `0` never opens.
    #[serde(default = "one")]
    pub opens_after_attempts: u32,
}

/// How a scripted guardian enters the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPresence {
    /// Live from the first snapshot.
    #[default]
    Present,
    /// Manifests when the named object opens.
    Spawned { by: ObjectId },
    /// Never appears.
    Absent,
    /// Already a corpse in the first snapshot.
    Fallen,
}

/// Scripted guardian behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimGuardian {
    pub entity: EntityId,
    pub archetype: TypeId,
    pub position: Position,
    #[serde(default)]
    pub presence: SimPresence,
    /// Engagements before the guardian falls; `0` never falls.
    #[serde(default = "one")]
    pub falls_after_engagements: u32,
    #[serde(default = "yes")]
    pub leaves_corpse: bool,
    #[serde(default = "yes")]
    pub elite: bool,
    /// Snapshot generations in which the live entity is omitted, modeling
    /// transient snapshot jitter.
    #[serde(default)]
    pub hidden_on_refreshes: Vec<u64>,
}

/// Scripted trash hostile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimHostile {
    pub entity: EntityId,
    pub archetype: TypeId,
    pub position: Position,
    #[serde(default)]
    pub elite: bool,
}

/// Complete scenario script (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimScript {
    pub actor: SimActor,
    #[serde(default)]
    pub objects: Vec<SimObject>,
    #[serde(default)]
    pub guardians: Vec<SimGuardian>,
    #[serde(default)]
    pub hostiles: Vec<SimHostile>,
    #[serde(default)]
    pub blocked: Vec<Position>,
    /// Move targets rejected with a navigation failure.
    #[serde(default)]
    pub unreachable: Vec<Position>,
}

impl SimScript {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("parse simulation script")
    }
}

/// Command counters for assertions and reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimCounters {
    pub refreshes: u64,
    pub moves: u64,
    pub interactions: BTreeMap<ObjectId, u32>,
    pub clears: u64,
    pub recoveries: u64,
    pub buffs: u64,
    pub loots: u64,
    /// Every pickup toggle, in order.
    pub pickup_log: Vec<bool>,
}

#[derive(Debug, Clone)]
struct ObjectState {
    spec: SimObject,
    attempts: u32,
    selectable: bool,
}

#[derive(Debug, Clone)]
struct GuardianState {
    spec: SimGuardian,
    live: bool,
    fallen: bool,
    engagements: u32,
}

#[derive(Debug, Clone)]
struct HostileState {
    spec: SimHostile,
    alive: bool,
}

/// The scripted world and the controlled actor within it.
pub struct SimWorld {
    actor: ActorState,
    objects: Vec<ObjectState>,
    guardians: Vec<GuardianState>,
    hostiles: Vec<HostileState>,
    blocked: BTreeSet<Position>,
    unreachable: BTreeSet<Position>,
    pickup_enabled: bool,
    pub counters: SimCounters,
}

impl SimWorld {
    pub fn new(script: SimScript) -> Self {
        let actor = ActorState {
            position: script.actor.position,
            health_fraction: script.actor.health_fraction,
            area: script.actor.area,
        };
        let objects = script
            .objects
            .into_iter()
            .map(|spec| ObjectState {
                attempts: 0,
                selectable: true,
                spec,
            })
            .collect();
        let guardians = script
            .guardians
            .into_iter()
            .map(|spec| GuardianState {
                live: spec.presence == SimPresence::Present,
                fallen: spec.presence == SimPresence::Fallen,
                engagements: 0,
                spec,
            })
            .collect();
        let hostiles = script
            .hostiles
            .into_iter()
            .map(|spec| HostileState { spec, alive: true })
            .collect();
        Self {
            actor,
            objects,
            guardians,
            hostiles,
            blocked: script.blocked.into_iter().collect(),
            unreachable: script.unreachable.into_iter().collect(),
            pickup_enabled: true,
            counters: SimCounters::default(),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(Self::new(SimScript::from_json(contents)?))
    }

    pub fn pickup_enabled(&self) -> bool {
        self.pickup_enabled
    }

    pub fn object_attempts(&self, id: ObjectId) -> u32 {
        self.objects
            .iter()
            .find(|state| state.spec.id == id)
            .map_or(0, |state| state.attempts)
    }

    pub fn guardian_engagements(&self, archetype: TypeId) -> u32 {
        self.guardians
            .iter()
            .find(|state| state.spec.archetype == archetype)
            .map_or(0, |state| state.engagements)
    }

    fn guardian_entity(state: &GuardianState) -> Entity {
        Entity {
            id: state.spec.entity,
            type_id: state.spec.archetype,
            position: state.spec.position,
            health_fraction: if state.fallen { 0.0 } else { 1.0 },
            is_elite: state.spec.elite,
        }
    }
}

impl WorldView for SimWorld {
    fn refresh(&mut self) -> Result<WorldSnapshot> {
        self.counters.refreshes += 1;
        let generation = self.counters.refreshes;

        let mut entities = Vec::new();
        let mut corpses = Vec::new();
        for state in &self.guardians {
            if state.fallen {
                if state.spec.leaves_corpse {
                    corpses.push(Self::guardian_entity(state));
                }
                continue;
            }
            if state.live && !state.spec.hidden_on_refreshes.contains(&generation) {
                entities.push(Self::guardian_entity(state));
            }
        }
        for state in &self.hostiles {
            if state.alive {
                entities.push(Entity {
                    id: state.spec.entity,
                    type_id: state.spec.archetype,
                    position: state.spec.position,
                    health_fraction: 1.0,
                    is_elite: state.spec.elite,
                });
            }
        }

        let objects = self
            .objects
            .iter()
            .map(|state| InteractiveObject {
                id: state.spec.id,
                position: state.spec.position,
                selectable: state.selectable,
            })
            .collect();

        Ok(WorldSnapshot {
            entities,
            corpses,
            objects,
            actor: self.actor,
            blocked: self.blocked.clone(),
        })
    }
}

impl Pilot for SimWorld {
    fn waypoint_to(&mut self, area: AreaKind) -> Result<()> {
        self.actor.area = area;
        Ok(())
    }

    fn enter_area(&mut self, area: AreaKind) -> Result<()> {
        self.actor.area = area;
        Ok(())
    }

    fn move_to(&mut self, target: Position, _policy: &MovePolicy) -> Result<()> {
        if self.unreachable.contains(&target) {
            return Err(NavigationFailure { target }.into());
        }
        self.counters.moves += 1;
        self.actor.position = target;
        Ok(())
    }

    fn interact_with(&mut self, object: ObjectId) -> Result<()> {
        *self.counters.interactions.entry(object).or_insert(0) += 1;
        let Some(state) = self
            .objects
            .iter_mut()
            .find(|state| state.spec.id == object)
        else {
            return Ok(());
        };
        if !state.selectable {
            return Ok(());
        }
        state.attempts += 1;
        let opens_after = state.spec.opens_after_attempts;
        if opens_after > 0 && state.attempts >= opens_after {
            state.selectable = false;
            for guardian in &mut self.guardians {
                if guardian.spec.presence == (SimPresence::Spawned { by: object }) {
                    guardian.live = true;
                }
            }
        }
        Ok(())
    }

    fn clear_area(
        &mut self,
        center: Position,
        radius: u32,
        selector: TargetSelector,
        _filter: &ThreatFilter,
    ) -> Result<()> {
        self.counters.clears += 1;
        for state in &mut self.guardians {
            if !state.live || state.fallen {
                continue;
            }
            if !state.spec.position.within(center, radius) {
                continue;
            }
            let engaged = match selector {
                TargetSelector::Everything => true,
                TargetSelector::Focus(id) => id == state.spec.entity,
            };
            if !engaged {
                continue;
            }
            state.engagements += 1;
            let falls_after = state.spec.falls_after_engagements;
            if falls_after > 0 && state.engagements >= falls_after {
                state.live = false;
                state.fallen = true;
            }
        }
        if selector == TargetSelector::Everything {
            for state in &mut self.hostiles {
                if state.alive && state.spec.position.within(center, radius) {
                    state.alive = false;
                }
            }
        }
        Ok(())
    }

    fn use_recovery_item(&mut self) -> Result<()> {
        self.counters.recoveries += 1;
        self.actor.health_fraction = 1.0;
        Ok(())
    }

    fn apply_buffs(&mut self) -> Result<()> {
        self.counters.buffs += 1;
        Ok(())
    }

    fn set_item_pickup(&mut self, enabled: bool) {
        self.pickup_enabled = enabled;
        self.counters.pickup_log.push(enabled);
    }

    fn collect_loot(&mut self, _radius: u32) -> Result<()> {
        self.counters.loots += 1;
        Ok(())
    }
}

/// Shared handle over one scripted world.
///
/// The orchestrator borrows its world view and its pilot separately; cloning
/// a handle lets the same scripted state serve both seams. Commands and
/// refreshes are strictly sequential, so the interior borrow is never held
/// across calls.
#[derive(Clone)]
pub struct SimHandle {
    inner: Rc<RefCell<SimWorld>>,
}

impl SimHandle {
    pub fn new(world: SimWorld) -> Self {
        Self {
            inner: Rc::new(RefCell::new(world)),
        }
    }

    /// Inspect the scripted world, e.g. for post-run assertions.
    pub fn with<R>(&self, inspect: impl FnOnce(&SimWorld) -> R) -> R {
        inspect(&self.inner.borrow())
    }
}

impl WorldView for SimHandle {
    fn refresh(&mut self) -> Result<WorldSnapshot> {
        self.inner.borrow_mut().refresh()
    }
}

impl Pilot for SimHandle {
    fn waypoint_to(&mut self, area: AreaKind) -> Result<()> {
        self.inner.borrow_mut().waypoint_to(area)
    }

    fn enter_area(&mut self, area: AreaKind) -> Result<()> {
        self.inner.borrow_mut().enter_area(area)
    }

    fn move_to(&mut self, target: Position, policy: &MovePolicy) -> Result<()> {
        self.inner.borrow_mut().move_to(target, policy)
    }

    fn interact_with(&mut self, object: ObjectId) -> Result<()> {
        self.inner.borrow_mut().interact_with(object)
    }

    fn clear_area(
        &mut self,
        center: Position,
        radius: u32,
        selector: TargetSelector,
        filter: &ThreatFilter,
    ) -> Result<()> {
        self.inner
            .borrow_mut()
            .clear_area(center, radius, selector, filter)
    }

    fn use_recovery_item(&mut self) -> Result<()> {
        self.inner.borrow_mut().use_recovery_item()
    }

    fn apply_buffs(&mut self) -> Result<()> {
        self.inner.borrow_mut().apply_buffs()
    }

    fn set_item_pickup(&mut self, enabled: bool) {
        self.inner.borrow_mut().set_item_pickup(enabled);
    }

    fn collect_loot(&mut self, radius: u32) -> Result<()> {
        self.inner.borrow_mut().collect_loot(radius)
    }
}

fn full_health() -> f64 {
    1.0
}

fn sanctum() -> AreaKind {
    AreaKind::Sanctum
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}
