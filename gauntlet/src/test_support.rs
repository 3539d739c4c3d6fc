//! Test-only builders and scripted collaborators.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::config::RunConfig;
use crate::core::filter::ThreatFilter;
use crate::core::types::{
    ActorState, AreaKind, Entity, EntityId, InteractiveObject, ObjectId, Position, TypeId,
    WorldSnapshot,
};
use crate::world::{MovePolicy, Pilot, TargetSelector, WorldView};

/// Config with millisecond-scale budgets so scenarios resolve quickly.
pub fn fast_config() -> RunConfig {
    RunConfig {
        poll_interval_ms: 1,
        detection_timeout_secs: 1,
        interaction_grace_ms: 5,
        ..RunConfig::default()
    }
}

/// Create a regular hostile entity.
pub fn entity(id: u32, type_id: TypeId, position: Position) -> Entity {
    Entity {
        id: EntityId(id),
        type_id,
        position,
        health_fraction: 1.0,
        is_elite: false,
    }
}

/// Create a marked-elite entity.
pub fn elite(id: u32, type_id: TypeId, position: Position) -> Entity {
    Entity {
        is_elite: true,
        ..entity(id, type_id, position)
    }
}

/// Create an interactive object at a fixed position.
pub fn object(id: ObjectId, selectable: bool) -> InteractiveObject {
    InteractiveObject {
        id,
        position: Position::new(10, 10),
        selectable,
    }
}

/// Snapshot with the default actor (healthy, in the sanctum).
pub fn snapshot(
    entities: Vec<Entity>,
    corpses: Vec<Entity>,
    objects: Vec<InteractiveObject>,
) -> WorldSnapshot {
    WorldSnapshot {
        entities,
        corpses,
        objects,
        actor: ActorState {
            position: Position::new(0, 0),
            health_fraction: 1.0,
            area: AreaKind::Sanctum,
        },
        blocked: Default::default(),
    }
}

pub fn snapshot_with_entities(entities: Vec<Entity>) -> WorldSnapshot {
    snapshot(entities, Vec::new(), Vec::new())
}

pub fn snapshot_with_objects(objects: Vec<InteractiveObject>) -> WorldSnapshot {
    snapshot(Vec::new(), Vec::new(), objects)
}

/// Copy of `base` with the actor relocated to `area`.
pub fn with_area(base: WorldSnapshot, area: AreaKind) -> WorldSnapshot {
    WorldSnapshot {
        actor: ActorState { area, ..base.actor },
        ..base
    }
}

/// Copy of `base` with the actor's health fraction replaced.
pub fn with_health(base: WorldSnapshot, health_fraction: f64) -> WorldSnapshot {
    WorldSnapshot {
        actor: ActorState {
            health_fraction,
            ..base.actor
        },
        ..base
    }
}

/// World view replaying a queue of snapshots; the last one repeats forever.
pub struct QueueWorld {
    queue: VecDeque<WorldSnapshot>,
    last: WorldSnapshot,
    reveal: Option<(Arc<AtomicBool>, WorldSnapshot)>,
}

impl QueueWorld {
    pub fn new(snapshots: Vec<WorldSnapshot>) -> Self {
        let last = snapshots
            .last()
            .cloned()
            .unwrap_or_else(|| snapshot(Vec::new(), Vec::new(), Vec::new()));
        Self {
            queue: snapshots.into(),
            last,
            reveal: None,
        }
    }

    /// Once `flag` is raised, every refresh returns `snapshot` instead of the
    /// queue. Pair with [`RecordingPilot::raise_on_clear`] to model world
    /// state that only becomes observable after a combat command.
    pub fn reveal_when(&mut self, flag: Arc<AtomicBool>, snapshot: WorldSnapshot) {
        self.reveal = Some((flag, snapshot));
    }
}

impl WorldView for QueueWorld {
    fn refresh(&mut self) -> Result<WorldSnapshot> {
        if let Some((flag, revealed)) = &self.reveal {
            if flag.load(Ordering::SeqCst) {
                return Ok(revealed.clone());
            }
        }
        Ok(self.queue.pop_front().unwrap_or_else(|| self.last.clone()))
    }
}

/// Pilot recording every command; all commands succeed.
#[derive(Default)]
pub struct RecordingPilot {
    pub waypoints: u32,
    pub area_entries: u32,
    pub moves: Vec<Position>,
    pub interactions: u32,
    pub clears: u32,
    pub recoveries: u32,
    pub buffs: u32,
    pub loots: u32,
    /// Every `set_item_pickup` call, in order.
    pub pickup_log: Vec<bool>,
    raise_on_clear: Option<Arc<AtomicBool>>,
}

impl RecordingPilot {
    /// Raise `flag` whenever a clear-area command lands (see
    /// [`QueueWorld::reveal_when`]).
    pub fn raise_on_clear(&mut self, flag: Arc<AtomicBool>) {
        self.raise_on_clear = Some(flag);
    }
}

impl Pilot for RecordingPilot {
    fn waypoint_to(&mut self, _area: AreaKind) -> Result<()> {
        self.waypoints += 1;
        Ok(())
    }

    fn enter_area(&mut self, _area: AreaKind) -> Result<()> {
        self.area_entries += 1;
        Ok(())
    }

    fn move_to(&mut self, target: Position, _policy: &MovePolicy) -> Result<()> {
        self.moves.push(target);
        Ok(())
    }

    fn interact_with(&mut self, _object: ObjectId) -> Result<()> {
        self.interactions += 1;
        Ok(())
    }

    fn clear_area(
        &mut self,
        _center: Position,
        _radius: u32,
        _selector: TargetSelector,
        _filter: &ThreatFilter,
    ) -> Result<()> {
        self.clears += 1;
        if let Some(flag) = &self.raise_on_clear {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn use_recovery_item(&mut self) -> Result<()> {
        self.recoveries += 1;
        Ok(())
    }

    fn apply_buffs(&mut self) -> Result<()> {
        self.buffs += 1;
        Ok(())
    }

    fn set_item_pickup(&mut self, enabled: bool) {
        self.pickup_log.push(enabled);
    }

    fn collect_loot(&mut self, _radius: u32) -> Result<()> {
        self.loots += 1;
        Ok(())
    }
}
