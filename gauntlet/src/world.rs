//! Collaborator seams to the live world.
//!
//! The [`WorldView`] trait decouples the engines from however snapshots are
//! actually synchronized, and [`Pilot`] decouples them from movement,
//! combat, and inventory execution. Tests and the `simulate` command use the
//! scripted implementation in [`crate::sim`]; a live deployment plugs in
//! adapters over the real world here.

use anyhow::Result;
use thiserror::Error;

use crate::core::filter::ThreatFilter;
use crate::core::types::{AreaKind, EntityId, ObjectId, Position, WorldSnapshot};

/// On-demand access to a consistent point-in-time view of the world.
pub trait WorldView {
    /// Re-synchronize and return a fresh snapshot.
    ///
    /// Safe to call arbitrarily often, including in tight poll loops.
    /// Previously returned snapshots stay valid (and stale) for their
    /// holders.
    fn refresh(&mut self) -> Result<WorldSnapshot>;
}

/// Which entities a clear-area command engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelector {
    /// Attack everything the filter admits within the radius.
    Everything,
    /// Attack only the tracked entity.
    Focus(EntityId),
}

/// Movement behavior for a single transport command.
#[derive(Debug, Clone, Default)]
pub struct MovePolicy {
    /// Walk past hostiles without engaging.
    pub ignore_hostiles: bool,
    /// Clear hostiles within this distance of the path while traveling.
    pub clear_path: Option<u32>,
    pub filter: ThreatFilter,
}

impl MovePolicy {
    /// Move without engaging anything.
    pub fn direct() -> Self {
        Self {
            ignore_hostiles: true,
            clear_path: None,
            filter: ThreatFilter::permissive(),
        }
    }

    /// Honor the filter but do not force path clearing.
    pub fn guarded(filter: ThreatFilter) -> Self {
        Self {
            ignore_hostiles: false,
            clear_path: None,
            filter,
        }
    }

    /// Clear filtered hostiles within `distance` of the path.
    pub fn clearing(distance: u32, filter: ThreatFilter) -> Self {
        Self {
            ignore_hostiles: false,
            clear_path: Some(distance),
            filter,
        }
    }
}

/// The world rejected a transport command; fatal to the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no path to {target}")]
pub struct NavigationFailure {
    pub target: Position,
}

/// Discrete commands against the controlled actor.
///
/// Implementations own pathfinding, input timing, and combat execution; the
/// engines only decide *what* to do and *when*.
pub trait Pilot {
    /// Travel to `area` through the waypoint network.
    fn waypoint_to(&mut self, area: AreaKind) -> Result<()>;

    /// Cross an adjacency into `area`.
    fn enter_area(&mut self, area: AreaKind) -> Result<()>;

    /// Transport the actor to `target` under `policy`.
    fn move_to(&mut self, target: Position, policy: &MovePolicy) -> Result<()>;

    /// Issue a single interaction attempt against `object`.
    ///
    /// Completion is observed by the caller through snapshot polling, not by
    /// this command's return.
    fn interact_with(&mut self, object: ObjectId) -> Result<()>;

    /// Engage entities selected by `selector` within `radius` of `center`.
    fn clear_area(
        &mut self,
        center: Position,
        radius: u32,
        selector: TargetSelector,
        filter: &ThreatFilter,
    ) -> Result<()>;

    fn use_recovery_item(&mut self) -> Result<()>;

    fn apply_buffs(&mut self) -> Result<()>;

    /// Toggle automatic item pickup.
    fn set_item_pickup(&mut self, enabled: bool);

    /// Sweep droppable loot within `radius`.
    fn collect_loot(&mut self, radius: u32) -> Result<()>;
}
