//! Shared world-state contract types.
//!
//! These types define the read-only view the engine receives from the world
//! accessor. A [`WorldSnapshot`] is replaced wholesale on every refresh;
//! holders of an older generation keep a valid (stale) view until they drop
//! it. Nothing in this crate mutates a snapshot after construction.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn within(self, center: Position, radius: u32) -> bool {
        self.distance(center) <= f64::from(radius)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Handle for a live entity.
///
/// Valid only until the entity despawns or respawns; not guaranteed stable
/// across a respawn. [`EntityId::NONE`] denotes "not yet acquired" and never
/// refers to a real entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const NONE: EntityId = EntityId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monster/guardian archetype identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an interactive world object, stable for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entity as reported by a single snapshot, live or dead depending on
/// which snapshot sequence it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub type_id: TypeId,
    pub position: Position,
    /// Remaining health in `[0.0, 1.0]`.
    pub health_fraction: f64,
    pub is_elite: bool,
}

/// An interactive world object.
///
/// `selectable` is true while the object still awaits interaction; once it
/// transitions to false it never reverts within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveObject {
    pub id: ObjectId,
    pub position: Position,
    pub selectable: bool,
}

/// Coarse area classification for the controlled actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaKind {
    /// Safe/rest area. Engagement attempts are never counted here.
    Haven,
    /// Transit area between the haven and the staging ground.
    Passage,
    /// The staging ground where the objective plays out.
    Sanctum,
}

impl AreaKind {
    pub fn is_safe(self) -> bool {
        matches!(self, AreaKind::Haven)
    }
}

/// State of the controlled actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub position: Position,
    /// Remaining health in `[0.0, 1.0]`.
    pub health_fraction: f64,
    pub area: AreaKind,
}

/// Point-in-time view of the world, produced by one refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Live entities, in world order.
    pub entities: Vec<Entity>,
    /// Entities in terminal state. A corpse may decay out of later snapshots.
    pub corpses: Vec<Entity>,
    pub objects: Vec<InteractiveObject>,
    pub actor: ActorState,
    /// Positions the accessor reports as unwalkable.
    #[serde(default)]
    pub blocked: BTreeSet<Position>,
}

impl WorldSnapshot {
    pub fn find_object(&self, id: ObjectId) -> Option<&InteractiveObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Resolve a live-entity handle against this snapshot.
    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        if id.is_none() {
            return None;
        }
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// First corpse matching `type_id`, if any.
    pub fn corpse_of(&self, type_id: TypeId) -> Option<&Entity> {
        self.corpses.iter().find(|corpse| corpse.type_id == type_id)
    }

    pub fn is_walkable(&self, position: Position) -> bool {
        !self.blocked.contains(&position)
    }
}

/// How a guardian's death was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillConfirmation {
    /// A matching corpse existed before the hunt engaged anything.
    AlreadyDead,
    /// A matching corpse was observed after an engagement.
    CorpseEvidence,
    /// No corpse and no live sighting after a confirmed earlier sighting.
    AbsenceInference,
    /// The guardian never appeared and is marked tolerant of absence.
    AbsenceTolerated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_handle_never_resolves() {
        let snapshot = WorldSnapshot {
            entities: vec![Entity {
                id: EntityId(7),
                type_id: TypeId(1),
                position: Position::new(0, 0),
                health_fraction: 1.0,
                is_elite: false,
            }],
            corpses: Vec::new(),
            objects: Vec::new(),
            actor: ActorState {
                position: Position::new(0, 0),
                health_fraction: 1.0,
                area: AreaKind::Sanctum,
            },
            blocked: BTreeSet::new(),
        };
        assert!(snapshot.find_entity(EntityId::NONE).is_none());
        assert!(snapshot.find_entity(EntityId(7)).is_some());
    }

    #[test]
    fn blocked_positions_are_not_walkable() {
        let mut blocked = BTreeSet::new();
        blocked.insert(Position::new(3, 4));
        let snapshot = WorldSnapshot {
            entities: Vec::new(),
            corpses: Vec::new(),
            objects: Vec::new(),
            actor: ActorState {
                position: Position::new(0, 0),
                health_fraction: 1.0,
                area: AreaKind::Sanctum,
            },
            blocked,
        };
        assert!(!snapshot.is_walkable(Position::new(3, 4)));
        assert!(snapshot.is_walkable(Position::new(3, 5)));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!(b.within(a, 5));
        assert!(!b.within(a, 4));
    }
}
