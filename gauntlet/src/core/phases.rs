//! The fixed objective graph for a sanctum run.
//!
//! A run walks three warded guardian phases in a fixed order, then the
//! terminal encounter. The graph is static per run type; nothing here is
//! synthesized at runtime.

use serde::Serialize;

use crate::core::types::{ObjectId, Position, TypeId};

/// Warding stones gating the guardian phases.
pub const WARD_ONE: ObjectId = ObjectId(401);
pub const WARD_TWO: ObjectId = ObjectId(402);
pub const WARD_THREE: ObjectId = ObjectId(403);
pub const WARD_FOUR: ObjectId = ObjectId(404);
pub const WARD_FIVE: ObjectId = ObjectId(405);

/// Guardian archetypes.
pub const TEMPEST: TypeId = TypeId(301);
pub const REVENANT: TypeId = TypeId(302);
pub const PLAGUEBEARER: TypeId = TypeId(303);
pub const OVERLORD: TypeId = TypeId(310);

/// Where the terminal guardian manifests.
pub const SANCTUM_CENTER: Position = Position::new(6192, 4094);
/// Waypoint on the path toward the first guardian's ward group.
pub const FIRST_WARD_APPROACH: Position = Position::new(6132, 4092);
/// Known sticking spot next to ward three; approach from the side instead.
const WARD_THREE_APPROACH: Position = Position::new(6168, 3958);

/// A guardian that must be confirmed dead to complete its phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardianSpec {
    pub name: &'static str,
    pub archetype: TypeId,
    /// Non-detection of this guardian terminates the hunt successfully with a
    /// diagnostic instead of failing the run. Exactly one archetype carries
    /// this flag; the asymmetry is deliberate and encoded here rather than
    /// inferred.
    pub tolerant: bool,
}

/// One gating object a phase must consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateSpec {
    pub object: ObjectId,
    /// Secondary position to move to after reaching the object, for objects
    /// whose own position is a known sticking spot.
    pub approach: Option<Position>,
    /// Refresh buffs before interacting with this object.
    pub buff_before: bool,
    /// Consuming this object is what makes the phase guardian manifest; the
    /// hunt runs immediately after it resolves, before any further gate.
    pub spawns_guardian: bool,
}

impl GateSpec {
    fn plain(object: ObjectId) -> Self {
        Self {
            object,
            approach: None,
            buff_before: false,
            spawns_guardian: false,
        }
    }
}

/// One node of the objective graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: &'static str,
    /// Gating objects, consumed strictly in order.
    pub gates: Vec<GateSpec>,
    /// Guardian unlocked by this phase's gates, if any.
    pub guardian: Option<GuardianSpec>,
}

/// The guardian phases of a sanctum run, in execution order.
pub fn objective_graph() -> Vec<Phase> {
    vec![
        Phase {
            name: "tempest",
            gates: vec![GateSpec::plain(WARD_FOUR), GateSpec::plain(WARD_FIVE)],
            guardian: Some(GuardianSpec {
                name: "Tempest",
                archetype: TEMPEST,
                tolerant: false,
            }),
        },
        Phase {
            name: "revenant",
            gates: vec![GateSpec {
                object: WARD_THREE,
                approach: Some(WARD_THREE_APPROACH),
                buff_before: false,
                spawns_guardian: false,
            }],
            // The Revenant is not reliably detectable; absence is accepted.
            guardian: Some(GuardianSpec {
                name: "Revenant",
                archetype: REVENANT,
                tolerant: true,
            }),
        },
        Phase {
            name: "plaguebearer",
            gates: vec![
                GateSpec {
                    object: WARD_ONE,
                    approach: None,
                    buff_before: true,
                    spawns_guardian: true,
                },
                GateSpec::plain(WARD_TWO),
            ],
            guardian: Some(GuardianSpec {
                name: "Plaguebearer",
                archetype: PLAGUEBEARER,
                tolerant: false,
            }),
        },
    ]
}

/// The terminal encounter at the sanctum center.
pub fn terminal_guardian() -> GuardianSpec {
    GuardianSpec {
        name: "Overlord",
        archetype: OVERLORD,
        tolerant: false,
    }
}

/// All guardian archetypes of the run, terminal included.
pub fn guardian_types(phases: &[Phase]) -> Vec<TypeId> {
    let mut types: Vec<TypeId> = phases
        .iter()
        .filter_map(|phase| phase.guardian.as_ref())
        .map(|guardian| guardian.archetype)
        .collect();
    types.push(terminal_guardian().archetype);
    types
}

/// Run-wide clearing behavior requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Engage only what the objective requires; travel with an elite-focused
    /// threat filter.
    ObjectiveOnly,
    /// Clear everything reachable along the way.
    FullClear,
}

/// Actor capabilities resolved once at run start.
///
/// Phase logic receives these as plain data instead of branching on the
/// character implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_teleport: bool,
    pub is_leveling_build: bool,
}

/// Caller-supplied run-mode flags; read-only input to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub mode: RunMode,
    /// Stage directly at the sanctum center instead of fighting toward the
    /// first ward group.
    pub start_at_center: bool,
    /// Engage the terminal encounter after the guardian phases.
    pub engage_terminal: bool,
    pub capabilities: Capabilities,
}

impl RunParameters {
    pub fn objective_only() -> Self {
        Self {
            mode: RunMode::ObjectiveOnly,
            start_at_center: false,
            engage_terminal: true,
            capabilities: Capabilities::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_order_is_fixed() {
        let phases = objective_graph();
        let names: Vec<&str> = phases.iter().map(|phase| phase.name).collect();
        assert_eq!(names, vec!["tempest", "revenant", "plaguebearer"]);
    }

    #[test]
    fn exactly_one_guardian_is_tolerant() {
        let tolerant: Vec<&str> = objective_graph()
            .iter()
            .filter_map(|phase| phase.guardian.as_ref())
            .filter(|guardian| guardian.tolerant)
            .map(|guardian| guardian.name)
            .collect();
        assert_eq!(tolerant, vec!["Revenant"]);
        assert!(!terminal_guardian().tolerant);
    }

    #[test]
    fn spawn_gate_precedes_remaining_gates() {
        let phases = objective_graph();
        let plaguebearer = &phases[2];
        assert!(plaguebearer.gates[0].spawns_guardian);
        assert!(!plaguebearer.gates[1].spawns_guardian);
    }

    #[test]
    fn guardian_types_include_terminal() {
        let types = guardian_types(&objective_graph());
        assert_eq!(types, vec![TEMPEST, REVENANT, PLAGUEBEARER, OVERLORD]);
    }
}
