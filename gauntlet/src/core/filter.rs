//! Threat filter policy.
//!
//! A pure selection rule deciding which nearby hostiles are legitimate
//! engagement or clearing targets. The same filter shapes movement policies
//! (what to clear while traveling) and the kill loop (what counts as "still
//! alive" when re-scanning).

use crate::core::types::{Entity, TypeId, WorldSnapshot};

/// Filter over candidate hostile entities.
///
/// Entities on unwalkable positions are always excluded. In elite-only mode,
/// only marked-elite entities and guardian archetypes pass, for builds that
/// prefer focused engagement over full clearing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatFilter {
    pub elite_only: bool,
    /// Guardian archetypes of the active run; always legitimate targets.
    pub guardian_types: Vec<TypeId>,
}

impl ThreatFilter {
    /// Filter that keeps every reachable hostile.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn focused(guardian_types: Vec<TypeId>) -> Self {
        Self {
            elite_only: true,
            guardian_types,
        }
    }

    /// Apply the filter to `candidates` against `snapshot` walkability.
    ///
    /// Safe to call with an empty list; returns an empty list.
    pub fn apply(&self, snapshot: &WorldSnapshot, candidates: &[Entity]) -> Vec<Entity> {
        candidates
            .iter()
            .filter(|entity| snapshot.is_walkable(entity.position))
            .filter(|entity| {
                if !self.elite_only {
                    return true;
                }
                entity.is_elite || self.guardian_types.contains(&entity.type_id)
            })
            .cloned()
            .collect()
    }

    /// Filter the snapshot's live entities.
    pub fn live(&self, snapshot: &WorldSnapshot) -> Vec<Entity> {
        self.apply(snapshot, &snapshot.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{elite, entity, snapshot_with_entities};
    use crate::core::types::Position;

    #[test]
    fn empty_candidates_yield_empty_result() {
        let snapshot = snapshot_with_entities(Vec::new());
        let filter = ThreatFilter::permissive();
        assert!(filter.apply(&snapshot, &[]).is_empty());
    }

    #[test]
    fn elite_only_keeps_exactly_the_elite() {
        let candidates = vec![
            entity(1, TypeId(10), Position::new(0, 1)),
            entity(2, TypeId(10), Position::new(0, 2)),
            elite(3, TypeId(11), Position::new(0, 3)),
        ];
        let snapshot = snapshot_with_entities(candidates.clone());
        let filter = ThreatFilter::focused(Vec::new());

        let kept = filter.apply(&snapshot, &candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.0, 3);
    }

    #[test]
    fn elite_only_also_keeps_guardian_archetypes() {
        let candidates = vec![
            entity(1, TypeId(10), Position::new(0, 1)),
            entity(2, TypeId(77), Position::new(0, 2)),
        ];
        let snapshot = snapshot_with_entities(candidates.clone());
        let filter = ThreatFilter::focused(vec![TypeId(77)]);

        let kept = filter.apply(&snapshot, &candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].type_id, TypeId(77));
    }

    #[test]
    fn unwalkable_positions_are_dropped() {
        let unreachable = Position::new(9, 9);
        let candidates = vec![
            entity(1, TypeId(10), Position::new(0, 1)),
            entity(2, TypeId(10), unreachable),
        ];
        let mut snapshot = snapshot_with_entities(candidates.clone());
        snapshot.blocked.insert(unreachable);

        let kept = ThreatFilter::permissive().apply(&snapshot, &candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.0, 1);
    }
}
