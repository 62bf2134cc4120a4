use anyhow::Result;
use rand::seq::SliceRandom;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    entity::{Entity, Position},
    events::{EventKind, GameEvent},
    rng::StreamRng,
    world::SimulationState,
};

/// Moves every entity that is not inside a pack. Packs move as a whole and
/// carry their members along.
pub struct MovementPhase;

impl MovementPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MovementPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for MovementPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Move
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        for id in state.repository().ids() {
            let repository = state.repository();
            // Anything listed by a pack, nested packs included, rides along.
            if repository.parent_of(id).is_some() {
                continue;
            }
            let leaves = match repository.get(id) {
                None => continue,
                Some(Entity::Individual(_)) => Vec::new(),
                Some(Entity::Pack(_)) => {
                    let leaves = repository.leaf_members(id);
                    if leaves.is_empty() {
                        continue;
                    }
                    leaves
                }
            };
            let Some(view) = repository.view(id) else {
                continue;
            };
            let target = if leaves.is_empty() {
                state
                    .terrain()
                    .move_within_range(view.position, view.range, rng)
            } else {
                // Only centers that keep every animal of the pack on the map.
                let leaf_positions: Vec<Position> = leaves
                    .iter()
                    .filter_map(|leaf| repository.position(*leaf))
                    .collect();
                let candidates: Vec<Position> = state
                    .terrain()
                    .reachable_positions(view.position, view.range)
                    .into_iter()
                    .filter(|to| {
                        let (dx, dy) = (to.x - view.position.x, to.y - view.position.y);
                        leaf_positions
                            .iter()
                            .all(|p| state.terrain().in_bounds(p.translated(dx, dy)))
                    })
                    .collect();
                candidates.choose(rng).copied()
            };
            let Some(target) = target else {
                tracing::debug!(%id, "no reachable free tile");
                continue;
            };
            state.repository_mut().set_position(id, target);
            ctx.events.publish(GameEvent::new(
                EventKind::Move,
                format!("Animal {id} moved to {target}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Sex, Species};
    use crate::phases::testing::{empty_state, place, run_phase};
    use crate::world::PackTarget;

    #[test]
    fn individuals_stay_within_species_range() {
        let mut state = empty_state();
        let herb = place(&mut state, Species::Herbivore, Sex::Male, (10, 10), 50, 0, 1);
        let carn = place(&mut state, Species::Carnivore, Sex::Male, (2, 2), 50, 0, 1);

        let lines = run_phase(&mut MovementPhase::new(), &mut state, 0);

        assert_eq!(lines.len(), 2);
        let herb_at = state.repository().position(herb).unwrap();
        let carn_at = state.repository().position(carn).unwrap();
        assert!(herb_at.manhattan(Position::new(10, 10)) <= 3);
        assert!(carn_at.manhattan(Position::new(2, 2)) <= 5);
        assert!(lines[0].starts_with(&format!("Animal {herb} moved to (")));
    }

    #[test]
    fn pack_members_move_only_with_their_pack() {
        let mut state = empty_state();
        let a = place(&mut state, Species::Carnivore, Sex::Male, (8, 8), 50, 0, 1);
        let b = place(&mut state, Species::Carnivore, Sex::Female, (10, 8), 50, 0, 1);
        let pack = state.group_into_pack(&[a, b], PackTarget::New).unwrap().pack;
        let before_a = state.repository().position(a).unwrap();
        let before_b = state.repository().position(b).unwrap();

        let lines = run_phase(&mut MovementPhase::new(), &mut state, 0);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("Animal {pack} moved to")));
        let after_a = state.repository().position(a).unwrap();
        let after_b = state.repository().position(b).unwrap();
        assert_eq!(
            (after_a.x - before_a.x, after_a.y - before_a.y),
            (after_b.x - before_b.x, after_b.y - before_b.y)
        );
        assert!(state.terrain().in_bounds(after_a));
        assert!(state.terrain().in_bounds(after_b));
    }

    #[test]
    fn nested_pack_moves_once_with_its_parent() {
        let mut state = empty_state();
        let a = place(&mut state, Species::Carnivore, Sex::Male, (8, 8), 50, 0, 1);
        let b = place(&mut state, Species::Carnivore, Sex::Female, (10, 8), 50, 0, 1);
        let c = place(&mut state, Species::Herbivore, Sex::Female, (9, 12), 50, 0, 1);
        let inner = state.group_into_pack(&[a, b], PackTarget::New).unwrap().pack;
        let outer = state.group_into_pack(&[inner, c], PackTarget::New).unwrap().pack;
        let before: Vec<Position> = [a, b, c]
            .iter()
            .map(|id| state.repository().position(*id).unwrap())
            .collect();

        let lines = run_phase(&mut MovementPhase::new(), &mut state, 0);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("Animal {outer} moved to")));
        let shifts: Vec<(i32, i32)> = [a, b, c]
            .iter()
            .zip(&before)
            .map(|(id, old)| {
                let new = state.repository().position(*id).unwrap();
                assert!(state.terrain().in_bounds(new));
                (new.x - old.x, new.y - old.y)
            })
            .collect();
        assert!(shifts.iter().all(|shift| *shift == shifts[0]));
    }

    #[test]
    fn empty_packs_do_not_move() {
        let mut state = empty_state();
        let a = place(&mut state, Species::Herbivore, Sex::Male, (1, 1), 50, 0, 1);
        state.group_into_pack(&[a], PackTarget::New).unwrap();
        state.delete_entity(a).unwrap();
        assert!(run_phase(&mut MovementPhase::new(), &mut state, 0).is_empty());
    }
}
