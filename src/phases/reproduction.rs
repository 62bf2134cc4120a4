use std::collections::HashSet;

use anyhow::Result;
use rand::Rng;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    entity::{EntityId, Sex},
    events::{EventKind, GameEvent},
    factory::AnimalSpec,
    rng::StreamRng,
    world::SimulationState,
};

const MATING_RADIUS: i32 = 3;
const MAX_LITTER: u32 = 5;
const PARENT_EXP: i32 = 50;

/// Pairs up nearby animals of the same species and opposite sex. Each
/// unordered pair breeds at most once per tick.
pub struct ReproductionPhase;

impl ReproductionPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReproductionPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for ReproductionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Reproduce
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        // Newborns join the population but not this tick's pairing.
        let parents = state.repository().individual_ids();
        let mut bred: HashSet<(EntityId, EntityId)> = HashSet::new();

        for &a in &parents {
            for &b in &parents {
                if a == b || bred.contains(&(a, b)) || bred.contains(&(b, a)) {
                    continue;
                }
                let repo = state.repository();
                let (Some(first), Some(second)) = (repo.individual(a), repo.individual(b)) else {
                    continue;
                };
                if first.species() != second.species()
                    || first.sex() == second.sex()
                    || !first.position.is_near(second.position, MATING_RADIUS)
                {
                    continue;
                }
                bred.insert((a, b));
                let (species, nest) = (first.species(), first.position);

                let litter = rng.gen_range(1..=MAX_LITTER);
                let mut born = 0;
                for _ in 0..litter {
                    let sex = Sex::random(rng);
                    match state.spawn_individual(species, AnimalSpec::newborn(nest, sex)) {
                        Ok(_) => born += 1,
                        Err(err) => tracing::warn!(%a, %b, %err, "newborn rejected"),
                    }
                }
                for parent in [a, b] {
                    if let Some(parent) = state.repository_mut().individual_mut(parent) {
                        parent.exp += PARENT_EXP;
                    }
                }
                ctx.events.publish(GameEvent::new(
                    EventKind::Reproduction,
                    format!("{a} and {b} reproduced and created {born} children."),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Position, Species};
    use crate::phases::testing::{empty_state, place, run_phase};

    #[test]
    fn a_pair_breeds_once_per_tick() {
        let mut state = empty_state();
        let male = place(&mut state, Species::Herbivore, Sex::Male, (5, 5), 50, 0, 1);
        let female = place(&mut state, Species::Herbivore, Sex::Female, (7, 7), 50, 0, 1);

        let lines = run_phase(&mut ReproductionPhase::new(), &mut state, 1);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("{male} and {female} reproduced and created ")));
        for parent in [male, female] {
            assert_eq!(state.repository().individual(parent).unwrap().exp, 50);
        }
        let children: Vec<_> = state
            .repository()
            .all_except_packs()
            .filter(|a| a.id() != male && a.id() != female)
            .collect();
        assert!((1..=5).contains(&children.len()));
        for child in children {
            assert_eq!(child.position, Position::new(5, 5));
            assert_eq!((child.hp, child.exp, child.level), (0, 100, 1));
            assert_eq!(child.species(), Species::Herbivore);
        }
    }

    #[test]
    fn mismatched_pairs_do_not_breed() {
        let mut state = empty_state();
        place(&mut state, Species::Herbivore, Sex::Male, (5, 5), 50, 0, 1);
        place(&mut state, Species::Herbivore, Sex::Male, (5, 6), 50, 0, 1);
        place(&mut state, Species::Carnivore, Sex::Female, (6, 5), 50, 0, 1);
        place(&mut state, Species::Carnivore, Sex::Male, (15, 15), 50, 0, 1);

        assert!(run_phase(&mut ReproductionPhase::new(), &mut state, 1).is_empty());
        assert_eq!(state.population(), 4);
    }

    #[test]
    fn one_animal_can_breed_with_several_partners() {
        let mut state = empty_state();
        place(&mut state, Species::Carnivore, Sex::Female, (5, 5), 50, 0, 1);
        place(&mut state, Species::Carnivore, Sex::Male, (4, 4), 50, 0, 1);
        place(&mut state, Species::Carnivore, Sex::Male, (6, 6), 50, 0, 1);

        let lines = run_phase(&mut ReproductionPhase::new(), &mut state, 1);

        assert_eq!(lines.len(), 2);
    }
}
