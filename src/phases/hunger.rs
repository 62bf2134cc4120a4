use std::sync::mpsc;

use anyhow::Result;
use rayon::prelude::*;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    events::{EventKind, GameEvent},
    rng::StreamRng,
    world::SimulationState,
};

/// Drains every individual's hp by its species' hunger loss. The per-animal
/// work fans out across rayon workers; events are queued on a channel and
/// published once the workers have joined.
pub struct HungerPhase;

impl HungerPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HungerPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for HungerPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Hunger
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        _rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        state
            .repository_mut()
            .par_individuals_mut()
            .for_each_with(tx, |tx, animal| {
                let loss = animal.species().hunger_loss();
                animal.hp -= loss;
                // The receiver outlives the parallel section.
                let _ = tx.send(GameEvent::new(
                    EventKind::Hunger,
                    format!("Animal {} lost {loss} HP due to hunger.", animal.id()),
                ));
            });
        ctx.events.publish_all(rx.try_iter());
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
    fn loss_depends_on_species() {
        let mut state = empty_state();
        let herb = place(&mut state, Species::Herbivore, Sex::Male, (1, 1), 50, 0, 1);
        let carn = place(&mut state, Species::Carnivore, Sex::Male, (9, 9), 50, 0, 1);

        let mut lines = run_phase(&mut HungerPhase::new(), &mut state, 1);
        lines.sort();

        assert_eq!(state.repository().individual(herb).unwrap().hp, 45);
        assert_eq!(state.repository().individual(carn).unwrap().hp, 30);
        let mut expected = vec![
            format!("Animal {herb} lost 5 HP due to hunger."),
            format!("Animal {carn} lost 20 HP due to hunger."),
        ];
        expected.sort();
        assert_eq!(lines, expected);
    }

    #[test]
    fn every_individual_is_hit_exactly_once() {
        let mut state = empty_state();
        let ids: Vec<_> = (0..40)
            .map(|i| place(&mut state, Species::Herbivore, Sex::Female, (i % 20, i / 20), 100, 0, 1))
            .collect();
        state.group_into_pack(&ids[..5], PackTarget::New).unwrap();

        let lines = run_phase(&mut HungerPhase::new(), &mut state, 1);

        assert_eq!(lines.len(), 40);
        assert!(state.repository().all_except_packs().all(|a| a.hp == 95));
    }
}
