use std::sync::mpsc;

use anyhow::Result;
use rayon::prelude::*;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    events::{EventKind, GameEvent},
    rng::StreamRng,
    world::SimulationState,
};

pub struct LevelingPhase;

impl LevelingPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LevelingPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for LevelingPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::AssignLevels
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
                for level in animal.level_up() {
                    let _ = tx.send(GameEvent::new(
                        EventKind::LevelUp,
                        format!("Animal {} leveled up to {level}.", animal.id()),
                    ));
                }
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

    #[test]
    fn banked_exp_buys_several_levels_at_once() {
        let mut state = empty_state();
        let id = place(&mut state, Species::Carnivore, Sex::Male, (4, 4), 30, 250, 1);

        let lines = run_phase(&mut LevelingPhase::new(), &mut state, 1);

        let animal = state.repository().individual(id).unwrap();
        assert_eq!((animal.level, animal.exp, animal.hp), (3, 50, 70));
        assert_eq!(
            lines,
            vec![
                format!("Animal {id} leveled up to 2."),
                format!("Animal {id} leveled up to 3."),
            ]
        );
    }

    #[test]
    fn below_threshold_nothing_happens() {
        let mut state = empty_state();
        place(&mut state, Species::Herbivore, Sex::Female, (4, 4), 30, 99, 1);
        assert!(run_phase(&mut LevelingPhase::new(), &mut state, 1).is_empty());
    }
}
