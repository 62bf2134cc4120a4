use anyhow::Result;
use rayon::prelude::*;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    entity::EntityId,
    events::{EventKind, GameEvent},
    rng::StreamRng,
    world::SimulationState,
};

/// Removes every individual whose hp has dropped to zero or below, in
/// ascending ID order.
pub struct DeathPhase;

impl DeathPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeathPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for DeathPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::CheckDeaths
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        _rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        let mut dead: Vec<EntityId> = state
            .repository()
            .par_individuals()
            .filter(|animal| animal.hp <= 0)
            .map(|animal| animal.id())
            .collect();
        dead.sort_unstable();
        for id in dead {
            if state.repository_mut().remove(id).is_some() {
                ctx.events
                    .publish(GameEvent::new(EventKind::Death, format!("Animal {id} died.")));
            }
        }
        Ok(())
    }
}
