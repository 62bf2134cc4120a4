use anyhow::Result;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    events::{EventKind, GameEvent},
    rng::StreamRng,
    terrain::ResourceKind,
    world::SimulationState,
};

/// Splits the per-cycle budget between grass and water. Grass takes the
/// slots whose parity matches the tick's.
pub fn split_budget(budget: usize, tick: u64) -> (usize, usize) {
    let tick_even = tick % 2 == 0;
    let grass = (0..budget).filter(|i| (i % 2 == 0) == tick_even).count();
    (grass, budget - grass)
}

pub struct RespawnPhase;

impl RespawnPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RespawnPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for RespawnPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::RespawnResources
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        let (grass, water) = split_budget(ctx.rules.respawn_per_cycle, ctx.tick);
        let grass = state.spawn_resources(ResourceKind::Grass, grass, rng);
        let water = state.spawn_resources(ResourceKind::Water, water, rng);
        ctx.events.publish(GameEvent::new(
            EventKind::ResourceRespawn,
            format!("Respawned {grass} grass and {water} water."),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::testing::{empty_state, run_phase};

    #[test]
    fn budget_alternates_with_tick_parity() {
        assert_eq!(split_budget(6, 2), (3, 3));
        assert_eq!(split_budget(5, 2), (3, 2));
        assert_eq!(split_budget(5, 3), (2, 3));
        assert_eq!(split_budget(1, 1), (0, 1));
        assert_eq!(split_budget(0, 4), (0, 0));
    }

    #[test]
    fn respawn_adds_tiles_and_reports_once() {
        let mut state = empty_state();
        let lines = run_phase(&mut RespawnPhase::new(), &mut state, 1);
        assert_eq!(lines, vec!["Respawned 3 grass and 3 water.".to_string()]);
        assert_eq!(state.terrain().tiles(ResourceKind::Grass).len(), 3);
        assert_eq!(state.terrain().tiles(ResourceKind::Water).len(), 3);
    }
}
