use anyhow::Result;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    entity::Species,
    events::{EventKind, GameEvent},
    rng::StreamRng,
    terrain::ResourceKind,
    world::SimulationState,
};

const FEED_RADIUS: i32 = 3;
const GRASS_HP_PER_LEVEL: i32 = 10;
const GRASS_EXP: i32 = 20;
const WATER_HP: i32 = 10;

/// Herbivores graze, everyone drinks. At most one tile of each kind per
/// animal per tick.
pub struct ConsumptionPhase;

impl ConsumptionPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsumptionPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for ConsumptionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::ConsumeResources
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        _rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        for id in state.repository().individual_ids() {
            let SimulationState {
                repository,
                terrain,
                ..
            } = &mut *state;
            let Some(animal) = repository.individual_mut(id) else {
                continue;
            };
            if animal.species() == Species::Herbivore
                && terrain
                    .consume_tile_near(ResourceKind::Grass, animal.position, FEED_RADIUS)
                    .is_some()
            {
                animal.hp += GRASS_HP_PER_LEVEL * animal.level;
                animal.exp += GRASS_EXP;
                ctx.events.publish(GameEvent::new(
                    EventKind::ResourceConsumption,
                    format!("Herbivore {id} ate grass."),
                ));
            }
            if terrain
                .consume_tile_near(ResourceKind::Water, animal.position, FEED_RADIUS)
                .is_some()
            {
                animal.hp += WATER_HP;
                ctx.events.publish(GameEvent::new(
                    EventKind::ResourceConsumption,
                    format!("Animal {id} drank water."),
                ));
            }
        }
        Ok(())
    }
}
