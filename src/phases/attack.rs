use anyhow::Result;

use crate::{
    engine::{Phase, PhaseContext, PhaseKind},
    entity::Species,
    events::{EventKind, GameEvent},
    rng::StreamRng,
    world::SimulationState,
};

const DAMAGE_PER_LEVEL: i32 = 20;
const ATTACK_EXP: i32 = 40;
const LIFESTEAL: i32 = 40;

/// Every carnivore hits every nearby individual outside its own pack.
pub struct AttackPhase;

impl AttackPhase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AttackPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl Phase for AttackPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Attack
    }

    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        _rng: &mut StreamRng<'_>,
    ) -> Result<()> {
        let radius = ctx.rules.attack_radius;
        let ids = state.repository().individual_ids();
        for &attacker_id in &ids {
            let Some(attacker) = state.repository().individual(attacker_id) else {
                continue;
            };
            if attacker.species() != Species::Carnivore {
                continue;
            }
            let (origin, pack, damage) = (
                attacker.position,
                attacker.pack(),
                attacker.level * DAMAGE_PER_LEVEL,
            );
            for &target_id in &ids {
                if target_id == attacker_id {
                    continue;
                }
                let Some(target) = state.repository().individual(target_id) else {
                    continue;
                };
                let same_pack = pack.is_some() && pack == target.pack();
                if same_pack || !origin.is_near(target.position, radius) {
                    continue;
                }
                if let Some(target) = state.repository_mut().individual_mut(target_id) {
                    target.hp -= damage;
                }
                if let Some(attacker) = state.repository_mut().individual_mut(attacker_id) {
                    attacker.exp += ATTACK_EXP;
                    attacker.hp += LIFESTEAL;
                }
                ctx.events.publish(GameEvent::new(
                    EventKind::Attack,
                    format!("Carnivore {attacker_id} attacked {target_id} at {origin}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Sex;
    use crate::phases::testing::{empty_state, place, run_phase};
    use crate::world::PackTarget;

    #[test]
    fn adjacent_carnivore_bites_herbivore() {
        let mut state = empty_state();
        let carn = place(&mut state, Species::Carnivore, Sex::Male, (5, 5), 100, 0, 2);
        let herb = place(&mut state, Species::Herbivore, Sex::Female, (5, 6), 50, 0, 1);

        let lines = run_phase(&mut AttackPhase::new(), &mut state, 1);

        let herb = state.repository().individual(herb).unwrap();
        let carn_after = state.repository().individual(carn).unwrap();
        assert_eq!(herb.hp, 10);
        assert_eq!(carn_after.hp, 140);
        assert_eq!(carn_after.exp, 40);
        assert_eq!(lines, vec![format!("Carnivore {carn} attacked {} at (5,5)", herb.id())]);
    }

    #[test]
    fn herbivores_never_attack_and_distance_matters() {
        let mut state = empty_state();
        let carn = place(&mut state, Species::Carnivore, Sex::Male, (0, 0), 100, 0, 1);
        let herb = place(&mut state, Species::Herbivore, Sex::Male, (2, 2), 50, 0, 1);

        assert!(run_phase(&mut AttackPhase::new(), &mut state, 1).is_empty());
        assert_eq!(state.repository().individual(carn).unwrap().hp, 100);
        assert_eq!(state.repository().individual(herb).unwrap().hp, 50);
    }

    #[test]
    fn carnivores_fight_each_other_unless_packed() {
        let mut state = empty_state();
        let a = place(&mut state, Species::Carnivore, Sex::Male, (3, 3), 100, 0, 1);
        let b = place(&mut state, Species::Carnivore, Sex::Female, (4, 4), 100, 0, 1);

        let lines = run_phase(&mut AttackPhase::new(), &mut state, 1);
        assert_eq!(lines.len(), 2);
        // Each lost 20 and gained 40.
        assert_eq!(state.repository().individual(a).unwrap().hp, 120);
        assert_eq!(state.repository().individual(b).unwrap().hp, 120);

        state.group_into_pack(&[a, b], PackTarget::New).unwrap();
        assert!(run_phase(&mut AttackPhase::new(), &mut state, 2).is_empty());
    }
}
