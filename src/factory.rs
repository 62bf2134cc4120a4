//! Species factory: validates requested stats and assembles individuals.

use crate::entity::{EntityId, Individual, Position, Sex, Species};
use crate::error::ValidationError;
use crate::terrain::Terrain;

/// Requested starting state for a new individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimalSpec {
    pub position: Position,
    pub sex: Sex,
    pub hp: i32,
    pub exp: i32,
    pub level: i32,
}

impl AnimalSpec {
    /// Stats for animals created or spawned by the player.
    pub fn adult(position: Position, sex: Sex) -> Self {
        Self {
            position,
            sex,
            hp: 100,
            exp: 0,
            level: 1,
        }
    }

    /// Birth stats. Newborns start at zero hp with enough exp banked for
    /// their first level-up.
    pub fn newborn(position: Position, sex: Sex) -> Self {
        Self {
            position,
            sex,
            hp: 0,
            exp: 100,
            level: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimalFactory {
    species: Species,
}

impl AnimalFactory {
    pub fn new(species: Species) -> Self {
        Self { species }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn validate(&self, spec: &AnimalSpec, terrain: &Terrain) -> Result<(), ValidationError> {
        if !terrain.in_bounds(spec.position) {
            return Err(ValidationError::OutOfBounds {
                position: spec.position,
                width: terrain.width(),
                height: terrain.height(),
            });
        }
        if spec.hp < 0 {
            return Err(ValidationError::NegativeHp(spec.hp));
        }
        if spec.exp < 0 {
            return Err(ValidationError::NegativeExp(spec.exp));
        }
        if spec.level < 1 {
            return Err(ValidationError::LevelBelowOne(spec.level));
        }
        Ok(())
    }

    /// Assembles an individual under an already allocated ID. Callers run
    /// [`AnimalFactory::validate`] first.
    pub(crate) fn assemble(&self, id: EntityId, spec: AnimalSpec) -> Individual {
        Individual::new(
            id,
            self.species,
            spec.sex,
            spec.position,
            spec.hp,
            spec.exp,
            spec.level,
        )
    }
}
