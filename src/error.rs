use thiserror::Error;

use crate::entity::{EntityId, Position};

/// Rejections raised by the species factory before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown species '{0}', expected 'carnivore' or 'herbivore'")]
    UnknownSpecies(String),
    #[error("unknown sex '{0}', expected 'm' or 'f'")]
    UnknownSex(String),
    #[error("position {position} lies outside the {width}x{height} map")]
    OutOfBounds {
        position: Position,
        width: i32,
        height: i32,
    },
    #[error("hp must be non-negative, got {0}")]
    NegativeHp(i32),
    #[error("exp must be non-negative, got {0}")]
    NegativeExp(i32),
    #[error("level must be at least 1, got {0}")]
    LevelBelowOne(i32),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no entity with id {0}")]
    NotFound(EntityId),
    #[error("entity {0} is not a pack")]
    NotAPack(EntityId),
    #[error("none of the requested ids refer to an existing animal")]
    NoValidMembers,
    #[error("no free tile left on the map")]
    NoFreeTile,
    #[error("pack invariant violated: {0}")]
    Invariant(String),
}

pub type SimResult<T> = Result<T, SimError>;
