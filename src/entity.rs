//! Entity model: individual animals and the packs that group them.
//!
//! Both variants live in one ID namespace inside the [`Repository`]. An
//! individual only stores the ID of the pack it belongs to, and a pack only
//! stores the IDs of its members, so neither side owns the other.
//!
//! [`Repository`]: crate::repository::Repository

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(EntityId)
    }
}

/// Grid coordinate. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `max(|dx|, |dy|)`, the 8-neighbourhood distance.
    pub fn chebyshev(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// True when `other` is within `radius` in Chebyshev distance. The radius
    /// never shrinks below one tile.
    pub fn is_near(self, other: Position, radius: i32) -> bool {
        self.chebyshev(other) <= radius.max(1)
    }

    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Sex::Male
        } else {
            Sex::Female
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("M"),
            Sex::Female => f.write_str("F"),
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Sex::Male),
            "f" | "female" => Ok(Sex::Female),
            other => Err(ValidationError::UnknownSex(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    /// Movement range, fixed per species.
    pub fn range(self) -> i32 {
        match self {
            Species::Herbivore => 3,
            Species::Carnivore => 5,
        }
    }

    /// HP lost every tick to hunger.
    pub fn hunger_loss(self) -> i32 {
        match self {
            Species::Herbivore => 5,
            Species::Carnivore => 20,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            Species::Herbivore => EntityKind::Herbivore,
            Species::Carnivore => EntityKind::Carnivore,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

impl FromStr for Species {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "herbivore" => Ok(Species::Herbivore),
            "carnivore" => Ok(Species::Carnivore),
            other => Err(ValidationError::UnknownSpecies(other.to_string())),
        }
    }
}

/// Type tag used by repository queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Herbivore,
    Carnivore,
    Pack,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Herbivore => "Herbivore",
            EntityKind::Carnivore => "Carnivore",
            EntityKind::Pack => "Pack",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pack" => Ok(EntityKind::Pack),
            other => other.parse::<Species>().map(Species::kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    id: EntityId,
    species: Species,
    sex: Sex,
    pub position: Position,
    pub hp: i32,
    pub exp: i32,
    pub level: i32,
    pack: Option<EntityId>,
}

impl Individual {
    pub(crate) fn new(
        id: EntityId,
        species: Species,
        sex: Sex,
        position: Position,
        hp: i32,
        exp: i32,
        level: i32,
    ) -> Self {
        Self {
            id,
            species,
            sex,
            position,
            hp,
            exp,
            level,
            pack: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn range(&self) -> i32 {
        self.species.range()
    }

    pub fn pack(&self) -> Option<EntityId> {
        self.pack
    }

    pub(crate) fn set_pack(&mut self, pack: Option<EntityId>) {
        self.pack = pack;
    }

    /// Applies level-ups while at least 100 exp is banked and returns the
    /// level reached after each one.
    pub fn level_up(&mut self) -> Vec<i32> {
        let mut reached = Vec::new();
        while self.exp >= 100 {
            self.level += 1;
            self.exp -= 100;
            self.hp += 20;
            reached.push(self.level);
        }
        reached
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    id: EntityId,
    members: Vec<EntityId>,
}

impl Pack {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn add_member(&mut self, id: EntityId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
    }

    pub(crate) fn remove_member(&mut self, id: EntityId) {
        self.members.retain(|member| *member != id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Individual(Individual),
    Pack(Pack),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Individual(animal) => animal.id(),
            Entity::Pack(pack) => pack.id(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Individual(animal) => animal.species().kind(),
            Entity::Pack(_) => EntityKind::Pack,
        }
    }

    /// Pack membership. Always `None` for a pack, even one nested in another
    /// pack's member list; see `Repository::parent_of`.
    pub fn pack(&self) -> Option<EntityId> {
        match self {
            Entity::Individual(animal) => animal.pack(),
            Entity::Pack(_) => None,
        }
    }

    pub fn is_pack(&self) -> bool {
        matches!(self, Entity::Pack(_))
    }

    pub fn as_individual(&self) -> Option<&Individual> {
        match self {
            Entity::Individual(animal) => Some(animal),
            Entity::Pack(_) => None,
        }
    }

    pub fn as_individual_mut(&mut self) -> Option<&mut Individual> {
        match self {
            Entity::Individual(animal) => Some(animal),
            Entity::Pack(_) => None,
        }
    }

    pub fn as_pack(&self) -> Option<&Pack> {
        match self {
            Entity::Pack(pack) => Some(pack),
            Entity::Individual(_) => None,
        }
    }

    pub fn as_pack_mut(&mut self) -> Option<&mut Pack> {
        match self {
            Entity::Pack(pack) => Some(pack),
            Entity::Individual(_) => None,
        }
    }
}

impl From<Individual> for Entity {
    fn from(value: Individual) -> Self {
        Entity::Individual(value)
    }
}

impl From<Pack> for Entity {
    fn from(value: Pack) -> Self {
        Entity::Pack(value)
    }
}
