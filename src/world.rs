//! The explicit simulation state threaded through the tick pipeline and the
//! command turn.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::entity::{Entity, EntityId, EntityKind, Pack, Sex, Species};
use crate::error::{SimError, SimResult};
use crate::factory::{AnimalFactory, AnimalSpec};
use crate::repository::{AnimalView, Repository};
use crate::terrain::{ResourceKind, Terrain};

/// Destination of a grouping request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackTarget {
    New,
    Existing(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub pack: EntityId,
    pub created: bool,
    pub added: Vec<EntityId>,
    /// Requested IDs that matched nothing and were skipped.
    pub missing: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackListing {
    pub pack: AnimalView,
    pub members: Vec<AnimalView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapSummary {
    pub width: i32,
    pub height: i32,
    pub water: usize,
    pub grass: usize,
    pub obstacles: usize,
    pub animals: usize,
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    next_entity: u64,
    tick: u64,
    pub(crate) repository: Repository,
    pub(crate) terrain: Terrain,
}

impl SimulationState {
    /// IDs start at 1; 0 never names an entity.
    pub fn new(terrain: Terrain) -> Self {
        Self {
            next_entity: 1,
            tick: 0,
            repository: Repository::new(),
            terrain,
        }
    }

    /// Reassembles a state from stored parts, checking that every pack link
    /// is symmetric, that nested packs form no cycle and that IDs will not
    /// be reused.
    pub(crate) fn from_parts(
        tick: u64,
        next_entity: u64,
        terrain: Terrain,
        entities: Vec<Entity>,
    ) -> SimResult<Self> {
        let mut repository = Repository::new();
        for entity in entities {
            if entity.id().raw() == 0 || entity.id().raw() >= next_entity {
                return Err(SimError::Invariant(format!(
                    "entity id {} lies outside 1..{next_entity}",
                    entity.id()
                )));
            }
            if repository.contains(entity.id()) {
                return Err(SimError::Invariant(format!(
                    "entity id {} appears twice",
                    entity.id()
                )));
            }
            repository.add(entity);
        }
        for entity in repository.all() {
            match entity {
                Entity::Individual(animal) => {
                    if let Some(pack_id) = animal.pack() {
                        let listed = repository
                            .get(pack_id)
                            .and_then(Entity::as_pack)
                            .is_some_and(|pack| pack.members().contains(&animal.id()));
                        if !listed {
                            return Err(SimError::Invariant(format!(
                                "animal {} claims pack {pack_id} which does not list it",
                                animal.id()
                            )));
                        }
                    }
                }
                Entity::Pack(pack) => {
                    for member in pack.members() {
                        let linked = match repository.get(*member) {
                            Some(Entity::Individual(animal)) => animal.pack() == Some(pack.id()),
                            Some(Entity::Pack(_)) => true,
                            None => false,
                        };
                        if !linked {
                            return Err(SimError::Invariant(format!(
                                "pack {} lists member {member} which is missing or not linked back",
                                pack.id()
                            )));
                        }
                    }
                }
            }
        }
        let mut listed = HashSet::new();
        for pack in repository.all().filter_map(Entity::as_pack) {
            for member in pack.members() {
                if !listed.insert(*member) {
                    return Err(SimError::Invariant(format!(
                        "entity {member} is listed by more than one pack"
                    )));
                }
            }
            if repository.pack_contains(pack.id(), pack.id()) {
                return Err(SimError::Invariant(format!("pack {} contains itself", pack.id())));
            }
        }
        Ok(Self {
            next_entity,
            tick,
            repository,
            terrain,
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn next_entity(&self) -> u64 {
        self.next_entity
    }

    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repository
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn terrain_mut(&mut self) -> &mut Terrain {
        &mut self.terrain
    }

    /// Number of individual animals. Packs are not counted.
    pub fn population(&self) -> usize {
        self.repository.all_except_packs().count()
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId::from_raw(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Validates `spec` through the species factory and registers the new
    /// individual under a fresh ID.
    pub fn spawn_individual(&mut self, species: Species, spec: AnimalSpec) -> SimResult<EntityId> {
        let factory = AnimalFactory::new(species);
        factory.validate(&spec, &self.terrain)?;
        let id = self.allocate();
        self.repository.add(factory.assemble(id, spec));
        tracing::debug!(%id, %species, position = %spec.position, "individual spawned");
        Ok(id)
    }

    /// Creates an adult of `species` on a random free tile.
    pub fn create_individual<R: Rng + ?Sized>(
        &mut self,
        species: Species,
        sex: Sex,
        rng: &mut R,
    ) -> SimResult<EntityId> {
        let position = self
            .terrain
            .random_free_position(rng)
            .ok_or(SimError::NoFreeTile)?;
        self.spawn_individual(species, AnimalSpec::adult(position, sex))
    }

    /// Creates up to `count` adults with random sex. One request places at
    /// most one animal per free tile, and stops early when none is left.
    pub fn spawn_animals<R: Rng + ?Sized>(
        &mut self,
        species: Species,
        count: usize,
        rng: &mut R,
    ) -> Vec<EntityId> {
        let free = self.terrain.free_positions().len();
        if count > free {
            tracing::warn!(%species, requested = count, free, "spawn capped at the free tile count");
        }
        let mut spawned = Vec::new();
        for _ in 0..count.min(free) {
            let sex = Sex::random(rng);
            match self.create_individual(species, sex, rng) {
                Ok(id) => spawned.push(id),
                Err(err) => {
                    tracing::warn!(%species, %err, "spawn stopped early");
                    break;
                }
            }
        }
        spawned
    }

    pub fn spawn_resources<R: Rng + ?Sized>(
        &mut self,
        kind: ResourceKind,
        count: usize,
        rng: &mut R,
    ) -> usize {
        self.terrain.spawn_resource_tiles(kind, count, rng)
    }

    pub fn delete_entity(&mut self, id: EntityId) -> SimResult<Entity> {
        let removed = self.repository.remove(id).ok_or(SimError::NotFound(id))?;
        tracing::info!(%id, kind = %removed.kind(), "entity deleted");
        Ok(removed)
    }

    /// Puts the given animals or packs into a pack, creating it when asked.
    /// Unknown IDs are skipped and reported. A member already in another
    /// pack is moved out of it first. A pack never ends up inside itself.
    pub fn group_into_pack(
        &mut self,
        ids: &[EntityId],
        target: PackTarget,
    ) -> SimResult<GroupOutcome> {
        let mut members = Vec::new();
        let mut missing = Vec::new();
        for &id in ids {
            match self.repository.get(id) {
                None => {
                    tracing::warn!(%id, "no entity with this id, skipping");
                    missing.push(id);
                }
                Some(_) if members.contains(&id) => {}
                Some(_) => members.push(id),
            }
        }
        if members.is_empty() {
            return Err(SimError::NoValidMembers);
        }

        let existing = match target {
            PackTarget::Existing(pack_id) => match self.repository.get(pack_id) {
                None => return Err(SimError::NotFound(pack_id)),
                Some(Entity::Individual(_)) => return Err(SimError::NotAPack(pack_id)),
                Some(Entity::Pack(_)) => Some(pack_id),
            },
            PackTarget::New => None,
        };
        if let Some(pack_id) = existing {
            let cyclic = members
                .iter()
                .find(|&&member| member == pack_id || self.repository.pack_contains(member, pack_id));
            if let Some(member) = cyclic {
                return Err(SimError::Invariant(format!(
                    "pack {pack_id} would contain itself through member {member}"
                )));
            }
        }
        let (pack_id, created) = match existing {
            Some(pack_id) => (pack_id, false),
            None => {
                let pack_id = self.allocate();
                self.repository.add(Pack::new(pack_id));
                tracing::info!(pack = %pack_id, "pack created");
                (pack_id, true)
            }
        };

        for &member in &members {
            let previous = self.repository.parent_of(member);
            if let Some(old) = previous.filter(|old| *old != pack_id) {
                match self.repository.get_mut(old).and_then(Entity::as_pack_mut) {
                    Some(old_pack) => old_pack.remove_member(member),
                    None => tracing::warn!(%member, pack = %old, "stale pack link dropped"),
                }
            }
            if let Some(animal) = self.repository.individual_mut(member) {
                animal.set_pack(Some(pack_id));
            }
            if let Some(pack) = self.repository.get_mut(pack_id).and_then(Entity::as_pack_mut) {
                pack.add_member(member);
            }
            tracing::debug!(%member, pack = %pack_id, "member added to pack");
        }

        Ok(GroupOutcome {
            pack: pack_id,
            created,
            added: members,
            missing,
        })
    }

    pub fn list_all(&self) -> Vec<AnimalView> {
        self.repository
            .ids()
            .into_iter()
            .filter_map(|id| self.repository.view(id))
            .collect()
    }

    pub fn list_by_type(&self, kind: EntityKind) -> Vec<AnimalView> {
        self.repository
            .ids_by_type(kind)
            .into_iter()
            .filter_map(|id| self.repository.view(id))
            .collect()
    }

    pub fn list_packs(&self) -> Vec<PackListing> {
        self.repository
            .ids_by_type(EntityKind::Pack)
            .into_iter()
            .filter_map(|id| {
                let pack = self.repository.view(id)?;
                let members = self
                    .repository
                    .get(id)
                    .and_then(Entity::as_pack)?
                    .members()
                    .iter()
                    .filter_map(|member| self.repository.view(*member))
                    .collect();
                Some(PackListing { pack, members })
            })
            .collect()
    }

    pub fn map_summary(&self) -> MapSummary {
        MapSummary {
            width: self.terrain.width(),
            height: self.terrain.height(),
            water: self.terrain.tiles(ResourceKind::Water).len(),
            grass: self.terrain.tiles(ResourceKind::Grass).len(),
            obstacles: self.terrain.obstacles().len(),
            animals: self.population(),
        }
    }

    /// Removes every entity, packs included. Returns how many were removed.
    pub fn clear_animals(&mut self) -> usize {
        let count = self.repository.len();
        self.repository.clear();
        tracing::info!(count, "all animals cleared");
        count
    }

    pub fn clear_resources(&mut self) {
        self.terrain.clear_resources();
        tracing::info!("all resources cleared");
    }
}
