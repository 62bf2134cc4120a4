//! Entity storage keyed by ID, with live pack aggregation.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::entity::{Entity, EntityId, EntityKind, Individual, Pack, Position, Sex};

/// Read-only projection of the capability set shared by individuals and
/// packs. For a pack every field is recomputed from its current members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimalView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub sex: Option<Sex>,
    pub position: Position,
    pub hp: i32,
    pub exp: i32,
    pub level: i32,
    pub range: i32,
    pub pack: Option<EntityId>,
}

#[derive(Debug, Default, Clone)]
pub struct Repository {
    entities: HashMap<EntityId, Entity>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: impl Into<Entity>) {
        let entity = entity.into();
        tracing::trace!(id = %entity.id(), kind = %entity.kind(), "entity added");
        self.entities.insert(entity.id(), entity);
    }

    /// Removes an entity and keeps pack membership symmetric: a removed
    /// individual leaves its pack, a removed pack releases its members and
    /// leaves the pack it was nested in.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let Some(removed) = self.entities.remove(&id) else {
            tracing::debug!(%id, "remove requested for unknown entity");
            return None;
        };
        match &removed {
            Entity::Individual(animal) => {
                if let Some(pack) = animal
                    .pack()
                    .and_then(|pack_id| self.entities.get_mut(&pack_id))
                    .and_then(Entity::as_pack_mut)
                {
                    pack.remove_member(id);
                }
            }
            Entity::Pack(pack) => {
                for member in pack.members() {
                    if let Some(animal) = self
                        .entities
                        .get_mut(member)
                        .and_then(Entity::as_individual_mut)
                    {
                        animal.set_pack(None);
                    }
                }
                for parent in self.entities.values_mut().filter_map(Entity::as_pack_mut) {
                    parent.remove_member(id);
                }
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn individual(&self, id: EntityId) -> Option<&Individual> {
        self.get(id).and_then(Entity::as_individual)
    }

    pub fn individual_mut(&mut self, id: EntityId) -> Option<&mut Individual> {
        self.get_mut(id).and_then(Entity::as_individual_mut)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every entity, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn all_except_packs(&self) -> impl Iterator<Item = &Individual> + '_ {
        self.entities.values().filter_map(Entity::as_individual)
    }

    pub fn all_by_type(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .values()
            .filter(move |entity| entity.kind() == kind)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn individual_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.all_except_packs().map(Individual::id).collect();
        ids.sort();
        ids
    }

    pub fn ids_by_type(&self, kind: EntityKind) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.all_by_type(kind).map(Entity::id).collect();
        ids.sort();
        ids
    }

    /// The pack that lists `id` as a member. Individuals carry the link
    /// themselves; a nested pack is found by scanning the packs.
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        match self.get(id)? {
            Entity::Individual(animal) => animal.pack(),
            Entity::Pack(_) => self
                .entities
                .values()
                .filter_map(Entity::as_pack)
                .find(|pack| pack.members().contains(&id))
                .map(Pack::id),
        }
    }

    /// Whether `id` sits inside pack `pack_id` at any depth.
    pub fn pack_contains(&self, pack_id: EntityId, id: EntityId) -> bool {
        let mut stack = vec![pack_id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(pack) = self.get(current).and_then(Entity::as_pack) else {
                continue;
            };
            for &member in pack.members() {
                if member == id {
                    return true;
                }
                stack.push(member);
            }
        }
        false
    }

    /// Individuals reached from `id` through any number of nested packs.
    pub fn leaf_members(&self, id: EntityId) -> Vec<EntityId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            match self.get(current) {
                Some(Entity::Individual(_)) => leaves.push(current),
                Some(Entity::Pack(pack)) => stack.extend(pack.members().iter().rev()),
                None => {}
            }
        }
        leaves
    }

    pub(crate) fn par_individuals(&self) -> impl ParallelIterator<Item = &Individual> + '_ {
        self.entities.par_iter().filter_map(|(_, e)| e.as_individual())
    }

    pub(crate) fn par_individuals_mut(
        &mut self,
    ) -> impl ParallelIterator<Item = &mut Individual> + '_ {
        self.entities
            .par_iter_mut()
            .filter_map(|(_, e)| e.as_individual_mut())
    }

    pub fn view(&self, id: EntityId) -> Option<AnimalView> {
        match self.get(id)? {
            Entity::Individual(animal) => Some(AnimalView {
                id,
                kind: animal.species().kind(),
                sex: Some(animal.sex()),
                position: animal.position,
                hp: animal.hp,
                exp: animal.exp,
                level: animal.level,
                range: animal.range(),
                pack: animal.pack(),
            }),
            Entity::Pack(pack) => {
                let members: Vec<AnimalView> = pack
                    .members()
                    .iter()
                    .filter_map(|member| self.view(*member))
                    .collect();
                let count = members.len() as i32;
                let average = |total: i32| if count == 0 { 0 } else { total / count };
                let position = Position::new(
                    average(members.iter().map(|m| m.position.x).sum()),
                    average(members.iter().map(|m| m.position.y).sum()),
                );
                Some(AnimalView {
                    id,
                    kind: EntityKind::Pack,
                    sex: None,
                    position,
                    hp: average(members.iter().map(|m| m.hp).sum()),
                    exp: members.iter().map(|m| m.exp).sum(),
                    // Level is a sum while hp and range are averages.
                    level: members.iter().map(|m| m.level).sum(),
                    range: average(members.iter().map(|m| m.range).sum()),
                    pack: None,
                })
            }
        }
    }

    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.view(id).map(|view| view.position)
    }

    /// Moves an entity. A pack is translated rigidly: the offset between its
    /// current center and `target` is applied to every member.
    pub fn set_position(&mut self, id: EntityId, target: Position) -> bool {
        let members = match self.get_mut(id) {
            None => return false,
            Some(Entity::Individual(animal)) => {
                animal.position = target;
                return true;
            }
            Some(Entity::Pack(pack)) => pack.members().to_vec(),
        };
        let Some(center) = self.position(id) else {
            return false;
        };
        let (dx, dy) = (target.x - center.x, target.y - center.y);
        for member in members {
            if let Some(current) = self.position(member) {
                self.set_position(member, current.translated(dx, dy));
            }
        }
        true
    }
}
