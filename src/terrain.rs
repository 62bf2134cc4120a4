//! Map tiles and the queries the tick pipeline asks of them.

use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::Position;

/// Exclusive upper bound on either map dimension.
pub const MAX_DIMENSION: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Grass,
    Water,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Grass => f.write_str("grass"),
            ResourceKind::Water => f.write_str("water"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerrainError {
    #[error("map dimensions {width}x{height} must both lie in 1..1000")]
    InvalidDimensions { width: i32, height: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    width: i32,
    height: i32,
    obstacles: Vec<Position>,
    grass: Vec<Position>,
    water: Vec<Position>,
}

impl Terrain {
    /// An empty map with no obstacles or resources.
    pub fn new(width: i32, height: i32) -> Result<Self, TerrainError> {
        let valid = |d: i32| d > 0 && d < MAX_DIMENSION;
        if !valid(width) || !valid(height) {
            return Err(TerrainError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            obstacles: Vec::new(),
            grass: Vec::new(),
            water: Vec::new(),
        })
    }

    /// Builds a map and scatters obstacles, grass and water on free tiles, in
    /// that order. Counts that exceed the free space are truncated.
    pub fn generate<R: Rng + ?Sized>(
        width: i32,
        height: i32,
        obstacles: usize,
        grass: usize,
        water: usize,
        rng: &mut R,
    ) -> Result<Self, TerrainError> {
        let mut terrain = Self::new(width, height)?;
        let placed = terrain.pick_free(obstacles, rng);
        terrain.obstacles.extend(placed);
        terrain.spawn_resource_tiles(ResourceKind::Grass, grass, rng);
        terrain.spawn_resource_tiles(ResourceKind::Water, water, rng);
        tracing::info!(
            width,
            height,
            obstacles = terrain.obstacles.len(),
            grass = terrain.grass.len(),
            water = terrain.water.len(),
            "map generated"
        );
        Ok(terrain)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    pub fn obstacles(&self) -> &[Position] {
        &self.obstacles
    }

    pub fn tiles(&self, kind: ResourceKind) -> &[Position] {
        match kind {
            ResourceKind::Grass => &self.grass,
            ResourceKind::Water => &self.water,
        }
    }

    fn tiles_mut(&mut self, kind: ResourceKind) -> &mut Vec<Position> {
        match kind {
            ResourceKind::Grass => &mut self.grass,
            ResourceKind::Water => &mut self.water,
        }
    }

    pub fn add_obstacle(&mut self, position: Position) {
        self.obstacles.push(position);
    }

    pub fn add_tile(&mut self, kind: ResourceKind, position: Position) {
        self.tiles_mut(kind).push(position);
    }

    /// Tiles not covered by an obstacle, grass or water, in row-major order.
    /// Animals never block a tile.
    pub fn free_positions(&self) -> Vec<Position> {
        let occupied: HashSet<Position> = self
            .obstacles
            .iter()
            .chain(&self.grass)
            .chain(&self.water)
            .copied()
            .collect();
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Position::new(x, y)))
            .filter(|pos| !occupied.contains(pos))
            .collect()
    }

    pub fn random_free_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        self.free_positions().choose(rng).copied()
    }

    fn pick_free<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Position> {
        let mut free = self.free_positions();
        let mut picked = Vec::with_capacity(count.min(free.len()));
        for _ in 0..count {
            if free.is_empty() {
                tracing::warn!(requested = count, placed = picked.len(), "map is full");
                break;
            }
            let index = rng.gen_range(0..free.len());
            picked.push(free.swap_remove(index));
        }
        picked
    }

    /// Places up to `count` new tiles of `kind` on random free positions and
    /// returns how many were placed.
    pub fn spawn_resource_tiles<R: Rng + ?Sized>(
        &mut self,
        kind: ResourceKind,
        count: usize,
        rng: &mut R,
    ) -> usize {
        let placed = self.pick_free(count, rng);
        let spawned = placed.len();
        self.tiles_mut(kind).extend(placed);
        tracing::debug!(%kind, spawned, total = self.tiles(kind).len(), "resource tiles spawned");
        spawned
    }

    /// Removes the first tile of `kind`, in list order, lying within `radius`
    /// (Chebyshev) of `position`. The first match wins even if a nearer tile
    /// appears later in the list.
    pub fn consume_tile_near(
        &mut self,
        kind: ResourceKind,
        position: Position,
        radius: i32,
    ) -> Option<Position> {
        let tiles = self.tiles_mut(kind);
        let index = tiles.iter().position(|tile| position.is_near(*tile, radius))?;
        Some(tiles.remove(index))
    }

    /// Free tiles within Manhattan distance `range` of `from`.
    pub fn reachable_positions(&self, from: Position, range: i32) -> Vec<Position> {
        self.free_positions()
            .into_iter()
            .filter(|pos| pos.manhattan(from) <= range)
            .collect()
    }

    /// Picks a random free tile within Manhattan distance `range` of `from`.
    pub fn move_within_range<R: Rng + ?Sized>(
        &self,
        from: Position,
        range: i32,
        rng: &mut R,
    ) -> Option<Position> {
        self.reachable_positions(from, range).choose(rng).copied()
    }

    pub fn clear_resources(&mut self) {
        self.grass.clear();
        self.water.clear();
    }
}
