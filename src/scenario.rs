use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;

use crate::{
    engine::SimRules,
    entity::Species,
    terrain::Terrain,
    world::SimulationState,
};

fn default_tile_count() -> usize {
    20
}

fn default_dimension() -> i32 {
    20
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub rules: SimRules,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_dimension")]
    pub width: i32,
    #[serde(default = "default_dimension")]
    pub height: i32,
    #[serde(default = "default_tile_count")]
    pub obstacles: usize,
    #[serde(default = "default_tile_count")]
    pub grass: usize,
    #[serde(default = "default_tile_count")]
    pub water: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            obstacles: default_tile_count(),
            grass: default_tile_count(),
            water: default_tile_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopulationConfig {
    #[serde(default)]
    pub herbivores: usize,
    #[serde(default)]
    pub carnivores: usize,
}

/// The stock game: a 20x20 map with twenty each of obstacles, grass and
/// water, and no animals.
impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: None,
            seed: default_seed(),
            ticks: None,
            map: MapConfig::default(),
            population: PopulationConfig::default(),
            rules: SimRules::default(),
            snapshot_interval_ticks: 0,
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Generates the map and the starting population.
    pub fn build_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SimulationState> {
        let map = &self.map;
        let terrain = Terrain::generate(
            map.width,
            map.height,
            map.obstacles,
            map.grass,
            map.water,
            rng,
        )
        .with_context(|| format!("Invalid map in scenario '{}'", self.name))?;
        let mut state = SimulationState::new(terrain);
        for (species, count) in [
            (Species::Herbivore, self.population.herbivores),
            (Species::Carnivore, self.population.carnivores),
        ] {
            let spawned = state.spawn_animals(species, count, rng).len();
            if spawned < count {
                tracing::warn!(%species, requested = count, spawned, "map too small for population");
            }
        }
        tracing::info!(
            scenario = %self.name,
            population = state.population(),
            "scenario state built"
        );
        Ok(state)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> Option<u64> {
        override_ticks.or(self.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::ResourceKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let scenario: Scenario = serde_yaml::from_str("name: bare\n").unwrap();
        assert_eq!(scenario.map.width, 20);
        assert_eq!(scenario.map.obstacles, 20);
        assert_eq!(scenario.population.herbivores, 0);
        assert_eq!(scenario.rules, SimRules::default());
        assert_eq!(scenario.snapshot_interval_ticks, 0);
        assert_eq!(scenario.ticks(None), None);
        assert_eq!(scenario.ticks(Some(3)), Some(3));
    }

    #[test]
    fn default_scenario_builds_the_stock_map() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let state = Scenario::default().build_state(&mut rng).unwrap();
        let terrain = state.terrain();
        assert_eq!((terrain.width(), terrain.height()), (20, 20));
        assert_eq!(terrain.obstacles().len(), 20);
        assert_eq!(terrain.tiles(ResourceKind::Grass).len(), 20);
        assert_eq!(terrain.tiles(ResourceKind::Water).len(), 20);
        assert_eq!(state.population(), 0);
    }

    #[test]
    fn oversized_map_is_rejected() {
        let mut scenario = Scenario::default();
        scenario.map.width = 1000;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = scenario.build_state(&mut rng).unwrap_err();
        assert!(format!("{err:#}").contains("1000x20"));
    }
}
