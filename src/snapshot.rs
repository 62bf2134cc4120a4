//! JSON snapshots of the full simulation state.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::Entity;
use crate::error::SimError;
use crate::terrain::{Terrain, TerrainError};
use crate::world::SimulationState;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot has an invalid map: {0}")]
    Terrain(#[from] TerrainError),
    #[error("snapshot is inconsistent: {0}")]
    State(#[from] SimError),
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub tick: u64,
    pub next_entity: u64,
    pub terrain: Terrain,
    /// Sorted by ID.
    pub entities: Vec<Entity>,
}

impl Snapshot {
    pub fn capture(state: &SimulationState) -> Self {
        let entities = state
            .repository()
            .ids()
            .into_iter()
            .filter_map(|id| state.repository().get(id).cloned())
            .collect();
        Self {
            saved_at: Utc::now(),
            tick: state.tick(),
            next_entity: state.next_entity(),
            terrain: state.terrain().clone(),
            entities,
        }
    }

    pub fn restore(self) -> Result<SimulationState, SnapshotError> {
        Terrain::new(self.terrain.width(), self.terrain.height())?;
        for entity in &self.entities {
            if let Entity::Individual(animal) = entity {
                if !self.terrain.in_bounds(animal.position) {
                    return Err(SimError::Invariant(format!(
                        "animal {} sits off the map at {}",
                        animal.id(),
                        animal.position
                    ))
                    .into());
                }
            }
        }
        let state =
            SimulationState::from_parts(self.tick, self.next_entity, self.terrain, self.entities)?;
        Ok(state)
    }
}

pub fn save(state: &SimulationState, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| SnapshotError::io(parent, err))?;
    }
    let json = serde_json::to_string_pretty(&Snapshot::capture(state))?;
    fs::write(path, json).map_err(|err| SnapshotError::io(path, err))?;
    tracing::info!(path = %path.display(), tick = state.tick(), "snapshot saved");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<SimulationState, SnapshotError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|err| SnapshotError::io(path, err))?;
    let snapshot: Snapshot = serde_json::from_str(&data)?;
    tracing::info!(
        path = %path.display(),
        tick = snapshot.tick,
        saved_at = %snapshot.saved_at,
        "snapshot loaded"
    );
    snapshot.restore()
}

/// Periodic autosave into `<dir>/<scenario>/tick_NNNNNN.json`.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn maybe_write(
        &self,
        state: &SimulationState,
        scenario_name: &str,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        if self.interval_ticks == 0 || state.tick() % self.interval_ticks != 0 {
            return Ok(None);
        }
        let file_path = self
            .output_dir
            .join(scenario_name)
            .join(format!("tick_{:06}.json", state.tick()));
        save(state, &file_path)?;
        Ok(Some(file_path))
    }
}
