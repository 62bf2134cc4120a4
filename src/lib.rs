pub mod commands;
pub mod engine;
pub mod entity;
pub mod error;
pub mod events;
pub mod factory;
pub mod phases;
pub mod repository;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod terrain;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, SimRules, TickReport};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::SimulationState;
