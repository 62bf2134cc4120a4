mod attack;
mod consumption;
mod deaths;
mod hunger;
mod leveling;
mod movement;
mod reproduction;
mod respawn;

pub use attack::AttackPhase;
pub use consumption::ConsumptionPhase;
pub use deaths::DeathPhase;
pub use hunger::HungerPhase;
pub use leveling::LevelingPhase;
pub use movement::MovementPhase;
pub use reproduction::ReproductionPhase;
pub use respawn::RespawnPhase;
