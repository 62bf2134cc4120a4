use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    commands::CommandSession,
    events::{EventBus, Observer, Recap},
    phases::{
        AttackPhase, ConsumptionPhase, DeathPhase, HungerPhase, LevelingPhase, MovementPhase,
        ReproductionPhase, RespawnPhase,
    },
    rng::{RngManager, StreamRng},
    snapshot::SnapshotWriter,
    world::SimulationState,
};

fn default_respawn_per_cycle() -> usize {
    6
}

fn default_attack_radius() -> i32 {
    1
}

/// Tunables read by the phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRules {
    /// Resource tiles added by each respawn, split between grass and water.
    #[serde(default = "default_respawn_per_cycle")]
    pub respawn_per_cycle: usize,
    /// Chebyshev reach of a carnivore attack. Values below one act as one.
    #[serde(default = "default_attack_radius")]
    pub attack_radius: i32,
}

impl Default for SimRules {
    fn default() -> Self {
        Self {
            respawn_per_cycle: default_respawn_per_cycle(),
            attack_radius: default_attack_radius(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    RespawnResources,
    Move,
    Attack,
    Hunger,
    CheckDeaths,
    ConsumeResources,
    Reproduce,
    AssignLevels,
}

impl PhaseKind {
    /// Stable name, also used to pick the phase's random stream.
    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::RespawnResources => "respawn",
            PhaseKind::Move => "movement",
            PhaseKind::Attack => "attack",
            PhaseKind::Hunger => "hunger",
            PhaseKind::CheckDeaths => "deaths",
            PhaseKind::ConsumeResources => "consumption",
            PhaseKind::Reproduce => "reproduction",
            PhaseKind::AssignLevels => "leveling",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const FIRST_TICK: [PhaseKind; 8] = [
    PhaseKind::Move,
    PhaseKind::Attack,
    PhaseKind::CheckDeaths,
    PhaseKind::ConsumeResources,
    PhaseKind::Hunger,
    PhaseKind::CheckDeaths,
    PhaseKind::Reproduce,
    PhaseKind::AssignLevels,
];

const STEADY_TICK: [PhaseKind; 8] = [
    PhaseKind::RespawnResources,
    PhaseKind::Move,
    PhaseKind::Attack,
    PhaseKind::Hunger,
    PhaseKind::CheckDeaths,
    PhaseKind::ConsumeResources,
    PhaseKind::Reproduce,
    PhaseKind::AssignLevels,
];

/// Phase order for `tick`. The opening tick never respawns resources and
/// checks deaths twice.
pub fn schedule_for(tick: u64) -> &'static [PhaseKind] {
    if tick == 0 {
        &FIRST_TICK
    } else {
        &STEADY_TICK
    }
}

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub rules: SimRules,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scenario_name: "default".to_string(),
            seed: 0,
            rules: SimRules::default(),
            snapshot_interval_ticks: 0,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    phases: Vec<Box<dyn Phase>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            phases: Vec::new(),
        }
    }

    /// Registers a phase. A later phase of the same kind replaces an
    /// earlier one.
    pub fn with_phase(mut self, phase: impl Phase + 'static) -> Self {
        self.push_phase(phase);
        self
    }

    pub fn push_phase(&mut self, phase: impl Phase + 'static) {
        let kind = phase.kind();
        self.phases.retain(|existing| existing.kind() != kind);
        self.phases.push(Box::new(phase));
    }

    /// Registers all eight standard phases.
    pub fn standard(self) -> Self {
        self.with_phase(RespawnPhase::new())
            .with_phase(MovementPhase::new())
            .with_phase(AttackPhase::new())
            .with_phase(HungerPhase::new())
            .with_phase(DeathPhase::new())
            .with_phase(ConsumptionPhase::new())
            .with_phase(ReproductionPhase::new())
            .with_phase(LevelingPhase::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            phases: self.phases,
            events: EventBus::new(),
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

/// What one call to [`Engine::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub phases: Vec<PhaseKind>,
    pub recap: Recap,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    rng: RngManager,
    phases: Vec<Box<dyn Phase>>,
    events: EventBus,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.events.subscribe(observer);
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn rng_stream(&mut self, name: &str) -> StreamRng<'_> {
        self.rng.stream(name)
    }

    /// Runs the phase pipeline once, flushes the recap and advances the
    /// tick counter.
    pub fn tick(&mut self, state: &mut SimulationState) -> Result<TickReport> {
        let tick = state.tick();
        let span = tracing::info_span!("tick", tick);
        let _guard = span.enter();

        let mut ran = Vec::new();
        for &kind in schedule_for(tick) {
            let Some(phase) = self.phases.iter_mut().find(|phase| phase.kind() == kind) else {
                tracing::debug!(phase = %kind, "phase not registered, skipping");
                continue;
            };
            let mut rng = self.rng.stream(kind.name());
            let mut ctx = PhaseContext {
                tick,
                rules: &self.settings.rules,
                events: &mut self.events,
            };
            phase
                .run(&mut ctx, state, &mut rng)
                .with_context(|| format!("phase {kind} failed at tick {tick}"))?;
            tracing::trace!(phase = %kind, population = state.population(), "phase done");
            ran.push(kind);
        }

        let recap = Recap {
            tick,
            body: self.events.flush_recap(),
        };
        state.advance_tick();
        let snapshot_path = self
            .snapshot_writer
            .maybe_write(state, &self.settings.scenario_name)
            .context("autosave failed")?;
        tracing::debug!(population = state.population(), "tick complete");

        Ok(TickReport {
            tick,
            phases: ran,
            recap,
            snapshot_path,
        })
    }

    pub fn run(&mut self, state: &mut SimulationState, ticks: u64) -> Result<()> {
        self.run_with_hook(state, ticks, |_| {})
    }

    pub fn run_with_hook<F>(
        &mut self,
        state: &mut SimulationState,
        ticks: u64,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(&TickReport),
    {
        for _ in 0..ticks {
            let report = self.tick(state)?;
            hook(&report);
        }
        Ok(())
    }

    /// Opens the command turn that follows a tick. Events published during
    /// the turn land in the next tick's recap.
    pub fn command_session<'a>(&'a mut self, state: &'a mut SimulationState) -> CommandSession<'a> {
        CommandSession::new(state, &mut self.events, self.rng.stream("commands"))
    }
}

pub struct PhaseContext<'a> {
    pub tick: u64,
    pub rules: &'a SimRules,
    pub events: &'a mut EventBus,
}

pub trait Phase: Send {
    fn kind(&self) -> PhaseKind;
    fn run(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        state: &mut SimulationState,
        rng: &mut StreamRng<'_>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_tick_skips_respawn_and_checks_deaths_twice() {
        let first = schedule_for(0);
        assert!(!first.contains(&PhaseKind::RespawnResources));
        assert_eq!(
            first.iter().filter(|k| **k == PhaseKind::CheckDeaths).count(),
            2
        );
        assert_eq!(first[0], PhaseKind::Move);
    }

    #[test]
    fn later_ticks_start_with_respawn() {
        for tick in [1, 2, 57] {
            let order = schedule_for(tick);
            assert_eq!(order[0], PhaseKind::RespawnResources);
            assert_eq!(order.last(), Some(&PhaseKind::AssignLevels));
        }
    }

    #[test]
    fn pushing_same_kind_replaces_phase() {
        let builder = EngineBuilder::new(EngineSettings::default())
            .standard()
            .with_phase(HungerPhase::new());
        assert_eq!(builder.phases.len(), 8);
    }
}
