//! The command turn that follows every tick.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use thiserror::Error;

use crate::entity::{EntityId, EntityKind, Sex, Species};
use crate::error::ValidationError;
use crate::events::{EventBus, EventKind, GameEvent};
use crate::repository::AnimalView;
use crate::rng::StreamRng;
use crate::snapshot;
use crate::terrain::ResourceKind;
use crate::world::{PackTarget, SimulationState};

pub const HELP: &str = "\
Commands:
  help | h                                 show this list
  continue | c                             end the turn and run the next tick
  exit                                     stop the simulation
  create <carnivore|herbivore> <m|f>       create an animal on a random free tile
  spawn <carnivore|herbivore|grass|water> <n>
                                           add n animals or resource tiles
  delete <id>                              remove an animal or pack
  pack <id,id,...> [<pack-id>|0]           group animals or packs, 0 or nothing makes a new pack
  list                                     list every entity
  listType <carnivore|herbivore|pack>      list entities of one kind
  listPacks                                list packs with their members
  listMap                                  show map counts
  clearAnimals                             remove every animal and pack
  clearResources                           remove every grass and water tile
  save <path>                              write the game to a json file
  load <path>                              replace the game with a saved one";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a valid entity id")]
    InvalidId(String),
    #[error("'{0}' is not a valid count")]
    InvalidCount(String),
    #[error("cannot spawn '{0}', expected carnivore, herbivore, grass or water")]
    UnknownSpawnTarget(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTarget {
    Animal(Species),
    Resource(ResourceKind),
}

impl FromStr for SpawnTarget {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grass" => Ok(SpawnTarget::Resource(ResourceKind::Grass)),
            "water" => Ok(SpawnTarget::Resource(ResourceKind::Water)),
            other => other
                .parse::<Species>()
                .map(SpawnTarget::Animal)
                .map_err(|_| ParseCommandError::UnknownSpawnTarget(s.to_string())),
        }
    }
}

impl fmt::Display for SpawnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnTarget::Animal(species) => species.fmt(f),
            SpawnTarget::Resource(kind) => kind.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Continue,
    Exit,
    Create { species: Species, sex: Sex },
    Spawn { target: SpawnTarget, count: usize },
    Delete(EntityId),
    Pack { ids: Vec<EntityId>, target: PackTarget },
    List,
    ListType(EntityKind),
    ListPacks,
    ListMap,
    ClearAnimals,
    ClearResources,
    Save(PathBuf),
    Load(PathBuf),
}

fn parse_id(token: &str) -> Result<EntityId, ParseCommandError> {
    token
        .parse()
        .map_err(|_| ParseCommandError::InvalidId(token.to_string()))
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(ParseCommandError::Empty);
        };
        let args: Vec<&str> = tokens.collect();
        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("help" | "h", []) => Command::Help,
            ("continue" | "c", []) => Command::Continue,
            ("exit", []) => Command::Exit,
            ("create", [species, sex]) => Command::Create {
                species: species.parse()?,
                sex: sex.parse()?,
            },
            ("create", _) => return Err(ParseCommandError::Usage("create <species> <m|f>")),
            ("spawn", [target, count]) => Command::Spawn {
                target: target.parse()?,
                count: count
                    .parse()
                    .map_err(|_| ParseCommandError::InvalidCount(count.to_string()))?,
            },
            ("spawn", _) => {
                return Err(ParseCommandError::Usage(
                    "spawn <carnivore|herbivore|grass|water> <n>",
                ))
            }
            ("delete", [id]) => Command::Delete(parse_id(id)?),
            ("delete", _) => return Err(ParseCommandError::Usage("delete <id>")),
            ("pack", [ids, rest @ ..]) if rest.len() <= 1 => {
                let ids = ids
                    .split(',')
                    .filter(|id| !id.is_empty())
                    .map(parse_id)
                    .collect::<Result<Vec<_>, _>>()?;
                let target = match rest.first() {
                    None => PackTarget::New,
                    Some(id) => match parse_id(id)? {
                        id if id.raw() == 0 => PackTarget::New,
                        id => PackTarget::Existing(id),
                    },
                };
                Command::Pack { ids, target }
            }
            ("pack", _) => return Err(ParseCommandError::Usage("pack <id,id,...> [<pack-id>|0]")),
            ("list", []) => Command::List,
            ("listtype", [kind]) => Command::ListType(kind.parse()?),
            ("listtype", _) => {
                return Err(ParseCommandError::Usage(
                    "listType <carnivore|herbivore|pack>",
                ))
            }
            ("listpacks", []) => Command::ListPacks,
            ("listmap", []) => Command::ListMap,
            ("clearanimals", []) => Command::ClearAnimals,
            ("clearresources", []) => Command::ClearResources,
            ("save", [path]) => Command::Save(PathBuf::from(path)),
            ("save", _) => return Err(ParseCommandError::Usage("save <path>")),
            ("load", [path]) => Command::Load(PathBuf::from(path)),
            ("load", _) => return Err(ParseCommandError::Usage("load <path>")),
            _ => return Err(ParseCommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

/// Flags a command turn raises to hand control back to the run loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TurnControl {
    ended: bool,
    exit: bool,
}

impl TurnControl {
    pub fn end_turn(&mut self) {
        self.ended = true;
    }

    /// Stops the whole simulation once this turn is over.
    pub fn request_exit(&mut self) {
        self.ended = true;
        self.exit = true;
    }

    pub fn turn_ended(&self) -> bool {
        self.ended
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Exit,
}

fn describe(view: &AnimalView) -> String {
    let sex = view.sex.map_or_else(|| "-".to_string(), |sex| sex.to_string());
    let pack = view.pack.map_or_else(|| "-".to_string(), |id| id.to_string());
    format!(
        "{} {}: pos={} sex={} hp={} exp={} level={} range={} pack={}",
        view.kind, view.id, view.position, sex, view.hp, view.exp, view.level, view.range, pack
    )
}

/// Applies user commands to the state between ticks.
pub struct CommandSession<'a> {
    state: &'a mut SimulationState,
    events: &'a mut EventBus,
    rng: StreamRng<'a>,
    control: TurnControl,
}

impl<'a> CommandSession<'a> {
    pub fn new(state: &'a mut SimulationState, events: &'a mut EventBus, rng: StreamRng<'a>) -> Self {
        Self {
            state,
            events,
            rng,
            control: TurnControl::default(),
        }
    }

    pub fn control(&self) -> TurnControl {
        self.control
    }

    pub fn state(&self) -> &SimulationState {
        &*self.state
    }

    fn record(&mut self, message: String) {
        self.events
            .publish(GameEvent::new(EventKind::UserAction, message));
    }

    /// Runs one command. Domain failures come back as errors and leave the
    /// turn open.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        tracing::debug!(?command, "executing command");
        match command {
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Continue => self.control.end_turn(),
            Command::Exit => self.control.request_exit(),
            Command::Create { species, sex } => {
                let id = self.state.create_individual(species, sex, &mut self.rng)?;
                let at = self.state.repository().position(id).unwrap_or_default();
                writeln!(out, "Created {species} {id} at {at}.")?;
                self.record(format!("User created {species} {id} at {at}."));
            }
            Command::Spawn { target, count } => {
                let spawned = match target {
                    SpawnTarget::Animal(species) => {
                        self.state.spawn_animals(species, count, &mut self.rng).len()
                    }
                    SpawnTarget::Resource(kind) => {
                        self.state.spawn_resources(kind, count, &mut self.rng)
                    }
                };
                writeln!(out, "Spawned {spawned} {target}.")?;
                if spawned < count {
                    writeln!(out, "Only {spawned} could be placed on free tiles.")?;
                }
                self.record(format!("User spawned {spawned} {target}."));
            }
            Command::Delete(id) => {
                let removed = self.state.delete_entity(id)?;
                writeln!(out, "Deleted {} {id}.", removed.kind())?;
                self.record(format!("User deleted {} {id}.", removed.kind()));
            }
            Command::Pack { ids, target } => {
                let outcome = self.state.group_into_pack(&ids, target)?;
                for id in &outcome.missing {
                    writeln!(out, "No entity with id {id}, skipped.")?;
                }
                let added: Vec<String> = outcome.added.iter().map(ToString::to_string).collect();
                let verb = if outcome.created { "created" } else { "updated" };
                writeln!(out, "Pack {} {verb} with [{}].", outcome.pack, added.join(","))?;
                self.record(format!(
                    "User grouped [{}] into pack {}.",
                    added.join(","),
                    outcome.pack
                ));
            }
            Command::List => {
                let views = self.state.list_all();
                if views.is_empty() {
                    writeln!(out, "No animals.")?;
                }
                for view in &views {
                    writeln!(out, "{}", describe(view))?;
                }
            }
            Command::ListType(kind) => {
                let views = self.state.list_by_type(kind);
                if views.is_empty() {
                    writeln!(out, "No {kind} entities.")?;
                }
                for view in &views {
                    writeln!(out, "{}", describe(view))?;
                }
            }
            Command::ListPacks => {
                let packs = self.state.list_packs();
                if packs.is_empty() {
                    writeln!(out, "No packs.")?;
                }
                for listing in &packs {
                    writeln!(out, "{} ({} members)", describe(&listing.pack), listing.members.len())?;
                    for member in &listing.members {
                        writeln!(out, "  {}", describe(member))?;
                    }
                }
            }
            Command::ListMap => {
                let map = self.state.map_summary();
                writeln!(
                    out,
                    "Map {}x{}: {} water, {} grass, {} obstacles, {} animals.",
                    map.width, map.height, map.water, map.grass, map.obstacles, map.animals
                )?;
            }
            Command::ClearAnimals => {
                let removed = self.state.clear_animals();
                writeln!(out, "Removed {removed} entities.")?;
                self.record("User cleared all animals.".to_string());
            }
            Command::ClearResources => {
                self.state.clear_resources();
                writeln!(out, "Removed all grass and water.")?;
                self.record("User cleared all resources.".to_string());
            }
            Command::Save(path) => {
                snapshot::save(&*self.state, &path)?;
                writeln!(out, "Game saved to {}.", path.display())?;
                self.record(format!("User saved the game to {}.", path.display()));
            }
            Command::Load(path) => {
                *self.state = snapshot::load(&path)?;
                writeln!(
                    out,
                    "Game loaded from {} at tick {}.",
                    path.display(),
                    self.state.tick()
                )?;
                self.record(format!("User loaded the game from {}.", path.display()));
            }
        }
        Ok(())
    }

    /// Reads commands until the turn ends. Bad input is reported and the
    /// turn goes on. End of input counts as `exit`.
    pub fn run_turn<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<TurnOutcome> {
        let mut lines = input.lines();
        while !self.control.turn_ended() {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                self.control.request_exit();
                break;
            };
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(err) => {
                    writeln!(out, "Error: {err}")?;
                    continue;
                }
            };
            if let Err(err) = self.execute(command, &mut out) {
                tracing::warn!(error = %err, "command failed");
                writeln!(out, "Error: {err:#}")?;
            }
        }
        Ok(if self.control.exit_requested() {
            TurnOutcome::Exit
        } else {
            TurnOutcome::Continue
        })
    }
}
