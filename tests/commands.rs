use ecosim::{
    commands::TurnOutcome,
    engine::{EngineBuilder, EngineSettings},
    entity::EntityKind,
    Engine, Scenario, SimulationState,
};
use tempfile::tempdir;

fn setup() -> (Engine, SimulationState) {
    let scenario = Scenario::default();
    let mut engine = EngineBuilder::new(EngineSettings::default())
        .standard()
        .build();
    let state = scenario
        .build_state(&mut engine.rng_stream("setup"))
        .expect("state builds");
    (engine, state)
}

fn turn(engine: &mut Engine, state: &mut SimulationState, input: &str) -> (TurnOutcome, String) {
    let mut out = Vec::new();
    let outcome = engine
        .command_session(state)
        .run_turn(input.as_bytes(), &mut out)
        .expect("turn io");
    (outcome, String::from_utf8(out).expect("utf8 output"))
}

#[test]
fn continue_ends_the_turn_and_keeps_running() {
    let (mut engine, mut state) = setup();
    let (outcome, out) = turn(&mut engine, &mut state, "create herbivore m\nlist\ncontinue\n");
    assert_eq!(outcome, TurnOutcome::Continue);
    assert!(out.contains("Created Herbivore 1 at ("));
    assert!(out.contains("Herbivore 1: pos=("));
    assert_eq!(state.population(), 1);
}

#[test]
fn exit_and_end_of_input_stop_the_game() {
    let (mut engine, mut state) = setup();
    assert_eq!(turn(&mut engine, &mut state, "exit\n").0, TurnOutcome::Exit);
    assert_eq!(turn(&mut engine, &mut state, "list\n").0, TurnOutcome::Exit);
}

#[test]
fn errors_are_reported_and_the_turn_goes_on() {
    let (mut engine, mut state) = setup();
    let (outcome, out) = turn(
        &mut engine,
        &mut state,
        "fly away\ndelete 99\ncreate dragon m\nc\n",
    );
    assert_eq!(outcome, TurnOutcome::Continue);
    assert!(out.contains("Error: unknown command 'fly away'"));
    assert!(out.contains("Error: no entity with id 99"));
    assert!(out.contains("Error: unknown species 'dragon'"));
}

#[test]
fn grouping_and_listing_packs() {
    let (mut engine, mut state) = setup();
    let (_, out) = turn(
        &mut engine,
        &mut state,
        "create carnivore m\ncreate carnivore f\npack 1,2,40\nlistPacks\nc\n",
    );
    assert!(out.contains("No entity with id 40, skipped."));
    assert!(out.contains("Pack 3 created with [1,2]."));
    assert!(out.contains("Pack 3: pos=("));
    assert!(out.contains("(2 members)"));
    assert_eq!(state.list_by_type(EntityKind::Pack).len(), 1);

    let (outcome, out) = turn(
        &mut engine,
        &mut state,
        "create herbivore f\npack 3,4\npack 5 3\nlistPacks\nc\n",
    );
    assert_eq!(outcome, TurnOutcome::Continue);
    assert!(out.contains("Pack 5 created with [3,4]."));
    assert!(out.contains("Error: pack invariant violated: pack 3 would contain itself through member 5"));
    assert!(out.contains("Pack 5: pos=("));
    assert!(out.contains("  Pack 3: pos=("));
    assert_eq!(state.list_by_type(EntityKind::Pack).len(), 2);
}

#[test]
fn oversized_spawn_is_capped_and_the_turn_goes_on() {
    let (mut engine, mut state) = setup();
    let (outcome, out) = turn(
        &mut engine,
        &mut state,
        "spawn herbivore 18446744073709551615\nspawn water 18446744073709551615\nlistMap\nc\n",
    );
    assert_eq!(outcome, TurnOutcome::Continue);
    assert!(out.contains("Spawned 340 Herbivore."));
    assert!(out.contains("Only 340 could be placed on free tiles."));
    assert!(out.contains("Map 20x20: 360 water, 20 grass, 20 obstacles, 340 animals."));
}

#[test]
fn spawning_and_clearing() {
    let (mut engine, mut state) = setup();
    let (_, out) = turn(
        &mut engine,
        &mut state,
        "spawn herbivore 4\nspawn grass 5\nlistMap\nclearResources\nclearAnimals\nlistMap\nc\n",
    );
    assert!(out.contains("Spawned 4 Herbivore."));
    assert!(out.contains("Spawned 5 grass."));
    assert!(out.contains("Map 20x20: 20 water, 25 grass, 20 obstacles, 4 animals."));
    assert!(out.contains("Map 20x20: 0 water, 0 grass, 20 obstacles, 0 animals."));
}

#[test]
fn user_actions_show_up_in_the_next_recap() {
    let (mut engine, mut state) = setup();
    turn(&mut engine, &mut state, "create carnivore f\nc\n");
    let report = engine.tick(&mut state).expect("tick");
    assert!(report
        .recap
        .lines()
        .any(|line| line.starts_with("User created Carnivore 1")));
}

#[test]
fn save_then_load_restores_the_game() {
    let (mut engine, mut state) = setup();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("game.json");
    let input = format!(
        "create herbivore f\nsave {path}\nclearAnimals\nload {path}\nc\n",
        path = path.display()
    );

    let (_, out) = turn(&mut engine, &mut state, &input);

    assert!(out.contains("Game saved to"));
    assert!(out.contains("Game loaded from"));
    assert_eq!(state.population(), 1);
    assert_eq!(state.list_all()[0].kind, EntityKind::Herbivore);
}
