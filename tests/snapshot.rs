use ecosim::{
    engine::{EngineBuilder, EngineSettings},
    entity::{Sex, Species},
    scenario::ScenarioLoader,
    snapshot::{self, SnapshotError},
    world::PackTarget,
    Scenario,
};
use tempfile::tempdir;

#[test]
fn mid_run_state_survives_a_round_trip() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/meadow.yaml")
        .expect("scenario should load");
    let mut engine = EngineBuilder::new(EngineSettings {
        seed: scenario.seed,
        ..EngineSettings::default()
    })
    .standard()
    .build();
    let mut state = scenario
        .build_state(&mut engine.rng_stream("setup"))
        .expect("state builds");
    engine.run(&mut state, 2).expect("run succeeds");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("meadow.json");
    snapshot::save(&state, &path).expect("save");
    let restored = snapshot::load(&path).expect("load");

    assert_eq!(restored.tick(), 2);
    assert_eq!(restored.list_all(), state.list_all());
    assert_eq!(restored.map_summary(), state.map_summary());
}

#[test]
fn asymmetric_pack_links_are_rejected() {
    let mut rng = rand::thread_rng();
    let mut state = Scenario::default()
        .build_state(&mut rng)
        .expect("state builds");
    let a = state
        .create_individual(Species::Carnivore, Sex::Male, &mut rng)
        .expect("create");
    state.group_into_pack(&[a], PackTarget::New).expect("group");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    snapshot::save(&state, &path).expect("save");

    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    for entity in json["entities"].as_array_mut().expect("entities") {
        if let Some(pack) = entity.get_mut("Pack") {
            pack["members"] = serde_json::json!([]);
        }
    }
    std::fs::write(&path, json.to_string()).expect("write");

    let err = snapshot::load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::State(_)));
}

#[test]
fn garbage_is_a_json_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "not json").expect("write");
    assert!(matches!(
        snapshot::load(&path),
        Err(SnapshotError::Json(_))
    ));
}
