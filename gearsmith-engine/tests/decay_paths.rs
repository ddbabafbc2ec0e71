use gearsmith_engine::degradation::{CombatEvent, Exposure};
use gearsmith_engine::{
    EngineConfig, Environment, EquipmentKind, EquipmentSnapshot, EquipmentStore, MaterialKind,
    MemoryStore, QualityTier, RepairEngine, RepairError, RngBundle, WearFactors,
};

fn store_with(tier: QualityTier, durability: f64) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_equipment(EquipmentSnapshot {
        id: "gear-1".to_string(),
        kind: EquipmentKind::Armor,
        tier,
        durability,
        base_value: 200.0,
        material: MaterialKind::Leather,
    });
    store
}

#[test]
fn estimate_is_a_dry_run_of_apply() {
    let cfg = EngineConfig::load_from_static();
    let store = store_with(QualityTier::Military, 80.0);
    let engine = RepairEngine::new(&cfg, &store);
    let factors = WearFactors {
        elapsed_days: 5.0,
        usage_intensity: 1.5,
        environment: Environment::Humid,
        combat_events: vec![CombatEvent {
            kind: EquipmentKind::Armor,
            intensity: 1.0,
            critical: false,
            damage_taken: 20.0,
            blocks_made: 0,
        }],
        exposure: None,
    };

    let estimated = engine
        .estimate_decay("gear-1", &factors, &RngBundle::from_user_seed(77))
        .unwrap();
    // The estimate leaves the store untouched.
    assert!((store.get("gear-1").unwrap().durability - 80.0).abs() < f64::EPSILON);
    assert!(store.maintenance_records().is_empty());

    let applied = engine
        .apply_decay("gear-1", &factors, &RngBundle::from_user_seed(77))
        .unwrap();
    assert_eq!(estimated, applied);
    assert!((store.get("gear-1").unwrap().durability - applied.new_durability).abs() < 1e-9);

    let records = store.maintenance_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "wear.assessed");
    assert!((records[0].durability_before - 80.0).abs() < f64::EPSILON);
}

#[test]
fn harsher_environments_wear_faster() {
    let cfg = EngineConfig::load_from_static();
    let engine_store = store_with(QualityTier::Basic, 100.0);
    let engine = RepairEngine::new(&cfg, &engine_store);

    let wear_in = |environment: Environment| {
        let factors = WearFactors {
            elapsed_days: 3.0,
            environment,
            ..WearFactors::default()
        };
        engine
            .estimate_decay("gear-1", &factors, &RngBundle::from_user_seed(5))
            .unwrap()
            .total_wear
    };

    // Same seed, so the jitter draw is identical and only the factor moves.
    let dry = wear_in(Environment::Dry);
    let normal = wear_in(Environment::Normal);
    let humid = wear_in(Environment::Humid);
    let cold = wear_in(Environment::ExtremeCold);
    assert!(dry < normal && normal < humid && humid < cold);
}

#[test]
fn higher_tiers_outlast_lower_tiers() {
    let cfg = EngineConfig::load_from_static();
    let factors = WearFactors {
        elapsed_days: 10.0,
        ..WearFactors::default()
    };
    let mut last_wear = f64::MAX;
    for tier in QualityTier::ALL {
        let store = store_with(tier, 100.0);
        let engine = RepairEngine::new(&cfg, &store);
        let report = engine
            .estimate_decay("gear-1", &factors, &RngBundle::from_user_seed(13))
            .unwrap();
        assert!(
            report.total_wear < last_wear,
            "{tier} should wear slower than the tier below"
        );
        last_wear = report.total_wear;
    }
}

#[test]
fn decay_to_broken_raises_the_flags() {
    let cfg = EngineConfig::load_from_static();
    let store = store_with(QualityTier::Basic, 12.0);
    let engine = RepairEngine::new(&cfg, &store);
    let factors = WearFactors {
        elapsed_days: 2.0,
        usage_intensity: 2.0,
        environment: Environment::ExtremeHeat,
        combat_events: Vec::new(),
        exposure: Some(Exposure {
            hours: 48.0,
            environment: Environment::ExtremeHeat,
            material: MaterialKind::Cloth,
            kind: EquipmentKind::Armor,
        }),
    };
    let report = engine
        .apply_decay("gear-1", &factors, &RngBundle::from_user_seed(21))
        .unwrap();
    assert!(report.new_durability < 10.0);
    assert!(report.became_broken);
    assert!(report.needs_immediate_attention);
    assert!(report.condition_changed);
}

#[test]
fn unknown_equipment_is_rejected_without_a_roll() {
    let cfg = EngineConfig::load_from_static();
    let store = MemoryStore::new();
    let engine = RepairEngine::new(&cfg, &store);
    let rng = RngBundle::from_user_seed(1);
    let err = engine
        .estimate_decay("ghost", &WearFactors::default(), &rng)
        .unwrap_err();
    assert!(matches!(err, RepairError::EquipmentNotFound { .. }));
    assert_eq!(rng.wear().draws(), 0);
}
