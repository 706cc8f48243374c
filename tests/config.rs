//! Movement config loading through serde.

use doofus_controller::prelude::*;

#[test]
fn config_round_trips_through_json() {
    let config = MovementConfig::snappy().with_speed(6.0, 1.25);

    let json = serde_json::to_string(&config).unwrap();
    let loaded: MovementConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let loaded: MovementConfig = serde_json::from_str(
        r#"{
            "speed_base": 8.0,
            "ride_height": 1.2,
            "ground_layer_filter": 3
        }"#,
    )
    .unwrap();

    assert_eq!(loaded.speed_base, 8.0);
    assert_eq!(loaded.ride_height, 1.2);
    assert_eq!(loaded.ground_layer_filter, 3);
    assert_eq!(loaded.levitator_stiffness, MovementConfig::default().levitator_stiffness);
    assert_eq!(loaded.validate(), Ok(()));
}

#[test]
fn loaded_config_is_validated_at_initialization() {
    let loaded: MovementConfig =
        serde_json::from_str(r#"{ "gravity_multiplier": -2.0 }"#).unwrap();

    let mut lifecycle = DoofusLifecycle::new();
    let result = lifecycle.initialize(
        Some(&loaded),
        Some(&MoveInput::default()),
        SpawnPose::default(),
    );

    assert_eq!(
        result,
        Err(LifecycleError::InvalidConfig(
            ConfigError::NonPositiveGravityMultiplier(-2.0)
        ))
    );
    assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
}
