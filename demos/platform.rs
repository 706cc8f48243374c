//! Platform Example
//!
//! A playable doofus hovering over a row of floating platforms.
//!
//! ## Controls
//! - **WASD** or **Arrow keys**: Move
//! - **Space**: Start the game
//! - **R**: Reset the doofus to its spawn point
//!
//! Falling off the platforms kills the doofus; press R to respawn and Space
//! to go again. The camera follows the doofus.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use doofus_controller::prelude::*;

// ==================== Constants ====================

const DOOFUS_RADIUS: f32 = 0.5;
const PLATFORM_SIZE: f32 = 6.0;
const PLATFORM_THICKNESS: f32 = 0.5;
const PLATFORM_GAP: f32 = 1.5;
const PLATFORM_COUNT: usize = 5;

const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 7.0, 12.0);

/// Marker for the player-controlled doofus.
#[derive(Component)]
struct Player;

// ==================== Main ====================

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Platform - Doofus Controller Example".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        // Physics stepped in FixedUpdate next to the controller
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
        .add_plugins(RapierDebugRenderPlugin::default())
        // Doofus controller
        .add_plugins(DoofusControllerPlugin::<Rapier3dBackend>::default())
        .insert_resource(Time::<Fixed>::from_hz(50.0))
        .insert_resource(TimestepMode::Fixed {
            dt: 1.0 / 50.0,
            substeps: 1,
        })
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (read_keyboard, game_keys, log_deaths, follow_camera),
        )
        .run();
}

// ==================== Setup ====================

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    spawn_platforms(&mut commands, &mut meshes, &mut materials);
    spawn_player(&mut commands, &mut meshes, &mut materials);

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(CAMERA_OFFSET).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Text::new("WASD: Move | Space: Start | R: Reset"),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
    ));
}

fn spawn_platforms(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Cuboid::new(
        PLATFORM_SIZE,
        PLATFORM_THICKNESS,
        PLATFORM_SIZE,
    ));
    let material = materials.add(Color::srgb(0.35, 0.45, 0.3));

    // A row of platforms along -Z, the direction W moves
    for i in 0..PLATFORM_COUNT {
        let z = -(i as f32) * (PLATFORM_SIZE + PLATFORM_GAP);
        commands.spawn((
            Transform::from_xyz(0.0, -PLATFORM_THICKNESS / 2.0, z),
            RigidBody::Fixed,
            Collider::cuboid(
                PLATFORM_SIZE / 2.0,
                PLATFORM_THICKNESS / 2.0,
                PLATFORM_SIZE / 2.0,
            ),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
        ));
    }
}

fn spawn_player(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Sphere::new(DOOFUS_RADIUS));
    let material = materials.add(Color::srgb(0.2, 0.6, 0.9));

    commands.spawn((
        Player,
        Transform::from_xyz(0.0, 1.3, 0.0),
        Mesh3d(mesh),
        MeshMaterial3d(material),
        DoofusBundle::new(MovementConfig::default()),
        Rapier3dDoofusBundle::new(),
        Collider::ball(DOOFUS_RADIUS),
        ColliderMassProperties::Mass(1.0),
    ));
}

// ==================== Input ====================

/// Map the keyboard onto the player's move input.
///
/// The camera looks down `-Z`, so "up" on the keyboard is `-Z` in the world
/// and the input `y` axis (world `z`) is flipped.
fn read_keyboard(keys: Res<ButtonInput<KeyCode>>, mut q_input: Query<&mut MoveInput, With<Player>>) {
    let axis = |positive: [KeyCode; 2], negative: [KeyCode; 2]| -> f32 {
        let pressed = |codes: [KeyCode; 2]| codes.iter().any(|k| keys.pressed(*k));
        (pressed(positive) as i32 - pressed(negative) as i32) as f32
    };

    let x = axis(
        [KeyCode::KeyD, KeyCode::ArrowRight],
        [KeyCode::KeyA, KeyCode::ArrowLeft],
    );
    let y = axis(
        [KeyCode::KeyS, KeyCode::ArrowDown],
        [KeyCode::KeyW, KeyCode::ArrowUp],
    );

    for mut input in &mut q_input {
        input.set(Vec2::new(x, y));
    }
}

fn game_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut started: EventWriter<GameStarted>,
    mut reset: EventWriter<ResetDoofus>,
) {
    if keys.just_pressed(KeyCode::Space) {
        started.write(GameStarted);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        reset.write(ResetDoofus::all());
    }
}

fn log_deaths(mut died: EventReader<DoofusDied>, q_lifecycle: Query<&DoofusLifecycle>) {
    for event in died.read() {
        let deaths = q_lifecycle
            .get(event.entity)
            .map(DoofusLifecycle::deaths)
            .unwrap_or_default();
        info!(
            "Doofus fell at {:?} (deaths: {}), press R to respawn",
            event.position, deaths
        );
    }
}

// ==================== Camera ====================

fn follow_camera(
    q_player: Query<&Transform, (With<Player>, Without<Camera3d>)>,
    mut q_camera: Query<&mut Transform, With<Camera3d>>,
) {
    let Ok(player) = q_player.single() else {
        return;
    };
    let Ok(mut camera) = q_camera.single_mut() else {
        return;
    };

    let target = player.translation;
    camera.translation = camera.translation.lerp(target + CAMERA_OFFSET, 0.1);
    camera.look_at(target, Vec3::Y);
}
