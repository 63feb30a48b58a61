//! Planet Hop Example
//!
//! A playable example with a character walking between two small planets:
//! - Each planet has its own spherical gravity field; the nearest one wins
//! - The character snaps to the new planet's gravity when it crosses over
//! - The camera keeps the horizon level with the ground under the player
//! - A few loose boulders fall toward whichever planet they are closest to
//! - Gizmos show field ranges and the player's link to its planet (G toggles)
//!
//! ## Controls
//! - **W/A/S/D**: Move relative to the camera
//! - **Shift** (hold): Sprint
//! - **Space**: Jump
//! - **E**: Escape launch (leave the planet)
//! - **R**: Snap upright to the current gravity
//! - **G**: Toggle gravity gizmos
//! - **Mouse**: Orbit the camera

use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin, EguiPrimaryContextPass};
use bevy_rapier3d::prelude::*;
use gravity_well::prelude::*;
use gravity_well::rapier::{Rapier3dBodyBundle, Rapier3dCharacterBundle};

// ==================== Constants ====================

const HOME_RADIUS: f32 = 10.0;
const HOME_CENTER: Vec3 = Vec3::ZERO;
const HOME_GRAVITY: f32 = 9.81;

const MOON_RADIUS: f32 = 6.0;
const MOON_CENTER: Vec3 = Vec3::new(34.0, 8.0, 0.0);
const MOON_GRAVITY: f32 = 4.0;

const PLAYER_HALF_HEIGHT: f32 = 0.5;
const PLAYER_RADIUS: f32 = 0.4;

const MOUSE_SENSITIVITY: f32 = 0.003;

// ==================== Components ====================

#[derive(Component)]
struct Player;

// ==================== Main ====================

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Planet Hop - Gravity Well Example".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        // Physics
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        // Gravity controller
        .add_plugins(GravityControllerPlugin::<Rapier3dBackend>::default())
        .add_plugins(GravityGizmosPlugin)
        // Egui for diagnostics UI
        .add_plugins(EguiPlugin::default())
        // Systems
        .add_systems(Startup, (setup, disable_rapier_gravity))
        .add_systems(
            Update,
            (player_input, camera_input, toggle_gizmos, log_field_changes),
        )
        .add_systems(EguiPrimaryContextPass, diagnostics_ui)
        .run();
}

// ==================== Setup ====================

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Light
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(20.0, 40.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    spawn_planet(
        &mut commands,
        &mut meshes,
        &mut materials,
        HOME_CENTER,
        HOME_RADIUS,
        HOME_GRAVITY,
        Color::srgb(0.3, 0.6, 0.3),
    );
    spawn_planet(
        &mut commands,
        &mut meshes,
        &mut materials,
        MOON_CENTER,
        MOON_RADIUS,
        MOON_GRAVITY,
        Color::srgb(0.6, 0.6, 0.65),
    );

    let player = spawn_player(&mut commands, &mut meshes, &mut materials);

    // Boulders between the planets
    for offset in [Vec3::new(16.0, 2.0, 3.0), Vec3::new(20.0, 6.0, -2.0), Vec3::new(0.0, 14.0, 4.0)] {
        commands.spawn((
            Mesh3d(meshes.add(Sphere::new(0.5))),
            MeshMaterial3d(materials.add(Color::srgb(0.5, 0.35, 0.2))),
            Transform::from_translation(offset),
            GravityBody::default(),
            Rapier3dBodyBundle::new().with_damping(0.1, 0.5),
            Collider::ball(0.5),
        ));
    }

    // Camera
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, HOME_RADIUS + 4.0, 8.0),
        FollowCamera::new(player).with_look_sensitivity(MOUSE_SENSITIVITY),
        CameraLook::default(),
    ));

    // UI instructions
    commands.spawn((
        Text::new("WASD: Move | Shift: Sprint | Space: Jump | E: Launch | R: Snap | G: Gizmos | Mouse: Look"),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        Pickable::IGNORE,
    ));
}

fn spawn_planet(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    center: Vec3,
    radius: f32,
    gravity: f32,
    color: Color,
) {
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(radius))),
        MeshMaterial3d(materials.add(color)),
        Transform::from_translation(center),
        RigidBody::Fixed,
        Collider::ball(radius),
        // Reach well past the surface so jumps stay inside the field
        GravityField::spherical(gravity, radius * 3.0),
    ));
}

fn spawn_player(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> Entity {
    let config = LocomotionConfig::player();
    commands
        .spawn((
            Player,
            Mesh3d(meshes.add(Capsule3d::new(PLAYER_RADIUS, PLAYER_HALF_HEIGHT * 2.0))),
            MeshMaterial3d(materials.add(Color::srgb(0.9, 0.5, 0.2))),
            Transform::from_translation(
                HOME_CENTER + Vec3::Y * (HOME_RADIUS + PLAYER_HALF_HEIGHT + PLAYER_RADIUS + 1.0),
            ),
            GravityOrientation::default(),
            config,
            LocomotionState::new(&config),
            GroundContact::default(),
            MovementIntent::default(),
            GravityDiagnostics::default(),
            Rapier3dCharacterBundle::new(),
            Collider::capsule_y(PLAYER_HALF_HEIGHT, PLAYER_RADIUS),
        ))
        .id()
}

/// Only the gravity registry pulls things in this scene.
fn disable_rapier_gravity(mut q_config: Query<&mut RapierConfiguration>) {
    for mut config in &mut q_config {
        config.gravity = Vec3::ZERO;
    }
}

// ==================== Input ====================

fn player_input(keys: Res<ButtonInput<KeyCode>>, mut q_player: Query<&mut MovementIntent, With<Player>>) {
    let Ok(mut intent) = q_player.single_mut() else {
        return;
    };

    let mut axis = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        axis.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        axis.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        axis.x += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        axis.x -= 1.0;
    }
    intent.set_move(axis);
    intent.set_sprint(keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]));

    if keys.just_pressed(KeyCode::Space) {
        intent.request_jump();
    }
    if keys.just_pressed(KeyCode::KeyE) {
        intent.request_launch();
    }
    if keys.just_pressed(KeyCode::KeyR) {
        intent.request_snap();
    }
}

fn camera_input(
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut q_camera: Query<(&FollowCamera, &mut CameraLook)>,
) {
    let delta = mouse_motion.delta;
    if delta == Vec2::ZERO {
        return;
    }
    for (camera, mut look) in &mut q_camera {
        look.add(-delta.x, delta.y, camera);
    }
}

fn toggle_gizmos(keys: Res<ButtonInput<KeyCode>>, mut settings: ResMut<GravityGizmos>) {
    if keys.just_pressed(KeyCode::KeyG) {
        settings.enabled = !settings.enabled;
    }
}

fn log_field_changes(mut events: EventReader<GravityFieldChanged>, q_player: Query<(), With<Player>>) {
    for event in events.read() {
        if q_player.contains(event.entity) {
            info!(
                "player moved from field {:?} to {:?}",
                event.previous, event.current
            );
        }
    }
}

// ==================== UI ====================

fn diagnostics_ui(
    mut contexts: EguiContexts,
    mut q_player: Query<
        (
            &mut LocomotionConfig,
            &GravityDiagnostics,
            &LocomotionState,
            &Transform,
        ),
        With<Player>,
    >,
    mut frame_count: Local<u32>,
) {
    let Ok((mut config, diagnostics, state, transform)) = q_player.single_mut() else {
        return;
    };

    // Skip the first few frames to ensure egui is fully initialized
    *frame_count += 1;
    if *frame_count <= 2 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Window::new("Gravity")
        .default_pos([10.0, 10.0])
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.collapsing("Diagnostics", |ui| {
                ui.label(format!(
                    "Position: ({:.1}, {:.1}, {:.1})",
                    transform.translation.x, transform.translation.y, transform.translation.z
                ));
                ui.label(format!(
                    "Gravity dir: ({:.2}, {:.2}, {:.2})",
                    diagnostics.gravity_direction.x,
                    diagnostics.gravity_direction.y,
                    diagnostics.gravity_direction.z
                ));
                ui.label(format!("Gravity: {:.2} m/s²", diagnostics.gravity_magnitude));
                ui.label(match diagnostics.active_field {
                    Some(field) => format!("Field: {field}"),
                    None => "Field: none (drifting)".to_string(),
                });
                ui.label(format!("Field changes: {}", diagnostics.field_changes));
                ui.label(format!(
                    "State: {:?}{}",
                    state.phase(),
                    if diagnostics.free_falling { " (free fall)" } else { "" }
                ));
                ui.label(format!("Vertical velocity: {:.2}", diagnostics.vertical_velocity));
            });

            ui.collapsing("Locomotion", |ui| {
                ui.add(egui::Slider::new(&mut config.move_speed, 0.5..=10.0).text("Walk speed"));
                ui.add(egui::Slider::new(&mut config.sprint_speed, 1.0..=20.0).text("Sprint speed"));
                ui.add(egui::Slider::new(&mut config.jump_height, 0.1..=5.0).text("Jump height"));
                ui.add(egui::Slider::new(&mut config.launch_speed, 5.0..=40.0).text("Launch speed"));
                ui.add(
                    egui::Slider::new(&mut config.alignment_rate, 0.5..=30.0).text("Alignment rate"),
                );
                ui.checkbox(&mut config.face_movement, "Face movement");
                if ui.button("Reset to Defaults").clicked() {
                    *config = LocomotionConfig::player();
                }
            });
        });
}
