//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Walking entities are driven through Rapier's `KinematicCharacterController`,
//! so their accumulated displacement is swept against the scene instead of
//! teleported. Its `grounded` output is what feeds [`GroundContact`].
//! Plain [`GravityBody`](crate::config::GravityBody) entities are dynamic
//! bodies whose `Velocity` receives the field's acceleration.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::{BindingError, GravityPhysicsBackend};
use crate::orientation::GravityOrientation;
use crate::state::GroundContact;
use crate::GravityStepSet;

/// Rapier3D physics backend for the gravity controller.
pub struct Rapier3dBackend;

impl GravityPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn check_binding(world: &World, entity: Entity) -> Result<(), BindingError> {
        if world.get::<Transform>(entity).is_none() {
            return Err(BindingError::MissingTransform);
        }
        let has_body = world.get::<KinematicCharacterController>(entity).is_some()
            || world.get::<RigidBody>(entity).is_some();
        if !has_body {
            return Err(BindingError::MissingPhysicsBody);
        }
        Ok(())
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
        if let Some(mut controller) = world.get_mut::<KinematicCharacterController>(entity) {
            controller.up = (rotation * Vec3::Y).normalize_or(Vec3::Y);
        }
    }

    fn apply_displacement(world: &mut World, entity: Entity, displacement: Vec3) {
        if let Some(mut controller) = world.get_mut::<KinematicCharacterController>(entity) {
            // Accumulate: Rapier consumes and clears the translation once per physics step.
            let pending = controller.translation.unwrap_or(Vec3::ZERO);
            controller.translation = Some(pending + displacement);
        } else if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += displacement;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the gravity controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            sync_ground_contact.in_set(GravityStepSet::Contact),
        );
        app.add_systems(
            FixedUpdate,
            sync_controller_up.in_set(GravityStepSet::Apply),
        );
    }
}

/// Copy the character controller's last `grounded` output into [`GroundContact`].
pub fn sync_ground_contact(
    mut q_controllers: Query<(&KinematicCharacterControllerOutput, &mut GroundContact)>,
) {
    for (output, mut contact) in &mut q_controllers {
        if contact.grounded != output.grounded {
            contact.set(output.grounded);
        }
    }
}

/// Point the character controller's `up` along the entity's gravity frame, so
/// slope limits and ground snapping are measured against the local surface.
pub fn sync_controller_up(
    mut q_controllers: Query<(&GravityOrientation, &mut KinematicCharacterController)>,
) {
    for (orientation, mut controller) in &mut q_controllers {
        controller.up = orientation.up();
    }
}

/// Bundle for a surface-walking character moved by Rapier3D.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use gravity_well::prelude::*;
/// use gravity_well::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 11.0, 0.0),
///         GravityOrientation::default(),
///         LocomotionConfig::player(),
///         LocomotionState::default(),
///         GroundContact::default(),
///         MovementIntent::default(),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.4),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::KinematicPositionBased`]
/// - `controller`: snaps to ground within 0.2 units, slides along walls
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// Kinematic body moved by the character controller.
    pub rigid_body: RigidBody,
    /// Sweeps the controller's displacement against the scene.
    pub controller: KinematicCharacterController,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// Create a character bundle with ground snapping enabled.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            controller: KinematicCharacterController {
                snap_to_ground: Some(CharacterLength::Absolute(0.2)),
                offset: CharacterLength::Absolute(0.02),
                slide: true,
                ..default()
            },
        }
    }

    /// Set the distance within which the character is pulled onto the ground.
    /// `None` disables ground snapping.
    pub fn with_snap_to_ground(mut self, distance: Option<f32>) -> Self {
        self.controller.snap_to_ground = distance.map(CharacterLength::Absolute);
        self
    }

    /// Set the steepest slope (radians) the character can walk up.
    pub fn with_max_slope(mut self, angle: f32) -> Self {
        self.controller.max_slope_climb_angle = angle;
        self
    }
}

/// Bundle for a dynamic body pulled by the gravity registry instead of
/// Rapier's global gravity.
///
/// Pair it with [`GravityBody`](crate::config::GravityBody).
#[derive(Bundle)]
pub struct Rapier3dBodyBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    /// Zero so only the registry's gravity acts on the body.
    pub gravity_scale: GravityScale,
    pub damping: Damping,
}

impl Default for Rapier3dBodyBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dBodyBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            gravity_scale: GravityScale(0.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.5,
            },
        }
    }

    /// Set the damping coefficients for velocity reduction.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }
}
