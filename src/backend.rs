//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! drive gravity-aligned entities. The controller systems decide *what* should
//! happen (displacements, rotations, accelerations); the backend decides *how*
//! it reaches the physics engine.
//!
//! [`KinematicBackend`] ships with the crate and moves entities by writing
//! their `Transform` directly. It needs no physics engine and is what the
//! tests run against.

use bevy::prelude::*;
use thiserror::Error;

use crate::GravityStepSet;

/// Why an entity cannot be driven by a backend.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    #[error("entity has no Transform")]
    MissingTransform,
    #[error("entity has no physics body the backend can move")]
    MissingPhysicsBody,
    #[error("entity has a LocomotionConfig but no LocomotionState")]
    MissingLocomotionState,
}

/// Trait for physics backend implementations.
///
/// All methods are static and operate on the `World`, so the controller's
/// exclusive systems can call them in any order.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use gravity_well::prelude::*;
///
/// fn spawn_without_physics_engine(mut commands: Commands) {
///     // KinematicBackend only needs a Transform.
///     commands.spawn((Transform::from_xyz(0.0, 11.0, 0.0), GravityOrientation::default()));
/// }
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(GravityControllerPlugin::<KinematicBackend>::default())
///     .add_systems(Startup, spawn_without_physics_engine);
/// ```
pub trait GravityPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Check that `entity` carries everything this backend needs.
    fn check_binding(world: &World, entity: Entity) -> Result<(), BindingError>;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Teleport an entity, bypassing collision.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Get the current rotation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Set the rotation of an entity.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Move an entity by `displacement` this step.
    ///
    /// Called once per step with the controller's accumulated movement.
    /// Collision-aware backends may shorten it.
    fn apply_displacement(world: &mut World, entity: Entity, displacement: Vec3);

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Accelerate an entity for one step of `dt` seconds.
    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3, dt: f32) {
        let velocity = Self::get_velocity(world, entity);
        Self::set_velocity(world, entity, velocity + acceleration * dt);
    }

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Linear velocity integrated by [`KinematicBackend`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Deref, DerefMut)]
#[reflect(Component)]
pub struct LinearVelocity(pub Vec3);

/// Transform-only backend without a physics engine.
///
/// Displacements and rotations are written straight into `Transform`.
/// Entities with a [`LinearVelocity`] are integrated once per step after the
/// controller has run. Ground contact is not detected; whatever writes
/// [`GroundContact`](crate::state::GroundContact) decides it.
pub struct KinematicBackend;

impl GravityPhysicsBackend for KinematicBackend {
    fn plugin() -> impl Plugin {
        KinematicBackendPlugin
    }

    fn check_binding(world: &World, entity: Entity) -> Result<(), BindingError> {
        if world.get::<Transform>(entity).is_none() {
            return Err(BindingError::MissingTransform);
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
    }

    fn apply_displacement(world: &mut World, entity: Entity, displacement: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += displacement;
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<LinearVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut linvel) = world.get_mut::<LinearVelocity>(entity) {
            linvel.0 = velocity;
        }
    }
}

/// Plugin that integrates [`LinearVelocity`] for [`KinematicBackend`].
pub struct KinematicBackendPlugin;

impl Plugin for KinematicBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<LinearVelocity>();
        app.add_systems(
            FixedUpdate,
            integrate_linear_velocity.in_set(GravityStepSet::Apply),
        );
    }
}

/// Move entities by their [`LinearVelocity`] for one fixed step.
pub fn integrate_linear_velocity(
    time: Res<Time<Fixed>>,
    mut q_bodies: Query<(&LinearVelocity, &mut Transform)>,
) {
    let dt = Some(time.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0);
    for (velocity, mut transform) in &mut q_bodies {
        transform.translation += velocity.0 * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinematic_binding_requires_transform() {
        let mut world = World::new();
        let bound = world.spawn(Transform::default()).id();
        let unbound = world.spawn_empty().id();

        assert_eq!(KinematicBackend::check_binding(&world, bound), Ok(()));
        assert_eq!(
            KinematicBackend::check_binding(&world, unbound),
            Err(BindingError::MissingTransform)
        );
    }

    #[test]
    fn kinematic_displacement_and_rotation() {
        let mut world = World::new();
        let entity = world.spawn(Transform::from_xyz(1.0, 2.0, 3.0)).id();

        KinematicBackend::apply_displacement(&mut world, entity, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(KinematicBackend::get_position(&world, entity), Vec3::new(2.0, 2.0, 2.0));

        let rotation = Quat::from_rotation_z(1.0);
        KinematicBackend::set_rotation(&mut world, entity, rotation);
        assert_eq!(KinematicBackend::get_rotation(&world, entity), rotation);

        KinematicBackend::set_position(&mut world, entity, Vec3::ZERO);
        assert_eq!(KinematicBackend::get_position(&world, entity), Vec3::ZERO);
    }

    #[test]
    fn kinematic_acceleration_changes_velocity() {
        let mut world = World::new();
        let entity = world
            .spawn((Transform::default(), LinearVelocity(Vec3::X)))
            .id();

        KinematicBackend::apply_acceleration(&mut world, entity, Vec3::new(0.0, -10.0, 0.0), 0.5);
        assert_eq!(
            KinematicBackend::get_velocity(&world, entity),
            Vec3::new(1.0, -5.0, 0.0)
        );
    }

    #[test]
    fn velocity_of_entity_without_component_is_zero() {
        let mut world = World::new();
        let entity = world.spawn(Transform::default()).id();
        KinematicBackend::set_velocity(&mut world, entity, Vec3::ONE);
        assert_eq!(KinematicBackend::get_velocity(&world, entity), Vec3::ZERO);
    }

    #[test]
    fn fixed_timestep_falls_back_without_time() {
        let world = World::new();
        assert!((KinematicBackend::get_fixed_timestep(&world) - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn backend_plugin_integrates_linear_velocity() {
        let mut app = App::new();
        app.add_plugins(KinematicBackend::plugin());
        app.init_resource::<Time<Fixed>>();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), LinearVelocity(Vec3::new(60.0, 0.0, 0.0))))
            .id();

        app.world_mut().run_schedule(FixedUpdate);

        let position = KinematicBackend::get_position(app.world(), entity);
        assert!((position - Vec3::X).length() < 1e-4, "got {position}");
    }

    #[test]
    fn binding_error_messages() {
        assert_eq!(BindingError::MissingTransform.to_string(), "entity has no Transform");
    }
}
