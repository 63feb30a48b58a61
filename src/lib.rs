//! # `gravity_well`
//!
//! Multi-source gravity, frame alignment and surface locomotion for Bevy 3D.
//!
//! This crate lets characters walk around small planets:
//! - Gravity fields register in a shared registry; the nearest in-range field
//!   governs each point
//! - Tracked entities snap to a new field's gravity on transition and align
//!   smoothly while inside it
//! - Move input is projected onto the tangent plane of the local up
//! - A separate vertical velocity handles jumping, falling and landing
//! - An optional surface clamp keeps walkers at a fixed radius from the planet
//! - A follow camera keeps the horizon level with the ground under the target
//! - Physics goes through a backend trait (kinematic and Rapier3D included)
//! - Optional debug gizmos draw fields and each entity's link to its field
//!
//! ## Architecture
//!
//! Every fixed step runs the [`GravityStepSet`] sets in order:
//! 1. Snapshot all [`GravityField`](field::GravityField) entities into the
//!    [`GravityFieldRegistry`](registry::GravityFieldRegistry)
//! 2. Read ground contact from the physics backend
//! 3. Detect field changes and snap to the new gravity
//! 4. Sample gravity at each entity and update its
//!    [`GravityOrientation`](orientation::GravityOrientation)
//! 5. Align rotations, integrate vertical velocity and tangent movement
//! 6. Clamp to the surface and hand the displacement to the backend
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use gravity_well::prelude::*;
//!
//! // A planet
//! let planet = (Transform::default(), GravityField::spherical(9.81, 30.0));
//!
//! // A walker standing on it
//! let config = LocomotionConfig::player();
//! let walker = (
//!     Transform::from_xyz(0.0, 11.0, 0.0),
//!     GravityOrientation::default(),
//!     config,
//!     LocomotionState::new(&config),
//!     GroundContact::default(),
//!     MovementIntent::default(),
//!     SurfaceClamp::new(11.0),
//! );
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod config;
pub mod field;
pub mod gizmos;
pub mod intent;
pub mod orientation;
pub mod registry;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{BindingError, GravityPhysicsBackend, KinematicBackend, LinearVelocity};
    pub use crate::camera::{CameraLook, FollowCamera};
    pub use crate::config::{GravityBody, LocomotionConfig, SurfaceClamp};
    pub use crate::field::{FieldShape, GravityField, GravityFieldError};
    pub use crate::gizmos::{GravityGizmos, GravityGizmosPlugin};
    pub use crate::intent::MovementIntent;
    pub use crate::orientation::GravityOrientation;
    pub use crate::registry::{GravityFieldChanged, GravityFieldRegistry};
    pub use crate::state::{
        Airborne, GravityDiagnostics, GroundContact, Grounded, LocomotionPhase, LocomotionState,
        Unbound,
    };
    pub use crate::{GravityControllerPlugin, GravityStepSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// Ordered phases of one fixed gravity step.
///
/// Backends and user code can hook into these, e.g. a custom collision
/// observer writing [`GroundContact`](state::GroundContact) in `Contact`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GravityStepSet {
    /// Snapshot fields, validate bindings, reset per-step state.
    SyncFields,
    /// Ground contact is written.
    Contact,
    /// Field-change detection and snapping.
    FieldChange,
    /// Gravity sampled into each entity's frame.
    Sample,
    /// Rotation alignment and gravity bodies.
    Align,
    /// Grounded/Airborne state and vertical velocity.
    Vertical,
    /// Tangent-plane movement.
    Move,
    /// Surface clamp.
    Clamp,
    /// Accumulated movement handed to the physics backend.
    Apply,
    /// State markers and diagnostics.
    Markers,
}

/// Main plugin for gravity resolution and surface locomotion.
///
/// This plugin is generic over a physics backend `B` which moves and rotates
/// the entities.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use gravity_well::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(GravityControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct GravityControllerPlugin<B: backend::GravityPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::GravityPhysicsBackend> Default for GravityControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::GravityPhysicsBackend> Plugin for GravityControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<field::GravityField>();
        app.register_type::<field::FieldShape>();
        app.register_type::<orientation::GravityOrientation>();
        app.register_type::<config::LocomotionConfig>();
        app.register_type::<config::SurfaceClamp>();
        app.register_type::<config::GravityBody>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<state::LocomotionState>();
        app.register_type::<state::GroundContact>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Unbound>();
        app.register_type::<state::GravityDiagnostics>();
        app.register_type::<camera::FollowCamera>();
        app.register_type::<camera::CameraLook>();

        app.init_resource::<registry::GravityFieldRegistry>();
        app.add_event::<registry::GravityFieldChanged>();

        app.configure_sets(
            FixedUpdate,
            (
                GravityStepSet::SyncFields,
                GravityStepSet::Contact,
                GravityStepSet::FieldChange,
                GravityStepSet::Sample,
                GravityStepSet::Align,
                GravityStepSet::Vertical,
                GravityStepSet::Move,
                GravityStepSet::Clamp,
                GravityStepSet::Apply,
                GravityStepSet::Markers,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                (
                    registry::sync_gravity_fields,
                    systems::validate_bindings::<B>,
                    systems::begin_locomotion_step,
                )
                    .chain()
                    .in_set(GravityStepSet::SyncFields),
                systems::detect_field_changes::<B>.in_set(GravityStepSet::FieldChange),
                systems::sample_gravity::<B>.in_set(GravityStepSet::Sample),
                (
                    systems::align_to_gravity::<B>,
                    systems::apply_gravity_to_bodies::<B>,
                )
                    .chain()
                    .in_set(GravityStepSet::Align),
                systems::update_vertical_velocity.in_set(GravityStepSet::Vertical),
                systems::apply_surface_movement::<B>.in_set(GravityStepSet::Move),
                systems::apply_surface_clamp::<B>.in_set(GravityStepSet::Clamp),
                systems::apply_displacements::<B>.in_set(GravityStepSet::Apply),
                (systems::sync_state_markers, systems::update_diagnostics)
                    .in_set(GravityStepSet::Markers),
            ),
        );

        // Reset movement requests at end of fixed update
        app.add_systems(FixedPostUpdate, systems::reset_movement_requests);

        // Camera reads the step's result once per frame
        app.add_systems(
            PostUpdate,
            (camera::follow_camera, camera::apply_camera_view_to_intent)
                .chain()
                .before(bevy::transform::TransformSystem::TransformPropagate),
        );
    }
}
