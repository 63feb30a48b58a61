//! Core controller systems.
//!
//! These systems implement one fixed step of gravity resolution, frame
//! alignment and surface locomotion. Systems that touch the physics engine
//! are exclusive and generic over the backend; pure state updates are
//! ordinary systems.
//!
//! Per-step order (see [`GravityStepSet`](crate::GravityStepSet)):
//! sync fields → ground contact → field change + snap → sample gravity →
//! align → vertical velocity → tangent movement → surface clamp → apply →
//! state markers.

use bevy::prelude::*;

use crate::backend::{BindingError, GravityPhysicsBackend};
use crate::config::{GravityBody, LocomotionConfig, SurfaceClamp};
use crate::field::FieldShape;
use crate::intent::MovementIntent;
use crate::orientation::{
    align_rotation, clamp_to_radius, face_direction, snap_rotation, tangent_move_direction,
    GravityOrientation,
};
use crate::registry::{GravityFieldChanged, GravityFieldRegistry};
use crate::state::{
    Airborne, GravityDiagnostics, GroundContact, Grounded, LocomotionState, Unbound,
};

fn fixed_delta(time: &Time<Fixed>) -> f32 {
    Some(time.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0)
}

/// Check every gravity-driven entity against the backend.
///
/// An entity that fails is reported once and marked [`Unbound`], which every
/// other system skips. The check is repeated each step without logging, and
/// the marker is removed as soon as it passes.
pub fn validate_bindings<B: GravityPhysicsBackend>(world: &mut World) {
    let candidates: Vec<(Entity, bool, bool, bool)> = world
        .query_filtered::<
            (Entity, Has<Unbound>, Has<LocomotionConfig>, Has<LocomotionState>),
            Or<(With<GravityOrientation>, With<GravityBody>)>,
        >()
        .iter(world)
        .collect();

    for (entity, is_unbound, has_config, has_state) in candidates {
        let result = B::check_binding(world, entity).and_then(|()| {
            if has_config && !has_state {
                Err(BindingError::MissingLocomotionState)
            } else {
                Ok(())
            }
        });

        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            continue;
        };
        match result {
            Err(err) if !is_unbound => {
                warn!("gravity entity {entity} excluded from simulation: {err}");
                entity_mut.insert(Unbound);
            }
            Ok(()) if is_unbound => {
                info!("gravity entity {entity} is bound again");
                entity_mut.remove::<Unbound>();
            }
            _ => {}
        }
    }
}

/// Reset per-step locomotion bookkeeping.
pub fn begin_locomotion_step(mut q_states: Query<&mut LocomotionState>) {
    for mut state in &mut q_states {
        state.begin_step();
    }
}

/// Detect governing-field changes and snap to the new gravity.
///
/// Each tracked entity is checked against the registry exactly once per step.
/// On a change a [`GravityFieldChanged`] event is sent and the entity's
/// rotation snaps so its up is exactly opposite the new gravity. Leaving every
/// field is a change too, but has no direction to snap to. A manual snap
/// requested through [`MovementIntent::request_snap`] realigns to the current
/// gravity without a change.
pub fn detect_field_changes<B: GravityPhysicsBackend>(world: &mut World) {
    if !world.contains_resource::<GravityFieldRegistry>() {
        return;
    }

    let tracked: Vec<(Entity, bool)> = world
        .query_filtered::<(Entity, Option<&MovementIntent>), (With<GravityOrientation>, Without<Unbound>)>()
        .iter(world)
        .map(|(e, intent)| (e, intent.is_some_and(|i| i.snap_requested())))
        .collect();

    let mut changes = Vec::new();
    let mut snaps = Vec::new();
    world.resource_scope(|world, mut registry: Mut<GravityFieldRegistry>| {
        for (entity, snap_requested) in tracked {
            let position = B::get_position(world, entity);
            match registry.detect_field_change(entity, position) {
                Some(change) => {
                    changes.push(GravityFieldChanged {
                        entity,
                        previous: change.previous,
                        current: change.current,
                        gravity_direction: change.gravity_direction,
                    });
                    snaps.push((entity, change.gravity_direction));
                }
                None if snap_requested => {
                    snaps.push((entity, registry.gravity_direction_at(position)));
                }
                None => {}
            }
        }
    });

    for change in changes {
        if let Some(mut diagnostics) = world.get_mut::<GravityDiagnostics>(change.entity) {
            diagnostics.field_changes += 1;
        }
        world.send_event(change);
    }

    for (entity, gravity_direction) in snaps {
        let rotation = B::get_rotation(world, entity);
        let Some(snapped) = snap_rotation(rotation, gravity_direction) else {
            continue;
        };
        B::set_rotation(world, entity, snapped);
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.snapped_this_step = true;
        }
    }
}

/// Sample the registry at each tracked entity and refresh its frame.
pub fn sample_gravity<B: GravityPhysicsBackend>(world: &mut World) {
    if !world.contains_resource::<GravityFieldRegistry>() {
        return;
    }

    let tracked: Vec<Entity> = world
        .query_filtered::<Entity, (With<GravityOrientation>, Without<Unbound>)>()
        .iter(world)
        .collect();

    world.resource_scope(|world, registry: Mut<GravityFieldRegistry>| {
        for entity in tracked {
            let position = B::get_position(world, entity);
            let (direction, magnitude, active_field) = match registry.closest_field(position) {
                Some(entry) => (
                    entry.direction_at(position),
                    entry.field.strength(),
                    Some(entry.id),
                ),
                None => (Vec3::ZERO, 0.0, None),
            };
            if let Some(mut orientation) = world.get_mut::<GravityOrientation>(entity) {
                orientation.update(direction, magnitude, active_field);
            }
        }
    });
}

/// Turn each tracked entity's up toward its frame's up.
///
/// Skipped without gravity and on steps where a snap already aligned the
/// entity.
pub fn align_to_gravity<B: GravityPhysicsBackend>(world: &mut World) {
    let default_rate = LocomotionConfig::default().alignment_rate;
    let entities: Vec<(Entity, Vec3, f32)> = world
        .query_filtered::<(
            Entity,
            &GravityOrientation,
            Option<&LocomotionConfig>,
            Option<&LocomotionState>,
        ), Without<Unbound>>()
        .iter(world)
        .filter(|(_, orientation, _, state)| {
            orientation.has_gravity() && !state.is_some_and(|s| s.snapped_this_step())
        })
        .map(|(e, orientation, config, _)| {
            let rate = config.map(|c| c.alignment_rate).unwrap_or(default_rate);
            (e, orientation.up(), rate)
        })
        .collect();

    let dt = B::get_fixed_timestep(world);

    for (entity, up, rate) in entities {
        let rotation = B::get_rotation(world, entity);
        B::set_rotation(world, entity, align_rotation(rotation, up, rate, dt));
    }
}

/// Pull [`GravityBody`] entities with the gravity at their position.
///
/// Bodies that also carry a [`GravityOrientation`] are aligned by
/// [`align_to_gravity`]; the rest align here when `align_rotation` is set.
pub fn apply_gravity_to_bodies<B: GravityPhysicsBackend>(world: &mut World) {
    if !world.contains_resource::<GravityFieldRegistry>() {
        return;
    }

    let bodies: Vec<(Entity, GravityBody, bool)> = world
        .query_filtered::<(Entity, &GravityBody, Has<GravityOrientation>), Without<Unbound>>()
        .iter(world)
        .map(|(e, body, has_orientation)| (e, *body, has_orientation))
        .collect();

    let dt = B::get_fixed_timestep(world);

    world.resource_scope(|world, registry: Mut<GravityFieldRegistry>| {
        for (entity, body, has_orientation) in bodies {
            let position = B::get_position(world, entity);
            let Some(entry) = registry.closest_field(position) else {
                continue;
            };

            let acceleration = entry.gravity_at(position) * body.gravity_scale;
            if acceleration != Vec3::ZERO {
                B::apply_acceleration(world, entity, acceleration, dt);
            }

            if body.align_rotation && !has_orientation {
                let up = -entry.direction_at(position);
                if up != Vec3::ZERO {
                    let rotation = B::get_rotation(world, entity);
                    B::set_rotation(
                        world,
                        entity,
                        align_rotation(rotation, up, body.alignment_rate, dt),
                    );
                }
            }
        }
    });
}

/// Advance the Grounded/Airborne state machine and vertical velocity.
///
/// Observes [`GroundContact`] first, then either takes an escape launch (only
/// inside a field) or integrates gravity and jump requests.
pub fn update_vertical_velocity(
    time: Res<Time<Fixed>>,
    mut q_controllers: Query<
        (
            Entity,
            &LocomotionConfig,
            &GravityOrientation,
            &mut LocomotionState,
            Option<&GroundContact>,
            Option<&MovementIntent>,
        ),
        Without<Unbound>,
    >,
) {
    let dt = fixed_delta(&time);

    for (entity, config, orientation, mut state, contact, intent) in &mut q_controllers {
        let contact = contact.is_some_and(|c| c.grounded);
        if let Some(phase) = state.observe_contact(contact, config) {
            debug!("entity {entity} is now {phase:?}");
        }

        let launch = intent.is_some_and(|i| i.launch_requested());
        let jump = intent.is_some_and(|i| i.jump_requested());

        if launch && orientation.active_field().is_some() {
            state.launch(config);
            debug!("entity {entity} launched");
        } else if state.update_vertical(config, orientation.gravity_magnitude(), jump, dt) {
            debug!("entity {entity} jumped");
        }
    }
}

/// Turn movement intent into a tangent-plane displacement.
///
/// The move input is oriented by the intent's view basis (or the entity's own
/// axes), flattened onto the plane orthogonal to up and scaled by the walk or
/// sprint speed. The vertical velocity adds a component along up. With
/// `face_movement` the entity also turns toward its move direction.
pub fn apply_surface_movement<B: GravityPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionConfig, Vec3, MovementIntent, f32)> = world
        .query_filtered::<(
            Entity,
            &LocomotionConfig,
            &GravityOrientation,
            Option<&MovementIntent>,
            &LocomotionState,
        ), Without<Unbound>>()
        .iter(world)
        .map(|(e, config, orientation, intent, state)| {
            (
                e,
                *config,
                orientation.up(),
                intent.copied().unwrap_or_default(),
                state.vertical_velocity(),
            )
        })
        .collect();

    let dt = B::get_fixed_timestep(world);

    for (entity, config, up, intent, vertical_velocity) in entities {
        let rotation = B::get_rotation(world, entity);
        let view_forward = intent.view_forward.unwrap_or(rotation * Vec3::NEG_Z);
        let view_right = intent.view_right.unwrap_or(rotation * Vec3::X);

        let direction = tangent_move_direction(view_forward, view_right, up, intent.move_axis);
        let has_input = direction != Vec3::ZERO;
        let speed = config.speed(has_input, intent.sprint) * intent.move_axis.length().min(1.0);

        let displacement = direction * speed * dt + up * vertical_velocity * dt;

        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.move_direction = direction;
            state.add_displacement(displacement);
        }

        if config.face_movement && has_input {
            B::set_rotation(
                world,
                entity,
                face_direction(rotation, direction, up, config.turn_rate, dt),
            );
        }
    }
}

/// Pull [`SurfaceClamp`] entities back toward their target radius.
///
/// The correction is added to the step's displacement, so it goes through the
/// backend like any other movement. While grounded the clamp owns the radial
/// axis: the stick velocity's push along up is dropped first, so the walker
/// rests exactly on the target radius. Skipped without an active field, for
/// directional fields (which have no center), and while airborne when the
/// clamp is grounded-only.
pub fn apply_surface_clamp<B: GravityPhysicsBackend>(world: &mut World) {
    if !world.contains_resource::<GravityFieldRegistry>() {
        return;
    }

    let entities: Vec<(Entity, SurfaceClamp, Entity, Vec3, bool)> = world
        .query_filtered::<(
            Entity,
            &SurfaceClamp,
            &GravityOrientation,
            &LocomotionState,
        ), Without<Unbound>>()
        .iter(world)
        .filter(|(_, clamp, orientation, state)| {
            orientation.has_gravity() && (!clamp.grounded_only || state.is_grounded())
        })
        .filter_map(|(e, clamp, orientation, state)| {
            orientation
                .active_field()
                .map(|field| (e, *clamp, field, orientation.up(), state.is_grounded()))
        })
        .collect();

    let dt = B::get_fixed_timestep(world);

    world.resource_scope(|world, registry: Mut<GravityFieldRegistry>| {
        for (entity, clamp, field, up, grounded) in entities {
            let Some(entry) = registry.get(field) else {
                continue;
            };
            if !matches!(entry.field.shape(), FieldShape::Spherical) {
                continue;
            }

            let position = B::get_position(world, entity);
            let Some(mut state) = world.get_mut::<LocomotionState>(entity) else {
                continue;
            };
            if grounded {
                state.remove_pending_along(up);
            }
            let moved = position + state.pending_displacement();
            let clamped =
                clamp_to_radius(moved, entry.position, clamp.target_radius, clamp.rate, dt);
            state.add_displacement(clamped - moved);
        }
    });
}

/// Hand each entity's accumulated displacement to the backend.
pub fn apply_displacements<B: GravityPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<LocomotionState>, Without<Unbound>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let displacement = match world.get_mut::<LocomotionState>(entity) {
            Some(mut state) => state.finalize_step(),
            None => continue,
        };
        if displacement != Vec3::ZERO {
            B::apply_displacement(world, entity, displacement);
        }
    }
}

/// Sync state marker components based on the locomotion phase.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &LocomotionState, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, state, has_grounded, has_airborne) in &q_controllers {
        if state.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !state.is_grounded() && has_grounded {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        } else if !state.is_grounded() && !has_airborne && !has_grounded {
            commands.entity(entity).insert(Airborne);
        }
    }
}

/// Refresh [`GravityDiagnostics`] snapshots.
pub fn update_diagnostics(
    mut q_diagnostics: Query<(
        &GravityOrientation,
        Option<&LocomotionState>,
        &mut GravityDiagnostics,
    )>,
) {
    for (orientation, state, mut diagnostics) in &mut q_diagnostics {
        diagnostics.gravity_direction = orientation.gravity_direction();
        diagnostics.gravity_magnitude = orientation.gravity_magnitude();
        diagnostics.active_field = orientation.active_field();
        diagnostics.grounded = state.is_some_and(|s| s.is_grounded());
        diagnostics.free_falling = state.is_some_and(|s| s.is_free_falling());
        diagnostics.vertical_velocity = state.map(|s| s.vertical_velocity()).unwrap_or(0.0);
    }
}

/// Clear per-step movement requests at the end of each fixed step.
pub fn reset_movement_requests(mut q: Query<&mut MovementIntent>) {
    for mut intent in &mut q {
        if intent.jump_requested() || intent.launch_requested() || intent.snap_requested() {
            intent.clear_requests();
        }
    }
}
