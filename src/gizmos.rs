//! Debug gizmos for gravity fields and tracked entities.
//!
//! Opt-in through [`GravityGizmosPlugin`]. Draws each field's influence
//! sphere, a grounded indicator at every walker and a line from each tracked
//! entity to the center of the field governing it. Requires Bevy's gizmo
//! plugin (part of `DefaultPlugins`).

use bevy::prelude::*;

use crate::orientation::GravityOrientation;
use crate::registry::GravityFieldRegistry;
use crate::state::LocomotionState;

/// Adds [`draw_gravity_gizmos`] and its [`GravityGizmos`] settings.
#[derive(Default)]
pub struct GravityGizmosPlugin;

impl Plugin for GravityGizmosPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<GravityGizmos>();
        app.init_resource::<GravityGizmos>();
        app.add_systems(PostUpdate, draw_gravity_gizmos);
    }
}

/// What the gravity gizmos draw, and in which colors.
#[derive(Resource, Reflect, Debug, Clone, Copy)]
#[reflect(Resource)]
pub struct GravityGizmos {
    pub enabled: bool,
    /// Wire sphere at each field's influence radius.
    pub draw_fields: bool,
    /// Line from each tracked entity to its field's center.
    pub draw_links: bool,
    /// Grounded/airborne sphere at each walker.
    pub draw_contact: bool,
    pub contact_radius: f32,
    pub field_color: Color,
    pub link_color: Color,
    pub grounded_color: Color,
    pub airborne_color: Color,
}

impl Default for GravityGizmos {
    fn default() -> Self {
        Self {
            enabled: true,
            draw_fields: true,
            draw_links: true,
            draw_contact: true,
            contact_radius: 0.2,
            field_color: Color::srgba(0.2, 0.6, 1.0, 0.5),
            link_color: Color::srgb(1.0, 0.9, 0.2),
            grounded_color: Color::srgba(0.0, 1.0, 0.0, 0.35),
            airborne_color: Color::srgba(1.0, 0.0, 0.0, 0.35),
        }
    }
}

impl GravityGizmos {
    /// Indicator color for a walker's contact state.
    pub fn contact_color(&self, grounded: bool) -> Color {
        if grounded {
            self.grounded_color
        } else {
            self.airborne_color
        }
    }
}

/// Center of the field governing a tracked entity, if it has one that is
/// still registered.
pub fn gravity_link(registry: &GravityFieldRegistry, orientation: &GravityOrientation) -> Option<Vec3> {
    orientation
        .active_field()
        .and_then(|field| registry.get(field))
        .map(|entry| entry.position)
}

/// Draw field spheres, contact indicators and gravity links.
pub fn draw_gravity_gizmos(
    mut gizmos: Gizmos,
    settings: Res<GravityGizmos>,
    registry: Option<Res<GravityFieldRegistry>>,
    q_tracked: Query<(&Transform, &GravityOrientation, Option<&LocomotionState>)>,
) {
    if !settings.enabled {
        return;
    }
    let Some(registry) = registry else {
        return;
    };

    if settings.draw_fields {
        for entry in registry.iter() {
            gizmos.sphere(
                entry.position,
                entry.field.influence_radius(),
                settings.field_color,
            );
        }
    }

    for (transform, orientation, state) in &q_tracked {
        let position = transform.translation;

        if settings.draw_links {
            if let Some(center) = gravity_link(&registry, orientation) {
                gizmos.line(position, center, settings.link_color);
            }
        }

        if settings.draw_contact {
            if let Some(state) = state {
                gizmos.sphere(
                    position - orientation.up() * settings.contact_radius,
                    settings.contact_radius,
                    settings.contact_color(state.is_grounded()),
                );
            }
        }
    }
}
