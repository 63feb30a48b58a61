//! Gravity-aligned follow camera.
//!
//! The camera sits behind and above its target in the target's gravity frame
//! and looks at it with the gravity "up" as its own up, so the horizon follows
//! the planet under the target's feet. It only reads the registry.

use bevy::prelude::*;

use crate::intent::MovementIntent;
use crate::orientation::{project_on_plane_normalized, smoothing_factor, tangent_forward};
use crate::registry::GravityFieldRegistry;

/// Follow camera settings. Put it on the camera entity.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FollowCamera {
    /// Entity to follow.
    pub target: Entity,
    /// Distance behind the target.
    pub distance: f32,
    /// Height above the target along its up.
    pub height: f32,
    /// Damping rate of the position follow.
    pub follow_speed: f32,
    /// Damping rate of the look rotation.
    pub rotation_speed: f32,
    /// Lowest orbit pitch in radians.
    pub min_pitch: f32,
    /// Highest orbit pitch in radians.
    pub max_pitch: f32,
    /// Radians of orbit per unit of look input.
    pub look_sensitivity: f32,
    /// Write the camera's flattened axes into the target's
    /// [`MovementIntent`] view, so input moves relative to the camera.
    pub drive_intent: bool,
}

impl FollowCamera {
    pub fn new(target: Entity) -> Self {
        Self {
            target,
            distance: 6.0,
            height: 2.0,
            follow_speed: 5.0,
            rotation_speed: 5.0,
            min_pitch: (-30.0_f32).to_radians(),
            max_pitch: 70.0_f32.to_radians(),
            look_sensitivity: 1.0,
            drive_intent: true,
        }
    }

    /// Builder: set distance and height.
    pub fn with_offset(mut self, distance: f32, height: f32) -> Self {
        self.distance = distance;
        self.height = height;
        self
    }

    /// Builder: set follow and rotation damping rates.
    pub fn with_speeds(mut self, follow_speed: f32, rotation_speed: f32) -> Self {
        self.follow_speed = follow_speed;
        self.rotation_speed = rotation_speed;
        self
    }

    /// Builder: set how far one unit of look input turns the orbit.
    pub fn with_look_sensitivity(mut self, sensitivity: f32) -> Self {
        self.look_sensitivity = sensitivity;
        self
    }

    /// Builder: leave the target's movement view alone.
    pub fn without_intent_view(mut self) -> Self {
        self.drive_intent = false;
        self
    }

    /// Where the camera wants to be for a target at `target_position`.
    ///
    /// The rest offset is `distance` behind the target's flattened forward
    /// and `height` along `up`, then orbited by `look`.
    pub fn desired_position(
        &self,
        target_position: Vec3,
        target_rotation: Quat,
        up: Vec3,
        look: CameraLook,
    ) -> Vec3 {
        let forward = tangent_forward(target_rotation * Vec3::NEG_Z, up);
        let right = forward.cross(up).normalize_or_zero();
        let offset = -forward * self.distance + up * self.height;

        let pitch = look.pitch.clamp(self.min_pitch, self.max_pitch);
        let orbit = Quat::from_axis_angle(up, look.yaw) * Quat::from_axis_angle(right, -pitch);
        target_position + orbit * offset
    }
}

/// Orbit input for a [`FollowCamera`], in radians.
///
/// Positive `pitch` raises the camera above its rest offset. Positive `yaw`
/// turns it counter-clockwise around the target's up.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct CameraLook {
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraLook {
    /// Add look input scaled by the camera's sensitivity, clamping pitch to
    /// the camera's range.
    pub fn add(&mut self, delta_yaw: f32, delta_pitch: f32, camera: &FollowCamera) {
        let sensitivity = camera.look_sensitivity;
        self.yaw = (self.yaw + delta_yaw * sensitivity) % std::f32::consts::TAU;
        self.pitch = (self.pitch + delta_pitch * sensitivity).clamp(camera.min_pitch, camera.max_pitch);
    }
}

/// Rotation looking exactly along `forward` with `up` as close to `up` as
/// possible. `None` when `forward` is zero or parallel to `up`.
pub fn look_at_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let forward = forward.normalize_or_zero();
    let right = forward.cross(up).normalize_or_zero();
    if right == Vec3::ZERO {
        return None;
    }
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

/// Move and turn every [`FollowCamera`] toward its target.
///
/// Up comes from the registry's gravity at the target, falling back to the
/// target's own up outside every field.
pub fn follow_camera(
    time: Res<Time>,
    registry: Option<Res<GravityFieldRegistry>>,
    q_targets: Query<&Transform, Without<FollowCamera>>,
    mut q_cameras: Query<(&FollowCamera, Option<&CameraLook>, &mut Transform)>,
) {
    let dt = time.delta_secs();

    for (camera, look, mut transform) in &mut q_cameras {
        let Ok(target) = q_targets.get(camera.target) else {
            continue;
        };

        let gravity_up = registry
            .as_ref()
            .map(|r| -r.gravity_direction_at(target.translation))
            .unwrap_or(Vec3::ZERO);
        let up = if gravity_up == Vec3::ZERO {
            target.rotation * Vec3::Y
        } else {
            gravity_up
        };

        let desired = camera.desired_position(
            target.translation,
            target.rotation,
            up,
            look.copied().unwrap_or_default(),
        );
        transform.translation = transform
            .translation
            .lerp(desired, smoothing_factor(camera.follow_speed, dt));

        if let Some(look_rotation) = look_at_rotation(target.translation - transform.translation, up)
        {
            transform.rotation = transform
                .rotation
                .slerp(look_rotation, smoothing_factor(camera.rotation_speed, dt))
                .normalize();
        }
    }
}

/// Feed each camera's flattened forward and right into its target's
/// [`MovementIntent`].
pub fn apply_camera_view_to_intent(
    q_cameras: Query<(&FollowCamera, &Transform)>,
    mut q_intents: Query<(&mut MovementIntent, &Transform), Without<FollowCamera>>,
) {
    for (camera, camera_transform) in &q_cameras {
        if !camera.drive_intent {
            continue;
        }
        let Ok((mut intent, target)) = q_intents.get_mut(camera.target) else {
            continue;
        };
        let up = target.rotation * Vec3::Y;
        let forward = project_on_plane_normalized(camera_transform.rotation * Vec3::NEG_Z, up);
        let right = project_on_plane_normalized(camera_transform.rotation * Vec3::X, up);
        if forward == Vec3::ZERO || right == Vec3::ZERO {
            continue;
        }
        intent.set_view(forward, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn camera() -> FollowCamera {
        FollowCamera::new(Entity::from_raw(1))
    }

    #[test]
    fn rest_position_is_behind_and_above() {
        let desired =
            camera().desired_position(Vec3::ZERO, Quat::IDENTITY, Vec3::Y, CameraLook::default());
        // Forward is -Z, so behind is +Z.
        assert!((desired - Vec3::new(0.0, 2.0, 6.0)).length() < EPS, "got {desired}");
    }

    #[test]
    fn rest_position_follows_gravity_up() {
        // Standing on the +X side of a planet: up is +X.
        let target = Vec3::new(10.0, 0.0, 0.0);
        let desired =
            camera().desired_position(target, Quat::IDENTITY, Vec3::X, CameraLook::default());
        let offset = desired - target;
        assert!((offset.dot(Vec3::X) - 2.0).abs() < EPS);
        assert!((offset.length_squared() - (36.0 + 4.0)).abs() < 1e-3);
    }

    #[test]
    fn positive_pitch_raises_camera() {
        let cam = camera();
        let rest = cam.desired_position(Vec3::ZERO, Quat::IDENTITY, Vec3::Y, CameraLook::default());
        let raised = cam.desired_position(
            Vec3::ZERO,
            Quat::IDENTITY,
            Vec3::Y,
            CameraLook {
                yaw: 0.0,
                pitch: 0.5,
            },
        );
        assert!(raised.y > rest.y);
        // Orbit keeps distance to target.
        assert!((raised.length() - rest.length()).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped() {
        let cam = camera();
        let mut look = CameraLook::default();
        look.add(0.0, 10.0, &cam);
        assert_eq!(look.pitch, cam.max_pitch);
        look.add(0.0, -20.0, &cam);
        assert_eq!(look.pitch, cam.min_pitch);
    }

    #[test]
    fn look_input_scales_with_sensitivity() {
        let cam = camera().with_look_sensitivity(0.01);
        let mut look = CameraLook::default();
        look.add(20.0, 10.0, &cam);
        assert!((look.yaw - 0.2).abs() < EPS);
        assert!((look.pitch - 0.1).abs() < EPS);

        let mut raw = CameraLook::default();
        raw.add(0.2, 0.1, &camera());
        assert!((raw.yaw - look.yaw).abs() < EPS);
        assert!((raw.pitch - look.pitch).abs() < EPS);
    }

    #[test]
    fn look_at_rotation_points_forward() {
        let rotation = look_at_rotation(Vec3::new(1.0, -1.0, 0.0), Vec3::Y).expect("not degenerate");
        let forward = rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::new(1.0, -1.0, 0.0).normalize()).length() < EPS);
        assert!((rotation * Vec3::Y).dot(Vec3::Y) > 0.0);
    }

    #[test]
    fn look_at_rotation_degenerate() {
        assert!(look_at_rotation(Vec3::ZERO, Vec3::Y).is_none());
        assert!(look_at_rotation(Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn follow_camera_system_converges() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.init_resource::<GravityFieldRegistry>();
        app.add_systems(Update, follow_camera);

        let target = app
            .world_mut()
            .spawn(Transform::from_xyz(0.0, 10.0, 0.0))
            .id();
        let camera = app
            .world_mut()
            .spawn((FollowCamera::new(target), Transform::from_xyz(50.0, 50.0, 50.0)))
            .id();

        for _ in 0..10 {
            app.update();
        }

        // MinimalPlugins time advances by real elapsed time, so only check
        // that the camera moved toward its goal.
        let position = app
            .world()
            .get::<Transform>(camera)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO);
        let goal = Vec3::new(0.0, 12.0, 6.0);
        assert!(position.distance(goal) <= Vec3::splat(50.0).distance(goal));
    }
}
