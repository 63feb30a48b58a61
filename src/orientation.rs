//! Gravity-relative reference frames and rotation alignment.
//!
//! [`GravityOrientation`] is the per-entity frame derived from the registry
//! each step. The free functions in this module are the pure math behind
//! snapping, damped alignment and tangent-plane projection; the systems call
//! them, and they are usable on their own.

use bevy::prelude::*;

/// Forward axis used when an entity's own forward collapses onto its up.
pub const FALLBACK_FORWARD: Vec3 = Vec3::NEG_Z;

/// Below this squared length a projected vector is treated as degenerate.
const DEGENERATE_EPSILON: f32 = 1e-8;

/// The gravity frame an entity currently lives in.
///
/// Updated once per fixed step from the gravity registry. While a field is in
/// range, `up` is exactly the negated gravity direction at the entity. With no
/// field in range, `up` keeps its last value and the gravity direction and
/// magnitude are zero.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct GravityOrientation {
    up: Vec3,
    gravity_direction: Vec3,
    gravity_magnitude: f32,
    active_field: Option<Entity>,
}

impl Default for GravityOrientation {
    fn default() -> Self {
        Self {
            up: Vec3::Y,
            gravity_direction: Vec3::ZERO,
            gravity_magnitude: 0.0,
            active_field: None,
        }
    }
}

impl GravityOrientation {
    /// Create a frame with the given up direction and no active field.
    ///
    /// The vector is normalized. If zero-length, defaults to `Vec3::Y`.
    pub fn new(up: Vec3) -> Self {
        let normalized = up.normalize_or_zero();
        Self {
            up: if normalized == Vec3::ZERO {
                Vec3::Y
            } else {
                normalized
            },
            ..default()
        }
    }

    /// Record the gravity sampled at the entity this step.
    ///
    /// A zero direction leaves `up` untouched.
    pub fn update(&mut self, direction: Vec3, magnitude: f32, active_field: Option<Entity>) {
        let direction = direction.normalize_or_zero();
        self.gravity_direction = direction;
        self.active_field = active_field;
        if direction == Vec3::ZERO {
            self.gravity_magnitude = 0.0;
        } else {
            self.gravity_magnitude = magnitude.max(0.0);
            self.up = -direction;
        }
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[inline]
    pub fn down(&self) -> Vec3 {
        -self.up
    }

    /// Unit gravity direction, zero when no field is in range.
    #[inline]
    pub fn gravity_direction(&self) -> Vec3 {
        self.gravity_direction
    }

    #[inline]
    pub fn gravity_magnitude(&self) -> f32 {
        self.gravity_magnitude
    }

    /// Gravity acceleration vector.
    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.gravity_direction * self.gravity_magnitude
    }

    #[inline]
    pub fn active_field(&self) -> Option<Entity> {
        self.active_field
    }

    /// Whether a field governs the entity this step.
    #[inline]
    pub fn has_gravity(&self) -> bool {
        self.gravity_direction != Vec3::ZERO
    }

    /// Project a world vector onto the tangent plane, keeping its length.
    pub fn flatten(&self, v: Vec3) -> Vec3 {
        project_on_plane(v, self.up)
    }

    /// Split a world vector into (tangent part, signed component along up).
    pub fn decompose(&self, v: Vec3) -> (Vec3, f32) {
        let along = v.dot(self.up);
        (v - self.up * along, along)
    }
}

/// Remove the component of `v` along `normal` (which must be unit length).
#[inline]
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Project `v` onto the plane orthogonal to `normal` and normalize, or
/// return zero when the projection collapses.
#[inline]
pub fn project_on_plane_normalized(v: Vec3, normal: Vec3) -> Vec3 {
    let projected = project_on_plane(v, normal);
    if projected.length_squared() < DEGENERATE_EPSILON {
        Vec3::ZERO
    } else {
        projected.normalize()
    }
}

/// Rotation whose local `-Z` looks along `forward` and local `+Y` is `up`.
///
/// `forward` must already be orthogonal-ish to `up`; it is re-orthogonalized
/// here. Degenerate input falls back through [`tangent_forward`].
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let up = up.normalize_or_zero();
    if up == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let forward = tangent_forward(forward, up);
    let right = forward.cross(up).normalize();
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize()
}

/// Forward direction confined to the plane orthogonal to `up`.
///
/// Tries `preferred`, then [`FALLBACK_FORWARD`], then any axis orthogonal to
/// `up`, so the result is always a unit vector.
pub fn tangent_forward(preferred: Vec3, up: Vec3) -> Vec3 {
    let forward = project_on_plane_normalized(preferred, up);
    if forward != Vec3::ZERO {
        return forward;
    }
    let forward = project_on_plane_normalized(FALLBACK_FORWARD, up);
    if forward != Vec3::ZERO {
        return forward;
    }
    up.any_orthonormal_vector()
}

/// Instant reorientation to a new gravity direction.
///
/// Keeps the entity's heading as far as the new tangent plane allows. Returns
/// `None` when `gravity_direction` is zero.
pub fn snap_rotation(current: Quat, gravity_direction: Vec3) -> Option<Quat> {
    let up = -gravity_direction.normalize_or_zero();
    if up == Vec3::ZERO {
        return None;
    }
    let forward = current * Vec3::NEG_Z;
    Some(look_rotation(forward, up))
}

/// Interpolation factor for exponential smoothing at `rate` per second.
///
/// Frame-rate independent: two steps of `dt` land where one step of `2 * dt`
/// would. Always in `[0, 1]`.
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    if rate <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}

/// Damped alignment of `current`'s local up toward `target_up`.
///
/// Composes the shortest-arc rotation from the current up to the target up
/// with the current rotation and slerps toward it. A zero target leaves the
/// rotation unchanged.
pub fn align_rotation(current: Quat, target_up: Vec3, rate: f32, dt: f32) -> Quat {
    let target_up = target_up.normalize_or_zero();
    if target_up == Vec3::ZERO {
        return current;
    }
    let current_up = (current * Vec3::Y).normalize();
    let target = Quat::from_rotation_arc(current_up, target_up) * current;
    current.slerp(target, smoothing_factor(rate, dt)).normalize()
}

/// Damped turn about `up` so the entity faces `direction`.
///
/// Only the heading changes; a zero or vertical `direction` leaves the
/// rotation unchanged.
pub fn face_direction(current: Quat, direction: Vec3, up: Vec3, rate: f32, dt: f32) -> Quat {
    let up = up.normalize_or_zero();
    let direction = project_on_plane_normalized(direction, up);
    if up == Vec3::ZERO || direction == Vec3::ZERO {
        return current;
    }
    let target = look_rotation(direction, up);
    current.slerp(target, smoothing_factor(rate, dt)).normalize()
}

/// World-space move direction confined to the tangent plane of `up`.
///
/// `view_forward` and `view_right` are flattened onto the plane and
/// renormalized, then combined with the 2D `input` (`x` = right, `y` =
/// forward). The result is unit length, or zero without input or when the
/// view axes collapse.
pub fn tangent_move_direction(view_forward: Vec3, view_right: Vec3, up: Vec3, input: Vec2) -> Vec3 {
    if input == Vec2::ZERO {
        return Vec3::ZERO;
    }
    let forward = project_on_plane_normalized(view_forward, up);
    let right = project_on_plane_normalized(view_right, up);
    let combined = forward * input.y + right * input.x;
    // Re-project: flattened forward and right are each tangent, but keep the
    // sum exactly on the plane against accumulated rounding.
    project_on_plane_normalized(combined, up)
}

/// Damped correction of `position` toward `target_radius` from `center`.
///
/// Interpolates between the current and the on-surface position by
/// `smoothing_factor(rate, dt)`, so the distance to `center` moves
/// monotonically toward the target without overshooting. Returns `position`
/// unchanged when it coincides with `center`.
pub fn clamp_to_radius(position: Vec3, center: Vec3, target_radius: f32, rate: f32, dt: f32) -> Vec3 {
    let offset = position - center;
    let outward = offset.normalize_or_zero();
    if outward == Vec3::ZERO {
        return position;
    }
    let on_surface = center + outward * target_radius.max(0.0);
    position.lerp(on_surface, smoothing_factor(rate, dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-4;

    #[test]
    fn orientation_default_is_world_up() {
        let orientation = GravityOrientation::default();
        assert_eq!(orientation.up(), Vec3::Y);
        assert_eq!(orientation.down(), Vec3::NEG_Y);
        assert!(!orientation.has_gravity());
    }

    #[test]
    fn orientation_new_normalizes_input() {
        let orientation = GravityOrientation::new(Vec3::new(0.0, 0.0, 5.0));
        assert!((orientation.up() - Vec3::Z).length() < EPS);
        assert_eq!(GravityOrientation::new(Vec3::ZERO).up(), Vec3::Y);
    }

    #[test]
    fn orientation_update_keeps_up_without_gravity() {
        let mut orientation = GravityOrientation::default();
        orientation.update(Vec3::NEG_X, 9.81, Some(Entity::from_raw(1)));
        assert_eq!(orientation.up(), Vec3::X);
        assert_eq!(orientation.gravity(), Vec3::NEG_X * 9.81);

        orientation.update(Vec3::ZERO, 9.81, None);
        assert_eq!(orientation.up(), Vec3::X);
        assert_eq!(orientation.gravity_magnitude(), 0.0);
        assert_eq!(orientation.active_field(), None);
    }

    #[test]
    fn decompose_splits_tangent_and_vertical() {
        let orientation = GravityOrientation::new(Vec3::Y);
        let (tangent, along) = orientation.decompose(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(tangent, Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(along, 2.0);
    }

    #[test]
    fn look_rotation_builds_requested_basis() {
        let q = look_rotation(Vec3::X, Vec3::Y);
        assert!((q * Vec3::NEG_Z - Vec3::X).length() < EPS);
        assert!((q * Vec3::Y - Vec3::Y).length() < EPS);

        let q = look_rotation(Vec3::new(0.3, 0.0, -1.0), Vec3::X);
        assert!((q * Vec3::Y - Vec3::X).length() < EPS);
        assert!((q * Vec3::NEG_Z).dot(Vec3::X).abs() < EPS);
    }

    #[test]
    fn tangent_forward_falls_back_when_degenerate() {
        // Preferred forward parallel to up: fall back to world forward.
        let forward = tangent_forward(Vec3::Y, Vec3::Y);
        assert!((forward - Vec3::NEG_Z).length() < EPS);

        // Both preferred and world forward parallel to up: any orthogonal axis.
        let forward = tangent_forward(Vec3::Z, Vec3::Z);
        assert!((forward.length() - 1.0).abs() < EPS);
        assert!(forward.dot(Vec3::Z).abs() < EPS);
    }

    #[test]
    fn snap_sets_up_exactly() {
        let current = Quat::IDENTITY;
        let snapped = snap_rotation(current, Vec3::NEG_X).expect("direction is defined");
        assert!((snapped * Vec3::Y - Vec3::X).length() < EPS);
        // Heading is preserved where possible.
        assert!((snapped * Vec3::NEG_Z - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn snap_without_gravity_is_none() {
        assert!(snap_rotation(Quat::IDENTITY, Vec3::ZERO).is_none());
    }

    #[test]
    fn snap_handles_forward_parallel_to_new_up() {
        // Entity looks along -Z; new up is +Z, so its forward collapses.
        let snapped = snap_rotation(Quat::IDENTITY, Vec3::NEG_Z).expect("direction is defined");
        let up = snapped * Vec3::Y;
        assert!((up - Vec3::Z).length() < EPS);
        assert!(!snapped.is_nan());
    }

    #[test]
    fn smoothing_factor_is_bounded() {
        assert_eq!(smoothing_factor(10.0, 0.0), 0.0);
        assert_eq!(smoothing_factor(0.0, 1.0), 0.0);
        let t = smoothing_factor(10.0, 1.0 / 60.0);
        assert!(t > 0.0 && t < 1.0);
        assert!(smoothing_factor(1.0e6, 1.0) <= 1.0);
    }

    #[test]
    fn alignment_converges_monotonically() {
        let target_up = Vec3::X;
        let dt = 1.0 / 60.0;
        let mut rotation = Quat::IDENTITY;
        let mut previous_cos = (rotation * Vec3::Y).dot(target_up);
        let mut steps = 0;
        while previous_cos < 1.0 - 1e-5 {
            rotation = align_rotation(rotation, target_up, 10.0, dt);
            let cos = (rotation * Vec3::Y).dot(target_up);
            assert!(
                cos > previous_cos,
                "step {steps}: cosine did not increase ({previous_cos} -> {cos})"
            );
            previous_cos = cos;
            steps += 1;
            assert!(steps < 200, "alignment did not converge in 200 steps");
        }
    }

    #[test]
    fn alignment_handles_opposite_up() {
        let rotation = align_rotation(Quat::IDENTITY, Vec3::NEG_Y, 10.0, 1.0 / 60.0);
        assert!(!rotation.is_nan());
        assert!((rotation * Vec3::Y).dot(Vec3::NEG_Y) > -1.0);
    }

    #[test]
    fn alignment_is_noop_when_aligned_or_without_target() {
        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        let aligned = align_rotation(rotation, Vec3::Y, 10.0, 1.0 / 60.0);
        assert!(aligned.angle_between(rotation) < EPS);

        let unchanged = align_rotation(rotation, Vec3::ZERO, 10.0, 1.0 / 60.0);
        assert_eq!(unchanged, rotation);
    }

    #[test]
    fn tangent_movement_stays_tangent() {
        let ups = [
            Vec3::Y,
            Vec3::X,
            Vec3::new(1.0, 1.0, 0.0).normalize(),
            Vec3::new(-0.3, 0.2, 0.9).normalize(),
        ];
        let views = [
            (Vec3::NEG_Z, Vec3::X),
            (Vec3::new(0.5, -0.5, -1.0).normalize(), Vec3::new(1.0, 0.2, 0.3).normalize()),
        ];
        let inputs = [Vec2::Y, Vec2::X, Vec2::new(-0.7, 0.7), Vec2::new(1.0, -1.0)];
        for up in ups {
            for (forward, right) in views {
                for input in inputs {
                    let dir = tangent_move_direction(forward, right, up, input);
                    assert!(dir.dot(up).abs() < EPS, "not tangent: {dir} vs up {up}");
                    if dir != Vec3::ZERO {
                        assert!((dir.length() - 1.0).abs() < EPS);
                    }
                }
            }
        }
    }

    #[test]
    fn tangent_movement_without_input_is_zero() {
        assert_eq!(tangent_move_direction(Vec3::NEG_Z, Vec3::X, Vec3::Y, Vec2::ZERO), Vec3::ZERO);
    }

    #[test]
    fn face_direction_turns_about_up_only() {
        let dt = 1.0 / 60.0;
        let mut rotation = Quat::IDENTITY;
        for _ in 0..300 {
            rotation = face_direction(rotation, Vec3::X, Vec3::Y, 10.0, dt);
        }
        assert!((rotation * Vec3::NEG_Z - Vec3::X).length() < 1e-3);
        assert!((rotation * Vec3::Y - Vec3::Y).length() < 1e-3);
    }

    #[test]
    fn clamp_converges_without_overshoot() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let dt = 1.0 / 60.0;
        for start_radius in [2.0_f32, 9.0, 10.5, 25.0] {
            let mut position = center + Vec3::new(1.0, 1.0, 0.0).normalize() * start_radius;
            let mut previous_error = (start_radius - 10.0).abs();
            for _ in 0..200 {
                position = clamp_to_radius(position, center, 10.0, 10.0, dt);
                let radius = position.distance(center);
                let error = radius - 10.0;
                // Never crosses the target radius.
                assert!(error.signum() == (start_radius - 10.0).signum() || error.abs() < EPS);
                assert!(error.abs() <= previous_error + EPS);
                previous_error = error.abs();
            }
            assert!(previous_error < 1e-3, "did not converge from {start_radius}");
        }
    }

    #[test]
    fn clamp_at_center_is_noop() {
        let center = Vec3::ONE;
        assert_eq!(clamp_to_radius(center, center, 10.0, 10.0, 0.1), center);
    }
}
