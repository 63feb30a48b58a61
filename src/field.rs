//! Gravity field components.
//!
//! A [`GravityField`] is a located, bounded source of gravitational
//! acceleration. Its position is the owning entity's `Transform`; the field
//! itself only stores strength, reach and shape.

use bevy::prelude::*;
use thiserror::Error;

/// Shape of a gravity field, deciding which way it pulls.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum FieldShape {
    /// Pulls toward the field's center (planets, moons, asteroids).
    Spherical,
    /// Pulls along a fixed world direction anywhere inside the influence
    /// sphere (gravity platforms, artificial decks).
    Directional {
        /// Direction of the pull. Normalized on use.
        direction: Vec3,
    },
}

impl Default for FieldShape {
    fn default() -> Self {
        Self::Spherical
    }
}

/// Errors raised when validating a gravity field descriptor.
#[derive(Debug, Error, PartialEq)]
pub enum GravityFieldError {
    #[error("gravity strength must be non-negative, got {0}")]
    NegativeStrength(f32),
    #[error("influence radius must be positive, got {0}")]
    NonPositiveRadius(f32),
    #[error("gravity field parameters must be finite")]
    NonFinite,
}

/// A source of gravity located at its entity's transform.
///
/// The field pulls anything within `influence_radius` of its position.
/// When several fields overlap, the registry picks the closest one; fields
/// never accumulate.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use gravity_well::prelude::*;
///
/// let field = GravityField::spherical(9.81, 30.0);
/// let g = field.gravity_at(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0));
/// assert!((g - Vec3::new(0.0, -9.81, 0.0)).length() < 1e-5);
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct GravityField {
    /// Acceleration magnitude imposed inside the field (units/s²).
    strength: f32,
    /// Maximum distance from the field's position at which it is active.
    influence_radius: f32,
    /// How the field pulls.
    shape: FieldShape,
}

impl Default for GravityField {
    fn default() -> Self {
        Self::planet()
    }
}

impl GravityField {
    /// Create a validated field.
    pub fn try_new(
        strength: f32,
        influence_radius: f32,
        shape: FieldShape,
    ) -> Result<Self, GravityFieldError> {
        if !strength.is_finite() || !influence_radius.is_finite() {
            return Err(GravityFieldError::NonFinite);
        }
        if let FieldShape::Directional { direction } = shape {
            if !direction.is_finite() {
                return Err(GravityFieldError::NonFinite);
            }
        }
        if strength < 0.0 {
            return Err(GravityFieldError::NegativeStrength(strength));
        }
        if influence_radius <= 0.0 {
            return Err(GravityFieldError::NonPositiveRadius(influence_radius));
        }
        Ok(Self {
            strength,
            influence_radius,
            shape,
        })
    }

    /// Create a spherical field.
    ///
    /// Negative strength is clamped to zero and the radius to a small
    /// positive minimum.
    pub fn spherical(strength: f32, influence_radius: f32) -> Self {
        Self {
            strength: strength.max(0.0),
            influence_radius: influence_radius.max(f32::EPSILON),
            shape: FieldShape::Spherical,
        }
    }

    /// Create a directional field pulling along `direction`.
    pub fn directional(direction: Vec3, strength: f32, influence_radius: f32) -> Self {
        Self {
            shape: FieldShape::Directional {
                direction: direction.normalize_or_zero(),
            },
            ..Self::spherical(strength, influence_radius)
        }
    }

    /// Earth-like small planet: 9.81 units/s² within 30 units.
    pub fn planet() -> Self {
        Self::spherical(9.81, 30.0)
    }

    /// Builder: set strength (clamped to be non-negative).
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength.max(0.0);
        self
    }

    /// Builder: set influence radius (clamped to be positive).
    pub fn with_influence_radius(mut self, radius: f32) -> Self {
        self.influence_radius = radius.max(f32::EPSILON);
        self
    }

    #[inline]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    #[inline]
    pub fn influence_radius(&self) -> f32 {
        self.influence_radius
    }

    #[inline]
    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Whether `point` lies within the influence radius of a field at `origin`.
    #[inline]
    pub fn in_range(&self, origin: Vec3, point: Vec3) -> bool {
        origin.distance_squared(point) <= self.influence_radius * self.influence_radius
    }

    /// Unit direction of the pull at `point`, or zero where undefined
    /// (a spherical field queried at its own center).
    pub fn direction_at(&self, origin: Vec3, point: Vec3) -> Vec3 {
        match self.shape {
            FieldShape::Spherical => (origin - point).normalize_or_zero(),
            FieldShape::Directional { direction } => direction.normalize_or_zero(),
        }
    }

    /// Acceleration this field would impose at `point`.
    ///
    /// Only meaningful when [`in_range`](Self::in_range) holds; callers go
    /// through the registry, which checks range first.
    pub fn gravity_at(&self, origin: Vec3, point: Vec3) -> Vec3 {
        self.direction_at(origin, point) * self.strength
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spherical_gravity_points_to_center_with_strength() {
        let field = GravityField::spherical(9.81, 30.0);
        let g = field.gravity_at(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0));
        assert!((g - Vec3::new(0.0, -9.81, 0.0)).length() < 1e-5);

        let point = Vec3::new(3.0, -4.0, 12.0);
        let g = field.gravity_at(Vec3::new(1.0, 1.0, 1.0), point);
        assert!((g.length() - 9.81).abs() < 1e-4);
        let expected_dir = (Vec3::new(1.0, 1.0, 1.0) - point).normalize();
        assert!(g.normalize().dot(expected_dir) > 0.9999);
    }

    #[test]
    fn spherical_gravity_at_center_is_zero() {
        let field = GravityField::spherical(9.81, 30.0);
        let origin = Vec3::new(5.0, 5.0, 5.0);
        let g = field.gravity_at(origin, origin);
        assert_eq!(g, Vec3::ZERO);
        assert!(!g.is_nan());
    }

    #[test]
    fn in_range_includes_boundary() {
        let field = GravityField::spherical(9.81, 30.0);
        assert!(field.in_range(Vec3::ZERO, Vec3::new(0.0, 30.0, 0.0)));
        assert!(!field.in_range(Vec3::ZERO, Vec3::new(0.0, 30.01, 0.0)));
        assert!(!field.in_range(Vec3::ZERO, Vec3::new(0.0, 40.0, 0.0)));
    }

    #[test]
    fn directional_field_ignores_position() {
        let field = GravityField::directional(Vec3::new(0.0, 0.0, -2.0), 5.0, 10.0);
        let a = field.gravity_at(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        let b = field.gravity_at(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(a, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(a, b);
    }

    #[test]
    fn try_new_rejects_invalid_descriptors() {
        assert_eq!(
            GravityField::try_new(-1.0, 10.0, FieldShape::Spherical),
            Err(GravityFieldError::NegativeStrength(-1.0))
        );
        assert_eq!(
            GravityField::try_new(1.0, 0.0, FieldShape::Spherical),
            Err(GravityFieldError::NonPositiveRadius(0.0))
        );
        assert_eq!(
            GravityField::try_new(f32::NAN, 10.0, FieldShape::Spherical),
            Err(GravityFieldError::NonFinite)
        );
        assert!(GravityField::try_new(0.0, 1.0, FieldShape::Spherical).is_ok());
    }

    #[test]
    fn infallible_constructors_clamp() {
        let field = GravityField::spherical(-3.0, -1.0);
        assert_eq!(field.strength(), 0.0);
        assert!(field.influence_radius() > 0.0);
    }
}
