//! Configuration components.
//!
//! This module defines the tuning for surface locomotion, the optional
//! surface clamp, and plain gravity-affected bodies.

use bevy::prelude::*;

/// Configuration parameters for surface locomotion.
///
/// Speeds are in world units per second, accelerations in units/s², rates
/// in 1/s (higher converges faster).
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct LocomotionConfig {
    // === Movement Settings ===
    /// Walking speed along the tangent plane.
    pub move_speed: f32,

    /// Speed while the sprint input is held.
    pub sprint_speed: f32,

    /// Whether the entity turns to face its move direction.
    pub face_movement: bool,

    /// Damping rate of the turn toward the move direction.
    pub turn_rate: f32,

    // === Jump Settings ===
    /// Apex height of a jump under the active field's gravity.
    pub jump_height: f32,

    /// Cooldown after landing before another jump is allowed (seconds).
    pub jump_timeout: f32,

    /// Time airborne before the entity counts as free falling (seconds).
    pub fall_timeout: f32,

    /// Escape launch speed along up.
    pub launch_speed: f32,

    // === Vertical Velocity Settings ===
    /// Maximum falling speed along gravity.
    pub terminal_velocity: f32,

    /// Vertical velocity held while grounded, keeping the entity pressed
    /// against the surface. Should be small and negative.
    pub stick_velocity: f32,

    // === Alignment Settings ===
    /// Damping rate of the continuous up-vector alignment.
    pub alignment_rate: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            // Movement settings
            move_speed: 2.0,
            sprint_speed: 5.335,
            face_movement: true,
            turn_rate: 10.0,

            // Jump settings
            jump_height: 1.2,
            jump_timeout: 0.5,
            fall_timeout: 0.15,
            launch_speed: 20.0,

            // Vertical velocity settings
            terminal_velocity: 53.0,
            stick_velocity: -2.0,

            // Alignment settings
            alignment_rate: 10.0,
        }
    }
}

impl LocomotionConfig {
    /// Create a config tuned for a responsive player.
    pub fn player() -> Self {
        Self {
            move_speed: 4.0,
            sprint_speed: 8.0,
            jump_timeout: 0.2,
            alignment_rate: 12.0,
            ..default()
        }
    }

    /// Create a config for slow, heavy characters.
    pub fn heavy() -> Self {
        Self {
            move_speed: 1.5,
            sprint_speed: 3.0,
            jump_height: 0.6,
            turn_rate: 5.0,
            alignment_rate: 6.0,
            ..default()
        }
    }

    /// Speed for the given input state.
    #[inline]
    pub fn speed(&self, has_input: bool, sprint: bool) -> f32 {
        match (has_input, sprint) {
            (false, _) => 0.0,
            (true, true) => self.sprint_speed,
            (true, false) => self.move_speed,
        }
    }

    /// Take-off speed reaching `jump_height` under `gravity_magnitude`.
    #[inline]
    pub fn jump_speed(&self, gravity_magnitude: f32) -> f32 {
        (self.jump_height * 2.0 * gravity_magnitude).max(0.0).sqrt()
    }

    /// Builder: set walk and sprint speeds.
    pub fn with_speeds(mut self, move_speed: f32, sprint_speed: f32) -> Self {
        self.move_speed = move_speed;
        self.sprint_speed = sprint_speed;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set jump cooldown.
    pub fn with_jump_timeout(mut self, timeout: f32) -> Self {
        self.jump_timeout = timeout;
        self
    }

    /// Builder: set fall timeout.
    pub fn with_fall_timeout(mut self, timeout: f32) -> Self {
        self.fall_timeout = timeout;
        self
    }

    /// Builder: set escape launch speed.
    pub fn with_launch_speed(mut self, speed: f32) -> Self {
        self.launch_speed = speed;
        self
    }

    /// Builder: set terminal falling speed.
    pub fn with_terminal_velocity(mut self, velocity: f32) -> Self {
        self.terminal_velocity = velocity;
        self
    }

    /// Builder: set the alignment damping rate.
    pub fn with_alignment_rate(mut self, rate: f32) -> Self {
        self.alignment_rate = rate;
        self
    }

    /// Builder: enable or disable turning toward the move direction.
    pub fn with_face_movement(mut self, enabled: bool) -> Self {
        self.face_movement = enabled;
        self
    }
}

/// Keeps an entity at a fixed distance from its active field's center.
///
/// Applied after movement as a damped correction, not a teleport.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct SurfaceClamp {
    /// Distance from the field center to hold (planet radius plus the
    /// entity's half height).
    pub target_radius: f32,

    /// Damping rate of the correction.
    pub rate: f32,

    /// Only correct while grounded, leaving jumps and falls untouched.
    pub grounded_only: bool,
}

impl Default for SurfaceClamp {
    fn default() -> Self {
        Self {
            target_radius: 10.0,
            rate: 10.0,
            grounded_only: true,
        }
    }
}

impl SurfaceClamp {
    /// Clamp to the given radius with default damping.
    pub fn new(target_radius: f32) -> Self {
        Self {
            target_radius,
            ..default()
        }
    }

    /// Builder: set damping rate.
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Builder: also correct while airborne.
    pub fn always(mut self) -> Self {
        self.grounded_only = false;
        self
    }
}

/// A plain physics body pulled by the registry's gravity.
///
/// Each fixed step the body receives the gravity at its position as an
/// acceleration, and optionally turns its up toward the field.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GravityBody {
    /// Multiplier on the field's acceleration.
    pub gravity_scale: f32,

    /// Whether to align the body's up with the field.
    pub align_rotation: bool,

    /// Damping rate of the alignment.
    pub alignment_rate: f32,
}

impl Default for GravityBody {
    fn default() -> Self {
        Self {
            gravity_scale: 1.0,
            align_rotation: true,
            alignment_rate: 10.0,
        }
    }
}

impl GravityBody {
    /// A body that falls but never rotates on its own.
    pub fn unaligned() -> Self {
        Self {
            align_rotation: false,
            ..default()
        }
    }

    /// Builder: set gravity scale.
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }
}
