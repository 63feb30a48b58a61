//! Locomotion state and state marker components.
//!
//! [`LocomotionState`] is the per-entity Grounded/Airborne state machine plus
//! the vertical velocity it integrates. The marker components mirror its
//! phase so other systems can filter on it.

use bevy::prelude::*;

use crate::config::LocomotionConfig;

/// Locomotion phase of a surface-walking entity.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocomotionPhase {
    #[default]
    Airborne,
    Grounded,
}

/// Ground contact reported by an external collision observer.
///
/// Written once per step before the controller runs. The controller only
/// reads it.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct GroundContact {
    pub grounded: bool,
}

impl GroundContact {
    pub fn new(grounded: bool) -> Self {
        Self { grounded }
    }

    pub fn set(&mut self, grounded: bool) {
        self.grounded = grounded;
    }
}

/// Per-entity locomotion state.
///
/// `vertical_velocity` is the signed speed along the entity's up axis:
/// positive moves away from the active field, negative falls toward it.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct LocomotionState {
    phase: LocomotionPhase,
    vertical_velocity: f32,
    jump_timeout_remaining: f32,
    fall_timeout_remaining: f32,

    // === Per-step bookkeeping (used by systems, kept pub(crate)) ===
    /// Whether a snap fired this step, suppressing smooth alignment.
    pub(crate) snapped_this_step: bool,
    /// Tangent move direction chosen this step.
    pub(crate) move_direction: Vec3,
    /// Displacement accumulated this step, handed to the backend at the end.
    pub(crate) displacement: Vec3,
    /// Displacement handed to the backend at the end of the previous step.
    pub(crate) applied_displacement: Vec3,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::new(&LocomotionConfig::default())
    }
}

impl LocomotionState {
    /// Create an airborne state with timeouts primed from `config`.
    pub fn new(config: &LocomotionConfig) -> Self {
        Self {
            phase: LocomotionPhase::Airborne,
            vertical_velocity: 0.0,
            jump_timeout_remaining: config.jump_timeout,
            fall_timeout_remaining: config.fall_timeout,
            snapped_this_step: false,
            move_direction: Vec3::ZERO,
            displacement: Vec3::ZERO,
            applied_displacement: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn phase(&self) -> LocomotionPhase {
        self.phase
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.phase == LocomotionPhase::Grounded
    }

    #[inline]
    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    #[inline]
    pub fn jump_timeout_remaining(&self) -> f32 {
        self.jump_timeout_remaining
    }

    #[inline]
    pub fn fall_timeout_remaining(&self) -> f32 {
        self.fall_timeout_remaining
    }

    /// Airborne long enough for the fall timeout to elapse.
    #[inline]
    pub fn is_free_falling(&self) -> bool {
        self.phase == LocomotionPhase::Airborne && self.fall_timeout_remaining <= 0.0
    }

    /// Whether a snap fired during the current step.
    #[inline]
    pub fn snapped_this_step(&self) -> bool {
        self.snapped_this_step
    }

    /// Tangent move direction chosen during the last step.
    #[inline]
    pub fn move_direction(&self) -> Vec3 {
        self.move_direction
    }

    /// Displacement handed to the physics backend at the end of the last step.
    #[inline]
    pub fn applied_displacement(&self) -> Vec3 {
        self.applied_displacement
    }

    /// Displacement accumulated so far this step.
    #[inline]
    pub fn pending_displacement(&self) -> Vec3 {
        self.displacement
    }

    /// Override vertical velocity (knockback, scripted launches).
    pub fn set_vertical_velocity(&mut self, velocity: f32) {
        self.vertical_velocity = velocity;
    }

    /// Reset per-step bookkeeping. Called at the start of every step.
    pub(crate) fn begin_step(&mut self) {
        self.snapped_this_step = false;
        self.move_direction = Vec3::ZERO;
        self.displacement = Vec3::ZERO;
    }

    /// Accumulate displacement for this step.
    pub(crate) fn add_displacement(&mut self, delta: Vec3) {
        self.displacement += delta;
    }

    /// Drop the part of this step's displacement that points along `up`.
    pub(crate) fn remove_pending_along(&mut self, up: Vec3) {
        self.displacement -= up * self.displacement.dot(up);
    }

    /// Take the accumulated displacement, remembering it for diagnostics.
    pub(crate) fn finalize_step(&mut self) -> Vec3 {
        let delta = std::mem::take(&mut self.displacement);
        self.applied_displacement = delta;
        delta
    }

    /// Apply the externally observed ground contact.
    ///
    /// Grounded → Airborne on loss of contact. Airborne → Grounded when
    /// contact resumes while not moving away from the surface; entering
    /// Grounded resets the fall timeout and pins a falling velocity to the
    /// stick value. Returns the new phase when it changed.
    pub fn observe_contact(
        &mut self,
        contact: bool,
        config: &LocomotionConfig,
    ) -> Option<LocomotionPhase> {
        match self.phase {
            LocomotionPhase::Grounded if !contact => {
                self.phase = LocomotionPhase::Airborne;
                Some(self.phase)
            }
            LocomotionPhase::Airborne if contact && self.vertical_velocity <= 0.0 => {
                self.phase = LocomotionPhase::Grounded;
                self.fall_timeout_remaining = config.fall_timeout;
                if self.vertical_velocity < 0.0 {
                    self.vertical_velocity = config.stick_velocity;
                }
                Some(self.phase)
            }
            _ => None,
        }
    }

    /// Advance vertical velocity by one step.
    ///
    /// While grounded a falling velocity is pinned to the stick value and
    /// gravity is not accumulated that step. Otherwise gravity accumulates
    /// until the falling speed reaches terminal velocity. A jump is taken when
    /// requested, grounded, the cooldown has elapsed and gravity is present.
    /// Returns `true` when a jump was taken.
    pub fn update_vertical(
        &mut self,
        config: &LocomotionConfig,
        gravity_magnitude: f32,
        jump_requested: bool,
        dt: f32,
    ) -> bool {
        let mut jumped = false;
        let mut pinned = false;

        match self.phase {
            LocomotionPhase::Grounded => {
                self.fall_timeout_remaining = config.fall_timeout;

                if self.vertical_velocity < 0.0 {
                    self.vertical_velocity = config.stick_velocity;
                    pinned = true;
                }

                if jump_requested && self.jump_timeout_remaining <= 0.0 && gravity_magnitude > 0.0
                {
                    self.vertical_velocity = config.jump_speed(gravity_magnitude);
                    self.jump_timeout_remaining = config.jump_timeout;
                    self.phase = LocomotionPhase::Airborne;
                    pinned = false;
                    jumped = true;
                } else if self.jump_timeout_remaining > 0.0 {
                    self.jump_timeout_remaining = (self.jump_timeout_remaining - dt).max(0.0);
                }
            }
            LocomotionPhase::Airborne => {
                self.jump_timeout_remaining = config.jump_timeout;
                if self.fall_timeout_remaining > 0.0 {
                    self.fall_timeout_remaining = (self.fall_timeout_remaining - dt).max(0.0);
                }
            }
        }

        let terminal = config.terminal_velocity.abs();
        if !pinned && self.vertical_velocity > -terminal {
            self.vertical_velocity = (self.vertical_velocity - gravity_magnitude * dt).max(-terminal);
        }

        jumped
    }

    /// Escape launch: leave the surface at `launch_speed` along up.
    pub fn launch(&mut self, config: &LocomotionConfig) {
        self.vertical_velocity = config.launch_speed;
        self.jump_timeout_remaining = config.jump_timeout;
        self.phase = LocomotionPhase::Airborne;
    }
}

/// Marker component indicating the entity is grounded.
///
/// Mirrors [`LocomotionState::phase`]. Mutually exclusive with [`Airborne`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use gravity_well::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the entity is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker for entities the physics backend cannot drive.
///
/// Added once when the binding check fails and removed when it passes again.
/// Entities carrying it are skipped by every controller system.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Unbound;

/// Read-only snapshot of an entity's gravity state, refreshed every step.
///
/// Add it to entities you want to visualize or log; nothing in the
/// controller reads it.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct GravityDiagnostics {
    pub gravity_direction: Vec3,
    pub gravity_magnitude: f32,
    pub active_field: Option<Entity>,
    pub grounded: bool,
    pub free_falling: bool,
    pub vertical_velocity: f32,
    /// Number of field changes seen since the entity was spawned.
    pub field_changes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const G: f32 = 9.81;

    fn grounded_state(config: &LocomotionConfig) -> LocomotionState {
        let mut state = LocomotionState::new(config);
        state.observe_contact(true, config);
        state
    }

    #[test]
    fn starts_airborne() {
        let state = LocomotionState::default();
        assert_eq!(state.phase(), LocomotionPhase::Airborne);
        assert!(!state.is_grounded());
    }

    #[test]
    fn contact_grounds_and_pins_falling_velocity() {
        let config = LocomotionConfig::default();
        let mut state = LocomotionState::new(&config);
        state.set_vertical_velocity(-10.0);

        assert_eq!(state.observe_contact(true, &config), Some(LocomotionPhase::Grounded));
        assert_eq!(state.vertical_velocity(), config.stick_velocity);
        assert_eq!(state.fall_timeout_remaining(), config.fall_timeout);

        // Steady state while grounded stays at the stick value.
        for _ in 0..10 {
            state.update_vertical(&config, G, false, DT);
            assert_eq!(state.vertical_velocity(), config.stick_velocity);
        }
    }

    #[test]
    fn rising_contact_does_not_ground() {
        let config = LocomotionConfig::default();
        let mut state = LocomotionState::new(&config);
        state.set_vertical_velocity(3.0);
        assert_eq!(state.observe_contact(true, &config), None);
        assert!(!state.is_grounded());
    }

    #[test]
    fn losing_contact_goes_airborne() {
        let config = LocomotionConfig::default();
        let mut state = grounded_state(&config);
        assert_eq!(state.observe_contact(false, &config), Some(LocomotionPhase::Airborne));
        assert_eq!(state.observe_contact(false, &config), None);
    }

    #[test]
    fn jump_requires_elapsed_cooldown() {
        let config = LocomotionConfig::default().with_jump_timeout(0.1);
        let mut state = grounded_state(&config);

        // Cooldown primed at construction has not elapsed yet.
        assert!(!state.update_vertical(&config, G, true, DT));
        assert!(state.is_grounded());

        for _ in 0..10 {
            state.update_vertical(&config, G, false, DT);
        }
        assert_eq!(state.jump_timeout_remaining(), 0.0);

        assert!(state.update_vertical(&config, G, true, DT));
        assert!(!state.is_grounded());
        let expected = config.jump_speed(G) - G * DT;
        assert!((state.vertical_velocity() - expected).abs() < 1e-4);
        assert_eq!(state.jump_timeout_remaining(), config.jump_timeout);
    }

    #[test]
    fn no_jump_without_gravity() {
        let config = LocomotionConfig::default().with_jump_timeout(0.0);
        let mut state = grounded_state(&config);
        assert!(!state.update_vertical(&config, 0.0, true, DT));
        assert!(state.is_grounded());
    }

    #[test]
    fn airborne_accumulates_until_terminal() {
        let config = LocomotionConfig::default().with_terminal_velocity(5.0);
        let mut state = LocomotionState::new(&config);
        state.update_vertical(&config, G, false, DT);
        assert!((state.vertical_velocity() + G * DT).abs() < 1e-5);

        for _ in 0..600 {
            state.update_vertical(&config, G, false, DT);
        }
        assert_eq!(state.vertical_velocity(), -5.0);
    }

    #[test]
    fn free_fall_after_fall_timeout() {
        let config = LocomotionConfig::default().with_fall_timeout(0.05);
        let mut state = LocomotionState::new(&config);
        assert!(!state.is_free_falling());
        for _ in 0..4 {
            state.update_vertical(&config, G, false, DT);
        }
        assert!(state.is_free_falling());

        state.observe_contact(true, &config);
        assert!(!state.is_free_falling());
    }

    #[test]
    fn launch_forces_airborne() {
        let config = LocomotionConfig::default();
        let mut state = grounded_state(&config);
        state.launch(&config);
        assert!(!state.is_grounded());
        assert_eq!(state.vertical_velocity(), config.launch_speed);
    }

    #[test]
    fn displacement_accumulates_and_finalizes() {
        let mut state = LocomotionState::default();
        state.add_displacement(Vec3::X);
        state.add_displacement(Vec3::Y);
        assert_eq!(state.pending_displacement(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(state.finalize_step(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(state.pending_displacement(), Vec3::ZERO);
        assert_eq!(state.applied_displacement(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn removing_pending_along_up_keeps_tangent_part() {
        let mut state = LocomotionState::default();
        state.add_displacement(Vec3::new(0.5, -0.2, 0.1));
        state.remove_pending_along(Vec3::Y);
        assert!((state.pending_displacement() - Vec3::new(0.5, 0.0, 0.1)).length() < 1e-6);
    }

    #[test]
    fn ground_contact_set() {
        let mut contact = GroundContact::default();
        assert!(!contact.grounded);
        contact.set(true);
        assert_eq!(contact, GroundContact::new(true));
    }
}
