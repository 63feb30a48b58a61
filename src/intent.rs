//! Movement intent components.
//!
//! Intents carry the already-debounced per-step input from the player or AI.
//! The controller systems read them and never poll devices themselves.

use bevy::prelude::*;

/// Desired movement for a surface-walking entity.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use gravity_well::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_move(Vec2::new(0.0, 1.0));
/// intent.set_sprint(true);
/// intent.request_jump();
/// assert!(intent.is_moving());
/// assert!(intent.jump_requested());
///
/// intent.clear();
/// assert!(!intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// 2D move input: `x` = right, `y` = forward. Clamped to the unit disc.
    pub move_axis: Vec2,
    /// Whether the sprint input is held.
    pub sprint: bool,
    /// View forward used to orient the move input, typically the camera's.
    /// `None` uses the entity's own forward.
    pub view_forward: Option<Vec3>,
    /// View right matching `view_forward`. `None` uses the entity's own
    /// right.
    pub view_right: Option<Vec3>,
    /// Jump edge for this step.
    pub(crate) jump: bool,
    /// Escape launch edge for this step.
    pub(crate) launch: bool,
    /// Manual snap edge for this step.
    pub(crate) snap: bool,
}

impl MovementIntent {
    /// Create a new empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 2D move input. Longer inputs are scaled back to length 1.
    pub fn set_move(&mut self, axis: Vec2) {
        self.move_axis = axis.clamp_length_max(1.0);
    }

    /// Set whether sprint is held.
    pub fn set_sprint(&mut self, sprint: bool) {
        self.sprint = sprint;
    }

    /// Orient move input relative to a view (camera) basis.
    pub fn set_view(&mut self, forward: Vec3, right: Vec3) {
        self.view_forward = Some(forward);
        self.view_right = Some(right);
    }

    /// Orient move input relative to the entity itself.
    pub fn clear_view(&mut self) {
        self.view_forward = None;
        self.view_right = None;
    }

    /// Request a jump this step. Dropped if the entity cannot jump.
    pub fn request_jump(&mut self) {
        self.jump = true;
    }

    /// Request an escape launch along up this step.
    pub fn request_launch(&mut self) {
        self.launch = true;
    }

    /// Request an instant realignment to the current gravity this step.
    pub fn request_snap(&mut self) {
        self.snap = true;
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.move_axis != Vec2::ZERO
    }

    #[inline]
    pub fn jump_requested(&self) -> bool {
        self.jump
    }

    #[inline]
    pub fn launch_requested(&self) -> bool {
        self.launch
    }

    #[inline]
    pub fn snap_requested(&self) -> bool {
        self.snap
    }

    /// Clear move input and all pending requests.
    pub fn clear(&mut self) {
        self.move_axis = Vec2::ZERO;
        self.sprint = false;
        self.clear_requests();
    }

    /// Clear the per-step request edges, keeping held input.
    pub fn clear_requests(&mut self) {
        self.jump = false;
        self.launch = false;
        self.snap = false;
    }
}
