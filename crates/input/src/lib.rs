//! Input collaborator boundary.
//!
//! Raw device capture lives in the host. The simulation only sees abstract
//! intent: which movement actions are held, whether the player wants to jump
//! or fire, and how far the view turned since the last step.

use glam::Vec2;
use std::collections::HashSet;

/// Abstract gameplay actions a host maps its devices onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Fire,
    /// Only honoured while the session is over.
    Restart,
}

/// Per-step movement/fire intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fire: bool,
}

impl MovementIntent {
    /// Desired direction in the player's local frame: `x` strafes right,
    /// `y` moves forward. Normalized, or zero when opposing keys cancel.
    pub fn planar(&self) -> Vec2 {
        let mut movement = Vec2::ZERO;
        if self.forward {
            movement.y += 1.0;
        }
        if self.backward {
            movement.y -= 1.0;
        }
        if self.left {
            movement.x -= 1.0;
        }
        if self.right {
            movement.x += 1.0;
        }
        movement.normalize_or_zero()
    }
}

/// View rotation requested since the last step, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookDelta {
    pub yaw: f32,
    pub pitch: f32,
}

/// What the simulation pulls from the host every fixed step.
pub trait InputSource {
    /// Current intent. Reading it has no side effects.
    fn movement_intent(&self) -> MovementIntent;

    /// Drain the look rotation accumulated since the previous call.
    fn take_look_delta(&mut self) -> LookDelta;

    /// Whether the player asked to restart a finished session.
    fn restart_requested(&self) -> bool {
        false
    }
}

/// Buffered input state fed by the host's device events.
#[derive(Debug)]
pub struct InputState {
    /// Actions currently held down.
    held: HashSet<Action>,
    /// Actions pressed since the last `begin_frame`.
    pressed: HashSet<Action>,
    /// Accumulated pointer motion not yet consumed.
    accumulated_delta: Vec2,
    /// Radians per unit of pointer motion.
    sensitivity: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(0.002)
    }
}

impl InputState {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            accumulated_delta: Vec2::ZERO,
            sensitivity,
        }
    }

    /// Clear per-frame state. Call at the start of each host frame.
    pub fn begin_frame(&mut self) {
        self.pressed.clear();
    }

    /// Process an action press or release.
    pub fn process_action(&mut self, action: Action, down: bool) {
        if down {
            if self.held.insert(action) {
                self.pressed.insert(action);
            }
        } else {
            self.held.remove(&action);
        }
    }

    /// Process pointer movement (device units; +x turns right, +y looks down).
    pub fn process_look(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.accumulated_delta += Vec2::new(dx, dy);
        } else {
            log::warn!("Ignoring non-finite look delta ({}, {})", dx, dy);
        }
    }

    /// Held now, or tapped and released within this frame.
    fn is_active(&self, action: Action) -> bool {
        self.held.contains(&action) || self.pressed.contains(&action)
    }
}

impl InputSource for InputState {
    fn movement_intent(&self) -> MovementIntent {
        MovementIntent {
            forward: self.is_active(Action::Forward),
            backward: self.is_active(Action::Backward),
            left: self.is_active(Action::Left),
            right: self.is_active(Action::Right),
            jump: self.is_active(Action::Jump),
            fire: self.is_active(Action::Fire),
        }
    }

    fn take_look_delta(&mut self) -> LookDelta {
        let delta = std::mem::take(&mut self.accumulated_delta);
        // Pointer right turns right (negative yaw around +Y); pointer down looks down.
        LookDelta {
            yaw: -delta.x * self.sensitivity,
            pitch: -delta.y * self.sensitivity,
        }
    }

    fn restart_requested(&self) -> bool {
        self.pressed.contains(&Action::Restart)
    }
}

/// Fixed intent for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pub intent: MovementIntent,
    /// Applied on every step.
    pub look_per_step: LookDelta,
    pub restart: bool,
}

impl ScriptedInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_intent(intent: MovementIntent) -> Self {
        Self {
            intent,
            ..Default::default()
        }
    }
}

impl InputSource for ScriptedInput {
    fn movement_intent(&self) -> MovementIntent {
        self.intent
    }

    fn take_look_delta(&mut self) -> LookDelta {
        self.look_per_step
    }

    fn restart_requested(&self) -> bool {
        self.restart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_normalizes_diagonals_and_cancels_opposites() {
        let diag = MovementIntent {
            forward: true,
            right: true,
            ..Default::default()
        };
        assert!((diag.planar().length() - 1.0).abs() < 1e-6);

        let cancel = MovementIntent {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(cancel.planar(), Vec2::ZERO);
    }

    #[test]
    fn tap_within_a_frame_still_counts() {
        let mut input = InputState::default();
        input.process_action(Action::Jump, true);
        input.process_action(Action::Jump, false);
        assert!(input.movement_intent().jump);
        input.begin_frame();
        assert!(!input.movement_intent().jump);
    }

    #[test]
    fn look_delta_is_drained_once() {
        let mut input = InputState::new(0.01);
        input.process_look(10.0, -5.0);
        input.process_look(f32::NAN, 0.0);
        let look = input.take_look_delta();
        assert!((look.yaw + 0.1).abs() < 1e-6);
        assert!((look.pitch - 0.05).abs() < 1e-6);
        assert_eq!(input.take_look_delta(), LookDelta::default());
    }

    #[test]
    fn restart_is_an_edge() {
        let mut input = InputState::default();
        input.process_action(Action::Restart, true);
        assert!(input.restart_requested());
        input.begin_frame();
        assert!(!input.restart_requested());
    }
}
