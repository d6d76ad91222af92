//! Hostile decision making.
//!
//! The brain is re-evaluated on a fixed think interval rather than every
//! tick. Each evaluation picks a state from the horizontal distance to the
//! player and returns a steering decision the simulation applies to the
//! hostile's body. Stuck detection compares positions between evaluations.

use std::time::Duration;

use engine_core::{horizontal_distance, AIState, Vec3};
use rand::Rng;

use crate::config::{secs, HostileConfig};

/// Hostile tuning resolved into simulation units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileTuning {
    pub move_speed: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown: Duration,
    pub think_interval: Duration,
    pub stuck_threshold: f32,
    pub stuck_timeout: Duration,
    pub unstuck_speed: f32,
    pub unstuck_duration: Duration,
    pub idle_damping: f32,
}

impl HostileTuning {
    pub fn from_config(config: &HostileConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            attack_range: config.attack_range,
            attack_damage: config.attack_damage,
            attack_cooldown: secs(config.attack_cooldown),
            think_interval: secs(config.think_interval),
            stuck_threshold: config.stuck_threshold,
            stuck_timeout: secs(config.stuck_timeout),
            unstuck_speed: config.unstuck_speed,
            unstuck_duration: secs(config.unstuck_duration),
            idle_damping: config.idle_damping.clamp(0.0, 1.0),
        }
    }
}

impl Default for HostileTuning {
    fn default() -> Self {
        Self::from_config(&HostileConfig::default())
    }
}

/// What to do with the body's horizontal velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// Replace horizontal velocity.
    Move(Vec3),
    /// Multiply horizontal velocity.
    Damp(f32),
    /// Leave velocity alone (an unstuck kick is still playing out).
    Coast,
}

/// Output of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub steering: Steering,
    /// Horizontal direction to face, if it should change.
    pub facing: Option<Vec3>,
    /// An unstuck kick was issued this evaluation.
    pub unstuck: bool,
}

/// Per-hostile AI state.
#[derive(Debug, Clone)]
pub struct HostileBrain {
    state: AIState,
    next_think: Duration,
    last_think: Option<Duration>,
    /// Position at the previous evaluation.
    last_sample: Vec3,
    /// How long the hostile has been chasing without making progress.
    stuck_for: Duration,
    unstuck_until: Option<Duration>,
    last_attack: Option<Duration>,
    died_at: Option<Duration>,
}

impl HostileBrain {
    /// A fresh brain evaluates on its first update.
    pub fn new(position: Vec3, now: Duration) -> Self {
        Self {
            state: AIState::Idle,
            next_think: now,
            last_think: None,
            last_sample: position,
            stuck_for: Duration::ZERO,
            unstuck_until: None,
            last_attack: None,
            died_at: None,
        }
    }

    pub fn state(&self) -> AIState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == AIState::Dead
    }

    pub fn died_at(&self) -> Option<Duration> {
        self.died_at
    }

    pub fn stuck_for(&self) -> Duration {
        self.stuck_for
    }

    /// Run an evaluation if the think timer is due. `target` is the player's
    /// position, or `None` when there is no living player to chase.
    pub fn update<R: Rng>(
        &mut self,
        now: Duration,
        position: Vec3,
        target: Option<Vec3>,
        tuning: &HostileTuning,
        rng: &mut R,
    ) -> Option<Decision> {
        if self.is_dead() || now < self.next_think {
            return None;
        }
        let since_last = self
            .last_think
            .map(|t| now.saturating_sub(t))
            .unwrap_or(Duration::ZERO);
        self.last_think = Some(now);
        self.next_think = now + tuning.think_interval;

        let moved = horizontal_distance(self.last_sample, position);
        self.last_sample = position;

        let Some(target) = target else {
            self.state = AIState::Idle;
            self.stuck_for = Duration::ZERO;
            self.unstuck_until = None;
            return Some(Decision {
                steering: Steering::Damp(tuning.idle_damping),
                facing: None,
                unstuck: false,
            });
        };

        let to_target = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
        if horizontal_distance(position, target) <= tuning.attack_range {
            self.state = AIState::Attacking;
            self.stuck_for = Duration::ZERO;
            self.unstuck_until = None;
            return Some(Decision {
                steering: Steering::Move(Vec3::ZERO),
                facing: Some(to_target),
                unstuck: false,
            });
        }

        let was_chasing = self.state == AIState::Chasing;
        self.state = AIState::Chasing;

        if let Some(until) = self.unstuck_until {
            if now < until {
                return Some(Decision {
                    steering: Steering::Coast,
                    facing: None,
                    unstuck: false,
                });
            }
            self.unstuck_until = None;
        }

        if was_chasing && moved < tuning.stuck_threshold {
            self.stuck_for += since_last;
        } else {
            self.stuck_for = Duration::ZERO;
        }

        if self.stuck_for >= tuning.stuck_timeout {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let kick = Vec3::new(angle.cos(), 0.0, angle.sin()) * tuning.unstuck_speed;
            self.stuck_for = Duration::ZERO;
            self.unstuck_until = Some(now + tuning.unstuck_duration);
            return Some(Decision {
                steering: Steering::Move(kick),
                facing: Some(kick),
                unstuck: true,
            });
        }

        let velocity = to_target.normalize_or_zero() * tuning.move_speed;
        Some(Decision {
            steering: Steering::Move(velocity),
            facing: Some(velocity),
            unstuck: false,
        })
    }

    /// Whether an attack may land at `now`. Records the attack when it does.
    pub fn try_attack(&mut self, now: Duration, tuning: &HostileTuning) -> bool {
        if self.state != AIState::Attacking {
            return false;
        }
        let ready = match self.last_attack {
            Some(last) => now.saturating_sub(last) >= tuning.attack_cooldown,
            None => true,
        };
        if ready {
            self.last_attack = Some(now);
        }
        ready
    }

    /// Enter the terminal Dead state. Returns false if already dead.
    pub fn kill(&mut self, now: Duration) -> bool {
        if self.is_dead() {
            return false;
        }
        self.state = AIState::Dead;
        self.died_at = Some(now);
        self.unstuck_until = None;
        true
    }
}
