//! Common components shared by the player and hostile entities.

use std::time::Duration;

/// Result of a [`Health::take_damage`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Damage landed and the owner survived.
    Applied { dealt: f32 },
    /// Damage landed and brought health to zero. Reported exactly once.
    Killed { dealt: f32 },
    /// Rejected because the immunity window is still open.
    Blocked,
    /// The owner was already dead; nothing changed.
    AlreadyDead,
}

impl DamageOutcome {
    pub fn landed(&self) -> bool {
        matches!(self, DamageOutcome::Applied { .. } | DamageOutcome::Killed { .. })
    }

    pub fn is_kill(&self) -> bool {
        matches!(self, DamageOutcome::Killed { .. })
    }
}

/// Health component for damageable entities.
///
/// `current` stays within `[0, max]` after every call. Damage is rejected
/// while `now - last_damage < immunity_window` so a contact that reports
/// every tick cannot compound into instant death.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    current: f32,
    max: f32,
    last_damage: Option<Duration>,
    immunity_window: Duration,
}

impl Health {
    /// Full health, no immunity window.
    pub fn new(max: f32) -> Self {
        Self::with_immunity(max, Duration::ZERO)
    }

    pub fn with_immunity(max: f32, immunity_window: Duration) -> Self {
        let max = if max.is_finite() && max > 0.0 { max } else { 1.0 };
        Self {
            current: max,
            max,
            last_damage: None,
            immunity_window,
        }
    }

    /// Apply `amount` of damage at simulated time `now`.
    ///
    /// Damage on a dead component is a silent no-op: death is only ever
    /// reported once, so kill counters cannot double count.
    pub fn take_damage(&mut self, amount: f32, now: Duration) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::AlreadyDead;
        }
        if self.is_immune(now) {
            return DamageOutcome::Blocked;
        }

        let amount = sanitize(amount);
        let before = self.current;
        self.current = (self.current - amount).clamp(0.0, self.max);
        self.last_damage = Some(now);

        let dealt = before - self.current;
        if self.current <= 0.0 {
            DamageOutcome::Killed { dealt }
        } else {
            DamageOutcome::Applied { dealt }
        }
    }

    /// Restore up to `amount`; returns what was actually healed. Never
    /// touches the immunity timer and cannot revive the dead.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead() {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + sanitize(amount)).clamp(0.0, self.max);
        self.current - before
    }

    /// Back to full health with the immunity timer cleared (respawn).
    pub fn reset(&mut self) {
        self.current = self.max;
        self.last_damage = None;
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Whether damage at `now` would be blocked.
    pub fn is_immune(&self, now: Duration) -> bool {
        match self.last_damage {
            Some(last) => now.saturating_sub(last) < self.immunity_window,
            None => false,
        }
    }

    /// Current / max, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        (self.current / self.max).clamp(0.0, 1.0)
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn immunity_window(&self) -> Duration {
        self.immunity_window
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

fn sanitize(amount: f32) -> f32 {
    if amount.is_finite() {
        amount.max(0.0)
    } else {
        0.0
    }
}

/// Lifecycle flag carried by every simulated entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Alive,
    /// Dead but still present in the world (corpse).
    Dead,
    /// Marked for removal at the end of the current tick.
    PendingRemoval,
}

/// AI state for hostile agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AIState {
    #[default]
    Idle,
    Chasing,
    Attacking,
    /// Terminal.
    Dead,
}

impl AIState {
    pub fn name(&self) -> &'static str {
        match self {
            AIState::Idle => "idle",
            AIState::Chasing => "chasing",
            AIState::Attacking => "attacking",
            AIState::Dead => "dead",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn health_stays_in_bounds() {
        let mut h = Health::new(50.0);
        for (i, amount) in [10.0, -5.0, 1e9, f32::NAN, 3.0].into_iter().enumerate() {
            h.take_damage(amount, ms(i as u64 * 10));
            assert!(h.current() >= 0.0 && h.current() <= h.max());
        }
        let mut h = Health::new(50.0);
        h.take_damage(20.0, ms(0));
        h.heal(1e9);
        assert_eq!(h.current(), 50.0);
        h.heal(f32::INFINITY);
        assert_eq!(h.current(), 50.0);
    }

    #[test]
    fn fractional_max_is_kept() {
        let mut h = Health::new(0.5);
        assert_eq!(h.max(), 0.5);
        assert_eq!(h.take_damage(0.25, ms(0)), DamageOutcome::Applied { dealt: 0.25 });
        assert_eq!(h.fraction(), 0.5);
        assert_eq!(Health::new(-3.0).max(), 1.0);
        assert_eq!(Health::new(f32::NAN).max(), 1.0);
    }

    #[test]
    fn immunity_blocks_second_hit_inside_window() {
        let mut once = Health::with_immunity(100.0, ms(1000));
        once.take_damage(10.0, ms(0));

        let mut twice = Health::with_immunity(100.0, ms(1000));
        assert!(twice.take_damage(10.0, ms(0)).landed());
        assert_eq!(twice.take_damage(10.0, ms(400)), DamageOutcome::Blocked);
        assert_eq!(twice.current(), once.current());

        // Window closes exactly at its length.
        assert!(twice.take_damage(10.0, ms(1000)).landed());
        assert_eq!(twice.current(), 80.0);
    }

    #[test]
    fn death_is_reported_once() {
        let mut h = Health::new(30.0);
        assert_eq!(h.take_damage(20.0, ms(0)), DamageOutcome::Applied { dealt: 20.0 });
        assert_eq!(h.take_damage(20.0, ms(1)), DamageOutcome::Killed { dealt: 10.0 });
        assert_eq!(h.take_damage(20.0, ms(2)), DamageOutcome::AlreadyDead);
        assert!(h.is_dead());
        assert_eq!(h.heal(10.0), 0.0);
    }

    #[test]
    fn heal_does_not_reset_immunity() {
        let mut h = Health::with_immunity(100.0, ms(500));
        h.take_damage(40.0, ms(0));
        assert_eq!(h.heal(15.0), 15.0);
        assert!(h.is_immune(ms(100)));
        assert_eq!(h.take_damage(5.0, ms(100)), DamageOutcome::Blocked);
    }

    #[test]
    fn reset_restores_max_and_clears_immunity() {
        let mut h = Health::with_immunity(100.0, ms(1000));
        h.take_damage(100.0, ms(0));
        assert!(h.is_dead());
        h.reset();
        assert_eq!(h.fraction(), 1.0);
        assert!(!h.is_immune(ms(1)));
        assert!(h.take_damage(10.0, ms(1)).landed());
    }
}
