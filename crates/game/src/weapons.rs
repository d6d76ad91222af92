//! The player's rifle: magazine and rate limiting.

use std::time::Duration;

use crate::config::{secs, WeaponConfig};

/// Result of a trigger pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// A round left the barrel.
    Fired,
    /// Too soon after the previous shot.
    CoolingDown,
    OutOfAmmo,
}

/// Weapon state. Cooldown is measured against simulated time, not a
/// countdown, so it is exact at any tick rate.
#[derive(Debug, Clone)]
pub struct Weapon {
    magazine_size: u32,
    ammo: u32,
    fire_interval: Duration,
    last_shot: Option<Duration>,
}

impl Weapon {
    pub fn new(magazine_size: u32, fire_interval: Duration) -> Self {
        Self {
            magazine_size,
            ammo: magazine_size,
            fire_interval,
            last_shot: None,
        }
    }

    pub fn from_config(config: &WeaponConfig) -> Self {
        Self::new(config.magazine_size, secs(config.fire_interval))
    }

    /// Check if the weapon could fire at `now`.
    pub fn can_fire(&self, now: Duration) -> bool {
        self.ammo > 0 && !self.cooling_down(now)
    }

    fn cooling_down(&self, now: Duration) -> bool {
        match self.last_shot {
            Some(last) => now.saturating_sub(last) < self.fire_interval,
            None => false,
        }
    }

    /// Fire at `now`, consuming one round on success.
    pub fn try_fire(&mut self, now: Duration) -> FireOutcome {
        if self.ammo == 0 {
            return FireOutcome::OutOfAmmo;
        }
        if self.cooling_down(now) {
            return FireOutcome::CoolingDown;
        }
        self.ammo -= 1;
        self.last_shot = Some(now);
        FireOutcome::Fired
    }

    /// Full magazine and no cooldown (session restart).
    pub fn refill(&mut self) {
        self.ammo = self.magazine_size;
        self.last_shot = None;
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn magazine_size(&self) -> u32 {
        self.magazine_size
    }

    /// Get ammo display string.
    pub fn ammo_display(&self) -> String {
        format!("{} / {}", self.ammo, self.magazine_size)
    }
}
