//! Escalating hostile spawning.
//!
//! The director banks simulated time and releases one hostile each time the
//! bank reaches the current spawn interval. Every release shrinks the
//! interval by a constant factor until it hits the configured floor, so
//! pressure keeps rising the longer the player holds out. Hostiles appear on
//! an annulus around the player: never on top of them, never too far away.

use std::time::Duration;

use engine_core::Vec3;
use rand::Rng;

use crate::config::{secs, SpawnConfig};

/// Named threat tiers for the HUD, pure flavour driven by time survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatLevel {
    /// 0-2 min
    Minimal,
    /// 2-5 min
    Moderate,
    /// 5-8 min
    Elevated,
    /// 8-12 min
    Severe,
    /// 12-18 min
    Critical,
    /// 18+ min
    Overrun,
}

impl ThreatLevel {
    pub fn from_survived(survived: Duration) -> Self {
        Self::from_minutes(survived.as_secs_f32() / 60.0)
    }

    pub fn from_minutes(minutes: f32) -> Self {
        match minutes {
            m if m < 2.0 => ThreatLevel::Minimal,
            m if m < 5.0 => ThreatLevel::Moderate,
            m if m < 8.0 => ThreatLevel::Elevated,
            m if m < 12.0 => ThreatLevel::Severe,
            m if m < 18.0 => ThreatLevel::Critical,
            _ => ThreatLevel::Overrun,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThreatLevel::Minimal => "MINIMAL",
            ThreatLevel::Moderate => "MODERATE",
            ThreatLevel::Elevated => "ELEVATED",
            ThreatLevel::Severe => "SEVERE",
            ThreatLevel::Critical => "CRITICAL",
            ThreatLevel::Overrun => "OVERRUN",
        }
    }
}

/// Manages continuous, escalating hostile spawning.
#[derive(Debug, Clone)]
pub struct SpawnDirector {
    // ── Timing ──────────────────────────────────────────────────────────
    initial_interval: Duration,
    /// Current interval. Non-increasing, never below `min_interval`.
    interval: Duration,
    min_interval: Duration,
    interval_decay: f32,
    /// Banked time since the last spawn cycle.
    accumulator: Duration,

    // ── Population ──────────────────────────────────────────────────────
    initial_population: usize,
    max_population: usize,

    // ── Geometry ────────────────────────────────────────────────────────
    inner_radius: f32,
    outer_radius: f32,
    /// Absolute height of spawned bodies.
    spawn_y: f32,
}

impl SpawnDirector {
    pub fn new(config: &SpawnConfig, ground_height: f32) -> Self {
        let min_interval = secs(config.min_interval);
        let initial_interval = secs(config.initial_interval).max(min_interval);
        Self {
            initial_interval,
            interval: initial_interval,
            min_interval,
            interval_decay: config.interval_decay.clamp(f32::EPSILON, 1.0),
            accumulator: Duration::ZERO,
            initial_population: config.initial_population,
            max_population: config.max_population,
            inner_radius: config.inner_radius.max(0.0),
            outer_radius: config.outer_radius.max(config.inner_radius.max(0.0)),
            spawn_y: ground_height + config.spawn_height,
        }
    }

    /// Advance by one step. Returns where to spawn a hostile, if one is due
    /// and the population is below the cap.
    pub fn update<R: Rng>(
        &mut self,
        dt: Duration,
        active: usize,
        player_position: Vec3,
        rng: &mut R,
    ) -> Option<Vec3> {
        self.accumulator += dt;
        if self.accumulator < self.interval {
            return None;
        }
        self.accumulator = Duration::ZERO;
        // Escalation follows elapsed time, not successful spawns.
        self.interval = self.interval.mul_f32(self.interval_decay).max(self.min_interval);

        if active >= self.max_population {
            log::debug!(
                "Spawn skipped: population at cap ({}/{})",
                active,
                self.max_population
            );
            return None;
        }
        Some(self.spawn_point(player_position, rng))
    }

    /// Positions for the population placed at session start, capped at the
    /// maximum population.
    pub fn initial_spawn_points<R: Rng>(&self, player_position: Vec3, rng: &mut R) -> Vec<Vec3> {
        (0..self.initial_population.min(self.max_population))
            .map(|_| self.spawn_point(player_position, rng))
            .collect()
    }

    /// Uniformly distributed point on the annulus around `center`.
    pub fn spawn_point<R: Rng>(&self, center: Vec3, rng: &mut R) -> Vec3 {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let r2_min = self.inner_radius * self.inner_radius;
        let r2_max = self.outer_radius * self.outer_radius;
        // Sample r^2 so points are uniform by area, not bunched at the center.
        let radius = if r2_max > r2_min {
            rng.gen_range(r2_min..r2_max).sqrt()
        } else {
            self.inner_radius
        };
        Vec3::new(
            center.x + angle.cos() * radius,
            self.spawn_y,
            center.z + angle.sin() * radius,
        )
    }

    /// Back to session-start pacing.
    pub fn reset(&mut self) {
        self.interval = self.initial_interval;
        self.accumulator = Duration::ZERO;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn max_population(&self) -> usize {
        self.max_population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::horizontal_distance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SpawnConfig {
        SpawnConfig {
            initial_population: 3,
            max_population: 5,
            initial_interval: 2.0,
            min_interval: 0.5,
            interval_decay: 0.5,
            inner_radius: 10.0,
            outer_radius: 20.0,
            spawn_height: 1.0,
        }
    }

    #[test]
    fn spawns_when_interval_elapses() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut director = SpawnDirector::new(&config(), 0.0);
        let step = Duration::from_millis(100);
        let mut spawned_at = None;
        for i in 1..=30u32 {
            if director.update(step, 0, Vec3::ZERO, &mut rng).is_some() {
                spawned_at = Some(i);
                break;
            }
        }
        assert_eq!(spawned_at, Some(20));
        assert_eq!(director.interval(), Duration::from_secs(1));
    }

    #[test]
    fn never_spawns_at_or_above_cap() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut director = SpawnDirector::new(&config(), 0.0);
        for _ in 0..100 {
            assert!(director
                .update(Duration::from_secs(1), 5, Vec3::ZERO, &mut rng)
                .is_none());
        }
        // Pacing still escalated while capped.
        assert_eq!(director.interval(), director.min_interval());
    }

    #[test]
    fn interval_never_drops_below_floor() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut director = SpawnDirector::new(&config(), 0.0);
        let mut previous = director.interval();
        for _ in 0..200 {
            director.update(Duration::from_millis(250), 0, Vec3::ZERO, &mut rng);
            assert!(director.interval() <= previous);
            assert!(director.interval() >= Duration::from_millis(500));
            previous = director.interval();
        }
        assert_eq!(director.interval(), Duration::from_millis(500));
    }

    #[test]
    fn spawn_points_lie_on_the_annulus() {
        let mut rng = StdRng::seed_from_u64(4);
        let director = SpawnDirector::new(&config(), 2.0);
        let center = Vec3::new(5.0, 3.0, -7.0);
        for _ in 0..500 {
            let p = director.spawn_point(center, &mut rng);
            let d = horizontal_distance(center, p);
            assert!((10.0 - 1e-3..=20.0 + 1e-3).contains(&d), "distance {}", d);
            assert_eq!(p.y, 3.0);
        }
    }

    #[test]
    fn initial_population_is_capped() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut cfg = config();
        cfg.initial_population = 12;
        let director = SpawnDirector::new(&cfg, 0.0);
        assert_eq!(director.initial_spawn_points(Vec3::ZERO, &mut rng).len(), 5);
    }

    #[test]
    fn reset_restores_initial_pacing() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut director = SpawnDirector::new(&config(), 0.0);
        for _ in 0..10 {
            director.update(Duration::from_secs(1), 0, Vec3::ZERO, &mut rng);
        }
        assert!(director.interval() < Duration::from_secs(2));
        director.reset();
        assert_eq!(director.interval(), Duration::from_secs(2));
    }

    #[test]
    fn threat_tiers_follow_minutes() {
        assert_eq!(ThreatLevel::from_minutes(0.0), ThreatLevel::Minimal);
        assert_eq!(ThreatLevel::from_minutes(6.0), ThreatLevel::Elevated);
        assert_eq!(ThreatLevel::from_minutes(30.0).name(), "OVERRUN");
        assert_eq!(
            ThreatLevel::from_survived(Duration::from_secs(150)),
            ThreatLevel::Moderate
        );
    }
}
