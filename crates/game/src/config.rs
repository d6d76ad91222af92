//! Simulation tuning. Loaded from a RON file at startup; every field has a
//! default so partial files work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use physics::{CharacterShape, PhysicsSettings};

use crate::error::ConfigError;

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for spawn placement and unstuck impulses (reproducible runs).
    pub seed: u64,
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    pub weapon: WeaponConfig,
    pub projectile: ProjectileConfig,
    pub hostile: HostileConfig,
    pub spawn: SpawnConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_c17e,
            physics: PhysicsConfig::default(),
            player: PlayerConfig::default(),
            weapon: WeaponConfig::default(),
            projectile: ProjectileConfig::default(),
            hostile: HostileConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed simulation rate in Hz.
    pub tick_rate: f32,
    pub gravity: f32,
    /// Upper bound on fixed steps run by one `tick()` call.
    pub max_steps_per_tick: u32,
    /// Height of the ground plane.
    pub ground_height: f32,
    /// Anything below this height is out of bounds.
    pub world_floor: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            gravity: -9.81,
            max_steps_per_tick: 8,
            ground_height: 0.0,
            world_floor: -20.0,
        }
    }
}

impl PhysicsConfig {
    pub fn fixed_timestep(&self) -> Duration {
        Duration::from_nanos((1e9 / self.tick_rate as f64).round() as u64)
    }

    pub fn settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            fixed_timestep: 1.0 / self.tick_rate,
            gravity: Vec3::new(0.0, self.gravity, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub spawn_position: Vec3,
    pub max_health: f32,
    /// Seconds after a hit during which further damage is ignored.
    pub immunity_window: f32,
    pub move_speed: f32,
    /// Vertical velocity set by a jump.
    pub jump_speed: f32,
    /// Minimum upward component of a support normal to count as grounded.
    pub ground_normal_threshold: f32,
    /// Extra reach of the downward ground probe below the capsule.
    pub ground_probe_distance: f32,
    pub half_height: f32,
    pub radius: f32,
    pub mass: f32,
    /// Camera height above the body center.
    pub eye_height: f32,
    /// Distance in front of the eye where shots spawn.
    pub muzzle_offset: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_position: Vec3::new(0.0, 1.0, 0.0),
            max_health: 100.0,
            immunity_window: 0.5,
            move_speed: 6.0,
            jump_speed: 5.5,
            ground_normal_threshold: 0.7,
            ground_probe_distance: 0.15,
            half_height: 0.5,
            radius: 0.4,
            mass: 75.0,
            eye_height: 0.7,
            muzzle_offset: 0.6,
        }
    }
}

impl PlayerConfig {
    pub fn shape(&self) -> CharacterShape {
        CharacterShape {
            half_height: self.half_height,
            radius: self.radius,
            mass: self.mass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub magazine_size: u32,
    /// Minimum seconds between shots.
    pub fire_interval: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            magazine_size: 30,
            fire_interval: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub speed: f32,
    pub radius: f32,
    /// Seconds before an unspent projectile expires.
    pub time_to_live: f32,
    pub damage: f32,
    pub gravity_scale: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 60.0,
            radius: 0.08,
            time_to_live: 2.0,
            damage: 25.0,
            gravity_scale: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileConfig {
    pub max_health: f32,
    /// Hostiles take every hit by default (no immunity window).
    pub immunity_window: f32,
    pub move_speed: f32,
    /// Horizontal distance at which a hostile stops to attack.
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown: f32,
    /// Seconds between AI re-evaluations.
    pub think_interval: f32,
    /// Minimum horizontal travel per evaluation to not count as stuck.
    pub stuck_threshold: f32,
    pub stuck_timeout: f32,
    pub unstuck_speed: f32,
    /// How long an unstuck impulse overrides chase steering.
    pub unstuck_duration: f32,
    /// Horizontal velocity multiplier per evaluation while idle.
    pub idle_damping: f32,
    /// Seconds a corpse stays in the world before it is pruned.
    pub corpse_linger: f32,
    pub half_height: f32,
    pub radius: f32,
    pub mass: f32,
}

impl Default for HostileConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            immunity_window: 0.0,
            move_speed: 3.5,
            attack_range: 1.8,
            attack_damage: 10.0,
            attack_cooldown: 1.0,
            think_interval: 0.1,
            stuck_threshold: 0.05,
            stuck_timeout: 1.5,
            unstuck_speed: 7.0,
            unstuck_duration: 0.4,
            idle_damping: 0.9,
            corpse_linger: 0.0,
            half_height: 0.5,
            radius: 0.4,
            mass: 60.0,
        }
    }
}

impl HostileConfig {
    pub fn shape(&self) -> CharacterShape {
        CharacterShape {
            half_height: self.half_height,
            radius: self.radius,
            mass: self.mass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Hostiles placed at session start regardless of the timer.
    pub initial_population: usize,
    pub max_population: usize,
    /// Seconds between spawns at session start.
    pub initial_interval: f32,
    /// Floor the interval never drops below.
    pub min_interval: f32,
    /// Multiplier applied to the interval after every spawn cycle.
    pub interval_decay: f32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Height above the ground at which hostiles appear.
    pub spawn_height: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            initial_population: 3,
            max_population: 20,
            initial_interval: 5.0,
            min_interval: 1.0,
            interval_decay: 0.95,
            inner_radius: 15.0,
            outer_radius: 30.0,
            spawn_height: 1.0,
        }
    }
}

/// `cityhold.ron` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("cityhold.ron")
}

/// Seconds from config to a `Duration`, rounded to whole microseconds so
/// values like `0.1` compare exactly against sums of themselves. Garbage
/// becomes zero.
pub(crate) fn secs(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_micros((value as f64 * 1e6).round() as u64)
    } else {
        Duration::ZERO
    }
}

impl GameConfig {
    /// Load config from `path`. If the file is missing or invalid, returns
    /// the default config.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match Self::from_ron_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            },
            Err(e) => log::info!("No config at {:?} ({}), using defaults", path, e),
        }
        Self::default()
    }

    /// Write the config as RON, logging instead of failing.
    pub fn save(&self, path: &Path) {
        match self.to_ron_string() {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    /// Parse and validate a RON document.
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed RON for writing a template file.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        }
        fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be non-negative, got {}", value),
                })
            }
        }

        positive("physics.tick_rate", self.physics.tick_rate)?;
        if self.physics.fixed_timestep().is_zero() {
            return Err(ConfigError::Invalid {
                field: "physics.tick_rate",
                reason: format!("{} Hz rounds to a zero-length step", self.physics.tick_rate),
            });
        }
        if !self.physics.gravity.is_finite() {
            return Err(ConfigError::Invalid {
                field: "physics.gravity",
                reason: "must be finite".to_string(),
            });
        }
        if self.physics.max_steps_per_tick == 0 {
            return Err(ConfigError::Invalid {
                field: "physics.max_steps_per_tick",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.physics.world_floor >= self.physics.ground_height {
            return Err(ConfigError::Invalid {
                field: "physics.world_floor",
                reason: "must lie below the ground plane".to_string(),
            });
        }

        positive("player.max_health", self.player.max_health)?;
        non_negative("player.immunity_window", self.player.immunity_window)?;
        positive("player.move_speed", self.player.move_speed)?;
        non_negative("player.jump_speed", self.player.jump_speed)?;
        positive("player.radius", self.player.radius)?;

        positive("weapon.fire_interval", self.weapon.fire_interval)?;

        positive("projectile.speed", self.projectile.speed)?;
        positive("projectile.radius", self.projectile.radius)?;
        positive("projectile.time_to_live", self.projectile.time_to_live)?;
        non_negative("projectile.damage", self.projectile.damage)?;

        positive("hostile.max_health", self.hostile.max_health)?;
        non_negative("hostile.immunity_window", self.hostile.immunity_window)?;
        positive("hostile.move_speed", self.hostile.move_speed)?;
        positive("hostile.attack_range", self.hostile.attack_range)?;
        positive("hostile.think_interval", self.hostile.think_interval)?;
        non_negative("hostile.stuck_threshold", self.hostile.stuck_threshold)?;
        positive("hostile.stuck_timeout", self.hostile.stuck_timeout)?;
        non_negative("hostile.corpse_linger", self.hostile.corpse_linger)?;
        positive("hostile.radius", self.hostile.radius)?;

        if self.spawn.max_population == 0 {
            return Err(ConfigError::Invalid {
                field: "spawn.max_population",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("spawn.min_interval", self.spawn.min_interval)?;
        if self.spawn.initial_interval < self.spawn.min_interval {
            return Err(ConfigError::Invalid {
                field: "spawn.initial_interval",
                reason: "must not be below spawn.min_interval".to_string(),
            });
        }
        if !(self.spawn.interval_decay > 0.0 && self.spawn.interval_decay <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "spawn.interval_decay",
                reason: "must be in (0, 1]".to_string(),
            });
        }
        non_negative("spawn.inner_radius", self.spawn.inner_radius)?;
        if !(self.spawn.outer_radius > self.spawn.inner_radius) {
            return Err(ConfigError::Invalid {
                field: "spawn.outer_radius",
                reason: "must exceed spawn.inner_radius".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_ron_fills_in_defaults() {
        let config = GameConfig::from_ron_str("(seed: 7, spawn: (max_population: 4))")
            .expect("partial config parses");
        assert_eq!(config.seed, 7);
        assert_eq!(config.spawn.max_population, 4);
        assert_eq!(config.spawn.inner_radius, SpawnConfig::default().inner_radius);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn template_roundtrips() {
        let config = GameConfig::default();
        let text = config.to_ron_string().expect("serializes");
        assert_eq!(GameConfig::from_ron_str(&text).expect("parses"), config);
    }

    #[test]
    fn rejects_inverted_annulus_and_bad_floor() {
        let mut config = GameConfig::default();
        config.spawn.outer_radius = config.spawn.inner_radius;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "spawn.outer_radius", .. })
        ));

        let mut config = GameConfig::default();
        config.spawn.min_interval = 10.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.physics.tick_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_tick_rate_with_zero_length_step() {
        let mut config = GameConfig::default();
        config.physics.tick_rate = 4.0e9;
        assert_eq!(config.physics.fixed_timestep(), Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "physics.tick_rate", .. })
        ));

        config.physics.tick_rate = 1.0e6;
        assert_eq!(config.physics.fixed_timestep(), Duration::from_micros(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        assert!(matches!(
            GameConfig::from_ron_str("(seed: \"nope\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn secs_rounds_to_microseconds() {
        assert_eq!(secs(0.1), Duration::from_millis(100));
        assert_eq!(secs(0.1) * 15, secs(1.5));
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f32::NAN), Duration::ZERO);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = GameConfig::load(Path::new("/definitely/not/here/cityhold.ron"));
        assert_eq!(config, GameConfig::default());
    }
}
