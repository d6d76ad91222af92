//! Projectiles fired by the player.
//!
//! A projectile is a hecs entity carrying `(Transform, PhysicsBody,
//! Projectile, Lifecycle)`. Its body is a small CCD ball so fast shots do
//! not tunnel through thin hostiles.

use std::time::Duration;

use engine_core::{Lifecycle, Transform, Vec3};
use hecs::{Entity, World};
use physics::{PhysicsBody, PhysicsWorld};

use crate::config::{secs, ProjectileConfig};
use crate::error::SimError;

/// Why a projectile left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// Outlived its time to live.
    Expired,
    /// Damaged a hostile.
    Hit,
    /// Struck ground or static geometry.
    Impact,
    /// Fell below the world floor.
    OutOfBounds,
}

/// Projectile component.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
    pub speed: f32,
    pub spawn_time: Duration,
    pub time_to_live: Duration,
    pub damage: f32,
    /// Set once the projectile has hit something. A spent projectile never
    /// deals damage again.
    spent: Option<ExpiryReason>,
}

impl Projectile {
    pub fn new(origin: Vec3, direction: Vec3, now: Duration, config: &ProjectileConfig) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            speed: config.speed,
            spawn_time: now,
            time_to_live: secs(config.time_to_live),
            damage: config.damage,
            spent: None,
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.direction * self.speed
    }

    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.spawn_time)
    }

    pub fn is_expired(&self, now: Duration) -> bool {
        self.age(now) > self.time_to_live
    }

    pub fn is_spent(&self) -> bool {
        self.spent.is_some()
    }

    /// Mark the projectile as used up. Returns false if it already was, so
    /// callers apply its damage at most once.
    pub fn spend(&mut self, reason: ExpiryReason) -> bool {
        if self.spent.is_some() {
            return false;
        }
        self.spent = Some(reason);
        true
    }

    pub fn spent_reason(&self) -> Option<ExpiryReason> {
        self.spent
    }

    /// Removal reason at `now`, if the projectile should leave the world.
    pub fn expiry(&self, now: Duration, position: Vec3, world_floor: f32) -> Option<ExpiryReason> {
        if let Some(reason) = self.spent {
            Some(reason)
        } else if position.y < world_floor {
            Some(ExpiryReason::OutOfBounds)
        } else if self.is_expired(now) {
            Some(ExpiryReason::Expired)
        } else {
            None
        }
    }
}

/// Register a projectile body and spawn its entity.
pub fn spawn_projectile(
    world: &mut World,
    physics: &mut PhysicsWorld,
    origin: Vec3,
    direction: Vec3,
    now: Duration,
    config: &ProjectileConfig,
) -> Result<(Entity, PhysicsBody), SimError> {
    let projectile = Projectile::new(origin, direction, now, config);
    if projectile.direction == Vec3::ZERO {
        return Err(SimError::InvalidState("projectile direction is zero"));
    }
    let body = physics.add_projectile_body(origin, config.radius, projectile.velocity(), config.gravity_scale)?;
    let entity = world.spawn((
        Transform::from_position(origin),
        body,
        projectile,
        Lifecycle::Alive,
    ));
    Ok((entity, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::PhysicsSettings;

    fn config() -> ProjectileConfig {
        ProjectileConfig {
            time_to_live: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn expiry_by_age_and_floor() {
        let p = Projectile::new(Vec3::ZERO, -Vec3::Z, Duration::from_secs(1), &config());
        assert_eq!(p.expiry(Duration::from_secs(3), Vec3::ZERO, -20.0), None);
        assert_eq!(
            p.expiry(Duration::from_millis(3001), Vec3::ZERO, -20.0),
            Some(ExpiryReason::Expired)
        );
        assert_eq!(
            p.expiry(Duration::from_secs(1), Vec3::new(0.0, -21.0, 0.0), -20.0),
            Some(ExpiryReason::OutOfBounds)
        );
    }

    #[test]
    fn spend_is_single_use() {
        let mut p = Projectile::new(Vec3::ZERO, Vec3::X, Duration::ZERO, &config());
        assert!(p.spend(ExpiryReason::Hit));
        assert!(!p.spend(ExpiryReason::Hit));
        assert!(!p.spend(ExpiryReason::Impact));
        assert_eq!(p.spent_reason(), Some(ExpiryReason::Hit));
        assert_eq!(p.expiry(Duration::ZERO, Vec3::ZERO, -20.0), Some(ExpiryReason::Hit));
    }

    #[test]
    fn spawned_body_travels_along_direction() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(PhysicsSettings::default()).expect("physics");
        let (entity, body) = spawn_projectile(
            &mut world,
            &mut physics,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 0.0, -2.0),
            Duration::ZERO,
            &config(),
        )
        .expect("spawn");
        let v = physics.linvel(body.rigid_body).expect("body");
        assert!((v - Vec3::new(0.0, 0.0, -60.0)).length() < 1e-3);
        let p = world.get::<&Projectile>(entity).expect("component");
        assert!((p.direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(PhysicsSettings::default()).expect("physics");
        let result = spawn_projectile(&mut world, &mut physics, Vec3::ZERO, Vec3::ZERO, Duration::ZERO, &config());
        assert!(matches!(result, Err(SimError::InvalidState(_))));
        assert_eq!(physics.body_count(), 0);
    }
}
