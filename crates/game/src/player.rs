//! Player controller and state.

use std::time::Duration;

use engine_core::{look_direction, DamageOutcome, Health, Quat, Transform, Vec3};
use input::{LookDelta, MovementIntent};
use physics::{CollisionCategory, PhysicsBody, PhysicsWorld};

use crate::config::{secs, PlayerConfig, WeaponConfig};
use crate::error::SimError;
use crate::weapons::{FireOutcome, Weapon};

const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;
/// Upward speed above which contacts no longer ground the player (just jumped).
const MAX_GROUNDED_RISE: f32 = 0.5;

/// A shot the simulation should turn into a projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub origin: Vec3,
    /// Unit look direction.
    pub direction: Vec3,
}

/// Singleton player: a rotation-locked capsule steered by input.
pub struct PlayerController {
    pub transform: Transform,
    body: PhysicsBody,
    health: Health,
    weapon: Weapon,
    yaw: f32,
    pitch: f32,
    is_grounded: bool,
    spawn_position: Vec3,
    config: PlayerConfig,
}

impl PlayerController {
    /// Register the player body at the configured spawn point.
    pub fn spawn(
        physics: &mut PhysicsWorld,
        config: &PlayerConfig,
        weapon: &WeaponConfig,
    ) -> Result<Self, SimError> {
        let body = physics.add_character_body(
            CollisionCategory::Player,
            config.spawn_position,
            config.shape(),
        )?;
        Ok(Self {
            transform: Transform::from_position(config.spawn_position),
            body,
            health: Health::with_immunity(config.max_health, secs(config.immunity_window)),
            weapon: Weapon::from_config(weapon),
            yaw: 0.0,
            pitch: 0.0,
            is_grounded: false,
            spawn_position: config.spawn_position,
            config: config.clone(),
        })
    }

    /// One fixed step of player logic, run after the physics step.
    ///
    /// Returns a shot when the fire intent produced one. A dead player does
    /// nothing.
    pub fn update(
        &mut self,
        physics: &mut PhysicsWorld,
        intent: MovementIntent,
        look: LookDelta,
        now: Duration,
    ) -> Option<ShotRequest> {
        if self.is_dead() {
            return None;
        }
        self.apply_look(look);
        self.sync_from_physics(physics);
        self.refresh_grounded(physics);
        self.apply_movement(physics, intent);

        if !intent.fire {
            return None;
        }
        match self.fire(now) {
            Ok(shot) => shot,
            Err(e) => {
                log::warn!("Player fire rejected: {}", e);
                None
            }
        }
    }

    /// Turn by a look delta. Pitch is clamped so the view never flips.
    pub fn apply_look(&mut self, look: LookDelta) {
        if !(look.yaw.is_finite() && look.pitch.is_finite()) {
            return;
        }
        self.yaw = (self.yaw + look.yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + look.pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.transform.rotation = Quat::from_rotation_y(self.yaw);
    }

    /// Copy the body's position into the transform.
    pub fn sync_from_physics(&mut self, physics: &PhysicsWorld) {
        match physics.position(self.body.rigid_body) {
            Some(position) => self.transform.position = position,
            None => log::warn!("Player body {:?} missing from physics world", self.body.rigid_body),
        }
    }

    /// Grounded when the last step reported a supporting contact, or when the
    /// downward probe finds ground just below the capsule.
    pub fn refresh_grounded(&mut self, physics: &PhysicsWorld) {
        let rising = physics
            .linvel(self.body.rigid_body)
            .map(|v| v.y > MAX_GROUNDED_RISE)
            .unwrap_or(false);
        if rising {
            self.is_grounded = false;
            return;
        }

        let threshold = self.config.ground_normal_threshold;
        let supported = physics
            .contacts()
            .iter()
            .filter_map(|c| c.view_from(self.body.rigid_body))
            .any(|view| {
                matches!(
                    view.other_category,
                    CollisionCategory::Ground
                        | CollisionCategory::StaticGeometry
                        | CollisionCategory::Hostile
                ) && view.normal.y > threshold
            });

        self.is_grounded = supported || {
            let reach = self.config.half_height + self.config.radius + self.config.ground_probe_distance;
            physics
                .ground_distance(self.transform.position, reach, self.body.rigid_body)
                .is_some()
        };
    }

    /// Steer horizontally along the yaw-relative intent; gravity keeps the
    /// vertical axis unless a grounded jump overrides it.
    pub fn apply_movement(&mut self, physics: &mut PhysicsWorld, intent: MovementIntent) {
        let Some(current) = physics.linvel(self.body.rigid_body) else {
            return;
        };
        let planar = intent.planar();
        let forward = look_direction(self.yaw, 0.0);
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        let horizontal = (right * planar.x + forward * planar.y) * self.config.move_speed;

        let mut vertical = current.y;
        if intent.jump && self.is_grounded {
            vertical = self.config.jump_speed;
            self.is_grounded = false;
        }
        physics.set_linvel(
            self.body.rigid_body,
            Vec3::new(horizontal.x, vertical, horizontal.z),
        );
    }

    /// Pull the trigger. `Ok(None)` when the weapon is cooling down or empty.
    pub fn fire(&mut self, now: Duration) -> Result<Option<ShotRequest>, SimError> {
        if self.is_dead() {
            return Err(SimError::InvalidState("cannot fire while dead"));
        }
        match self.weapon.try_fire(now) {
            FireOutcome::Fired => {
                let direction = self.look_direction();
                Ok(Some(ShotRequest {
                    origin: self.eye_position() + direction * self.config.muzzle_offset,
                    direction,
                }))
            }
            FireOutcome::CoolingDown => Ok(None),
            FireOutcome::OutOfAmmo => {
                log::debug!("Click: magazine empty");
                Ok(None)
            }
        }
    }

    pub fn take_damage(&mut self, amount: f32, now: Duration) -> DamageOutcome {
        self.health.take_damage(amount, now)
    }

    /// Back to the spawn point at rest, with full health and ammo.
    pub fn reset(&mut self, physics: &mut PhysicsWorld) {
        physics.teleport(self.body.rigid_body, self.spawn_position);
        self.transform = Transform::from_position(self.spawn_position);
        self.health.reset();
        self.weapon.refill();
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.is_grounded = false;
    }

    /// Get player position.
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn eye_position(&self) -> Vec3 {
        self.transform.position + Vec3::Y * self.config.eye_height
    }

    pub fn look_direction(&self) -> Vec3 {
        look_direction(self.yaw, self.pitch)
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_grounded(&self) -> bool {
        self.is_grounded
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn weapon(&self) -> &Weapon {
        &self.weapon
    }

    pub fn body(&self) -> PhysicsBody {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::PhysicsSettings;

    fn setup() -> (PhysicsWorld, PlayerController) {
        let mut physics = PhysicsWorld::new(PhysicsSettings::default()).expect("physics");
        physics.add_ground_plane(0.0);
        let player = PlayerController::spawn(&mut physics, &PlayerConfig::default(), &WeaponConfig::default())
            .expect("player");
        (physics, player)
    }

    fn settle(physics: &mut PhysicsWorld, player: &mut PlayerController, steps: usize) {
        for _ in 0..steps {
            physics.step();
            player.update(physics, MovementIntent::default(), LookDelta::default(), Duration::ZERO);
        }
    }

    #[test]
    fn lands_and_becomes_grounded() {
        let (mut physics, mut player) = setup();
        settle(&mut physics, &mut player, 60);
        assert!(player.is_grounded());
        assert!(player.position().y < 1.0);
    }

    #[test]
    fn airborne_player_is_not_grounded() {
        let mut physics = PhysicsWorld::new(PhysicsSettings::default()).expect("physics");
        physics.add_ground_plane(0.0);
        let config = PlayerConfig {
            spawn_position: Vec3::new(0.0, 10.0, 0.0),
            ..Default::default()
        };
        let mut player = PlayerController::spawn(&mut physics, &config, &WeaponConfig::default()).expect("player");
        physics.step();
        player.update(&mut physics, MovementIntent::default(), LookDelta::default(), Duration::ZERO);
        assert!(!player.is_grounded());
    }

    #[test]
    fn jump_only_from_the_ground() {
        let (mut physics, mut player) = setup();
        settle(&mut physics, &mut player, 60);

        let jump = MovementIntent {
            jump: true,
            ..Default::default()
        };
        physics.step();
        player.update(&mut physics, jump, LookDelta::default(), Duration::ZERO);
        let vy = physics.linvel(player.body().rigid_body).expect("body").y;
        assert!((vy - PlayerConfig::default().jump_speed).abs() < 1e-4);
        assert!(!player.is_grounded());

        // Still rising on the next step: a held jump does not stack.
        physics.step();
        player.update(&mut physics, jump, LookDelta::default(), Duration::ZERO);
        let vy2 = physics.linvel(player.body().rigid_body).expect("body").y;
        assert!(vy2 < vy);
    }

    #[test]
    fn movement_follows_yaw() {
        let (mut physics, mut player) = setup();
        settle(&mut physics, &mut player, 30);

        let forward = MovementIntent {
            forward: true,
            ..Default::default()
        };
        physics.step();
        player.update(&mut physics, forward, LookDelta::default(), Duration::ZERO);
        let v = physics.linvel(player.body().rigid_body).expect("body");
        assert!((v.z + 6.0).abs() < 1e-3 && v.x.abs() < 1e-3);

        // Quarter turn to the left: forward is now -X.
        let turn = LookDelta {
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
        };
        physics.step();
        player.update(&mut physics, forward, turn, Duration::ZERO);
        let v = physics.linvel(player.body().rigid_body).expect("body");
        assert!((v.x + 6.0).abs() < 1e-3 && v.z.abs() < 1e-3);

        let strafe = MovementIntent {
            right: true,
            ..Default::default()
        };
        physics.step();
        player.update(&mut physics, strafe, LookDelta::default(), Duration::ZERO);
        let v = physics.linvel(player.body().rigid_body).expect("body");
        assert!((v.z + 6.0).abs() < 1e-3, "right of -X is -Z, got {:?}", v);
    }

    #[test]
    fn pitch_is_clamped() {
        let (_, mut player) = setup();
        player.apply_look(LookDelta { yaw: 0.0, pitch: 10.0 });
        assert!((player.pitch() - MAX_PITCH).abs() < 1e-6);
        player.apply_look(LookDelta { yaw: 0.0, pitch: -20.0 });
        assert!((player.pitch() + MAX_PITCH).abs() < 1e-6);
        assert!(player.look_direction().y < -0.99);
    }

    #[test]
    fn shots_leave_from_the_muzzle() {
        let (_, mut player) = setup();
        let shot = player
            .fire(Duration::ZERO)
            .expect("alive")
            .expect("first shot fires");
        assert!((shot.direction - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        let expected = player.eye_position() + shot.direction * PlayerConfig::default().muzzle_offset;
        assert!((shot.origin - expected).length() < 1e-5);
        assert_eq!(player.weapon().ammo(), 29);
        assert_eq!(player.fire(Duration::from_millis(50)).expect("alive"), None);
    }

    #[test]
    fn firing_while_dead_is_invalid() {
        let (_, mut player) = setup();
        assert!(player.take_damage(1000.0, Duration::ZERO).is_kill());
        assert!(matches!(player.fire(Duration::from_secs(1)), Err(SimError::InvalidState(_))));
    }

    #[test]
    fn reset_restores_spawn_state() {
        let (mut physics, mut player) = setup();
        player.take_damage(60.0, Duration::ZERO);
        let _ = player.fire(Duration::ZERO);
        physics.teleport(player.body().rigid_body, Vec3::new(20.0, 1.0, 5.0));
        player.apply_look(LookDelta { yaw: 1.0, pitch: 0.5 });

        player.reset(&mut physics);
        assert_eq!(player.health().fraction(), 1.0);
        assert_eq!(player.weapon().ammo(), 30);
        assert_eq!(player.yaw(), 0.0);
        let p = physics.position(player.body().rigid_body).expect("body");
        assert!((p - PlayerConfig::default().spawn_position).length() < 1e-5);
        assert_eq!(physics.linvel(player.body().rigid_body), Some(Vec3::ZERO));
    }
}
