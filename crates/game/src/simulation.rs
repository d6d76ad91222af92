//! The fixed-step simulation loop.
//!
//! `Simulation` owns every piece of mutable game state: the physics world,
//! the ECS world holding hostiles and projectiles, the player, the spawn
//! director and the session counters. Hosts call [`Simulation::tick`] once
//! per frame with the wall time that elapsed; the clock converts that into
//! zero or more fixed steps. Each step runs in a fixed order:
//!
//! 1. sample input
//! 2. step physics and collect contacts
//! 3. player movement, look and fire
//! 4. hostile AI and transform sync
//! 5. projectile sync, hit resolution and expiry
//! 6. melee attacks against the player
//! 7. spawn director
//! 8. prune dead and expired entities
//! 9. game-over check

use std::collections::HashMap;
use std::time::Duration;

use engine_core::{
    horizontal_distance, DamageOutcome, Health, Lifecycle, SimClock, Transform, Vec3,
};
use hecs::{Entity, World};
use input::InputSource;
use physics::{CollisionCategory, PhysicsBody, PhysicsWorld, RigidBodyHandle, StaticShape};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{secs, GameConfig};
use crate::error::SimError;
use crate::events::{EventQueue, GameEvent};
use crate::hostile::{alive_count, hostile_views, Hostile, HostileBundle, HostileView};
use crate::hostile_ai::{HostileTuning, Steering};
use crate::player::{PlayerController, ShotRequest};
use crate::projectile::{spawn_projectile, ExpiryReason, Projectile};
use crate::session::{SessionPhase, SessionStats};
use crate::spawner::{SpawnDirector, ThreatLevel};

/// Top-level simulation state.
pub struct Simulation {
    config: GameConfig,
    phase: SessionPhase,
    clock: SimClock,
    physics: PhysicsWorld,
    world: World,
    player: PlayerController,
    director: SpawnDirector,
    tuning: HostileTuning,
    rng: StdRng,
    /// Reverse lookup from physics bodies to the entities owning them.
    bodies: HashMap<RigidBodyHandle, Entity>,
    stats: SessionStats,
    events: EventQueue,
    next_hostile_id: u32,
}

impl Simulation {
    /// Build the world: ground plane, static geometry from the world
    /// generator, and the player body. Invalid configuration or geometry is
    /// fatal here and nowhere else.
    pub fn new(config: GameConfig, static_geometry: &[StaticShape]) -> Result<Self, SimError> {
        config.validate()?;

        let mut physics = PhysicsWorld::new(config.physics.settings())?;
        physics.add_ground_plane(config.physics.ground_height);
        for shape in static_geometry {
            physics.add_static_geometry(shape)?;
        }
        let player = PlayerController::spawn(&mut physics, &config.player, &config.weapon)?;
        physics.update_query_pipeline();

        let clock = SimClock::new(config.physics.fixed_timestep())
            .with_max_steps(config.physics.max_steps_per_tick);
        let director = SpawnDirector::new(&config.spawn, config.physics.ground_height);

        log::info!(
            "Simulation ready: {} static shapes, {:.0} Hz, seed {:#x}",
            static_geometry.len(),
            config.physics.tick_rate,
            config.seed
        );

        Ok(Self {
            phase: SessionPhase::NotStarted,
            clock,
            physics,
            world: World::new(),
            player,
            director,
            tuning: HostileTuning::from_config(&config.hostile),
            rng: StdRng::seed_from_u64(config.seed),
            bodies: HashMap::new(),
            stats: SessionStats::default(),
            events: EventQueue::default(),
            next_hostile_id: 0,
            config,
        })
    }

    /// Begin the first session: place the initial population and start the
    /// clock.
    pub fn start_session(&mut self) -> Result<(), SimError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SimError::InvalidState("session already started"));
        }
        self.events.push(GameEvent::SessionStarted { restart: false });
        self.seed_population()?;
        self.phase = SessionPhase::Running;
        log::info!("Session started");
        Ok(())
    }

    /// Tear down every hostile and projectile and start over with a fresh
    /// player, pacing and counters.
    pub fn restart_session(&mut self) -> Result<(), SimError> {
        if self.phase == SessionPhase::NotStarted {
            return self.start_session();
        }
        log::info!(
            "Restarting session after {} ({} kills)",
            self.stats.time_survived_str(),
            self.stats.kills
        );

        self.despawn_all();
        self.player.reset(&mut self.physics);
        self.director.reset();
        self.clock.reset();
        self.stats = SessionStats::default();
        self.physics.update_query_pipeline();

        self.events.push(GameEvent::SessionStarted { restart: true });
        self.seed_population()?;
        self.phase = SessionPhase::Running;
        Ok(())
    }

    /// Feed host time and run the fixed steps it pays for. Returns the
    /// number of steps run. Once the session is over only a restart request
    /// is honoured.
    pub fn tick<I: InputSource>(&mut self, elapsed: Duration, input: &mut I) -> u32 {
        match self.phase {
            SessionPhase::NotStarted => return 0,
            SessionPhase::GameOver => {
                if input.restart_requested() {
                    if let Err(e) = self.restart_session() {
                        log::warn!("Restart failed: {}", e);
                    }
                }
                return 0;
            }
            SessionPhase::Running => {}
        }

        self.clock.advance(elapsed);
        let mut steps = 0;
        while self.phase == SessionPhase::Running && self.clock.should_fixed_update() {
            self.fixed_step(input);
            steps += 1;
        }
        steps
    }

    fn fixed_step<I: InputSource>(&mut self, input: &mut I) {
        let now = self.clock.now();
        let dt = self.clock.fixed_timestep();

        let intent = input.movement_intent();
        let look = input.take_look_delta();

        self.physics.step();

        if let Some(shot) = self.player.update(&mut self.physics, intent, look, now) {
            self.launch_projectile(shot, now);
        }
        self.update_hostiles(now);
        self.update_projectiles(now);
        self.resolve_melee(now);
        self.run_director(dt, now);
        self.prune(now);

        self.stats.time_survived += dt;
        if self.player.is_dead() {
            self.phase = SessionPhase::GameOver;
            log::info!(
                "Game over: survived {}, {} kills, {:.0}% accuracy",
                self.stats.time_survived_str(),
                self.stats.kills,
                self.stats.accuracy() * 100.0
            );
        }
    }

    // ── Spawning ────────────────────────────────────────────────────────

    fn seed_population(&mut self) -> Result<(), SimError> {
        let points = self
            .director
            .initial_spawn_points(self.player.position(), &mut self.rng);
        for point in points {
            self.spawn_hostile_at(point)?;
        }
        self.physics.update_query_pipeline();
        Ok(())
    }

    /// Place a hostile at `position`. Used by the director; hosts may call it
    /// for scripted encounters. At the population cap this is a no-op and
    /// returns `Ok(None)`.
    pub fn spawn_hostile_at(&mut self, position: Vec3) -> Result<Option<Entity>, SimError> {
        let active = alive_count(&self.world);
        if active >= self.director.max_population() {
            log::debug!(
                "Spawn at {:?} skipped: population at cap ({}/{})",
                position,
                active,
                self.director.max_population()
            );
            return Ok(None);
        }
        let id = self.next_hostile_id;
        let (entity, body) = HostileBundle::new(id, position, &self.config.hostile, self.clock.now())
            .spawn(&mut self.world, &mut self.physics, &self.config.hostile)?;
        self.next_hostile_id += 1;
        self.bodies.insert(body.rigid_body, entity);
        self.events.push(GameEvent::HostileSpawned { id, position });
        log::debug!("Hostile {} spawned at {:?}", id, position);
        Ok(Some(entity))
    }

    fn launch_projectile(&mut self, shot: ShotRequest, now: Duration) {
        match spawn_projectile(
            &mut self.world,
            &mut self.physics,
            shot.origin,
            shot.direction,
            now,
            &self.config.projectile,
        ) {
            Ok((entity, body)) => {
                self.bodies.insert(body.rigid_body, entity);
                self.stats.shots_fired += 1;
                self.events.push(GameEvent::ShotFired {
                    origin: shot.origin,
                    direction: shot.direction,
                    ammo_left: self.player.weapon().ammo(),
                });
            }
            Err(e) => log::warn!("Failed to launch projectile: {}", e),
        }
    }

    fn run_director(&mut self, dt: Duration, now: Duration) {
        let active = alive_count(&self.world);
        let Some(point) = self
            .director
            .update(dt, active, self.player.position(), &mut self.rng)
        else {
            return;
        };
        if let Err(e) = self.spawn_hostile_at(point) {
            log::warn!("Spawn at {:?} failed at {:?}: {}", point, now, e);
        }
    }

    // ── Hostiles ────────────────────────────────────────────────────────

    fn update_hostiles(&mut self, now: Duration) {
        let target = (!self.player.is_dead()).then(|| self.player.position());

        for (_, (transform, body, hostile, lifecycle)) in self
            .world
            .query_mut::<(&mut Transform, &PhysicsBody, &mut Hostile, &Lifecycle)>()
        {
            if *lifecycle != Lifecycle::Alive {
                continue;
            }
            let (Some(position), Some(velocity)) = (
                self.physics.position(body.rigid_body),
                self.physics.linvel(body.rigid_body),
            ) else {
                log::warn!("Hostile {} lost its body; idling", hostile.id);
                hostile
                    .brain
                    .update(now, transform.position, None, &self.tuning, &mut self.rng);
                continue;
            };
            transform.position = position;

            let Some(decision) =
                hostile
                    .brain
                    .update(now, position, target, &self.tuning, &mut self.rng)
            else {
                continue;
            };

            let new_velocity = match decision.steering {
                Steering::Move(v) => Some(Vec3::new(v.x, velocity.y, v.z)),
                Steering::Damp(f) => Some(Vec3::new(velocity.x * f, velocity.y, velocity.z * f)),
                Steering::Coast => None,
            };
            if let Some(v) = new_velocity {
                self.physics.set_linvel(body.rigid_body, v);
            }
            if let Some(facing) = decision.facing {
                transform.face_horizontal(facing);
            }
            if decision.unstuck {
                log::debug!("Hostile {} unstuck", hostile.id);
                self.events.push(GameEvent::HostileUnstuck { id: hostile.id });
            }
        }
    }

    /// Apply damage to a hostile. A killing blow runs the death transition
    /// exactly once.
    fn damage_hostile(&mut self, entity: Entity, amount: f32, now: Duration) -> DamageOutcome {
        let outcome = match self.world.get::<&mut Health>(entity) {
            Ok(mut health) => health.take_damage(amount, now),
            Err(_) => return DamageOutcome::AlreadyDead,
        };
        let id = self
            .world
            .get::<&Hostile>(entity)
            .map(|h| h.id)
            .unwrap_or(u32::MAX);

        match outcome {
            DamageOutcome::Applied { dealt } => {
                self.events.push(GameEvent::HostileHit { id, damage: dealt });
            }
            DamageOutcome::Killed { dealt } => {
                self.events.push(GameEvent::HostileHit { id, damage: dealt });
                self.kill_hostile(entity, id, now);
            }
            DamageOutcome::Blocked | DamageOutcome::AlreadyDead => {}
        }
        outcome
    }

    fn kill_hostile(&mut self, entity: Entity, id: u32, now: Duration) {
        let Ok((transform, body, hostile, lifecycle)) = self
            .world
            .query_one_mut::<(&Transform, &PhysicsBody, &mut Hostile, &mut Lifecycle)>(entity)
        else {
            return;
        };
        if !hostile.brain.kill(now) {
            return;
        }
        *lifecycle = Lifecycle::Dead;
        let position = transform.position;
        self.physics.make_immovable(body.rigid_body);

        self.stats.kills += 1;
        self.events.push(GameEvent::HostileKilled { id, position });
        log::debug!("Hostile {} killed ({} total)", id, self.stats.kills);
    }

    fn resolve_melee(&mut self, now: Duration) {
        if self.player.is_dead() {
            return;
        }
        let player_position = self.player.position();
        let mut attacks = 0u32;
        for (_, (transform, hostile, lifecycle)) in self
            .world
            .query_mut::<(&Transform, &mut Hostile, &Lifecycle)>()
        {
            if *lifecycle != Lifecycle::Alive
                || horizontal_distance(transform.position, player_position) > self.tuning.attack_range
            {
                continue;
            }
            if hostile.brain.try_attack(now, &self.tuning) {
                attacks += 1;
            }
        }

        for _ in 0..attacks {
            match self.player.take_damage(self.tuning.attack_damage, now) {
                DamageOutcome::Applied { dealt } => {
                    self.record_player_damage(dealt);
                }
                DamageOutcome::Killed { dealt } => {
                    self.record_player_damage(dealt);
                    self.events.push(GameEvent::PlayerDied);
                    break;
                }
                DamageOutcome::Blocked => {
                    log::trace!("Attack absorbed by immunity window");
                }
                DamageOutcome::AlreadyDead => break,
            }
        }
    }

    fn record_player_damage(&mut self, dealt: f32) {
        self.stats.damage_taken += dealt;
        self.events.push(GameEvent::PlayerDamaged {
            damage: dealt,
            health_left: self.player.health().current(),
        });
    }

    // ── Projectiles ─────────────────────────────────────────────────────

    fn update_projectiles(&mut self, now: Duration) {
        for (_, (transform, body, _)) in self
            .world
            .query_mut::<(&mut Transform, &PhysicsBody, &Projectile)>()
        {
            if let Some(position) = self.physics.position(body.rigid_body) {
                transform.position = position;
            }
        }

        let mut hits = Vec::new();
        let mut impacts = Vec::new();
        for contact in self.physics.contacts() {
            if let Some((Some(projectile), Some(hostile))) =
                contact.pair_of(CollisionCategory::Projectile, CollisionCategory::Hostile)
            {
                hits.push((projectile, hostile));
                continue;
            }
            for environment in [CollisionCategory::Ground, CollisionCategory::StaticGeometry] {
                if let Some((Some(projectile), _)) =
                    contact.pair_of(CollisionCategory::Projectile, environment)
                {
                    impacts.push(projectile);
                }
            }
        }
        hits.extend(self.overlapping_hits());

        for (projectile_body, hostile_body) in hits {
            let (Some(&projectile), Some(&hostile)) = (
                self.bodies.get(&projectile_body),
                self.bodies.get(&hostile_body),
            ) else {
                continue;
            };
            self.resolve_projectile_hit(projectile, hostile, now);
        }
        for projectile_body in impacts {
            if let Some(&entity) = self.bodies.get(&projectile_body) {
                if let Ok(mut projectile) = self.world.get::<&mut Projectile>(entity) {
                    projectile.spend(ExpiryReason::Impact);
                }
            }
        }

        let floor = self.config.physics.world_floor;
        for (_, (transform, projectile, lifecycle)) in self
            .world
            .query_mut::<(&Transform, &Projectile, &mut Lifecycle)>()
        {
            if *lifecycle != Lifecycle::Alive {
                continue;
            }
            if let Some(reason) = projectile.expiry(now, transform.position, floor) {
                *lifecycle = Lifecycle::PendingRemoval;
                self.events.push(GameEvent::ProjectileExpired { reason });
            }
        }
    }

    /// Unspent projectiles sitting inside a living hostile's capsule. Covers
    /// shots that start inside a hostile or that the solver reported no
    /// contact for.
    fn overlapping_hits(&self) -> Vec<(RigidBodyHandle, RigidBodyHandle)> {
        let hostile = &self.config.hostile;
        let reach = hostile.radius + self.config.projectile.radius;
        let mut targets: Vec<(u32, Vec3, RigidBodyHandle)> = self
            .world
            .query::<(&Transform, &PhysicsBody, &Hostile, &Lifecycle)>()
            .iter()
            .filter(|(_, (_, _, _, lifecycle))| **lifecycle == Lifecycle::Alive)
            .map(|(_, (transform, body, h, _))| (h.id, transform.position, body.rigid_body))
            .collect();
        targets.sort_by_key(|(id, _, _)| *id);

        let mut hits = Vec::new();
        for (_, (transform, body, projectile)) in self
            .world
            .query::<(&Transform, &PhysicsBody, &Projectile)>()
            .iter()
        {
            if projectile.is_spent() {
                continue;
            }
            let p = transform.position;
            if let Some((_, _, target)) = targets.iter().find(|(_, center, _)| {
                let axis_y = p.y.clamp(center.y - hostile.half_height, center.y + hostile.half_height);
                p.distance(Vec3::new(center.x, axis_y, center.z)) <= reach
            }) {
                hits.push((body.rigid_body, *target));
            }
        }
        hits
    }

    /// A projectile touching a hostile. Single use: only the first hostile a
    /// projectile reaches takes its damage, and corpses only absorb it.
    fn resolve_projectile_hit(&mut self, projectile: Entity, hostile: Entity, now: Duration) {
        let hostile_alive = self
            .world
            .get::<&Lifecycle>(hostile)
            .map(|l| *l == Lifecycle::Alive)
            .unwrap_or(false);

        let damage = {
            let Ok(mut p) = self.world.get::<&mut Projectile>(projectile) else {
                return;
            };
            let reason = if hostile_alive {
                ExpiryReason::Hit
            } else {
                ExpiryReason::Impact
            };
            if !p.spend(reason) || !hostile_alive {
                return;
            }
            p.damage
        };

        if self.damage_hostile(hostile, damage, now).landed() {
            self.stats.shots_hit += 1;
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Remove expired projectiles, corpses past their linger time and
    /// hostiles that fell out of the world, deregistering their bodies first.
    /// Falling out is a removal, not a kill.
    fn prune(&mut self, now: Duration) {
        let linger = secs(self.config.hostile.corpse_linger);
        let floor = self.config.physics.world_floor;
        let mut to_despawn: Vec<(Entity, RigidBodyHandle)> = Vec::new();

        for (entity, (transform, body, lifecycle, hostile)) in self
            .world
            .query::<(&Transform, &PhysicsBody, &Lifecycle, Option<&Hostile>)>()
            .iter()
        {
            let remove = match lifecycle {
                Lifecycle::PendingRemoval => true,
                Lifecycle::Dead => hostile
                    .and_then(|h| h.brain.died_at())
                    .map(|t| now.saturating_sub(t) >= linger)
                    .unwrap_or(true),
                Lifecycle::Alive => match hostile {
                    Some(h) if transform.position.y < floor => {
                        log::warn!(
                            "Hostile {} fell out of the world at {:?}",
                            h.id,
                            transform.position
                        );
                        self.events.push(GameEvent::HostileOutOfBounds { id: h.id });
                        true
                    }
                    _ => false,
                },
            };
            if remove {
                to_despawn.push((entity, body.rigid_body));
            }
        }

        for (entity, body) in to_despawn {
            self.physics.remove_body(body);
            self.bodies.remove(&body);
            if let Err(e) = self.world.despawn(entity) {
                log::warn!("Despawn of {:?} failed: {}", entity, e);
            }
        }
    }

    fn despawn_all(&mut self) {
        let handles: Vec<RigidBodyHandle> = self
            .world
            .query::<&PhysicsBody>()
            .iter()
            .map(|(_, body)| body.rigid_body)
            .collect();
        for handle in handles {
            self.physics.remove_body(handle);
        }
        self.world.clear();
        self.bodies.clear();
    }

    // ── Read-only views ─────────────────────────────────────────────────

    pub fn player_transform(&self) -> Transform {
        self.player.transform
    }

    pub fn hostile_views(&self) -> Vec<HostileView> {
        hostile_views(&self.world)
    }

    pub fn projectile_positions(&self) -> Vec<Vec3> {
        self.world
            .query::<(&Transform, &Projectile)>()
            .iter()
            .map(|(_, (transform, _))| transform.position)
            .collect()
    }

    pub fn player_health_fraction(&self) -> f32 {
        self.player.health().fraction()
    }

    pub fn player_ammo(&self) -> u32 {
        self.player.weapon().ammo()
    }

    /// Living hostiles.
    pub fn active_hostiles(&self) -> usize {
        alive_count(&self.world)
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    pub fn kill_count(&self) -> u32 {
        self.stats.kills
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Take every event queued since the previous call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Simulated time since the session started.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn spawn_interval(&self) -> Duration {
        self.director.interval()
    }

    /// Display tier for the time survived so far.
    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_survived(self.stats.time_survived)
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}
