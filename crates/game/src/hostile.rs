//! Hostile agents: components, spawning and the read-only view handed to
//! the renderer.

use std::time::Duration;

use engine_core::{AIState, Health, Lifecycle, Transform, Vec3};
use hecs::{Entity, World};
use physics::{CollisionCategory, PhysicsBody, PhysicsWorld};

use crate::config::{secs, HostileConfig};
use crate::error::SimError;
use crate::hostile_ai::HostileBrain;

/// Hostile component. Paired on the entity with `Transform`, `PhysicsBody`,
/// `Health` and `Lifecycle`.
#[derive(Debug, Clone)]
pub struct Hostile {
    /// Session-unique serial, used in events.
    pub id: u32,
    pub brain: HostileBrain,
}

/// Everything needed to put one hostile into the world.
pub struct HostileBundle {
    pub transform: Transform,
    pub health: Health,
    pub hostile: Hostile,
}

impl HostileBundle {
    pub fn new(id: u32, position: Vec3, config: &HostileConfig, now: Duration) -> Self {
        Self {
            transform: Transform::from_position(position),
            health: Health::with_immunity(config.max_health, secs(config.immunity_window)),
            hostile: Hostile {
                id,
                brain: HostileBrain::new(position, now),
            },
        }
    }

    /// Register the body and spawn into the ECS world.
    pub fn spawn(
        self,
        world: &mut World,
        physics: &mut PhysicsWorld,
        config: &HostileConfig,
    ) -> Result<(Entity, PhysicsBody), SimError> {
        let body = physics.add_character_body(
            CollisionCategory::Hostile,
            self.transform.position,
            config.shape(),
        )?;
        let entity = world.spawn((
            self.transform,
            body,
            self.health,
            self.hostile,
            Lifecycle::Alive,
        ));
        Ok((entity, body))
    }
}

/// Snapshot of a hostile for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileView {
    pub id: u32,
    pub transform: Transform,
    pub state: AIState,
    pub health_fraction: f32,
}

/// Collect views of every hostile still in the world, dead ones included
/// until they are pruned.
pub fn hostile_views(world: &World) -> Vec<HostileView> {
    let mut views: Vec<HostileView> = world
        .query::<(&Transform, &Health, &Hostile)>()
        .iter()
        .map(|(_, (transform, health, hostile))| HostileView {
            id: hostile.id,
            transform: *transform,
            state: hostile.brain.state(),
            health_fraction: health.fraction(),
        })
        .collect();
    views.sort_by_key(|v| v.id);
    views
}

/// Number of living hostiles.
pub fn alive_count(world: &World) -> usize {
    world
        .query::<(&Hostile, &Lifecycle)>()
        .iter()
        .filter(|(_, (_, lifecycle))| **lifecycle == Lifecycle::Alive)
        .count()
}
