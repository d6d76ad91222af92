//! Gameplay events queued during a tick and drained by the host afterwards.

use engine_core::Vec3;

use crate::projectile::ExpiryReason;

/// Something the host may want to react to (sound, HUD flash, kill feed).
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    SessionStarted { restart: bool },
    ShotFired { origin: Vec3, direction: Vec3, ammo_left: u32 },
    HostileSpawned { id: u32, position: Vec3 },
    HostileHit { id: u32, damage: f32 },
    HostileKilled { id: u32, position: Vec3 },
    PlayerDamaged { damage: f32, health_left: f32 },
    PlayerDied,
    ProjectileExpired { reason: ExpiryReason },
    /// A hostile that stopped making progress was kicked in a random direction.
    HostileUnstuck { id: u32 },
    /// A living hostile fell below the world floor and was removed uncounted.
    HostileOutOfBounds { id: u32 },
}

/// Per-tick event buffer. Hosts call [`crate::Simulation::drain_events`]
/// once per frame; undrained events keep accumulating.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut q = EventQueue::default();
        q.push(GameEvent::PlayerDied);
        q.push(GameEvent::HostileHit { id: 3, damage: 25.0 });
        assert_eq!(q.len(), 2);
        let drained = q.drain();
        assert_eq!(drained[0], GameEvent::PlayerDied);
        assert!(q.is_empty());
    }
}
