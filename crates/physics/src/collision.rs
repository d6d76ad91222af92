//! Collision categories and filtering.
//!
//! A pair is resolved only when each body's category is in the other's
//! accept mask, so a contact reported after `step()` is always a pair the
//! gameplay code cares about.

use rapier3d::prelude::*;

/// Collision categories for simulated bodies.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionCategory {
    /// Walkable ground plane.
    Ground = 1 << 0,
    /// Player character
    Player = 1 << 1,
    /// Hostile agents
    Hostile = 1 << 2,
    /// Player projectiles
    Projectile = 1 << 3,
    /// Buildings and other geometry supplied by world generation.
    StaticGeometry = 1 << 4,
}

impl CollisionCategory {
    pub const ALL: [CollisionCategory; 5] = [
        CollisionCategory::Ground,
        CollisionCategory::Player,
        CollisionCategory::Hostile,
        CollisionCategory::Projectile,
        CollisionCategory::StaticGeometry,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Categories this one resolves contacts with.
    pub fn accept_mask(self) -> u32 {
        use CollisionCategory::*;
        match self {
            Ground | StaticGeometry => Player.bits() | Hostile.bits() | Projectile.bits(),
            Player => Ground.bits() | StaticGeometry.bits() | Hostile.bits(),
            Hostile => {
                Ground.bits()
                    | StaticGeometry.bits()
                    | Player.bits()
                    | Hostile.bits()
                    | Projectile.bits()
            }
            Projectile => Ground.bits() | StaticGeometry.bits() | Hostile.bits(),
        }
    }

    /// Symmetric filter test: both sides must accept each other.
    pub fn accepts(self, other: CollisionCategory) -> bool {
        self.accept_mask() & other.bits() != 0 && other.accept_mask() & self.bits() != 0
    }

    /// Rapier membership/filter pair for this category.
    pub fn interaction_groups(self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_retain(self.bits()),
            Group::from_bits_retain(self.accept_mask()),
        )
    }

    /// Encode into collider user data so contacts can be classified later.
    pub fn to_user_data(self) -> u128 {
        self.bits() as u128
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.to_user_data() == data)
    }
}

/// Handles linking a simulated entity to its physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub rigid_body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

impl PhysicsBody {
    pub fn new(rigid_body: RigidBodyHandle, collider: ColliderHandle) -> Self {
        Self {
            rigid_body,
            collider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_symmetric() {
        for a in CollisionCategory::ALL {
            for b in CollisionCategory::ALL {
                assert_eq!(a.accepts(b), b.accepts(a), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn irrelevant_pairs_are_filtered() {
        use CollisionCategory::*;
        assert!(!Projectile.accepts(Projectile));
        assert!(!Projectile.accepts(Player));
        assert!(!Ground.accepts(StaticGeometry));
        assert!(Projectile.accepts(Hostile));
        assert!(Player.accepts(Hostile));
        assert!(Hostile.accepts(Hostile));
        assert!(Player.accepts(Ground));
    }

    #[test]
    fn user_data_roundtrip() {
        for c in CollisionCategory::ALL {
            assert_eq!(CollisionCategory::from_user_data(c.to_user_data()), Some(c));
        }
        assert_eq!(CollisionCategory::from_user_data(0), None);
    }
}
