//! Raycasting for line-of-sight and ground probes.
//!
//! Rays are cast against solid shapes: a ray whose origin is already inside
//! a collider reports an immediate hit at distance 0 on that collider. Pass
//! the caster's own body as `exclude` to avoid hitting yourself.

use crate::collision::CollisionCategory;
use crate::PhysicsWorld;
use engine_core::Vec3;
use rapier3d::prelude::*;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The collider that was hit.
    pub collider: ColliderHandle,
    /// Body owning the collider (None for parentless static geometry).
    pub body: Option<RigidBodyHandle>,
    pub category: Option<CollisionCategory>,
    /// Distance along the ray to the hit point.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
    /// Surface normal at the hit point (zero for embedded starts).
    pub normal: Vec3,
}

/// Restricts which bodies a ray may hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayFilter {
    pub exclude: Option<RigidBodyHandle>,
    /// Bitmask of [`CollisionCategory`] bits; `None` hits everything.
    pub categories: Option<u32>,
}

impl RayFilter {
    pub fn excluding(body: RigidBodyHandle) -> Self {
        Self {
            exclude: Some(body),
            categories: None,
        }
    }

    pub fn only(mut self, categories: &[CollisionCategory]) -> Self {
        self.categories = Some(categories.iter().fold(0, |acc, c| acc | c.bits()));
        self
    }
}

impl PhysicsWorld {
    /// Cast a ray and return the nearest hit within `max_distance`.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !(max_distance > 0.0) {
            return None;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        let mut query = QueryFilter::default();
        if let Some(body) = filter.exclude {
            query = query.exclude_rigid_body(body);
        }
        if let Some(mask) = filter.categories {
            query = query.groups(InteractionGroups::new(Group::ALL, Group::from_bits_retain(mask)));
        }

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                query,
            )
            .map(|(collider, intersection)| {
                let point = ray.point_at(intersection.time_of_impact);
                let (body, category) = self
                    .collider_set
                    .get(collider)
                    .map(|c| (c.parent(), CollisionCategory::from_user_data(c.user_data)))
                    .unwrap_or((None, None));
                RaycastHit {
                    collider,
                    body,
                    category,
                    distance: intersection.time_of_impact,
                    point: Vec3::new(point.x, point.y, point.z),
                    normal: Vec3::new(
                        intersection.normal.x,
                        intersection.normal.y,
                        intersection.normal.z,
                    ),
                }
            })
    }

    /// Check if there's a clear line of sight between two points, ignoring
    /// whatever `filter` excludes.
    pub fn line_of_sight(&self, from: Vec3, to: Vec3, filter: RayFilter) -> bool {
        let direction = to - from;
        let distance = direction.length();
        if distance < 0.001 {
            return true;
        }
        self.raycast(from, direction / distance, distance, filter).is_none()
    }

    /// Distance from `origin` straight down to the nearest ground or static
    /// geometry, if any within `max_distance`.
    pub fn ground_distance(&self, origin: Vec3, max_distance: f32, exclude: RigidBodyHandle) -> Option<f32> {
        let filter = RayFilter::excluding(exclude)
            .only(&[CollisionCategory::Ground, CollisionCategory::StaticGeometry]);
        self.raycast(origin, -Vec3::Y, max_distance, filter)
            .map(|hit| hit.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterShape, PhysicsSettings, StaticShape};

    fn world_with_wall() -> PhysicsWorld {
        let mut w = PhysicsWorld::new(PhysicsSettings::default()).expect("valid settings");
        w.add_ground_plane(0.0);
        w.add_static_geometry(&StaticShape {
            center: Vec3::new(0.0, 2.0, -10.0),
            rotation_y: 0.0,
            half_extents: Vec3::new(5.0, 2.0, 0.5),
        })
        .expect("wall");
        w.update_query_pipeline();
        w
    }

    #[test]
    fn raycast_hits_nearest_wall_face() {
        let w = world_with_wall();
        let hit = w
            .raycast(Vec3::new(0.0, 1.0, 0.0), -Vec3::Z, 50.0, RayFilter::default())
            .expect("wall should be hit");
        assert!((hit.distance - 9.5).abs() < 1e-3);
        assert_eq!(hit.category, Some(CollisionCategory::StaticGeometry));
        assert!(hit.normal.z > 0.9);
        assert!(hit.body.is_none());
    }

    #[test]
    fn raycast_misses_beyond_max_distance() {
        let w = world_with_wall();
        assert!(w
            .raycast(Vec3::new(0.0, 1.0, 0.0), -Vec3::Z, 5.0, RayFilter::default())
            .is_none());
    }

    #[test]
    fn embedded_origin_is_an_immediate_hit() {
        let w = world_with_wall();
        let hit = w
            .raycast(Vec3::new(0.0, 2.0, -10.0), Vec3::Z, 50.0, RayFilter::default())
            .expect("embedded ray reports a hit");
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.category, Some(CollisionCategory::StaticGeometry));
    }

    #[test]
    fn line_of_sight_blocked_by_wall_and_ignores_excluded_caster() {
        let mut w = world_with_wall();
        let shape = CharacterShape {
            half_height: 0.5,
            radius: 0.4,
            mass: 70.0,
        };
        let caster = w
            .add_character_body(CollisionCategory::Hostile, Vec3::new(0.0, 1.0, 0.0), shape)
            .expect("body");
        w.update_query_pipeline();

        let filter = RayFilter::excluding(caster.rigid_body);
        assert!(!w.line_of_sight(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, -20.0), filter));
        assert!(w.line_of_sight(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 5.0), filter));
    }

    #[test]
    fn ground_distance_measures_down_to_plane() {
        let mut w = world_with_wall();
        let shape = CharacterShape {
            half_height: 0.5,
            radius: 0.4,
            mass: 70.0,
        };
        let body = w
            .add_character_body(CollisionCategory::Player, Vec3::new(3.0, 4.0, 3.0), shape)
            .expect("body");
        w.update_query_pipeline();
        let d = w
            .ground_distance(Vec3::new(3.0, 4.0, 3.0), 10.0, body.rigid_body)
            .expect("ground below");
        assert!((d - 4.0).abs() < 1e-3);
    }
}
