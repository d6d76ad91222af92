//! Physics world management with Rapier3D.

use crate::collision::{CollisionCategory, PhysicsBody};
use crate::contact::{collect_contacts, ContactEvent};
use engine_core::Vec3;
use rapier3d::na::{Isometry3, Vector3};
use rapier3d::prelude::*;
use thiserror::Error;

/// Errors raised while setting up the physics world. These are fatal for a
/// session: no partial world is ever handed out.
#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    #[error("fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    #[error("gravity must be finite, got {0:?}")]
    InvalidGravity(Vec3),
    #[error("invalid {what} dimensions: {value}")]
    InvalidShape { what: &'static str, value: f32 },
}

/// Parameters fixed for the lifetime of a physics world.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsSettings {
    /// Seconds advanced by every `step()`.
    pub fixed_timestep: f32,
    pub gravity: Vec3,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// Shape and placement of a character body (player or hostile).
#[derive(Debug, Clone, Copy)]
pub struct CharacterShape {
    pub half_height: f32,
    pub radius: f32,
    pub mass: f32,
}

/// Static geometry supplied by the world-generation collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticShape {
    /// World position of the box center.
    pub center: Vec3,
    /// Rotation around Y in radians.
    pub rotation_y: f32,
    pub half_extents: Vec3,
}

/// Main physics world containing all simulation state.
///
/// Only the owner of the world registers and removes bodies and calls
/// `step()`; entities only read and write the bodies they own.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    /// Contacts observed at the end of the last step.
    contacts: Vec<ContactEvent>,
    steps: u64,
}

impl PhysicsWorld {
    /// Create a new physics world. Fails on a non-positive timestep or
    /// non-finite gravity.
    pub fn new(settings: PhysicsSettings) -> Result<Self, PhysicsError> {
        if !(settings.fixed_timestep.is_finite() && settings.fixed_timestep > 0.0) {
            return Err(PhysicsError::InvalidTimestep(settings.fixed_timestep));
        }
        if !settings.gravity.is_finite() {
            return Err(PhysicsError::InvalidGravity(settings.gravity));
        }

        let integration_parameters = IntegrationParameters {
            dt: settings.fixed_timestep,
            ..IntegrationParameters::default()
        };

        Ok(Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![settings.gravity.x, settings.gravity.y, settings.gravity.z],
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            contacts: Vec::new(),
            steps: 0,
        })
    }

    /// Advance the simulation by exactly one fixed timestep, then collect the
    /// contacts for this step. Contacts are never delivered from inside the
    /// solver.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.contacts = collect_contacts(&self.narrow_phase, &self.collider_set);
        self.steps += 1;
    }

    /// Contacts reported by the last `step()`.
    pub fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn fixed_timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Update query pipeline for raycasting (needed when bodies were added
    /// since the last step).
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a dynamic, rotation-locked capsule for a player or hostile.
    pub fn add_character_body(
        &mut self,
        category: CollisionCategory,
        position: Vec3,
        shape: CharacterShape,
    ) -> Result<PhysicsBody, PhysicsError> {
        if !(shape.radius > 0.0 && shape.half_height >= 0.0) {
            return Err(PhysicsError::InvalidShape {
                what: "capsule",
                value: shape.radius.min(shape.half_height),
            });
        }
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .lock_rotations()
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        let collider = ColliderBuilder::capsule_y(shape.half_height, shape.radius)
            .mass(shape.mass.max(0.1))
            .friction(0.0)
            .collision_groups(category.interaction_groups())
            .user_data(category.to_user_data())
            .build();
        let collider = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        Ok(PhysicsBody::new(handle, collider))
    }

    /// Add a small CCD-enabled ball travelling at `velocity`.
    pub fn add_projectile_body(
        &mut self,
        position: Vec3,
        radius: f32,
        velocity: Vec3,
        gravity_scale: f32,
    ) -> Result<PhysicsBody, PhysicsError> {
        if !(radius > 0.0) {
            return Err(PhysicsError::InvalidShape {
                what: "projectile",
                value: radius,
            });
        }
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .linvel(vector![velocity.x, velocity.y, velocity.z])
            .gravity_scale(gravity_scale)
            .ccd_enabled(true)
            .build();
        let handle = self.rigid_body_set.insert(rigid_body);

        let category = CollisionCategory::Projectile;
        let collider = ColliderBuilder::ball(radius)
            .density(0.1)
            .collision_groups(category.interaction_groups())
            .user_data(category.to_user_data())
            .build();
        let collider = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        Ok(PhysicsBody::new(handle, collider))
    }

    /// Add a ground plane (half-space facing +Y) at the given height.
    pub fn add_ground_plane(&mut self, height: f32) -> ColliderHandle {
        let category = CollisionCategory::Ground;
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .translation(vector![0.0, height, 0.0])
            .collision_groups(category.interaction_groups())
            .user_data(category.to_user_data())
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a static cuboid collider (building, wall). No parent body; the
    /// collider is fixed in the world.
    pub fn add_static_geometry(&mut self, shape: &StaticShape) -> Result<ColliderHandle, PhysicsError> {
        let he = shape.half_extents;
        if !(he.x > 0.0 && he.y > 0.0 && he.z > 0.0 && he.is_finite()) {
            return Err(PhysicsError::InvalidShape {
                what: "static cuboid",
                value: he.min_element(),
            });
        }
        let tra = vector![shape.center.x, shape.center.y, shape.center.z];
        let axisangle = Vector3::y_axis().into_inner() * (shape.rotation_y as Real);
        let category = CollisionCategory::StaticGeometry;
        let collider = ColliderBuilder::cuboid(he.x, he.y, he.z)
            .position(Isometry3::new(tra, axisangle))
            .collision_groups(category.interaction_groups())
            .user_data(category.to_user_data())
            .build();
        Ok(self.collider_set.insert(collider))
    }

    /// Remove a rigid body and its colliders. Pending contacts that reference
    /// the body are discarded. Unknown handles are ignored.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.contacts.retain(|c| !c.involves(handle));
        let removed = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if removed.is_none() {
            log::debug!("remove_body: {:?} was not registered", handle);
        }
    }

    /// Whether the body is still registered.
    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            Vec3::new(pos.x, pos.y, pos.z)
        })
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| {
            let v = body.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    /// Teleport a body and clear its velocity.
    pub fn teleport(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(vector![position.x, position.y, position.z], true);
            body.set_linvel(vector![0.0, 0.0, 0.0], true);
        }
    }

    /// Freeze a body in place: zero velocity and switch to a fixed body so
    /// nothing can push it any more (the "mass zero" state).
    pub fn make_immovable(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(vector![0.0, 0.0, 0.0], false);
            body.set_body_type(RigidBodyType::Fixed, true);
        }
    }

    pub fn is_immovable(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.is_fixed())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsSettings::default()).expect("valid settings")
    }

    const SHAPE: CharacterShape = CharacterShape {
        half_height: 0.5,
        radius: 0.4,
        mass: 70.0,
    };

    #[test]
    fn rejects_invalid_settings() {
        let bad = PhysicsSettings {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(PhysicsWorld::new(bad), Err(PhysicsError::InvalidTimestep(_))));

        let bad = PhysicsSettings {
            gravity: Vec3::new(0.0, f32::NAN, 0.0),
            ..Default::default()
        };
        assert!(matches!(PhysicsWorld::new(bad), Err(PhysicsError::InvalidGravity(_))));
    }

    #[test]
    fn character_falls_onto_ground_and_reports_contact() {
        let mut w = world();
        w.add_ground_plane(0.0);
        let body = w
            .add_character_body(CollisionCategory::Player, Vec3::new(0.0, 2.0, 0.0), SHAPE)
            .expect("body");

        let mut touched = false;
        for _ in 0..180 {
            w.step();
            touched |= w
                .contacts()
                .iter()
                .filter_map(|c| c.view_from(body.rigid_body))
                .any(|v| v.other_category == CollisionCategory::Ground && v.normal.y > 0.7);
        }
        assert!(touched, "expected a ground contact with an upward normal");
        let y = w.position(body.rigid_body).expect("registered").y;
        assert!(y > 0.5 && y < 1.2, "capsule should rest on the plane, y = {}", y);
    }

    #[test]
    fn projectiles_do_not_collide_with_each_other() {
        let mut w = world();
        let a = w
            .add_projectile_body(Vec3::new(-1.0, 5.0, 0.0), 0.1, Vec3::new(10.0, 0.0, 0.0), 0.0)
            .expect("projectile");
        let b = w
            .add_projectile_body(Vec3::new(1.0, 5.0, 0.0), 0.1, Vec3::new(-10.0, 0.0, 0.0), 0.0)
            .expect("projectile");
        for _ in 0..30 {
            w.step();
            assert!(w.contacts().is_empty());
        }
        // They passed through each other.
        assert!(w.position(a.rigid_body).expect("a").x > 1.0);
        assert!(w.position(b.rigid_body).expect("b").x < -1.0);
    }

    #[test]
    fn removing_a_body_discards_its_pending_contacts() {
        let mut w = world();
        w.add_ground_plane(0.0);
        let body = w
            .add_character_body(CollisionCategory::Hostile, Vec3::new(0.0, 0.85, 0.0), SHAPE)
            .expect("body");
        for _ in 0..10 {
            w.step();
        }
        assert!(w.contacts().iter().any(|c| c.involves(body.rigid_body)));

        w.remove_body(body.rigid_body);
        assert!(!w.contains(body.rigid_body));
        assert!(w.contacts().iter().all(|c| !c.involves(body.rigid_body)));

        // Removing twice and stepping afterwards must be harmless.
        w.remove_body(body.rigid_body);
        w.step();
        assert_eq!(w.body_count(), 0);
    }

    #[test]
    fn immovable_body_ignores_velocity() {
        let mut w = world();
        let body = w
            .add_character_body(CollisionCategory::Hostile, Vec3::new(0.0, 3.0, 0.0), SHAPE)
            .expect("body");
        w.make_immovable(body.rigid_body);
        w.set_linvel(body.rigid_body, Vec3::new(5.0, 0.0, 0.0));
        for _ in 0..30 {
            w.step();
        }
        assert!(w.is_immovable(body.rigid_body));
        let p = w.position(body.rigid_body).expect("registered");
        assert!((p - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn static_geometry_rejects_degenerate_boxes() {
        let mut w = world();
        let err = w.add_static_geometry(&StaticShape {
            center: Vec3::ZERO,
            rotation_y: 0.0,
            half_extents: Vec3::new(1.0, 0.0, 1.0),
        });
        assert!(err.is_err());
    }
}
