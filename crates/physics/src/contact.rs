//! Contact events collected after each physics step.

use engine_core::Vec3;
use rapier3d::prelude::*;

use crate::collision::CollisionCategory;

/// One touching collider pair observed at the end of a step.
///
/// `normal` points from side `a` towards side `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub collider_a: ColliderHandle,
    pub collider_b: ColliderHandle,
    pub body_a: Option<RigidBodyHandle>,
    pub body_b: Option<RigidBodyHandle>,
    pub category_a: CollisionCategory,
    pub category_b: CollisionCategory,
    pub normal: Vec3,
}

/// The other side of a contact as seen from one participating body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactView {
    pub other_body: Option<RigidBodyHandle>,
    pub other_collider: ColliderHandle,
    pub other_category: CollisionCategory,
    /// Normal pointing from the other side into the viewing body.
    pub normal: Vec3,
}

impl ContactEvent {
    pub fn involves(&self, body: RigidBodyHandle) -> bool {
        self.body_a == Some(body) || self.body_b == Some(body)
    }

    /// View this contact from `body`'s side, if it participates.
    pub fn view_from(&self, body: RigidBodyHandle) -> Option<ContactView> {
        if self.body_a == Some(body) {
            Some(ContactView {
                other_body: self.body_b,
                other_collider: self.collider_b,
                other_category: self.category_b,
                normal: -self.normal,
            })
        } else if self.body_b == Some(body) {
            Some(ContactView {
                other_body: self.body_a,
                other_collider: self.collider_a,
                other_category: self.category_a,
                normal: self.normal,
            })
        } else {
            None
        }
    }

    /// Bodies of a `(first, second)` category pair in that order, if this
    /// contact is between those categories.
    pub fn pair_of(
        &self,
        first: CollisionCategory,
        second: CollisionCategory,
    ) -> Option<(Option<RigidBodyHandle>, Option<RigidBodyHandle>)> {
        if self.category_a == first && self.category_b == second {
            Some((self.body_a, self.body_b))
        } else if self.category_b == first && self.category_a == second {
            Some((self.body_b, self.body_a))
        } else {
            None
        }
    }
}

/// Build the contact list for the step that just finished.
pub(crate) fn collect_contacts(narrow_phase: &NarrowPhase, colliders: &ColliderSet) -> Vec<ContactEvent> {
    let mut events = Vec::new();
    for pair in narrow_phase.contact_pairs() {
        if !pair.has_any_active_contact {
            continue;
        }
        let (Some(c1), Some(c2)) = (colliders.get(pair.collider1), colliders.get(pair.collider2)) else {
            continue;
        };
        let (Some(cat1), Some(cat2)) = (
            CollisionCategory::from_user_data(c1.user_data),
            CollisionCategory::from_user_data(c2.user_data),
        ) else {
            continue;
        };
        if !cat1.accepts(cat2) {
            continue;
        }

        let normal = pair
            .manifolds
            .iter()
            .find(|m| !m.points.is_empty())
            .map(|m| Vec3::new(m.data.normal.x, m.data.normal.y, m.data.normal.z))
            .unwrap_or(Vec3::ZERO);

        events.push(ContactEvent {
            collider_a: pair.collider1,
            collider_b: pair.collider2,
            body_a: c1.parent(),
            body_b: c2.parent(),
            category_a: cat1,
            category_b: cat2,
            normal,
        });
    }
    events
}
