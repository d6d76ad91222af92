//! Transform component and utilities for spatial positioning.

use glam::{Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
///
/// This is what the rendering collaborator reads each tick to place visuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Rotate around the Y axis so that `forward()` points along the
    /// horizontal component of `direction`. Near-vertical or zero directions
    /// leave the rotation untouched.
    pub fn face_horizontal(&mut self, direction: Vec3) {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        if flat.length_squared() > 1e-4 {
            // Pure yaw keeps +Y up even for directions opposite to -Z.
            self.rotation = Quat::from_rotation_y((-flat.x).atan2(-flat.z));
        }
    }

    /// Yaw angle (radians) of the current forward vector around +Y.
    pub fn yaw(&self) -> f32 {
        let f = self.forward();
        (-f.x).atan2(-f.z)
    }
}

/// Horizontal (XZ-plane) distance between two points.
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let d = b - a;
    (d.x * d.x + d.z * d.z).sqrt()
}

/// Unit look direction for a yaw/pitch pair (radians). Yaw 0 looks down -Z.
pub fn look_direction(yaw: f32, pitch: f32) -> Vec3 {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    Vec3::new(-sy * cp, sp, -cy * cp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_horizontal_points_forward_along_flat_direction() {
        let mut t = Transform::default();
        t.face_horizontal(Vec3::new(1.0, 5.0, 0.0));
        let f = t.forward();
        assert!((f - Vec3::X).length() < 1e-4, "forward was {:?}", f);
    }

    #[test]
    fn face_horizontal_ignores_vertical_direction() {
        let mut t = Transform::default();
        t.face_horizontal(Vec3::Y);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn look_direction_matches_transform_yaw() {
        let dir = look_direction(std::f32::consts::FRAC_PI_2, 0.0);
        assert!((dir - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);

        let mut t = Transform::default();
        t.face_horizontal(dir);
        assert!((t.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let d = horizontal_distance(Vec3::new(0.0, 10.0, 0.0), Vec3::new(3.0, -4.0, 4.0));
        assert!((d - 5.0).abs() < 1e-5);
    }
}
