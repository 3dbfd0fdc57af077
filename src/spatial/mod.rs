//! Pose and ray types shared by the tracker, scene and gesture code.
//!
//! Vector, quaternion and matrix math comes from `glam`; host hit tests hand
//! back column-major `Mat4`s.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, Vec3};

/// Smallest absolute scale component still considered usable for placement.
pub const MIN_SCALE: f32 = 1.0e-6;

/// Position, orientation and per-axis scale of a scene object or anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Splits an affine transform into translation, rotation and scale. A
    /// negative determinant is folded into the x scale.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, orientation, position) = m.to_scale_rotation_translation();
        Self {
            position,
            orientation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// True when the pose can anchor a new object: everything finite and no
    /// collapsed scale axis.
    pub fn is_placeable(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.scale.is_finite()
            && self.scale.abs().min_element() > MIN_SCALE
    }

    pub fn with_uniform_factor(mut self, factor: f32) -> Self {
        self.scale *= factor;
        self
    }

    /// Yaw about world up, applied on top of the current orientation.
    pub fn rotated_about_up(mut self, angle: f32) -> Self {
        self.orientation = (Quat::from_rotation_y(angle) * self.orientation).normalize();
        self
    }

    /// Places `child`, expressed in this pose's local space, into the parent
    /// space. Non-uniform scale under rotation is approximated per axis.
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * (self.scale * child.position),
            orientation: (self.orientation * child.orientation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max_element()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Returns `None` for a zero-length direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalize()?,
        })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to the first contact with the sphere, if any.
    /// A ray starting inside the sphere reports the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-4
    }

    #[test]
    fn decomposes_translation_rotation_and_scale() {
        let source = Pose {
            position: Vec3::new(0.5, -1.0, -2.0),
            orientation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 3.0, 0.5),
        };

        let decoded = Pose::from_matrix(&source.to_matrix());

        assert!(decoded.position.abs_diff_eq(source.position, 1.0e-4));
        assert!(decoded.scale.abs_diff_eq(source.scale, 1.0e-4));
        assert!(approx(decoded.orientation.dot(source.orientation).abs(), 1.0));
    }

    #[test]
    fn large_rotations_survive_a_matrix_round_trip() {
        let orientations = [
            Quat::from_rotation_y(PI),
            Quat::from_rotation_z(PI),
            Quat::from_rotation_x(170.0_f32.to_radians()),
        ];
        for orientation in orientations {
            let source = Pose {
                position: Vec3::new(1.0, 0.0, -3.0),
                orientation,
                scale: Vec3::new(0.3, 2.0, 1.0),
            };
            let matrix = source.to_matrix();
            let rebuilt = Pose::from_matrix(&matrix).to_matrix();
            assert!(rebuilt.abs_diff_eq(matrix, 1.0e-5), "{orientation:?}");
        }
    }

    #[test]
    fn identity_matrix_decomposes_to_identity_pose() {
        let pose = Pose::from_matrix(&Mat4::IDENTITY);
        assert_eq!(pose.position, Vec3::ZERO);
        assert!(pose.scale.abs_diff_eq(Vec3::ONE, 1.0e-6));
        assert!(approx(pose.orientation.w, 1.0));
    }

    #[test]
    fn mirrored_matrix_folds_sign_into_x_scale() {
        let m = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let pose = Pose::from_matrix(&m);
        assert!(approx(pose.scale.x, -1.0));
        assert!(pose.is_placeable());
        assert!(pose.to_matrix().abs_diff_eq(m, 1.0e-5));
    }

    #[test]
    fn degenerate_scale_is_not_placeable() {
        let mut pose = Pose::IDENTITY;
        pose.scale.y = 0.0;
        assert!(!pose.is_placeable());

        let mut pose = Pose::IDENTITY;
        pose.position.z = f32::NAN;
        assert!(!pose.is_placeable());
    }

    #[test]
    fn quarter_turn_about_up_maps_x_to_negative_z() {
        let pose = Pose::IDENTITY.rotated_about_up(FRAC_PI_2);
        let rotated = pose.orientation * Vec3::X;
        assert!(rotated.abs_diff_eq(Vec3::NEG_Z, 1.0e-5));
    }

    #[test]
    fn yaw_is_applied_in_world_space() {
        let tilted = Pose {
            orientation: Quat::from_rotation_x(FRAC_PI_2),
            ..Pose::IDENTITY
        };
        let turned = tilted.rotated_about_up(FRAC_PI_2);
        // local +y points along world +z after the tilt; the yaw swings it to +x
        let up = turned.orientation * Vec3::Y;
        assert!(up.abs_diff_eq(Vec3::X, 1.0e-5), "{up:?}");
    }

    #[test]
    fn compose_offsets_child_by_parent_transform() {
        let parent = Pose {
            position: Vec3::X,
            orientation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let child = Pose::from_position(Vec3::Y);
        let world = parent.compose(&child);
        assert!(world.position.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1.0e-5));
        assert!(world.scale.abs_diff_eq(Vec3::splat(2.0), 1.0e-5));
    }

    #[test]
    fn ray_hits_sphere_in_front_and_misses_behind() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("direction");
        let hit = ray
            .intersect_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0)
            .expect("hit");
        assert!(approx(hit, 4.0));
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 5.0), 1.0).is_none());
        assert!(ray.intersect_sphere(Vec3::new(3.0, 0.0, -5.0), 1.0).is_none());
    }

    #[test]
    fn ray_from_inside_reports_exit_point() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0)).expect("direction");
        assert_eq!(ray.direction, Vec3::NEG_Z);
        let exit = ray.intersect_sphere(Vec3::ZERO, 1.5).expect("exit");
        assert!(approx(exit, 1.5));
    }

    #[test]
    fn zero_direction_ray_is_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }
}
