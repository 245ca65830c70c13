//! Rigid-body transforms between node coordinate systems.
//!
//! A node's pose is a rotation followed by a translation. Scale is
//! unrepresentable: directions keep unit length under transformation, so ray
//! t-values measured in a local frame are valid world distances as-is.

use glam::{DMat3, DQuat, DVec3};

/// Rotation plus translation, in that order.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    rotation: DQuat,
    translation: DVec3,
}

impl Transform {
    /// The identity pose.
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Pure translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DQuat::IDENTITY,
            translation,
        }
    }

    /// Rotation about `axis` by `angle` radians, then translation.
    pub fn new(translation: DVec3, axis: DVec3, angle: f64) -> Self {
        Self {
            rotation: DQuat::from_axis_angle(axis.normalize(), angle),
            translation,
        }
    }

    /// Build from an explicit rotation matrix (orthonormalised through the
    /// quaternion conversion) and a translation.
    pub fn from_matrix(translation: DVec3, rotation: DMat3) -> Self {
        Self {
            rotation: DQuat::from_mat3(&rotation).normalize(),
            translation,
        }
    }

    /// Transform a point: rotate, then translate.
    pub fn point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }

    /// Transform a direction: rotate only.
    pub fn vector(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// The inverse pose.
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.conjugate();
        Self {
            rotation: inv_rotation,
            translation: inv_rotation * -self.translation,
        }
    }

    /// Compose with a child pose: `self.then(child)` maps child-local
    /// coordinates through `child` and then through `self`.
    pub fn then(&self, child: &Self) -> Self {
        Self {
            rotation: self.rotation * child.rotation,
            translation: self.rotation * child.translation + self.translation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn translate_then_rotate_point() {
        let t = Transform::new(DVec3::new(1.0, 0.0, 0.0), DVec3::Z, FRAC_PI_2);
        // Rotation applies first: +x maps to +y, then shifts by (1, 0, 0)
        assert!(close(t.point(DVec3::X), DVec3::new(1.0, 1.0, 0.0)));
        assert!(close(t.vector(DVec3::X), DVec3::Y));
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform::new(DVec3::new(0.3, -2.0, 5.0), DVec3::new(1.0, 1.0, 0.0), 0.7);
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert!(close(t.inverse().point(t.point(p)), p));
        assert!(close(t.point(t.inverse().point(p)), p));
    }

    #[test]
    fn composition_matches_sequential_application() {
        let parent = Transform::new(DVec3::new(1.0, 0.0, 0.0), DVec3::Z, 0.4);
        let child = Transform::new(DVec3::new(0.0, 2.0, 0.0), DVec3::X, -1.1);
        let composed = parent.then(&child);
        let p = DVec3::new(0.5, 0.6, 0.7);
        assert!(close(composed.point(p), parent.point(child.point(p))));
    }

    #[test]
    fn directions_keep_unit_length() {
        let t = Transform::new(DVec3::new(9.0, 9.0, 9.0), DVec3::new(0.2, 1.0, -0.4), 2.2);
        let d = t.vector(DVec3::new(0.0, 0.6, 0.8));
        assert!((d.length() - 1.0).abs() < 1e-12);
    }
}
