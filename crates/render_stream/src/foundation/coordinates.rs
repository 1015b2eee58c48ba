//! Coordinate system conversion between the link and the host
//!
//! The link reports poses Y-up in meters. The host is Z-up with X forward and
//! a configurable distance unit. Every conversion here has an explicit inverse
//! so values can be sent back to the link unchanged.
//!
//! Axis mapping (link -> host): `x -> Y`, `y -> Z`, `z -> X`.

use serde::{Deserialize, Serialize};

use super::math::{Mat3, Mat4, Quat, Quaternion, Rotator, Transform, Vec3};

/// Host distance unit; link distances are always meters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceUnit {
    /// 1 host unit = 1 meter
    Meters,
    /// 1 host unit = 1 centimeter
    #[default]
    Centimeters,
    /// 1 host unit = 1 millimeter
    Millimeters,
    /// 1 host unit = 1 inch
    Inches,
    /// 1 host unit = 1 foot
    Feet,
}

impl DistanceUnit {
    /// Number of host units in one meter
    pub const fn units_per_meter(self) -> f32 {
        match self {
            Self::Meters => 1.0,
            Self::Centimeters => 100.0,
            Self::Millimeters => 1000.0,
            Self::Inches => 39.370_08,
            Self::Feet => 3.280_84,
        }
    }
}

/// Basis change taking link axes onto host axes
fn link_to_host_basis() -> Mat3 {
    Mat3::new(
        0.0, 0.0, 1.0,
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
    )
}

/// Link/host coordinate converter
///
/// Built once from the configured distance unit and shared by camera, transform
/// parameter and skeleton conversions.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateConverter {
    units_per_meter: f32,
    basis: Mat3,
    /// Applied after the basis change on transform parameters (-90° about host Y)
    transform_adjust: Quat,
    /// Conjugates skeleton joints into the host's sideways axis convention (90° yaw)
    skeleton_space: Quat,
}

impl CoordinateConverter {
    /// Create a converter for the given host distance unit
    pub fn new(unit: DistanceUnit) -> Self {
        Self {
            units_per_meter: unit.units_per_meter(),
            basis: link_to_host_basis(),
            transform_adjust: Rotator::new(-90.0, 0.0, 0.0).to_quat(),
            skeleton_space: Rotator::new(0.0, 90.0, 0.0).to_quat(),
        }
    }

    /// Host units per link meter
    pub const fn units_per_meter(&self) -> f32 {
        self.units_per_meter
    }

    /// Convert a distance in meters to host units
    pub fn meters_to_host(&self, meters: f32) -> f32 {
        meters * self.units_per_meter
    }

    /// Convert a link position (meters) to a host position
    pub fn position_to_host(&self, link: Vec3) -> Vec3 {
        self.basis * link * self.units_per_meter
    }

    /// Convert a host position back to a link position (meters)
    pub fn position_to_link(&self, host: Vec3) -> Vec3 {
        self.basis.transpose() * host / self.units_per_meter
    }

    /// Convert the link's camera Euler angles (degrees) to a host rotation
    ///
    /// `rx` is pitch, `ry` is yaw and `rz` is roll.
    pub fn camera_rotation_to_host(&self, rx: f32, ry: f32, rz: f32) -> Quat {
        Rotator::new(rx, ry, rz).to_quat()
    }

    /// Recover the link's camera Euler angles `(rx, ry, rz)` from a host rotation
    pub fn camera_rotation_to_link(&self, rotation: &Quat) -> (f32, f32, f32) {
        let rotator = Rotator::from_quat(rotation);
        (rotator.pitch, rotator.yaw, rotator.roll)
    }

    /// Convert a link transform matrix (meters, column vectors) to a host matrix
    ///
    /// The linear part is conjugated by the basis change and then post-rotated
    /// by the transform adjustment, which also swaps the X/Y scale axes.
    pub fn matrix_to_host(&self, link: &Mat4) -> Mat4 {
        let basis = self.basis.to_homogeneous();
        let mut host = basis * link * basis.transpose() * self.transform_adjust.to_homogeneous();
        host.m14 *= self.units_per_meter;
        host.m24 *= self.units_per_meter;
        host.m34 *= self.units_per_meter;
        host
    }

    /// Inverse of [`matrix_to_host`](Self::matrix_to_host)
    pub fn matrix_to_link(&self, host: &Mat4) -> Mat4 {
        let basis = self.basis.to_homogeneous();
        let mut unscaled = *host;
        unscaled.m14 /= self.units_per_meter;
        unscaled.m24 /= self.units_per_meter;
        unscaled.m34 /= self.units_per_meter;
        basis.transpose()
            * unscaled
            * self.transform_adjust.inverse().to_homogeneous()
            * basis
    }

    /// Convert a link rotation quaternion to the host basis
    pub fn rotation_to_host(&self, link: &Quat) -> Quat {
        let axis = self.basis * link.imag();
        Quat::new_normalize(Quaternion::new(link.w, axis.x, axis.y, axis.z))
    }

    /// Inverse of [`rotation_to_host`](Self::rotation_to_host)
    pub fn rotation_to_link(&self, host: &Quat) -> Quat {
        let axis = self.basis.transpose() * host.imag();
        Quat::new_normalize(Quaternion::new(host.w, axis.x, axis.y, axis.z))
    }

    /// Convert a link skeleton joint into host skeleton space
    pub fn joint_to_host(&self, position: Vec3, rotation: &Quat) -> Transform {
        let local = Transform::from_position_rotation(
            self.position_to_host(position),
            self.rotation_to_host(rotation),
        );
        let space = Transform::from_position_rotation(Vec3::zeros(), self.skeleton_space);
        space.combine(&local).combine(&space.inverse())
    }

    /// Inverse of [`joint_to_host`](Self::joint_to_host), returning `(position, rotation)`
    pub fn joint_to_link(&self, joint: &Transform) -> (Vec3, Quat) {
        let space = Transform::from_position_rotation(Vec3::zeros(), self.skeleton_space);
        let local = space.inverse().combine(joint).combine(&space);
        (
            self.position_to_link(local.position),
            self.rotation_to_link(&local.rotation),
        )
    }
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self::new(DistanceUnit::default())
    }
}
