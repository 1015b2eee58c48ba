//! Math types shared by camera poses, transform parameters and skeletal joints

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// 3D vector
pub type Vec3 = Vector3<f32>;

/// Homogeneous 4D vector
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix
pub type Mat3 = Matrix3<f32>;

/// 4x4 column-vector transform matrix
pub type Mat4 = Matrix4<f32>;

/// Unit quaternion rotation
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose a transformation matrix
    ///
    /// Assumes the matrix has no shear; scale is read from column lengths.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let linear: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vec3::from_fn(|axis, _| linear.column(axis).norm());
        let rotation = Quat::from_matrix(&Mat3::from_columns(&[
            linear.column(0) / scale.x,
            linear.column(1) / scale.y,
            linear.column(2) / scale.z,
        ]));

        Self {
            position: matrix.fixed_view::<3, 1>(0, 3).into_owned(),
            rotation,
            scale,
        }
    }

    /// Combine this transform with another (`self` applied after `other`)
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            position: self.position + self.rotation * (self.scale.component_mul(&other.position)),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Transform that undoes this one
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let scale = self.scale.map(f32::recip);
        Self {
            position: scale.component_mul(&(rotation * -self.position)),
            rotation,
            scale,
        }
    }
}

/// Euler rotation in degrees using the host's pitch/yaw/roll naming
///
/// Roll turns about X, pitch about Y and yaw about Z. The composed rotation is
/// `yaw * pitch * roll`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator {
    /// Rotation about the Y axis, in degrees
    pub pitch: f32,
    /// Rotation about the Z axis, in degrees
    pub yaw: f32,
    /// Rotation about the X axis, in degrees
    pub roll: f32,
}

impl Rotator {
    /// Create a rotator from pitch, yaw and roll in degrees
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Convert to a unit quaternion
    pub fn to_quat(self) -> Quat {
        Quat::from_euler_angles(
            utils::deg_to_rad(self.roll),
            utils::deg_to_rad(self.pitch),
            utils::deg_to_rad(self.yaw),
        )
    }

    /// Recover a rotator from a unit quaternion
    pub fn from_quat(rotation: &Quat) -> Self {
        let (roll, pitch, yaw) = rotation.euler_angles();
        Self {
            pitch: utils::rad_to_deg(pitch),
            yaw: utils::rad_to_deg(yaw),
            roll: utils::rad_to_deg(roll),
        }
    }
}

/// Angle conversions
pub mod utils {
    /// Degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_transform_matrix_round_trip() {
        let transform = Transform {
            position: Vec3::new(1.0, -2.0, 3.0),
            rotation: Rotator::new(10.0, 45.0, -30.0).to_quat(),
            scale: Vec3::new(2.0, 1.0, 0.5),
        };

        let recovered = Transform::from_matrix(&transform.to_matrix());

        assert_relative_eq!(recovered.position, transform.position, epsilon = EPSILON);
        assert_relative_eq!(recovered.scale, transform.scale, epsilon = EPSILON);
        assert_relative_eq!(
            recovered.rotation.angle_to(&transform.rotation),
            0.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_transform_inverse_cancels() {
        let transform = Transform::from_position_rotation(
            Vec3::new(5.0, 0.0, -1.0),
            Rotator::new(0.0, 90.0, 0.0).to_quat(),
        );
        let combined = transform.combine(&transform.inverse());

        assert_relative_eq!(combined.position, Vec3::zeros(), epsilon = EPSILON);
        assert_relative_eq!(combined.rotation.angle(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rotator_yaw_turns_about_up_axis() {
        let rotation = Rotator::new(0.0, 90.0, 0.0).to_quat();
        let forward = rotation * Vec3::x();

        assert_relative_eq!(forward, Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn test_rotator_quat_round_trip() {
        let rotator = Rotator::new(20.0, -75.0, 12.5);
        let recovered = Rotator::from_quat(&rotator.to_quat());

        assert_relative_eq!(recovered.pitch, rotator.pitch, epsilon = 1e-3);
        assert_relative_eq!(recovered.yaw, rotator.yaw, epsilon = 1e-3);
        assert_relative_eq!(recovered.roll, rotator.roll, epsilon = 1e-3);
    }
}
