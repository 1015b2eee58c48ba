//! # Virtual cameras driven by the link
//!
//! Each viewport owns a [`VirtualCamera`]. Once per frame the link's camera
//! record is converted into the camera's pose and lens (see [`apply`]), and a
//! [`CameraResponseData`](crate::link::CameraResponseData) is queued for the
//! render-submission thread (see [`queue`]).
//!
//! ## Conventions
//! Cameras live in host space: X forward, Y right, Z up. View space used by
//! [`VirtualCamera::view_matrix`] and the projections in [`projection`] is
//! X right, Y up, Z forward into the screen, with depth mapped to `[0, 1]`.

pub mod apply;
pub mod projection;
pub mod queue;

pub use apply::{apply_camera_data, apply_cameras, horizontal_fov_degrees};
pub use projection::{apply_clipping, clipping_matrix};
pub use queue::CameraResponseQueue;

use crate::config::CameraTemplateConfig;
use crate::foundation::math::{utils, Mat3, Mat4, Quat, Transform, Vec3};

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection
    #[default]
    Perspective,
    /// Orthographic projection
    Orthographic,
}

/// Physical sensor and lens of a cine-style camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CineSensor {
    /// Sensor width in millimeters
    pub sensor_width: f32,
    /// Sensor height in millimeters
    pub sensor_height: f32,
    /// Focal length in millimeters
    pub focal_length: f32,
}

/// Camera a viewport renders through
///
/// Plain perspective cameras are driven by horizontal field of view; cameras
/// created with [`VirtualCamera::cine`] take sensor and focal length directly.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCamera {
    /// Position in host space
    pub position: Vec3,

    /// Orientation in host space
    pub rotation: Quat,

    /// Projection model
    pub mode: ProjectionMode,

    /// Horizontal field of view in degrees (perspective, non-cine)
    pub fov_degrees: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Orthographic view width in host units
    pub ortho_width: f32,

    cine: Option<CineSensor>,
}

impl Default for VirtualCamera {
    fn default() -> Self {
        Self::perspective(90.0, 16.0 / 9.0)
    }
}

impl VirtualCamera {
    /// Create a perspective camera at the origin
    ///
    /// # Arguments
    /// * `fov_degrees` - Horizontal field of view in degrees
    /// * `aspect` - Aspect ratio (width / height)
    pub fn perspective(fov_degrees: f32, aspect: f32) -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            mode: ProjectionMode::Perspective,
            fov_degrees,
            aspect,
            ortho_width: 0.0,
            cine: None,
        }
    }

    /// Create a cine-style camera at the origin
    pub fn cine(sensor: CineSensor) -> Self {
        let mut camera = Self::perspective(0.0, sensor.sensor_width / sensor.sensor_height);
        camera.cine = Some(sensor);
        camera.fov_degrees = camera.horizontal_fov_degrees();
        camera
    }

    /// Create a camera from a channel template
    pub fn from_template(template: &CameraTemplateConfig) -> Self {
        match *template {
            CameraTemplateConfig::Perspective { fov_degrees } => Self::perspective(fov_degrees, 16.0 / 9.0),
            CameraTemplateConfig::Cine {
                sensor_width,
                sensor_height,
                focal_length,
            } => Self::cine(CineSensor {
                sensor_width,
                sensor_height,
                focal_length,
            }),
        }
    }

    /// Whether the camera takes sensor size and focal length directly
    pub const fn supports_cine(&self) -> bool {
        self.cine.is_some()
    }

    /// Cine sensor, if this is a cine camera
    pub const fn cine_sensor(&self) -> Option<&CineSensor> {
        self.cine.as_ref()
    }

    /// Set position and orientation in host space
    pub fn set_pose(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
        log::trace!("Camera pose updated to {:?}", position);
    }

    /// Switch to perspective with the given horizontal field of view
    pub fn set_field_of_view(&mut self, fov_degrees: f32) {
        self.mode = ProjectionMode::Perspective;
        self.fov_degrees = fov_degrees;
    }

    /// Update aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Switch to orthographic with the given width in host units
    pub fn set_orthographic(&mut self, width: f32) {
        self.mode = ProjectionMode::Orthographic;
        self.ortho_width = width;
    }

    /// Set sensor and focal length; only meaningful on cine cameras
    pub fn set_cine_sensor(&mut self, sensor: CineSensor) {
        self.mode = ProjectionMode::Perspective;
        if sensor.sensor_height > 0.0 {
            self.aspect = sensor.sensor_width / sensor.sensor_height;
        }
        self.cine = Some(sensor);
        self.fov_degrees = self.horizontal_fov_degrees();
    }

    /// Effective horizontal field of view in degrees
    pub fn horizontal_fov_degrees(&self) -> f32 {
        self.cine.map_or(self.fov_degrees, |sensor| {
            horizontal_fov_degrees(sensor.focal_length, sensor.sensor_width)
        })
    }

    /// World-to-view transform
    pub fn view_matrix(&self) -> Mat4 {
        let axes = Mat3::new(
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
            1.0, 0.0, 0.0,
        );
        let camera_to_world = Transform::from_position_rotation(self.position, self.rotation);
        axes.to_homogeneous() * camera_to_world.inverse().to_matrix()
    }

    /// View-to-clip transform for the given clip distances
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        match self.mode {
            ProjectionMode::Orthographic => {
                let width = self.ortho_width.max(f32::EPSILON);
                projection::orthographic(width, width / self.aspect.max(f32::EPSILON), near, far)
            }
            ProjectionMode::Perspective => {
                let half_width = near * (utils::deg_to_rad(self.horizontal_fov_degrees()) * 0.5).tan();
                let half_height = half_width / self.aspect.max(f32::EPSILON);
                projection::off_axis(-half_width, half_width, half_height, -half_height, near, far)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Rotator, Vec4};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_cine_camera_fov_from_sensor() {
        let camera = VirtualCamera::cine(CineSensor {
            sensor_width: 36.0,
            sensor_height: 24.0,
            focal_length: 18.0,
        });

        assert!(camera.supports_cine());
        assert_relative_eq!(camera.horizontal_fov_degrees(), 90.0, epsilon = 1e-3);
        assert_relative_eq!(camera.aspect, 1.5, epsilon = EPSILON);
    }

    #[test]
    fn test_view_matrix_maps_forward_to_depth() {
        let mut camera = VirtualCamera::default();
        camera.set_pose(Vec3::new(10.0, 0.0, 0.0), Rotator::new(0.0, 90.0, 0.0).to_quat());

        // Camera faces +Y after a 90° yaw; a point ahead of it lands on +Z in view space.
        let ahead = camera.view_matrix() * Vec4::new(10.0, 5.0, 0.0, 1.0);
        assert_relative_eq!(ahead.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(ahead.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(ahead.z, 5.0, epsilon = EPSILON);
    }

    #[test]
    fn test_template_selects_camera_kind() {
        let plain = VirtualCamera::from_template(&CameraTemplateConfig::Perspective { fov_degrees: 60.0 });
        assert!(!plain.supports_cine());
        assert_relative_eq!(plain.horizontal_fov_degrees(), 60.0, epsilon = EPSILON);

        let cine = VirtualCamera::from_template(&CameraTemplateConfig::Cine {
            sensor_width: 24.0,
            sensor_height: 24.0,
            focal_length: 12.0,
        });
        assert!(cine.supports_cine());
        assert_relative_eq!(cine.aspect, 1.0, epsilon = EPSILON);
    }
}
