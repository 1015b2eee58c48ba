//! Plain data exchanged with the link

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Opaque per-stream id assigned by the link
pub type StreamHandle = u64;

/// Opaque camera id; zero means no 3D camera
pub type CameraHandle = u64;

/// Content hash of one schema scene
pub type SchemaHash = u64;

bitflags! {
    /// Per-frame flags reported with [`FrameData`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u32 {
        /// The controller restarted its timeline
        const RESET = 1;
    }
}

/// Authoritative per-frame timing and scene selection
///
/// Plain old data so it can be copied into the cluster payload byte for byte.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct FrameData {
    /// Tracked time on the controller's clock, in seconds
    pub t_tracked: f64,
    /// Controller wall-clock time, in seconds
    pub local_time: f64,
    /// Controller wall-clock delta, in seconds
    pub local_time_delta: f64,
    /// Nominal frame rate numerator
    pub frame_rate_numerator: u32,
    /// Nominal frame rate denominator
    pub frame_rate_denominator: u32,
    /// Raw [`FrameFlags`] bits
    pub flags: u32,
    /// Index of the active schema scene
    pub scene: u32,
}

impl FrameData {
    /// Decoded frame flags; unknown bits are dropped
    pub const fn frame_flags(&self) -> FrameFlags {
        FrameFlags::from_bits_truncate(self.flags)
    }

    /// Nominal frame delta `denominator / numerator`, if the rate is usable
    pub fn nominal_delta(&self) -> Option<f64> {
        (self.frame_rate_numerator != 0).then(|| {
            f64::from(self.frame_rate_denominator) / f64::from(self.frame_rate_numerator)
        })
    }
}

/// Per-camera lens, sensor and pose record for one frame
///
/// Distances are meters and angles degrees, in the link's Y-up convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraData {
    /// Stream this record belongs to
    pub id: StreamHandle,
    /// Camera identity; zero selects 2D passthrough
    pub camera_handle: CameraHandle,
    /// Position X
    pub x: f32,
    /// Position Y (up)
    pub y: f32,
    /// Position Z
    pub z: f32,
    /// Pitch
    pub rx: f32,
    /// Yaw
    pub ry: f32,
    /// Roll
    pub rz: f32,
    /// Focal length in millimeters
    pub focal_length: f32,
    /// Sensor width in millimeters
    pub sensor_x: f32,
    /// Sensor height in millimeters
    pub sensor_y: f32,
    /// Lens-center offset X, normalized
    pub cx: f32,
    /// Lens-center offset Y, normalized
    pub cy: f32,
    /// Near clip distance
    pub near_z: f32,
    /// Far clip distance
    pub far_z: f32,
    /// Orthographic width in meters; positive selects an orthographic camera
    pub ortho_width: f32,
    /// Lens aperture
    pub aperture: f32,
    /// Focus distance
    pub focus_distance: f32,
}

/// Camera record paired with the frame it was applied on
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraResponseData {
    /// Tracked time of the applied frame
    pub t_tracked: f64,
    /// Camera record as applied
    pub camera: CameraData,
}

impl CameraResponseData {
    /// Neutral values used when no response is queued yet
    pub fn neutral() -> Self {
        Self {
            t_tracked: 0.0,
            camera: CameraData {
                near_z: 0.1,
                far_z: 1.0,
                sensor_x: 1.0,
                sensor_y: 1.0,
                focal_length: 1.0,
                ..CameraData::default()
            },
        }
    }
}

/// Pixel formats a stream can be published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// No usable format
    #[default]
    Invalid,
    /// 8-bit BGRA
    Bgra8,
    /// 8-bit BGR with padding
    Bgrx8,
    /// 32-bit float RGBA
    Rgba32F,
    /// 16-bit RGBA
    Rgba16,
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit RGB with padding
    Rgbx8,
}

impl PixelFormat {
    /// Bytes per pixel, or `None` for [`PixelFormat::Invalid`]
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Invalid => None,
            Self::Bgra8 | Self::Bgrx8 | Self::Rgba8 | Self::Rgbx8 => Some(4),
            Self::Rgba16 => Some(8),
            Self::Rgba32F => Some(16),
        }
    }
}

/// Normalized sub-region of the camera frustum a stream renders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionClipping {
    /// Left edge, 0..1
    pub left: f32,
    /// Right edge, 0..1
    pub right: f32,
    /// Top edge, 0..1
    pub top: f32,
    /// Bottom edge, 0..1
    pub bottom: f32,
}

impl Default for ProjectionClipping {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 1.0,
            top: 0.0,
            bottom: 1.0,
        }
    }
}

/// One output stream as reported by the link
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamDescription {
    /// Opaque stream id
    pub handle: StreamHandle,
    /// Channel the stream's camera is bound to
    pub channel: String,
    /// Mapping the stream belongs to on the controller
    pub mapping_id: u64,
    /// Viewpoint index within the mapping
    pub viewpoint: i32,
    /// Stream name, matched against viewport ids
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Frustum sub-region
    pub clipping: ProjectionClipping,
}

/// Image parameter value for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageFrameData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Link-side image id
    pub image_id: i64,
}

/// Joint transform in the link's convention (meters, quaternion xyzw)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTransform {
    /// Position X
    pub x: f32,
    /// Position Y (up)
    pub y: f32,
    /// Position Z
    pub z: f32,
    /// Rotation quaternion X
    pub rx: f32,
    /// Rotation quaternion Y
    pub ry: f32,
    /// Rotation quaternion Z
    pub rz: f32,
    /// Rotation quaternion W
    pub rw: f32,
}

impl Default for JointTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            rw: 1.0,
        }
    }
}

/// Joint of a skeleton layout
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonJointDesc {
    /// Joint id
    pub id: u64,
    /// Parent joint id; a value not present in the layout marks the root
    pub parent_id: u64,
    /// Rest pose
    pub transform: JointTransform,
}

/// Live joint transform for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonJointPose {
    /// Joint id within the layout
    pub id: u64,
    /// Live transform
    pub transform: JointTransform,
}

/// Header of a skeleton pose slot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SkeletonPoseInfo {
    /// Layout the pose refers to
    pub layout_id: u64,
    /// Layout version the pose refers to
    pub layout_version: u32,
    /// Number of joint poses available; zero means no skeleton is assigned
    pub joint_count: usize,
    /// Root position override
    pub root_position: [f32; 3],
    /// Root orientation override, quaternion xyzw
    pub root_orientation: [f32; 4],
}

/// Named timing sample reported back to the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilingEntry {
    /// Sample name
    pub name: String,
    /// Value in milliseconds
    pub value: f64,
}
