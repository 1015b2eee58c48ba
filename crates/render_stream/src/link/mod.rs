//! Binding to the external transport ("the link")
//!
//! The link supplies frame timing, cameras, parameter values and skeletons from
//! the controlling application, and receives rendered frames back. Every call
//! is synchronous; the blocking ones take a caller-supplied timeout.
//!
//! Calls returning variable-length data follow a two-call protocol: called
//! with `None` they report the required element count, called with a buffer
//! they fill it and report how many elements were written, or fail with
//! [`LinkError::BufferTooSmall`] if the data grew in between. Use
//! [`fetch_sized`] rather than driving that protocol by hand.

mod error;
mod fetch;
pub mod loopback;
mod types;

pub use error::LinkError;
pub use fetch::{fetch_sized, DEFAULT_MAX_ATTEMPTS};
pub use loopback::LoopbackLink;
pub use types::{
    CameraData, CameraHandle, CameraResponseData, FrameData, FrameFlags, ImageFrameData,
    JointTransform, PixelFormat, ProfilingEntry, ProjectionClipping, SchemaHash,
    SkeletonJointDesc, SkeletonJointPose, SkeletonPoseInfo, StreamDescription, StreamHandle,
};

use crate::foundation::logging::LinkLogger;
use crate::schema::Schema;

/// Link protocol major version this crate speaks
pub const LINK_VERSION_MAJOR: u32 = 2;

/// Link protocol minor version this crate speaks
pub const LINK_VERSION_MINOR: u32 = 0;

/// Operations the host consumes from the link
///
/// Implementations must be internally synchronized: the logic thread and the
/// render-submission thread call into the same link.
pub trait Link: Send + Sync {
    /// Version-gated handshake; a mismatch yields [`LinkError::IncompatibleVersion`]
    fn initialise(&self, major: u32, minor: u32) -> Result<(), LinkError>;

    /// Route the link's own diagnostics through the given callbacks
    fn register_logging(&self, logger: LinkLogger);

    /// Block up to `timeout_ms` for the next frame
    fn await_frame_data(&self, timeout_ms: u32) -> Result<FrameData, LinkError>;

    /// Declare whether this process is a cluster follower
    fn set_follower(&self, is_follower: bool) -> Result<(), LinkError>;

    /// Follower only: select the controller frame identified by `t_tracked`
    ///
    /// `f64::MAX` waits without bound.
    fn begin_follower_frame(&self, t_tracked: f64) -> Result<(), LinkError>;

    /// Two-call query of the current stream descriptions
    fn get_streams(&self, out: Option<&mut [StreamDescription]>) -> Result<usize, LinkError>;

    /// Camera record of a stream for the current frame
    fn get_frame_camera(&self, stream: StreamHandle) -> Result<CameraData, LinkError>;

    /// Publish a rendered frame together with the camera response it used
    fn send_frame(&self, stream: StreamHandle, response: &CameraResponseData) -> Result<(), LinkError>;

    /// Two-call query of the project's schema blob
    fn load_schema(&self, out: Option<&mut [u8]>) -> Result<usize, LinkError>;

    /// Publish the schema in use; the link assigns each scene's hash
    fn set_schema(&self, schema: &mut Schema) -> Result<(), LinkError>;

    /// Float values of a scene for the current frame; `out` must be sized exactly
    fn get_frame_parameters(&self, hash: SchemaHash, out: &mut [f32]) -> Result<(), LinkError>;

    /// Image values of a scene for the current frame; `out` must be sized exactly
    fn get_frame_image_data(&self, hash: SchemaHash, out: &mut [ImageFrameData]) -> Result<(), LinkError>;

    /// Text value of a scene's `index`-th text parameter for the current frame
    fn get_frame_text(&self, hash: SchemaHash, index: usize) -> Result<String, LinkError>;

    /// Header of a skeleton pose slot for the current frame
    fn get_skeleton_pose_info(&self, hash: SchemaHash, slot: usize) -> Result<SkeletonPoseInfo, LinkError>;

    /// Two-call query of a skeleton pose slot's joint poses
    fn get_skeleton_joint_poses(
        &self,
        hash: SchemaHash,
        slot: usize,
        out: Option<&mut [SkeletonJointPose]>,
    ) -> Result<usize, LinkError>;

    /// Two-call query of a layout's joint descriptors
    fn get_skeleton_layout(&self, layout_id: u64, out: Option<&mut [SkeletonJointDesc]>) -> Result<usize, LinkError>;

    /// Two-call query of a layout's joint names
    fn get_skeleton_joint_names(&self, layout_id: u64, out: Option<&mut [String]>) -> Result<usize, LinkError>;

    /// Replace the status message shown on the controller; empty clears it
    fn set_status_message(&self, message: &str) -> Result<(), LinkError>;

    /// Report timing samples to the controller
    fn send_profiling_data(&self, entries: &[ProfilingEntry]) -> Result<(), LinkError>;
}
