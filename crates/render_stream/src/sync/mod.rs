//! Cluster frame synchronization
//!
//! [`FrameSyncObject`] carries one frame from the controller node to every
//! follower. The host side of a tick is abstracted by [`FrameHost`].

pub mod archive;
mod frame_sync;
mod timecode;

pub use archive::{Archive, ArchiveError};
pub use frame_sync::{
    derive_delta, FrameSyncObject, QuitState, SyncOutcome, DATA_VERSION, DEFAULT_AWAIT_TIMEOUT_MS,
    SYNC_OBJECT_ID,
};
pub use timecode::{Timecode, TimecodeProvider};

use crate::error::Result;
use crate::link::{FrameData, Link};

/// Host operations a receive call drives
pub trait FrameHost {
    /// Link used for this node
    fn link(&self) -> &dyn Link;

    /// Re-read stream descriptions from the link
    fn populate_streams(&mut self);

    /// Slave the host's time-stepping to the controller's delta
    fn set_fixed_delta(&mut self, delta_seconds: f64);

    /// Apply the selected scene, then the cameras
    ///
    /// # Errors
    /// Fatal configuration errors, such as an out-of-range scene.
    fn apply_frame(&mut self, frame: &FrameData, delta_time: f64) -> Result<()>;

    /// Ask the host process to exit
    fn request_exit(&mut self);
}
