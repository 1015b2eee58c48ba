//! In-process link
//!
//! [`LoopbackLink`] plays the controller's side from scripted state. Await
//! outcomes are queued ahead of time, per-scene values are set per schema hash
//! and everything sent back (frames, schemas, status, profiling) is recorded
//! for inspection.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    CameraData, CameraResponseData, FrameData, ImageFrameData, Link, LinkError, ProfilingEntry,
    SchemaHash, SkeletonJointDesc, SkeletonJointPose, SkeletonPoseInfo, StreamDescription,
    StreamHandle, LINK_VERSION_MAJOR, LINK_VERSION_MINOR,
};
use crate::foundation::logging::LinkLogger;
use crate::schema::Schema;

/// Values a scene reports for the current frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneValues {
    /// Float buffer
    pub floats: Vec<f32>,
    /// Image buffer
    pub images: Vec<ImageFrameData>,
    /// Text values in text-slot order
    pub texts: Vec<String>,
}

#[derive(Default)]
struct LoopbackState {
    version: (u32, u32),
    initialised: bool,
    logger: Option<LinkLogger>,
    await_script: VecDeque<Result<FrameData, LinkError>>,
    follower: bool,
    follower_script: VecDeque<Result<(), LinkError>>,
    follower_frames: Vec<f64>,
    streams: Vec<StreamDescription>,
    cameras: HashMap<StreamHandle, CameraData>,
    sent_frames: Vec<(StreamHandle, CameraResponseData)>,
    schema_blob: Option<Vec<u8>>,
    schema_error: Option<LinkError>,
    published_schemas: Vec<Schema>,
    scene_values: HashMap<SchemaHash, SceneValues>,
    poses: HashMap<(SchemaHash, usize), (SkeletonPoseInfo, Vec<SkeletonJointPose>)>,
    layouts: HashMap<u64, (Vec<SkeletonJointDesc>, Vec<String>)>,
    layout_fetches: usize,
    status_messages: Vec<String>,
    profiling: Vec<ProfilingEntry>,
    pending_growth: usize,
}

impl LoopbackState {
    /// Shared fill half of the two-call protocol
    fn fill<T: Clone>(&mut self, source: &[T], out: Option<&mut [T]>) -> Result<usize, LinkError> {
        let Some(out) = out else {
            return Ok(source.len());
        };
        if self.pending_growth > 0 {
            self.pending_growth -= 1;
            return Err(LinkError::BufferTooSmall {
                required: source.len(),
            });
        }
        if out.len() < source.len() {
            return Err(LinkError::BufferTooSmall {
                required: source.len(),
            });
        }
        out[..source.len()].clone_from_slice(source);
        Ok(source.len())
    }
}

/// Scriptable in-process [`Link`]
pub struct LoopbackLink {
    state: Mutex<LoopbackState>,
}

impl Default for LoopbackLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackLink {
    /// Create a link speaking this crate's protocol version
    pub fn new() -> Self {
        Self::with_version(LINK_VERSION_MAJOR, LINK_VERSION_MINOR)
    }

    /// Create a link that reports the given protocol version
    pub fn with_version(major: u32, minor: u32) -> Self {
        Self {
            state: Mutex::new(LoopbackState {
                version: (major, minor),
                ..LoopbackState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a successful await
    pub fn push_frame(&self, frame: FrameData) {
        self.state().await_script.push_back(Ok(frame));
    }

    /// Queue an arbitrary await outcome
    pub fn push_await_outcome(&self, outcome: Result<FrameData, LinkError>) {
        self.state().await_script.push_back(outcome);
    }

    /// Queue a `begin_follower_frame` outcome; unscripted calls succeed
    pub fn push_follower_outcome(&self, outcome: Result<(), LinkError>) {
        self.state().follower_script.push_back(outcome);
    }

    /// Replace the reported stream descriptions
    pub fn set_streams(&self, streams: Vec<StreamDescription>) {
        self.state().streams = streams;
    }

    /// Set the camera record returned for a stream
    pub fn set_camera(&self, stream: StreamHandle, camera: CameraData) {
        self.state().cameras.insert(stream, camera);
    }

    /// Set the schema blob returned by `load_schema`
    pub fn set_schema_blob(&self, blob: Vec<u8>) {
        let mut state = self.state();
        state.schema_blob = Some(blob);
        state.schema_error = None;
    }

    /// Make `load_schema` fail with the given error
    pub fn fail_schema_load(&self, error: LinkError) {
        self.state().schema_error = Some(error);
    }

    /// Set a scene's current values
    pub fn set_scene_values(&self, hash: SchemaHash, values: SceneValues) {
        self.state().scene_values.insert(hash, values);
    }

    /// Set the pose of a skeleton slot
    pub fn set_skeleton_pose(&self, hash: SchemaHash, slot: usize, info: SkeletonPoseInfo, joints: Vec<SkeletonJointPose>) {
        let info = SkeletonPoseInfo {
            joint_count: joints.len(),
            ..info
        };
        self.state().poses.insert((hash, slot), (info, joints));
    }

    /// Define a skeleton layout
    pub fn set_skeleton_layout(&self, layout_id: u64, joints: Vec<SkeletonJointDesc>, names: Vec<String>) {
        self.state().layouts.insert(layout_id, (joints, names));
    }

    /// Make the next `count` buffer fills report that the data grew
    pub fn grow_next_fetches(&self, count: usize) {
        self.state().pending_growth = count;
    }

    /// Content hash the link assigns to a scene
    pub fn scene_hash(scene: &crate::schema::RemoteParameters) -> SchemaHash {
        let mut hasher = DefaultHasher::new();
        scene.name.hash(&mut hasher);
        for parameter in &scene.parameters {
            parameter.key.hash(&mut hasher);
            parameter.parameter_type.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Whether `initialise` succeeded
    pub fn is_initialised(&self) -> bool {
        self.state().initialised
    }

    /// Whether a logger has been registered
    pub fn has_logger(&self) -> bool {
        self.state().logger.is_some()
    }

    /// Whether this process declared itself a follower
    pub fn is_follower(&self) -> bool {
        self.state().follower
    }

    /// Tracked times passed to `begin_follower_frame`
    pub fn follower_frames(&self) -> Vec<f64> {
        self.state().follower_frames.clone()
    }

    /// Frames published through `send_frame`
    pub fn sent_frames(&self) -> Vec<(StreamHandle, CameraResponseData)> {
        self.state().sent_frames.clone()
    }

    /// Schemas published through `set_schema`
    pub fn published_schemas(&self) -> Vec<Schema> {
        self.state().published_schemas.clone()
    }

    /// Number of layout fetches served
    pub fn layout_fetches(&self) -> usize {
        self.state().layout_fetches
    }

    /// Status messages set, oldest first
    pub fn status_messages(&self) -> Vec<String> {
        self.state().status_messages.clone()
    }

    /// Profiling entries received, oldest first
    pub fn profiling(&self) -> Vec<ProfilingEntry> {
        self.state().profiling.clone()
    }

    /// Await outcomes still queued
    pub fn pending_awaits(&self) -> usize {
        self.state().await_script.len()
    }
}

impl Link for LoopbackLink {
    fn initialise(&self, major: u32, minor: u32) -> Result<(), LinkError> {
        let mut state = self.state();
        if state.initialised {
            return Err(LinkError::AlreadyInitialised);
        }
        if state.version != (major, minor) {
            return Err(LinkError::IncompatibleVersion);
        }
        state.initialised = true;
        Ok(())
    }

    fn register_logging(&self, logger: LinkLogger) {
        (logger.verbose)("loopback link logging registered");
        self.state().logger = Some(logger);
    }

    fn await_frame_data(&self, _timeout_ms: u32) -> Result<FrameData, LinkError> {
        self.state()
            .await_script
            .pop_front()
            .unwrap_or(Err(LinkError::Timeout))
    }

    fn set_follower(&self, is_follower: bool) -> Result<(), LinkError> {
        self.state().follower = is_follower;
        Ok(())
    }

    fn begin_follower_frame(&self, t_tracked: f64) -> Result<(), LinkError> {
        let mut state = self.state();
        state.follower_frames.push(t_tracked);
        state.follower_script.pop_front().unwrap_or(Ok(()))
    }

    fn get_streams(&self, out: Option<&mut [StreamDescription]>) -> Result<usize, LinkError> {
        let mut state = self.state();
        let streams = state.streams.clone();
        state.fill(&streams, out)
    }

    fn get_frame_camera(&self, stream: StreamHandle) -> Result<CameraData, LinkError> {
        self.state()
            .cameras
            .get(&stream)
            .copied()
            .ok_or(LinkError::NotFound)
    }

    fn send_frame(&self, stream: StreamHandle, response: &CameraResponseData) -> Result<(), LinkError> {
        let mut state = self.state();
        if !state.streams.iter().any(|s| s.handle == stream) {
            return Err(LinkError::InvalidHandle);
        }
        state.sent_frames.push((stream, *response));
        Ok(())
    }

    fn load_schema(&self, out: Option<&mut [u8]>) -> Result<usize, LinkError> {
        let mut state = self.state();
        if let Some(error) = state.schema_error.clone() {
            return Err(error);
        }
        let blob = state.schema_blob.clone().ok_or(LinkError::NotFound)?;
        state.fill(&blob, out)
    }

    fn set_schema(&self, schema: &mut Schema) -> Result<(), LinkError> {
        for scene in &mut schema.scenes {
            scene.hash = Self::scene_hash(scene);
        }
        self.state().published_schemas.push(schema.clone());
        Ok(())
    }

    fn get_frame_parameters(&self, hash: SchemaHash, out: &mut [f32]) -> Result<(), LinkError> {
        let state = self.state();
        let values = state.scene_values.get(&hash).ok_or(LinkError::NotFound)?;
        if values.floats.len() != out.len() {
            return Err(LinkError::InvalidParameters);
        }
        out.copy_from_slice(&values.floats);
        Ok(())
    }

    fn get_frame_image_data(&self, hash: SchemaHash, out: &mut [ImageFrameData]) -> Result<(), LinkError> {
        if out.is_empty() {
            return Ok(());
        }
        let state = self.state();
        let values = state.scene_values.get(&hash).ok_or(LinkError::NotFound)?;
        if values.images.len() != out.len() {
            return Err(LinkError::InvalidParameters);
        }
        out.copy_from_slice(&values.images);
        Ok(())
    }

    fn get_frame_text(&self, hash: SchemaHash, index: usize) -> Result<String, LinkError> {
        self.state()
            .scene_values
            .get(&hash)
            .and_then(|values| values.texts.get(index).cloned())
            .ok_or(LinkError::NotFound)
    }

    fn get_skeleton_pose_info(&self, hash: SchemaHash, slot: usize) -> Result<SkeletonPoseInfo, LinkError> {
        Ok(self
            .state()
            .poses
            .get(&(hash, slot))
            .map(|(info, _)| *info)
            .unwrap_or_default())
    }

    fn get_skeleton_joint_poses(
        &self,
        hash: SchemaHash,
        slot: usize,
        out: Option<&mut [SkeletonJointPose]>,
    ) -> Result<usize, LinkError> {
        let mut state = self.state();
        let joints = state
            .poses
            .get(&(hash, slot))
            .map(|(_, joints)| joints.clone())
            .ok_or(LinkError::NotFound)?;
        state.fill(&joints, out)
    }

    fn get_skeleton_layout(&self, layout_id: u64, out: Option<&mut [SkeletonJointDesc]>) -> Result<usize, LinkError> {
        let mut state = self.state();
        let joints = state
            .layouts
            .get(&layout_id)
            .map(|(joints, _)| joints.clone())
            .ok_or(LinkError::NotFound)?;
        if out.is_some() {
            state.layout_fetches += 1;
        }
        state.fill(&joints, out)
    }

    fn get_skeleton_joint_names(&self, layout_id: u64, out: Option<&mut [String]>) -> Result<usize, LinkError> {
        let mut state = self.state();
        let names = state
            .layouts
            .get(&layout_id)
            .map(|(_, names)| names.clone())
            .ok_or(LinkError::NotFound)?;
        state.fill(&names, out)
    }

    fn set_status_message(&self, message: &str) -> Result<(), LinkError> {
        self.state().status_messages.push(message.to_string());
        Ok(())
    }

    fn send_profiling_data(&self, entries: &[ProfilingEntry]) -> Result<(), LinkError> {
        self.state().profiling.extend_from_slice(entries);
        Ok(())
    }
}
