//! Pose-consuming side of the skeleton pipeline
//!
//! A [`PoseSink`] receives the static skeleton once per topology change and a
//! frame pose every frame, keyed by subject. Retargeting onto a target
//! skeleton is the sink's business.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::math::Transform;

/// Skeleton topology: bone names and parent indices in layout order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSkeleton {
    /// Bone names
    pub bone_names: Vec<String>,
    /// Parent index per bone; -1 for the root
    pub parent_indices: Vec<i32>,
}

/// Joint transforms for one frame, in layout order and host space
#[derive(Debug, Clone, PartialEq)]
pub struct FramePose {
    /// Joint transforms; the root entry already carries the root override
    pub transforms: Vec<Transform>,
    /// Root override as delivered by the link, in host space
    pub root: Transform,
    /// Frame delta in seconds
    pub delta_time: f64,
    /// Schema hash the pose was read from, for event and curve passthrough
    pub source_key: u64,
}

/// Receives skeletons and poses keyed by a stable subject name
pub trait PoseSink: Send {
    /// Topology of `subject` changed
    fn push_static_skeleton(&mut self, subject: &str, skeleton: StaticSkeleton);

    /// New pose for `subject`
    fn push_frame_pose(&mut self, subject: &str, pose: FramePose);
}

/// Latest state of one subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectPose {
    /// Current topology
    pub skeleton: StaticSkeleton,
    /// Most recent pose
    pub latest: Option<FramePose>,
    /// Number of topology pushes received
    pub static_updates: usize,
}

/// Generic pose source keeping the latest pose of every subject
///
/// Clones share the same store, so animation code can read what the logic
/// thread publishes.
#[derive(Debug, Clone, Default)]
pub struct PoseStore {
    subjects: Arc<Mutex<HashMap<String, SubjectPose>>>,
}

impl PoseStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn subjects_guard(&self) -> MutexGuard<'_, HashMap<String, SubjectPose>> {
        self.subjects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of one subject
    pub fn subject(&self, name: &str) -> Option<SubjectPose> {
        self.subjects_guard().get(name).cloned()
    }

    /// Known subject names, sorted
    pub fn subject_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.subjects_guard().keys().cloned().collect();
        names.sort();
        names
    }
}

impl PoseSink for PoseStore {
    fn push_static_skeleton(&mut self, subject: &str, skeleton: StaticSkeleton) {
        let mut subjects = self.subjects_guard();
        let entry = subjects.entry(subject.to_string()).or_default();
        entry.skeleton = skeleton;
        entry.latest = None;
        entry.static_updates += 1;
    }

    fn push_frame_pose(&mut self, subject: &str, pose: FramePose) {
        self.subjects_guard()
            .entry(subject.to_string())
            .or_default()
            .latest = Some(pose);
    }
}
