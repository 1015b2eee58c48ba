//! # Skeletal pose pipeline
//!
//! Skeleton-typed parameters carry a pose slot index. For each one the
//! pipeline pulls the slot's joint poses from the link, makes sure the layout
//! they refer to is cached, converts everything into host space and publishes
//! the result to a [`PoseSink`] under the parameter's key.
//!
//! Layouts are cached by id and refetched whenever a pose names a version the
//! cache does not hold. Nothing is pushed by the link; the cache is refreshed
//! only when a pose asks for it.

mod sink;

pub use sink::{FramePose, PoseSink, PoseStore, StaticSkeleton, SubjectPose};

use std::collections::HashMap;

use crate::foundation::coordinates::CoordinateConverter;
use crate::foundation::math::{Quat, Quaternion, Transform, Vec3};
use crate::link::{fetch_sized, JointTransform, Link, LinkError, SchemaHash, SkeletonJointDesc};

/// Cached joint layout of a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalLayout {
    /// Layout id
    pub id: u64,
    /// Layout version
    pub version: u32,
    /// Joints in layout order
    pub joints: Vec<SkeletonJointDesc>,
    /// Joint names, parallel to `joints`
    pub names: Vec<String>,
}

impl SkeletalLayout {
    /// Index of each joint's parent, or -1 when the parent id is not in the layout
    pub fn parent_indices(&self) -> Vec<i32> {
        self.joints
            .iter()
            .map(|joint| {
                self.index_of(joint.parent_id)
                    .and_then(|index| i32::try_from(index).ok())
                    .unwrap_or(-1)
            })
            .collect()
    }

    /// Layout index of the joint with the given id
    pub fn index_of(&self, joint_id: u64) -> Option<usize> {
        self.joints.iter().position(|joint| joint.id == joint_id)
    }

    /// Index of the first joint without a parent in the layout
    pub fn root_index(&self) -> Option<usize> {
        self.joints
            .iter()
            .position(|joint| self.index_of(joint.parent_id).is_none())
    }

    fn static_skeleton(&self) -> StaticSkeleton {
        StaticSkeleton {
            bone_names: self.names.clone(),
            parent_indices: self.parent_indices(),
        }
    }
}

fn joint_rotation(transform: &JointTransform) -> Quat {
    Quat::new_normalize(Quaternion::new(transform.rw, transform.rx, transform.ry, transform.rz))
}

/// Pulls, converts and republishes skeleton poses
pub struct SkeletonPipeline {
    layouts: HashMap<u64, SkeletalLayout>,
    published: HashMap<String, (u64, u32)>,
    sink: Box<dyn PoseSink>,
    converter: CoordinateConverter,
    max_attempts: u32,
}

impl SkeletonPipeline {
    /// Create a pipeline publishing to `sink`
    pub fn new(sink: Box<dyn PoseSink>, converter: CoordinateConverter, max_attempts: u32) -> Self {
        Self {
            layouts: HashMap::new(),
            published: HashMap::new(),
            sink,
            converter,
            max_attempts,
        }
    }

    /// Cached layout by id
    pub fn layout(&self, layout_id: u64) -> Option<&SkeletalLayout> {
        self.layouts.get(&layout_id)
    }

    /// Drop every cached layout and topology record
    pub fn clear(&mut self) {
        self.layouts.clear();
        self.published.clear();
    }

    /// Resolve and publish the pose of one skeleton parameter
    ///
    /// Returns `Ok(false)` when the slot has no skeleton assigned.
    ///
    /// # Arguments
    /// * `link` - Link to query
    /// * `hash` - Schema hash of the active scene
    /// * `slot` - Running index of the skeleton parameter within the scene
    /// * `subject` - Parameter key, used as the published subject name
    /// * `delta_time` - Frame delta forwarded to the sink
    pub fn resolve_pose_for_parameter(
        &mut self,
        link: &dyn Link,
        hash: SchemaHash,
        slot: usize,
        subject: &str,
        delta_time: f64,
    ) -> Result<bool, LinkError> {
        let info = link.get_skeleton_pose_info(hash, slot)?;
        if info.joint_count == 0 {
            return Ok(false);
        }

        let poses = fetch_sized("skeleton joint poses", self.max_attempts, |out| {
            link.get_skeleton_joint_poses(hash, slot, out)
        })?;

        let layout_current = self
            .layouts
            .get(&info.layout_id)
            .is_some_and(|layout| layout.version == info.layout_version);
        if !layout_current {
            let layout = self.fetch_layout(link, info.layout_id, info.layout_version)?;
            self.layouts.insert(info.layout_id, layout);
        }
        let Some(layout) = self.layouts.get(&info.layout_id) else {
            return Ok(false);
        };

        let mut transforms: Vec<Transform> = layout
            .joints
            .iter()
            .map(|joint| {
                let source = poses
                    .iter()
                    .find(|pose| pose.id == joint.id)
                    .map_or(&joint.transform, |pose| &pose.transform);
                self.converter.joint_to_host(
                    Vec3::new(source.x, source.y, source.z),
                    &joint_rotation(source),
                )
            })
            .collect();

        let [rx, ry, rz, rw] = info.root_orientation;
        let root = self.converter.joint_to_host(
            Vec3::from(info.root_position),
            &Quat::new_normalize(Quaternion::new(rw, rx, ry, rz)),
        );
        match layout.root_index() {
            Some(index) => transforms[index] = root,
            None => log::warn!("Skeleton layout {} has no root joint", layout.id),
        }

        let topology = (layout.id, layout.version);
        if self.published.get(subject) != Some(&topology) {
            log::debug!("Publishing skeleton topology for '{subject}' (layout {} v{})", topology.0, topology.1);
            self.sink.push_static_skeleton(subject, layout.static_skeleton());
            self.published.insert(subject.to_string(), topology);
        }
        self.sink.push_frame_pose(
            subject,
            FramePose {
                transforms,
                root,
                delta_time,
                source_key: hash,
            },
        );
        Ok(true)
    }

    fn fetch_layout(&self, link: &dyn Link, layout_id: u64, version: u32) -> Result<SkeletalLayout, LinkError> {
        let joints = fetch_sized("skeleton layout", self.max_attempts, |out| {
            link.get_skeleton_layout(layout_id, out)
        })?;
        let mut names = fetch_sized("skeleton joint names", self.max_attempts, |out| {
            link.get_skeleton_joint_names(layout_id, out)
        })?;
        if names.len() != joints.len() {
            log::warn!(
                "Skeleton layout {layout_id} has {} joints but {} names",
                joints.len(),
                names.len()
            );
            names.resize_with(joints.len(), String::new);
            for (name, joint) in names.iter_mut().zip(&joints) {
                if name.is_empty() {
                    *name = format!("joint_{}", joint.id);
                }
            }
        }
        log::info!("Fetched skeleton layout {layout_id} v{version} with {} joints", joints.len());
        Ok(SkeletalLayout {
            id: layout_id,
            version,
            joints,
            names,
        })
    }
}
