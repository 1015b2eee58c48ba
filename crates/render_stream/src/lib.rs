//! # Render Stream
//!
//! Frame synchronization and parameter distribution for rendering nodes driven
//! by an external media-server controller.
//!
//! ## Features
//!
//! - **Cluster Sync**: One controller pulls frames from the link and replicates them to followers
//! - **Remote Parameters**: Schema-described scene parameters applied to actors every frame
//! - **Scene Selection**: Scenes map onto the whole world, streaming levels, or maps
//! - **Camera Tracking**: Per-stream camera records drive viewport cameras and projections
//! - **Skeletons**: Live joint poses converted into host space and republished
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use render_stream::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link: Arc<dyn Link> = Arc::new(LoopbackLink::new());
//!     let mut module = RenderStreamModule::startup(
//!         link,
//!         RenderStreamSettings::default(),
//!         Box::new(HostResourceAllocator),
//!         Box::new(PoseStore::new()),
//!     )?;
//!
//!     let mut world = World::new("/Game/Maps/Stage");
//!     module.load_schemas(&world);
//!     module.populate_streams();
//!     while !module.exit_requested() {
//!         module.begin_frame(&mut world)?;
//!         module.end_frame();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod link;
pub mod schema;
pub mod config;
pub mod events;
pub mod status;
pub mod streams;
pub mod camera;
pub mod viewport;
pub mod skeleton;
pub mod scene;
pub mod sync;
pub mod submission;

mod error;
mod module;

pub use error::{RenderStreamError, Result};
pub use module::RenderStreamModule;

#[cfg(test)]
mod tests;

/// Common imports for module users
pub mod prelude {
    pub use crate::{
        config::{ClusterRole, Config, RenderStreamSettings, SceneSelectorKind},
        events::{Event, EventArg, EventType},
        foundation::{
            coordinates::{CoordinateConverter, DistanceUnit},
            math::{Mat4, Quat, Transform, Vec3},
        },
        link::{FrameData, Link, LinkError, LoopbackLink},
        scene::{ParameterActor, PropertyKind, PropertyValue, ScriptActor, World},
        skeleton::{PoseSink, PoseStore},
        status::{RenderStreamStatus, StatusColor},
        streams::HostResourceAllocator,
        submission::RenderSubmitter,
        sync::{SyncOutcome, Timecode},
        RenderStreamError, RenderStreamModule,
    };
}
