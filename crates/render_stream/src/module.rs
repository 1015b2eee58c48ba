//! # Render stream module
//!
//! [`RenderStreamModule`] is the per-node entry point. It owns the link
//! session and every table the tick needs, and drives one frame at a time:
//!
//! 1. [`begin_frame`](RenderStreamModule::begin_frame) on the controller, or
//!    [`receive_cluster_payload`](RenderStreamModule::receive_cluster_payload)
//!    on a follower, applies the frame's scene and cameras
//! 2. the host renders; [`submitter`](RenderStreamModule::submitter) and
//!    [`submissions`](RenderStreamModule::submissions) feed the render thread
//! 3. [`end_frame`](RenderStreamModule::end_frame) reports timings
//!
//! The world is owned by the host and lent to each call.

use std::sync::Arc;

use crate::camera::apply_cameras;
use crate::config::{ClusterRole, ConfigError, RenderStreamSettings};
use crate::error::{RenderStreamError, Result};
use crate::events::{Event, EventArg, EventHandler, EventSystem, EventType};
use crate::foundation::coordinates::CoordinateConverter;
use crate::foundation::logging::link_logger;
use crate::foundation::time::{FrameClock, Stopwatch};
use crate::link::{FrameData, Link, LinkError, ProfilingEntry, LINK_VERSION_MAJOR, LINK_VERSION_MINOR};
use crate::scene::{ParameterApplier, SceneSelector, World};
use crate::skeleton::{PoseSink, SkeletonPipeline};
use crate::status::{RenderStreamStatus, StatusColor};
use crate::streams::{ResourceAllocator, StreamInfo, StreamRegistry};
use crate::submission::RenderSubmitter;
use crate::sync::{ArchiveError, FrameHost, FrameSyncObject, SyncOutcome, Timecode, TimecodeProvider};
use crate::viewport::{ChannelTable, ViewportSubmission, ViewportTable};

/// Everything a tick mutates apart from the sync object and the world
struct NodeState {
    link: Arc<dyn Link>,
    converter: CoordinateConverter,
    max_attempts: u32,
    streams: StreamRegistry,
    viewports: ViewportTable,
    channels: ChannelTable,
    selector: SceneSelector,
    events: EventSystem,
    clock: FrameClock,
    status: RenderStreamStatus,
    exit_requested: bool,
}

impl NodeState {
    fn stream_infos(&self) -> Vec<StreamInfo> {
        self.streams
            .streams()
            .map(|stream| StreamInfo {
                channel: stream.channel().to_string(),
                name: stream.name().to_string(),
            })
            .collect()
    }

    fn populate_streams(&mut self) {
        match self.streams.populate(self.link.as_ref(), self.max_attempts) {
            Ok(report) => {
                let valid = self.viewports.configure_capture(&self.streams, &self.channels);
                log::info!(
                    "{} stream(s) reported, {} viewport(s) capturing",
                    report.streams.len(),
                    valid
                );
                if report.is_clean() {
                    self.status.output("Stream(s) created", StatusColor::Green);
                } else {
                    let mut failed = report.failed.clone();
                    failed.extend(report.resolution_mismatches.iter().cloned());
                    self.status
                        .output(format!("Failed to create stream(s): {}", failed.join(", ")), StatusColor::Red);
                }
                self.events
                    .send(Event::new(EventType::StreamsChanged, EventArg::Streams(report.streams)));
            }
            Err(e) => {
                log::error!("Unable to get streams - {e}");
                self.status.output("Failed to get streams", StatusColor::Red);
            }
        }
    }
}

/// Borrowed view of a node and its world for one receive call
struct TickHost<'a> {
    node: &'a mut NodeState,
    world: &'a mut World,
}

impl FrameHost for TickHost<'_> {
    fn link(&self) -> &dyn Link {
        self.node.link.as_ref()
    }

    fn populate_streams(&mut self) {
        self.node.populate_streams();
    }

    fn set_fixed_delta(&mut self, delta_seconds: f64) {
        self.node.clock.set_fixed_delta(delta_seconds);
    }

    fn apply_frame(&mut self, frame: &FrameData, delta_time: f64) -> Result<()> {
        let node = &mut *self.node;
        node.selector
            .apply_scene(node.link.as_ref(), self.world, frame.scene as usize, delta_time)?;
        apply_cameras(frame, &mut node.viewports, &node.streams, node.link.as_ref(), &node.converter);
        Ok(())
    }

    fn request_exit(&mut self) {
        self.node.exit_requested = true;
        self.node.events.send(Event::new(EventType::QuitRequested, EventArg::None));
    }
}

/// One node of a render stream cluster
pub struct RenderStreamModule {
    settings: RenderStreamSettings,
    sync: FrameSyncObject,
    timecode: TimecodeProvider,
    frame_timer: Stopwatch,
    node: NodeState,
}

impl RenderStreamModule {
    /// Validate settings, open the link session and set up the node
    ///
    /// # Arguments
    /// * `link` - Link for this node, shared with the render thread
    /// * `settings` - Node settings
    /// * `allocator` - Creates backing resources for streams
    /// * `pose_sink` - Receives skeleton poses
    ///
    /// # Errors
    /// Returns [`RenderStreamError::Config`] for invalid settings,
    /// [`RenderStreamError::VersionMismatch`] when the link speaks another
    /// protocol version and [`RenderStreamError::LinkInit`] for any other
    /// initialisation failure. The status surface reports the latter two.
    pub fn startup(
        link: Arc<dyn Link>,
        settings: RenderStreamSettings,
        allocator: Box<dyn ResourceAllocator>,
        pose_sink: Box<dyn PoseSink>,
    ) -> Result<Self> {
        settings.validate().map_err(ConfigError::Invalid)?;

        let status = RenderStreamStatus::new();
        status.input_output(
            "Initialising stream",
            StatusColor::Orange,
            "Waiting for data from controller",
            StatusColor::Orange,
        );

        match link.initialise(LINK_VERSION_MAJOR, LINK_VERSION_MINOR) {
            Ok(()) => {}
            Err(LinkError::IncompatibleVersion) => {
                log::error!("Unsupported link library, expected version {LINK_VERSION_MAJOR}.{LINK_VERSION_MINOR}");
                status.input_output("Error", StatusColor::Red, "Unsupported link library", StatusColor::Red);
                return Err(RenderStreamError::VersionMismatch {
                    major: LINK_VERSION_MAJOR,
                    minor: LINK_VERSION_MINOR,
                });
            }
            Err(e) => {
                log::error!("Unable to initialise link library - {e}");
                status.input_output("Error", StatusColor::Red, "Unable to initialise link library", StatusColor::Red);
                return Err(RenderStreamError::LinkInit(e));
            }
        }
        link.register_logging(link_logger());
        log::info!(
            "Link initialised as {:?} with {:?} scene selection",
            settings.cluster_role,
            settings.scene_selector
        );

        let converter = CoordinateConverter::new(settings.distance_unit);
        let max_attempts = settings.max_fetch_attempts;
        let skeletons = SkeletonPipeline::new(pose_sink, converter, max_attempts);
        let selector = SceneSelector::new(
            settings.scene_selector,
            ParameterApplier::new(converter, skeletons),
            max_attempts,
        );

        let node = NodeState {
            link,
            converter,
            max_attempts,
            streams: StreamRegistry::new(allocator),
            viewports: ViewportTable::from_config(&settings.viewports),
            channels: ChannelTable::from_config(&settings.channels),
            selector,
            events: EventSystem::new(),
            clock: FrameClock::new(),
            status,
            exit_requested: false,
        };

        Ok(Self {
            settings,
            sync: FrameSyncObject::new(),
            timecode: TimecodeProvider::new(),
            frame_timer: Stopwatch::new(),
            node,
        })
    }

    /// Settings the node was started with
    pub const fn settings(&self) -> &RenderStreamSettings {
        &self.settings
    }

    /// Whether this node drives the link directly
    pub fn is_controller(&self) -> bool {
        self.settings.cluster_role == ClusterRole::Controller
    }

    /// Register a handler for module events
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.node.events.register_handler(event_type, handler);
    }

    /// Load the schema for the current world
    ///
    /// Falls back to the default schema on any failure. Returns true when the
    /// link's schema was accepted.
    pub fn load_schemas(&mut self, world: &World) -> bool {
        let node = &mut self.node;
        let loaded = node.selector.load_schemas(node.link.as_ref(), world);
        let scenes = node.selector.schema().scenes.len();
        node.events
            .send(Event::new(EventType::SchemaLoaded, EventArg::SceneCount(scenes)));
        node.events.dispatch();
        loaded
    }

    /// Re-read streams from the link and rebind viewports
    pub fn populate_streams(&mut self) {
        self.node.populate_streams();
        self.node.events.dispatch();
    }

    /// Tell handlers about the current streams after a map change
    pub fn on_map_loaded(&mut self) {
        let streams = self.node.stream_infos();
        self.node
            .events
            .send(Event::new(EventType::StreamsChanged, EventArg::Streams(streams)));
        self.node.events.dispatch();
    }

    /// Await and apply this tick's frame (controller only)
    ///
    /// # Errors
    /// Propagates fatal errors from applying the frame's scene.
    pub fn begin_frame(&mut self, world: &mut World) -> Result<SyncOutcome> {
        self.frame_timer = Stopwatch::start_new();
        if !self.is_controller() {
            log::error!("begin_frame called on a follower node; frames arrive through the cluster payload");
            return Ok(SyncOutcome::NoFrame);
        }
        let mut host = TickHost {
            node: &mut self.node,
            world,
        };
        let outcome = self
            .sync
            .controller_receive(&mut host, self.settings.await_timeout_ms);
        self.after_receive();
        outcome
    }

    /// Serialize this tick's state for broadcast to followers
    ///
    /// # Errors
    /// Saving does not fail in practice.
    pub fn cluster_payload(&mut self) -> std::result::Result<Vec<u8>, ArchiveError> {
        self.sync.serialize()
    }

    /// Apply a payload broadcast by the controller (follower only)
    ///
    /// A payload that cannot be decoded is logged and the tick renders
    /// without new frame data.
    ///
    /// # Errors
    /// Propagates fatal errors from applying the frame's scene.
    pub fn receive_cluster_payload(&mut self, bytes: &[u8], world: &mut World) -> Result<SyncOutcome> {
        self.frame_timer = Stopwatch::start_new();
        if self.sync.deserialize(bytes).is_err() {
            return Ok(SyncOutcome::NoFrame);
        }
        let mut host = TickHost {
            node: &mut self.node,
            world,
        };
        let outcome = self.sync.follower_receive(&mut host);
        self.after_receive();
        outcome
    }

    fn after_receive(&mut self) {
        self.timecode
            .update(self.sync.frame_data(), self.sync.is_frame_data_valid());
        self.node.events.dispatch();
    }

    /// Report this tick's timings to the link
    pub fn end_frame(&mut self) {
        let (name, value) = if self.is_controller() {
            ("Await Time", self.sync.await_time_ms())
        } else {
            ("Receive Time", self.sync.receive_time_ms())
        };
        let entries = [
            ProfilingEntry {
                name: "Frame Time".to_string(),
                value: self.frame_timer.elapsed_millis(),
            },
            ProfilingEntry {
                name: name.to_string(),
                value,
            },
        ];
        if let Err(e) = self.node.link.send_profiling_data(&entries) {
            log::trace!("Unable to send profiling data: {e}");
        }
    }

    /// Timecode of the last applied frame
    pub const fn timecode(&self) -> Timecode {
        self.timecode.current()
    }

    /// Whether the cluster asked this node to exit
    pub const fn exit_requested(&self) -> bool {
        self.node.exit_requested
    }

    /// Snapshot of every streamed viewport for the render thread
    pub fn submissions(&self) -> Vec<ViewportSubmission> {
        self.node.viewports.submissions(&self.node.streams)
    }

    /// Render-thread frame publisher sharing this node's link
    pub fn submitter(&self) -> RenderSubmitter {
        RenderSubmitter::new(Arc::clone(&self.node.link))
    }

    /// Status surface, cloneable for a display widget
    pub const fn status(&self) -> &RenderStreamStatus {
        &self.node.status
    }

    /// Frame clock, slaved to the controller's deltas
    pub const fn clock(&self) -> &FrameClock {
        &self.node.clock
    }

    /// Replicated sync state
    pub const fn sync(&self) -> &FrameSyncObject {
        &self.sync
    }

    /// Stream registry
    pub const fn streams(&self) -> &StreamRegistry {
        &self.node.streams
    }

    /// Viewport table
    pub const fn viewports(&self) -> &ViewportTable {
        &self.node.viewports
    }

    /// Scene selector and the active schema
    pub const fn selector(&self) -> &SceneSelector {
        &self.node.selector
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::SceneSelectorKind;
    use crate::link::{LoopbackLink, PixelFormat, StreamDescription};
    use crate::skeleton::PoseStore;
    use crate::streams::HostResourceAllocator;

    fn start(link: &Arc<LoopbackLink>, settings: RenderStreamSettings) -> Result<RenderStreamModule> {
        let link: Arc<dyn Link> = link.clone();
        RenderStreamModule::startup(
            link,
            settings,
            Box::new(HostResourceAllocator),
            Box::new(PoseStore::new()),
        )
    }

    fn stream(name: &str, width: u32, height: u32) -> StreamDescription {
        StreamDescription {
            handle: 1,
            channel: "main".to_string(),
            name: name.to_string(),
            width,
            height,
            format: PixelFormat::Rgba8,
            ..StreamDescription::default()
        }
    }

    #[test]
    fn test_startup_rejects_other_link_version() {
        let link = Arc::new(LoopbackLink::with_version(1, 9));
        let err = start(&link, RenderStreamSettings::default()).err();
        assert!(matches!(err, Some(RenderStreamError::VersionMismatch { major: 2, minor: 0 })));
    }

    #[test]
    fn test_startup_rejects_second_session() {
        let link = Arc::new(LoopbackLink::new());
        assert!(start(&link, RenderStreamSettings::default()).is_ok());
        let err = start(&link, RenderStreamSettings::default()).err();
        assert!(matches!(err, Some(RenderStreamError::LinkInit(LinkError::AlreadyInitialised))));
    }

    #[test]
    fn test_startup_rejects_invalid_settings() {
        let link = Arc::new(LoopbackLink::new());
        let settings = RenderStreamSettings {
            await_timeout_ms: 0,
            ..RenderStreamSettings::default()
        };
        assert!(matches!(start(&link, settings), Err(RenderStreamError::Config(_))));
        assert!(!link.is_initialised());
    }

    #[test]
    fn test_startup_status_and_logging() {
        let link = Arc::new(LoopbackLink::new());
        let module = start(&link, RenderStreamSettings::default()).unwrap();

        let (input, output) = module.status().lines();
        assert_eq!(input.text, "Initialising stream");
        assert_eq!(output.text, "Waiting for data from controller");
        assert!(link.has_logger());
        assert!(module.selector().is_fallback());
    }

    #[test]
    fn test_populate_binds_viewport_and_broadcasts() {
        let link = Arc::new(LoopbackLink::new());
        link.set_streams(vec![stream("Main", 64, 32)]);
        let settings = RenderStreamSettings::default().with_viewport("Main", 64, 32);
        let mut module = start(&link, settings).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        module.register_handler(
            EventType::StreamsChanged,
            Box::new(move |event: &Event| {
                sink.lock().unwrap().extend(event.streams().unwrap_or_default().to_vec());
                false
            }),
        );

        module.populate_streams();
        assert_eq!(module.streams().stream_count(), 1);
        assert!(module.viewports().get("Main").unwrap().is_valid());
        assert_eq!(module.submissions().len(), 1);
        assert_eq!(module.status().lines().1.text, "Stream(s) created");
        assert_eq!(seen.lock().unwrap()[0].name, "Main");
    }

    #[test]
    fn test_resolution_mismatch_reports_red() {
        let link = Arc::new(LoopbackLink::new());
        link.set_streams(vec![stream("Main", 64, 32)]);
        let mut module = start(&link, RenderStreamSettings::default().with_viewport("Main", 128, 32)).unwrap();

        module.populate_streams();
        assert!(!module.viewports().get("Main").unwrap().is_valid());

        link.set_streams(vec![stream("Main", 32, 32)]);
        module.populate_streams();
        let (_, output) = module.status().lines();
        assert_eq!(output.color, StatusColor::Red);
    }

    #[test]
    fn test_controller_frame_applies_and_profiles() {
        let link = Arc::new(LoopbackLink::new());
        let mut module = start(&link, RenderStreamSettings::default()).unwrap();
        let mut world = World::new("Stage");
        module.load_schemas(&world);

        link.push_frame(FrameData {
            t_tracked: 1.0,
            local_time: 3661.5,
            frame_rate_numerator: 50,
            frame_rate_denominator: 1,
            ..FrameData::default()
        });
        assert_eq!(module.begin_frame(&mut world).unwrap(), SyncOutcome::Applied);
        module.end_frame();

        assert!(module.clock().is_fixed());
        assert_eq!(module.timecode().to_string(), "01:01:01:25");
        let names: Vec<String> = link.profiling().into_iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["Frame Time", "Await Time"]);
    }

    #[test]
    fn test_begin_frame_on_follower_does_nothing() {
        let link = Arc::new(LoopbackLink::new());
        let settings = RenderStreamSettings::default().with_cluster_role(ClusterRole::Follower);
        let mut module = start(&link, settings).unwrap();
        link.push_frame(FrameData::default());

        let mut world = World::new("Stage");
        assert_eq!(module.begin_frame(&mut world).unwrap(), SyncOutcome::NoFrame);
        assert_eq!(link.pending_awaits(), 1);
    }

    #[test]
    fn test_quit_is_deferred_one_tick() {
        let link = Arc::new(LoopbackLink::new());
        let mut module = start(&link, RenderStreamSettings::default()).unwrap();
        let mut world = World::new("Stage");

        let quits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&quits);
        module.register_handler(
            EventType::QuitRequested,
            Box::new(move |_: &Event| {
                *counter.lock().unwrap() += 1;
                true
            }),
        );

        link.push_await_outcome(Err(LinkError::Quit));
        assert_eq!(module.begin_frame(&mut world).unwrap(), SyncOutcome::QuitPending);
        assert!(!module.exit_requested());

        assert_eq!(module.begin_frame(&mut world).unwrap(), SyncOutcome::Exited);
        assert!(module.exit_requested());
        assert_eq!(*quits.lock().unwrap(), 1);
        assert_eq!(link.status_messages().last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_garbled_payload_is_skipped() {
        let link = Arc::new(LoopbackLink::new());
        let settings = RenderStreamSettings::default()
            .with_cluster_role(ClusterRole::Follower)
            .with_scene_selector(SceneSelectorKind::Maps);
        let mut module = start(&link, settings).unwrap();
        let mut world = World::new("Stage");

        assert_eq!(module.receive_cluster_payload(&[1, 2, 3], &mut world).unwrap(), SyncOutcome::NoFrame);
        assert!(!link.is_follower());
        module.end_frame();
        assert_eq!(link.profiling()[1].name, "Receive Time");
    }
}
