//! Stream node demo
//!
//! Runs a controller and a follower node side by side on scripted loopback
//! links. The controller pulls frames, broadcasts its payload to the follower,
//! and a render thread per node publishes camera responses back. Pass a
//! `.ron` or `.toml` settings file to override the default viewport layout.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use render_stream::config::{CameraTemplateConfig, ConfigError};
use render_stream::foundation::logging;
use render_stream::link::loopback::SceneValues;
use render_stream::link::{CameraData, PixelFormat, StreamDescription};
use render_stream::prelude::*;
use render_stream::scene::describe_parameters;
use render_stream::schema::{RemoteParameters, Schema};
use render_stream::sync::ArchiveError;
use render_stream::viewport::ViewportSubmission;

const DEMO_FRAMES: u32 = 120;
const FRAME_RATE: u32 = 60;

#[derive(thiserror::Error, Debug)]
enum NodeError {
    #[error("settings: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Module(#[from] RenderStreamError),
    #[error("cluster payload: {0}")]
    Payload(#[from] ArchiveError),
    #[error("render thread: {0}")]
    Thread(#[from] std::io::Error),
}

fn default_settings() -> RenderStreamSettings {
    RenderStreamSettings::default()
        .with_viewport("Main", 1920, 1080)
        .with_channel("main", CameraTemplateConfig::Perspective { fov_degrees: 60.0 })
}

fn load_settings() -> Result<RenderStreamSettings, NodeError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {path}");
            Ok(RenderStreamSettings::load_from_file(&path)?)
        }
        None => Ok(default_settings()),
    }
}

/// Stage actor the controller drives, and a handle to observe it
fn build_stage() -> (World, ScriptActor) {
    let stage = ScriptActor::new("Stage")
        .with_property("Brightness", PropertyKind::Float)
        .with_property("Tint", PropertyKind::Color)
        .with_property("Cue", PropertyKind::Event);
    let mut world = World::new("/Game/Maps/Stage");
    let root = world.spawn_actor(Box::new(stage.clone()));
    world.set_persistent_root(root);
    (world, stage)
}

/// Link scripted with a schema for the stage, one stream per viewport and a
/// slowly moving camera
fn scripted_link(world: &World, settings: &RenderStreamSettings, follower: bool) -> Arc<LoopbackLink> {
    let link = Arc::new(LoopbackLink::new());

    let mut scene = RemoteParameters::new(Schema::DEFAULT_SCENE);
    scene.parameters = describe_parameters(world, &world.all_level_roots());
    let mut schema = Schema {
        scenes: vec![scene],
        ..Schema::default()
    };
    if let Err(e) = link.set_schema(&mut schema) {
        log::error!("Unable to hash demo schema: {e}");
    }
    match schema.to_bytes() {
        Ok(blob) => link.set_schema_blob(blob),
        Err(e) => log::error!("Unable to encode demo schema: {e}"),
    }
    link.set_scene_values(
        schema.scenes[0].hash,
        SceneValues {
            floats: vec![0.8, 1.0, 0.5, 0.25, 1.0, 1.0],
            ..SceneValues::default()
        },
    );

    let streams: Vec<StreamDescription> = settings
        .viewports
        .iter()
        .zip(1..)
        .map(|(viewport, handle)| StreamDescription {
            handle,
            channel: viewport.channel.clone().unwrap_or_else(|| "main".to_string()),
            name: viewport.id.clone(),
            width: viewport.width,
            height: viewport.height,
            format: PixelFormat::Rgba8,
            ..StreamDescription::default()
        })
        .collect();
    for stream in &streams {
        link.set_camera(
            stream.handle,
            CameraData {
                camera_handle: stream.handle,
                z: -5.0,
                focal_length: 35.0,
                sensor_x: 36.0,
                sensor_y: 20.25,
                near_z: 0.1,
                far_z: 1000.0,
                ..CameraData::default()
            },
        );
    }
    link.set_streams(streams);

    if follower {
        for _ in 0..DEMO_FRAMES {
            link.push_follower_outcome(Ok(()));
        }
        link.push_follower_outcome(Err(LinkError::Quit));
    } else {
        for index in 0..DEMO_FRAMES {
            let t = f64::from(index) / f64::from(FRAME_RATE);
            link.push_frame(FrameData {
                t_tracked: t,
                local_time: 3600.0 + t,
                local_time_delta: 1.0 / f64::from(FRAME_RATE),
                frame_rate_numerator: FRAME_RATE,
                frame_rate_denominator: 1,
                ..FrameData::default()
            });
        }
        link.push_await_outcome(Err(LinkError::Quit));
    }
    link
}

fn start_node(link: &Arc<LoopbackLink>, settings: RenderStreamSettings) -> Result<RenderStreamModule, NodeError> {
    let shared: Arc<dyn Link> = link.clone();
    Ok(RenderStreamModule::startup(
        shared,
        settings,
        Box::new(HostResourceAllocator),
        Box::new(PoseStore::new()),
    )?)
}

/// Render thread publishing one frame per submitted viewport
fn spawn_render_thread(
    name: &str,
    submitter: RenderSubmitter,
) -> std::io::Result<(mpsc::Sender<Vec<ViewportSubmission>>, thread::JoinHandle<usize>)> {
    let (sender, receiver) = mpsc::channel::<Vec<ViewportSubmission>>();
    let handle = thread::Builder::new()
        .name(format!("{name}-render"))
        .spawn(move || {
            let mut sent = 0;
            for batch in receiver {
                for submission in &batch {
                    let frame = submitter.submit(submission);
                    if frame.response.is_some() {
                        sent += 1;
                    }
                }
            }
            sent
        })?;
    Ok((sender, handle))
}

fn run() -> Result<(), NodeError> {
    let settings = load_settings()?;

    let (mut controller_world, controller_stage) = build_stage();
    let (mut follower_world, follower_stage) = build_stage();
    let controller_link = scripted_link(&controller_world, &settings, false);
    let follower_link = scripted_link(&follower_world, &settings, true);

    let mut controller = start_node(&controller_link, settings.clone())?;
    let mut follower = start_node(
        &follower_link,
        settings.with_cluster_role(ClusterRole::Follower),
    )?;

    controller.register_handler(
        EventType::StreamsChanged,
        Box::new(|event: &Event| {
            for stream in event.streams().unwrap_or_default() {
                log::info!("Stream '{}' on channel '{}'", stream.name, stream.channel);
            }
            false
        }),
    );

    for (node, world) in [(&mut controller, &controller_world), (&mut follower, &follower_world)] {
        if !node.load_schemas(world) {
            log::warn!("Running with the fallback schema");
        }
        node.populate_streams();
    }

    let (controller_frames, controller_render) = spawn_render_thread("controller", controller.submitter())?;
    let (follower_frames, follower_render) = spawn_render_thread("follower", follower.submitter())?;

    while !(controller.exit_requested() && follower.exit_requested()) {
        if !controller.exit_requested() {
            let outcome = controller.begin_frame(&mut controller_world)?;
            if outcome == SyncOutcome::Applied && controller.clock().frame_count() % u64::from(FRAME_RATE) == 0 {
                log::info!("Timecode {}", controller.timecode());
            }
        }
        let payload = controller.cluster_payload()?;
        if !follower.exit_requested() {
            follower.receive_cluster_payload(&payload, &mut follower_world)?;
        }

        // Render thread closed means the process is already shutting down.
        let _ = controller_frames.send(controller.submissions());
        let _ = follower_frames.send(follower.submissions());

        controller.end_frame();
        follower.end_frame();

        for world in [&mut controller_world, &mut follower_world] {
            world.complete_pending_loads();
        }
    }

    drop(controller_frames);
    drop(follower_frames);
    let sent = (
        controller_render.join().unwrap_or_default(),
        follower_render.join().unwrap_or_default(),
    );
    log::info!(
        "Cluster stopped at {}; {} controller and {} follower frames sent",
        controller.timecode(),
        sent.0,
        sent.1
    );
    log::info!(
        "Controller stage brightness {:?}, follower {:?}; cues fired {} / {}",
        controller_stage.value("Brightness"),
        follower_stage.value("Brightness"),
        controller_stage.fired_events().len(),
        follower_stage.fired_events().len()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level(log::LevelFilter::Info);
    log::info!("Starting stream node demo");

    if let Err(e) = run() {
        log::error!("Stream node failed: {e}");
        return Err(e.into());
    }
    log::info!("Stream node finished");
    Ok(())
}
