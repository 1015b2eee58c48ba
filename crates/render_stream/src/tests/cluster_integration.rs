//! Controller and follower nodes stepping in lockstep

use std::sync::Arc;

use approx::assert_relative_eq;

use super::{serve_schema, start_node};
use crate::config::{ClusterRole, RenderStreamSettings};
use crate::link::loopback::SceneValues;
use crate::link::{CameraData, FrameData, LinkError, LoopbackLink, PixelFormat, StreamDescription};
use crate::scene::{describe_parameters, PropertyKind, PropertyValue, ScriptActor, World};
use crate::schema::{RemoteParameters, Schema};
use crate::submission::RenderSubmitter;
use crate::sync::SyncOutcome;

fn frame(t_tracked: f64) -> FrameData {
    FrameData {
        t_tracked,
        local_time: t_tracked,
        frame_rate_numerator: 50,
        frame_rate_denominator: 1,
        ..FrameData::default()
    }
}

fn stage() -> (World, ScriptActor) {
    let actor = ScriptActor::new("Stage")
        .with_property("Speed", PropertyKind::Float)
        .with_property("Offset", PropertyKind::Vector);
    let mut world = World::new("Stage");
    let root = world.spawn_actor(Box::new(actor.clone()));
    world.set_persistent_root(root);
    (world, actor)
}

/// Both links serve the same schema and values, as a real controller would
fn cluster_links(world: &World) -> (Arc<LoopbackLink>, Arc<LoopbackLink>) {
    let mut scene = RemoteParameters::new("Default");
    scene.parameters = describe_parameters(world, &world.all_level_roots());
    let mut schema = Schema {
        scenes: vec![scene],
        ..Schema::default()
    };

    let links = (Arc::new(LoopbackLink::new()), Arc::new(LoopbackLink::new()));
    for link in [&links.0, &links.1] {
        serve_schema(link, &mut schema);
        link.set_scene_values(
            schema.scenes[0].hash,
            SceneValues {
                floats: vec![2.5, 1.0, 2.0, 3.0],
                ..SceneValues::default()
            },
        );
    }
    links
}

#[test]
fn test_follower_matches_controller() {
    let (mut controller_world, controller_actor) = stage();
    let (mut follower_world, follower_actor) = stage();
    let (controller_link, follower_link) = cluster_links(&controller_world);

    let mut controller = start_node(&controller_link, RenderStreamSettings::default());
    let mut follower = start_node(
        &follower_link,
        RenderStreamSettings::default().with_cluster_role(ClusterRole::Follower),
    );
    assert!(controller.load_schemas(&controller_world));
    assert!(follower.load_schemas(&follower_world));

    for t in [10.0, 10.02, 10.04] {
        controller_link.push_frame(frame(t));
        assert_eq!(controller.begin_frame(&mut controller_world).unwrap(), SyncOutcome::Applied);
        let payload = controller.cluster_payload().unwrap();
        assert_eq!(
            follower.receive_cluster_payload(&payload, &mut follower_world).unwrap(),
            SyncOutcome::Applied
        );

        assert_eq!(follower.sync().frame_data(), controller.sync().frame_data());
        assert_eq!(follower.clock().fixed_delta(), controller.clock().fixed_delta());
        assert_eq!(follower.timecode(), controller.timecode());
    }

    assert_eq!(follower_link.follower_frames(), vec![10.0, 10.02, 10.04]);
    assert!(follower_link.is_follower());
    for actor in [&controller_actor, &follower_actor] {
        assert_eq!(actor.value("Speed"), Some(PropertyValue::Float(2.5)));
    }
    assert_eq!(follower_actor.value("Offset"), controller_actor.value("Offset"));
}

#[test]
fn test_delta_follows_tracked_time() {
    let link = Arc::new(LoopbackLink::new());
    let mut node = start_node(&link, RenderStreamSettings::default());
    let mut world = World::new("Stage");

    let mut deltas = Vec::new();
    for t in [5.0, 5.04, 5.1, 5.1, 5.0] {
        link.push_frame(frame(t));
        node.begin_frame(&mut world).unwrap();
        deltas.push(node.clock().fixed_delta().unwrap_or_default());
    }

    // First frame and non-advancing frames fall back to the nominal rate.
    let expected = [0.02, 0.04, 0.06, 0.02, 0.02];
    for (delta, expected) in deltas.iter().zip(expected) {
        assert_relative_eq!(*delta, expected, epsilon = 1e-9);
    }
}

#[test]
fn test_stream_change_reaches_follower() {
    let controller_link = Arc::new(LoopbackLink::new());
    let follower_link = Arc::new(LoopbackLink::new());
    let streams = vec![StreamDescription {
        handle: 3,
        channel: "main".to_string(),
        name: "Main".to_string(),
        width: 64,
        height: 32,
        format: PixelFormat::Rgba8,
        ..StreamDescription::default()
    }];
    controller_link.set_streams(streams.clone());
    follower_link.set_streams(streams);

    let mut controller = start_node(&controller_link, RenderStreamSettings::default());
    let mut follower = start_node(
        &follower_link,
        RenderStreamSettings::default().with_cluster_role(ClusterRole::Follower),
    );
    let mut world = World::new("Stage");

    controller_link.push_await_outcome(Err(LinkError::StreamsChanged));
    controller_link.push_frame(frame(1.0));
    assert_eq!(controller.begin_frame(&mut world).unwrap(), SyncOutcome::Applied);
    assert_eq!(controller.streams().stream_count(), 1);

    let payload = controller.cluster_payload().unwrap();
    assert!(!controller.sync().streams_changed());
    follower.receive_cluster_payload(&payload, &mut world).unwrap();
    assert_eq!(follower.streams().stream_count(), 1);

    // The edge is sent once; the next payload does not repopulate again.
    controller_link.push_frame(frame(1.02));
    controller.begin_frame(&mut world).unwrap();
    let payload = controller.cluster_payload().unwrap();
    follower.receive_cluster_payload(&payload, &mut world).unwrap();
    assert!(!follower.sync().streams_changed());
}

#[test]
fn test_cluster_quit_handshake() {
    let controller_link = Arc::new(LoopbackLink::new());
    let follower_link = Arc::new(LoopbackLink::new());
    let mut controller = start_node(&controller_link, RenderStreamSettings::default());
    let mut follower = start_node(
        &follower_link,
        RenderStreamSettings::default().with_cluster_role(ClusterRole::Follower),
    );
    let mut controller_world = World::new("Stage");
    let mut follower_world = World::new("Stage");

    controller_link.push_await_outcome(Err(LinkError::Quit));
    assert_eq!(
        controller.begin_frame(&mut controller_world).unwrap(),
        SyncOutcome::QuitPending
    );
    let payload = controller.cluster_payload().unwrap();

    follower_link.push_follower_outcome(Ok(()));
    follower_link.push_follower_outcome(Err(LinkError::Quit));
    assert_eq!(
        follower.receive_cluster_payload(&payload, &mut follower_world).unwrap(),
        SyncOutcome::Exited
    );
    assert!(follower.exit_requested());
    assert_eq!(follower_link.follower_frames().len(), 2);

    assert_eq!(controller.begin_frame(&mut controller_world).unwrap(), SyncOutcome::Exited);
    assert!(controller.exit_requested());
}

#[test]
fn test_render_thread_consumes_one_response_per_frame() {
    let link = Arc::new(LoopbackLink::new());
    link.set_streams(vec![StreamDescription {
        handle: 9,
        channel: "main".to_string(),
        name: "Main".to_string(),
        width: 64,
        height: 32,
        format: PixelFormat::Rgba8,
        ..StreamDescription::default()
    }]);
    let mut node = start_node(&link, RenderStreamSettings::default().with_viewport("Main", 64, 32));
    node.populate_streams();
    let submitter: RenderSubmitter = node.submitter();
    let mut world = World::new("Stage");

    for t in 0..5 {
        let t = f64::from(t) * 0.02;
        link.set_camera(
            9,
            CameraData {
                camera_handle: 1,
                focal_length: 18.0,
                sensor_x: 36.0,
                sensor_y: 24.0,
                near_z: 0.1,
                far_z: 100.0,
                ..CameraData::default()
            },
        );
        link.push_frame(frame(t));
        node.begin_frame(&mut world).unwrap();

        let submissions = node.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].responses.len(), 1);
        let submitted = submitter.submit(&submissions[0]);
        assert_eq!(submitted.response.map(|response| response.t_tracked), Some(t));
        assert_eq!(submissions[0].responses.len(), 0);
        node.end_frame();
    }

    // A render with nothing queued neither underflows nor sends.
    let submissions = node.submissions();
    assert!(submitter.submit(&submissions[0]).response.is_none());
    assert_eq!(link.sent_frames().len(), 5);
}
