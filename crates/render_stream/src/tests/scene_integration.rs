//! Scene selection and parameter application driven through full ticks

use std::sync::Arc;

use super::{serve_schema, start_node};
use crate::config::{RenderStreamSettings, SceneSelectorKind};
use crate::link::loopback::SceneValues;
use crate::link::{FrameData, LinkError, LoopbackLink};
use crate::scene::{describe_parameters, validate_parameters, PropertyKind, PropertyValue, ScriptActor, World};
use crate::schema::{RemoteParameters, Schema};
use crate::sync::SyncOutcome;

fn frame(t_tracked: f64, scene: u32) -> FrameData {
    FrameData {
        t_tracked,
        frame_rate_numerator: 60,
        frame_rate_denominator: 1,
        scene,
        ..FrameData::default()
    }
}

#[test]
fn test_streaming_level_loads_before_apply() {
    let base = ScriptActor::new("Persistent").with_property("Brightness", PropertyKind::Float);
    let wing = ScriptActor::new("Wing").with_property("Open", PropertyKind::Bool);

    let mut world = World::new("/Game/Maps/Venue");
    let base_id = world.spawn_actor(Box::new(base.clone()));
    world.set_persistent_root(base_id);
    world.add_streaming_level("/Game/Maps/Venue_Levels/Base");
    world.add_streaming_level("/Game/Maps/Venue_Levels/Wing");
    let wing_id = world.spawn_actor(Box::new(wing.clone()));
    world.set_level_root("Wing", wing_id);

    let mut base_scene = RemoteParameters::new("Base");
    base_scene.parameters = describe_parameters(&world, &[base_id]);
    let mut wing_scene = RemoteParameters::new("Wing");
    wing_scene.parameters = describe_parameters(&world, &[base_id, wing_id]);
    let mut schema = Schema {
        scenes: vec![base_scene, wing_scene],
        ..Schema::default()
    };

    let link = Arc::new(LoopbackLink::new());
    serve_schema(&link, &mut schema);
    link.set_scene_values(
        schema.scenes[1].hash,
        SceneValues {
            floats: vec![0.75, 1.0],
            ..SceneValues::default()
        },
    );

    let settings = RenderStreamSettings::default().with_scene_selector(SceneSelectorKind::StreamingLevels);
    let mut node = start_node(&link, settings);
    assert!(node.load_schemas(&world));

    // First tick only asks for the level.
    link.push_frame(frame(1.0, 1));
    assert_eq!(node.begin_frame(&mut world).unwrap(), SyncOutcome::Applied);
    assert!(world.find_streaming_level("Wing").unwrap().is_load_requested());
    assert_eq!(wing.value("Open"), None);
    assert_eq!(base.value("Brightness"), None);

    assert_eq!(world.complete_pending_loads(), 1);

    link.push_frame(frame(1.02, 1));
    node.begin_frame(&mut world).unwrap();
    assert!(world.find_streaming_level("Wing").unwrap().is_visible());
    assert!(!world.find_streaming_level("Base").unwrap().is_visible());
    assert_eq!(base.value("Brightness"), Some(PropertyValue::Float(0.75)));
    assert_eq!(wing.value("Open"), Some(PropertyValue::Bool(true)));
}

#[test]
fn test_fallback_is_idempotent() {
    let link = Arc::new(LoopbackLink::new());
    link.fail_schema_load(LinkError::NotFound);
    let mut node = start_node(&link, RenderStreamSettings::default());
    let world = World::new("Stage");

    assert!(!node.load_schemas(&world));
    let first = node.selector().schema().clone();
    assert!(!node.load_schemas(&world));

    assert_eq!(node.selector().schema(), &first);
    let published = link.published_schemas();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].scenes[0].hash, published[1].scenes[0].hash);
}

#[test]
fn test_events_fire_on_rising_values() {
    let actor = ScriptActor::new("Stage").with_property("Cue", PropertyKind::Event);
    let mut world = World::new("Stage");
    let root = world.spawn_actor(Box::new(actor.clone()));
    world.set_persistent_root(root);

    let mut scene = RemoteParameters::new("Default");
    scene.parameters = describe_parameters(&world, &[root]);
    let mut schema = Schema {
        scenes: vec![scene],
        ..Schema::default()
    };
    let link = Arc::new(LoopbackLink::new());
    serve_schema(&link, &mut schema);

    let mut node = start_node(&link, RenderStreamSettings::default());
    assert!(node.load_schemas(&world));

    let mut fired_at = Vec::new();
    for (index, value) in (0u32..).zip([0.0, 0.0, 5.0, 5.0, 2.0, 2.0, 9.0]) {
        link.set_scene_values(
            schema.scenes[0].hash,
            SceneValues {
                floats: vec![value],
                ..SceneValues::default()
            },
        );
        let before = actor.fired_events().len();
        link.push_frame(frame(f64::from(index) / 60.0, 0));
        node.begin_frame(&mut world).unwrap();
        if actor.fired_events().len() > before {
            fired_at.push(index);
        }
    }

    assert_eq!(fired_at, vec![2, 6]);
    assert_eq!(actor.fired_events(), vec!["Cue", "Cue"]);
}

#[test]
fn test_described_scene_always_validates() {
    let actor = ScriptActor::new("Everything")
        .with_property("Flag", PropertyKind::Bool)
        .with_property("Level", PropertyKind::Byte)
        .with_property("Count", PropertyKind::Int)
        .with_property("Gain", PropertyKind::Float)
        .with_property("Precise", PropertyKind::Double)
        .with_property("Offset", PropertyKind::Vector)
        .with_property("Tint", PropertyKind::Color)
        .with_property("Glow", PropertyKind::LinearColor)
        .with_property("Turn", PropertyKind::Rotator)
        .with_property("Anchor", PropertyKind::Transform)
        .with_property("Mount", PropertyKind::Pose)
        .with_property("Screen", PropertyKind::Image)
        .with_property("Caption", PropertyKind::Text)
        .with_property("Performer", PropertyKind::Skeleton)
        .with_property("Cue", PropertyKind::Event);
    let mut world = World::new("Stage");
    let root = world.spawn_actor(Box::new(actor));
    let other = world.spawn_actor(Box::new(ScriptActor::new("Other").with_property("Gain", PropertyKind::Float)));

    let mut scene = RemoteParameters::new("Default");
    scene.parameters = describe_parameters(&world, &[root, other]);
    assert_eq!(scene.parameters.len(), 26);
    assert!(validate_parameters(&scene, &world, &[root, other]));

    // Actor order is part of the contract.
    assert!(!validate_parameters(&scene, &world, &[other, root]));
}

#[test]
fn test_unknown_scene_id_is_skipped() {
    let mut world = World::new("/Game/Maps/Base");
    let mut schema = Schema {
        scenes: vec![RemoteParameters::new("Base")],
        ..Schema::default()
    };
    let link = Arc::new(LoopbackLink::new());
    serve_schema(&link, &mut schema);

    let settings = RenderStreamSettings::default().with_scene_selector(SceneSelectorKind::Maps);
    let mut node = start_node(&link, settings);
    assert!(node.load_schemas(&world));

    link.push_frame(frame(1.0, 4));
    assert_eq!(node.begin_frame(&mut world).unwrap(), SyncOutcome::Applied);
    assert_eq!(world.pending_map(), None);
}
