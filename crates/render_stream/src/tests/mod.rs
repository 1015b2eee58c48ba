//! Whole-module scenarios spanning the link, sync and scene layers

mod cluster_integration;
mod scene_integration;

use std::sync::Arc;

use crate::config::RenderStreamSettings;
use crate::link::{Link, LoopbackLink};
use crate::schema::Schema;
use crate::skeleton::PoseStore;
use crate::streams::HostResourceAllocator;
use crate::RenderStreamModule;

/// Start a module on a loopback link
fn start_node(link: &Arc<LoopbackLink>, settings: RenderStreamSettings) -> RenderStreamModule {
    let shared: Arc<dyn Link> = link.clone();
    RenderStreamModule::startup(
        shared,
        settings,
        Box::new(HostResourceAllocator),
        Box::new(PoseStore::new()),
    )
    .unwrap()
}

/// Assign scene hashes through the link and serve the schema from it
fn serve_schema(link: &LoopbackLink, schema: &mut Schema) {
    link.set_schema(schema).unwrap();
    link.set_schema_blob(schema.to_bytes().unwrap());
}
