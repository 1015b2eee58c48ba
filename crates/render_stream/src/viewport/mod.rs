//! Viewports and camera channels
//!
//! Viewports and channels are owned here and refer to each other, and to
//! streams, only by id. A viewport publishes through the stream that carries
//! its id; the stream's channel picks the camera template the viewport uses.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::camera::{CameraResponseQueue, VirtualCamera};
use crate::config::{CameraTemplateConfig, ChannelConfig, ViewportConfig};
use crate::link::{ProjectionClipping, StreamHandle};
use crate::streams::StreamRegistry;

/// Camera templates keyed by channel name
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    templates: HashMap<String, CameraTemplateConfig>,
}

impl ChannelTable {
    /// Build from configured channels
    pub fn from_config(channels: &[ChannelConfig]) -> Self {
        Self {
            templates: channels
                .iter()
                .map(|channel| (channel.name.clone(), channel.camera))
                .collect(),
        }
    }

    /// Add or replace a channel
    pub fn insert(&mut self, name: impl Into<String>, template: CameraTemplateConfig) {
        self.templates.insert(name.into(), template);
    }

    /// Template for a channel
    pub fn template(&self, channel: &str) -> Option<&CameraTemplateConfig> {
        self.templates.get(channel)
    }

    /// Channel names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }
}

/// One capture region published as a stream
#[derive(Debug)]
pub struct Viewport {
    config: ViewportConfig,
    channel: Option<String>,
    camera: Option<VirtualCamera>,
    valid: bool,
    responses: Arc<CameraResponseQueue>,
}

impl Viewport {
    /// Create from configuration; the viewport stays invalid until configured
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            config,
            camera: None,
            valid: false,
            responses: Arc::new(CameraResponseQueue::new()),
        }
    }

    /// Viewport id
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// `(width, height)` of the capture region
    pub const fn resolution(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Bound channel
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Whether the viewport matched its stream and may be rendered
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// The viewport's camera
    pub const fn camera(&self) -> Option<&VirtualCamera> {
        self.camera.as_ref()
    }

    /// Shared response queue, cloned for the render-submission thread
    pub fn responses(&self) -> Arc<CameraResponseQueue> {
        Arc::clone(&self.responses)
    }

    /// Camera and response queue, borrowed together for camera application
    pub fn camera_and_responses(&mut self) -> (Option<&mut VirtualCamera>, &CameraResponseQueue) {
        (self.camera.as_mut(), &self.responses)
    }

    fn bind_channel(&mut self, channel: &str, channels: &ChannelTable) {
        if self.channel.as_deref() == Some(channel) && self.camera.is_some() {
            return;
        }
        self.camera = Some(
            channels
                .template(channel)
                .map_or_else(VirtualCamera::default, VirtualCamera::from_template),
        );
        self.channel = Some(channel.to_string());
    }
}

/// Everything the render-submission thread needs for one viewport
#[derive(Debug, Clone)]
pub struct ViewportSubmission {
    /// Viewport id
    pub viewport: String,
    /// Stream the frame is published on
    pub stream: StreamHandle,
    /// Stream's frustum sub-region
    pub clipping: ProjectionClipping,
    /// Camera snapshot for the projection
    pub camera: VirtualCamera,
    /// The viewport's response queue
    pub responses: Arc<CameraResponseQueue>,
}

/// Owned table of viewports keyed by id
#[derive(Debug, Default)]
pub struct ViewportTable {
    viewports: BTreeMap<String, Viewport>,
}

impl ViewportTable {
    /// Build from configured viewports
    pub fn from_config(viewports: &[ViewportConfig]) -> Self {
        let mut table = Self::default();
        for config in viewports {
            table.insert(config.clone());
        }
        table
    }

    /// Add or replace a viewport
    pub fn insert(&mut self, config: ViewportConfig) {
        self.viewports.insert(config.id.to_ascii_lowercase(), Viewport::new(config));
    }

    /// Viewport by id, case-insensitively
    pub fn get(&self, id: &str) -> Option<&Viewport> {
        self.viewports.get(&id.to_ascii_lowercase())
    }

    /// Viewports in id order
    pub fn iter(&self) -> impl Iterator<Item = &Viewport> {
        self.viewports.values()
    }

    /// Viewports in id order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Viewport> {
        self.viewports.values_mut()
    }

    /// Number of viewports
    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    /// Whether there are no viewports
    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    /// Match every viewport against its stream
    ///
    /// A viewport without a stream, or whose stream reports a different
    /// resolution than the viewport's capture region, is flagged invalid and
    /// its camera binding is left unchanged. Returns the number of valid
    /// viewports.
    pub fn configure_capture(&mut self, streams: &StreamRegistry, channels: &ChannelTable) -> usize {
        let mut valid = 0;
        for viewport in self.viewports.values_mut() {
            let Some(stream) = streams.get_stream(viewport.id()) else {
                log::debug!("Viewport '{}' has no stream", viewport.id());
                viewport.valid = false;
                continue;
            };
            if stream.resolution() != viewport.resolution() {
                log::error!(
                    "Viewport '{}' expects {:?} but stream reports {:?}; viewport disabled",
                    viewport.id(),
                    viewport.resolution(),
                    stream.resolution()
                );
                viewport.valid = false;
                continue;
            }
            viewport.bind_channel(stream.channel(), channels);
            viewport.valid = true;
            valid += 1;
        }
        valid
    }

    /// Snapshot of every valid viewport for the render-submission thread
    pub fn submissions(&self, streams: &StreamRegistry) -> Vec<ViewportSubmission> {
        self.viewports
            .values()
            .filter(|viewport| viewport.valid)
            .filter_map(|viewport| {
                let stream = streams.get_stream(viewport.id())?;
                Some(ViewportSubmission {
                    viewport: viewport.id().to_string(),
                    stream: stream.handle(),
                    clipping: stream.clipping(),
                    camera: viewport.camera.clone().unwrap_or_default(),
                    responses: viewport.responses(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{PixelFormat, StreamDescription};
    use crate::streams::HostResourceAllocator;

    fn viewport(id: &str, width: u32, height: u32) -> ViewportConfig {
        ViewportConfig {
            id: id.to_string(),
            width,
            height,
            ..ViewportConfig::default()
        }
    }

    fn registry(streams: &[(&str, &str, u32, u32)]) -> StreamRegistry {
        let mut registry = StreamRegistry::new(Box::new(HostResourceAllocator));
        for (index, (name, channel, width, height)) in streams.iter().enumerate() {
            registry
                .add_stream(&StreamDescription {
                    handle: index as u64 + 1,
                    channel: (*channel).to_string(),
                    name: (*name).to_string(),
                    width: *width,
                    height: *height,
                    format: PixelFormat::Rgba8,
                    ..StreamDescription::default()
                })
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_resolution_mismatch_invalidates_viewport() {
        let mut table = ViewportTable::from_config(&[viewport("Left", 64, 32), viewport("Right", 64, 32)]);
        let streams = registry(&[("Left", "main", 64, 32), ("Right", "main", 128, 32)]);

        assert_eq!(table.configure_capture(&streams, &ChannelTable::default()), 1);
        assert!(table.get("left").unwrap().is_valid());
        assert!(!table.get("Right").unwrap().is_valid());
        assert_eq!(table.submissions(&streams).len(), 1);
    }

    #[test]
    fn test_channel_template_selects_camera() {
        let mut channels = ChannelTable::default();
        channels.insert(
            "cine",
            CameraTemplateConfig::Cine {
                sensor_width: 36.0,
                sensor_height: 24.0,
                focal_length: 35.0,
            },
        );
        let mut table = ViewportTable::from_config(&[viewport("Left", 64, 32)]);
        let streams = registry(&[("Left", "cine", 64, 32)]);

        table.configure_capture(&streams, &channels);

        let left = table.get("Left").unwrap();
        assert_eq!(left.channel(), Some("cine"));
        assert!(left.camera().unwrap().supports_cine());
    }

    #[test]
    fn test_missing_stream_leaves_viewport_invalid() {
        let mut table = ViewportTable::from_config(&[viewport("Solo", 64, 32)]);
        let streams = registry(&[]);

        assert_eq!(table.configure_capture(&streams, &ChannelTable::default()), 0);
        assert!(table.submissions(&streams).is_empty());
    }
}
