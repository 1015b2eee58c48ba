//! Registry of output streams
//!
//! Streams are discovered from the link and kept in a free pool. A viewport
//! checks a stream out with [`StreamRegistry::allocate_for`] and hands it back
//! with [`StreamRegistry::return_for`]; the registry keeps ownership of the
//! record and its backing resources throughout.

mod resources;

pub use resources::{HostResourceAllocator, ResourceAllocator, ResourceError, StreamTarget};

use std::collections::HashMap;

use crate::link::{
    fetch_sized, Link, LinkError, PixelFormat, ProjectionClipping, StreamDescription, StreamHandle,
};

/// `(channel, name)` pair announced to listeners when streams change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Channel the stream is bound to
    pub channel: String,
    /// Stream name
    pub name: String,
}

/// One registered output stream
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStream {
    name: String,
    channel: String,
    handle: StreamHandle,
    width: u32,
    height: u32,
    format: PixelFormat,
    clipping: ProjectionClipping,
    target: StreamTarget,
}

impl FrameStream {
    /// Stream name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel the stream's camera is bound to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Link handle
    pub const fn handle(&self) -> StreamHandle {
        self.handle
    }

    /// `(width, height)` in pixels
    pub const fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel format
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Frustum sub-region
    pub const fn clipping(&self) -> ProjectionClipping {
        self.clipping
    }

    /// Backing render target
    pub const fn target(&self) -> &StreamTarget {
        &self.target
    }
}

/// Outcome of repopulating the registry from the link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Every stream the link reported, in link order
    pub streams: Vec<StreamInfo>,
    /// Streams whose backing resources could not be allocated
    pub failed: Vec<String>,
    /// Existing streams the link now reports at a different resolution
    pub resolution_mismatches: Vec<String>,
}

impl PopulateReport {
    /// Whether every stream was registered cleanly
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.resolution_mismatches.is_empty()
    }
}

/// Owner of all stream records
pub struct StreamRegistry {
    pool: Vec<FrameStream>,
    allocated: HashMap<String, FrameStream>,
    allocator: Box<dyn ResourceAllocator>,
}

impl StreamRegistry {
    /// Create an empty registry backed by the given allocator
    pub fn new(allocator: Box<dyn ResourceAllocator>) -> Self {
        Self {
            pool: Vec::new(),
            allocated: HashMap::new(),
            allocator,
        }
    }

    /// Register a stream and allocate its backing resources
    ///
    /// On allocation failure nothing is registered.
    pub fn add_stream(&mut self, description: &StreamDescription) -> Result<(), ResourceError> {
        if self.get_stream(&description.name).is_some() {
            log::warn!("Stream '{}' is already registered", description.name);
            return Ok(());
        }
        let target = self.allocator.allocate(
            &description.name,
            description.width,
            description.height,
            description.format,
        )?;
        log::info!(
            "Registered stream '{}' ({}x{} {:?}) on channel '{}'",
            description.name,
            description.width,
            description.height,
            description.format,
            description.channel
        );
        self.pool.push(FrameStream {
            name: description.name.clone(),
            channel: description.channel.clone(),
            handle: description.handle,
            width: description.width,
            height: description.height,
            format: description.format,
            clipping: description.clipping,
            target,
        });
        Ok(())
    }

    /// Look up a stream by name, case-insensitively, whether pooled or allocated
    pub fn get_stream(&self, name: &str) -> Option<&FrameStream> {
        self.pool
            .iter()
            .chain(self.allocated.values())
            .find(|stream| stream.name.eq_ignore_ascii_case(name))
    }

    fn get_stream_mut(&mut self, name: &str) -> Option<&mut FrameStream> {
        self.pool
            .iter_mut()
            .chain(self.allocated.values_mut())
            .find(|stream| stream.name.eq_ignore_ascii_case(name))
    }

    /// Check a pooled stream out for exclusive use by `owner`
    ///
    /// Returns `None` if `owner` already holds a stream or `name` is not in
    /// the free pool.
    pub fn allocate_for(&mut self, name: &str, owner: &str) -> Option<&FrameStream> {
        if self.allocated.contains_key(owner) {
            return None;
        }
        let index = self
            .pool
            .iter()
            .position(|stream| stream.name.eq_ignore_ascii_case(name))?;
        let stream = self.pool.swap_remove(index);
        log::debug!("Stream '{}' allocated to '{owner}'", stream.name);
        Some(self.allocated.entry(owner.to_string()).or_insert(stream))
    }

    /// Release whatever `owner` holds back to the pool
    pub fn return_for(&mut self, owner: &str) {
        if let Some(stream) = self.allocated.remove(owner) {
            log::debug!("Stream '{}' returned by '{owner}'", stream.name);
            self.pool.push(stream);
        }
    }

    /// Streams in the free pool
    pub fn pool_count(&self) -> usize {
        self.pool.len()
    }

    /// All registered streams
    pub fn stream_count(&self) -> usize {
        self.pool.len() + self.allocated.len()
    }

    /// All registered streams, pooled first
    pub fn streams(&self) -> impl Iterator<Item = &FrameStream> {
        self.pool.iter().chain(self.allocated.values())
    }

    /// Re-read stream descriptions from the link and reconcile the registry
    ///
    /// Existing streams are reconfigured in place; a resolution change is
    /// reported and leaves the stream's resources untouched. New streams are
    /// added, and allocation failures are reported rather than returned.
    pub fn populate(&mut self, link: &dyn Link, max_attempts: u32) -> Result<PopulateReport, LinkError> {
        let descriptions = fetch_sized("streams", max_attempts, |out| link.get_streams(out))?;
        let mut report = PopulateReport::default();

        for description in &descriptions {
            report.streams.push(StreamInfo {
                channel: description.channel.clone(),
                name: description.name.clone(),
            });

            if let Some(stream) = self.get_stream_mut(&description.name) {
                if stream.resolution() != (description.width, description.height) {
                    log::error!(
                        "Stream '{}' changed resolution from {:?} to {}x{}; keeping existing resources",
                        description.name,
                        stream.resolution(),
                        description.width,
                        description.height
                    );
                    report.resolution_mismatches.push(description.name.clone());
                    continue;
                }
                stream.handle = description.handle;
                stream.channel.clone_from(&description.channel);
                stream.clipping = description.clipping;
                log::debug!("Stream '{}' reconfigured", description.name);
            } else if let Err(err) = self.add_stream(description) {
                log::error!("Failed to create stream '{}': {err}", description.name);
                report.failed.push(description.name.clone());
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LoopbackLink;

    fn description(name: &str, handle: StreamHandle, width: u32, height: u32) -> StreamDescription {
        StreamDescription {
            handle,
            channel: "main".to_string(),
            name: name.to_string(),
            width,
            height,
            format: PixelFormat::Rgba8,
            ..StreamDescription::default()
        }
    }

    fn registry() -> StreamRegistry {
        StreamRegistry::new(Box::new(HostResourceAllocator))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = registry();
        registry.add_stream(&description("Left", 1, 64, 32)).unwrap();

        assert_eq!(registry.get_stream("LEFT").map(FrameStream::handle), Some(1));
        assert!(registry.get_stream("Right").is_none());
    }

    #[test]
    fn test_add_fails_on_allocation_failure() {
        let mut registry = registry();
        let mut bad = description("Broken", 2, 64, 32);
        bad.format = PixelFormat::Invalid;

        assert!(registry.add_stream(&bad).is_err());
        assert_eq!(registry.stream_count(), 0);
    }

    #[test]
    fn test_allocation_is_exclusive() {
        let mut registry = registry();
        registry.add_stream(&description("Left", 1, 64, 32)).unwrap();
        registry.add_stream(&description("Right", 2, 64, 32)).unwrap();

        assert!(registry.allocate_for("Left", "viewport_a").is_some());
        assert!(registry.allocate_for("Left", "viewport_b").is_none());
        assert!(registry.allocate_for("Right", "viewport_a").is_none());
        assert_eq!(registry.pool_count(), 1);
        assert_eq!(registry.stream_count(), 2);

        registry.return_for("viewport_a");
        registry.return_for("viewport_a");
        assert_eq!(registry.pool_count(), 2);
        assert!(registry.allocate_for("Left", "viewport_b").is_some());
    }

    #[test]
    fn test_populate_adds_and_reconfigures() {
        let link = LoopbackLink::new();
        link.set_streams(vec![description("Left", 1, 64, 32)]);
        let mut registry = registry();

        let report = registry.populate(&link, 3).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.streams.len(), 1);

        let mut moved = description("left", 9, 64, 32);
        moved.channel = "alt".to_string();
        link.set_streams(vec![moved, description("Right", 2, 64, 32)]);
        let report = registry.populate(&link, 3).unwrap();

        assert!(report.is_clean());
        assert_eq!(registry.stream_count(), 2);
        let left = registry.get_stream("Left").unwrap();
        assert_eq!(left.handle(), 9);
        assert_eq!(left.channel(), "alt");
    }

    #[test]
    fn test_populate_reports_resolution_change() {
        let link = LoopbackLink::new();
        link.set_streams(vec![description("Left", 1, 64, 32)]);
        let mut registry = registry();
        registry.populate(&link, 3).unwrap();

        link.set_streams(vec![description("Left", 1, 128, 32)]);
        let report = registry.populate(&link, 3).unwrap();

        assert_eq!(report.resolution_mismatches, vec!["Left".to_string()]);
        assert_eq!(registry.get_stream("Left").unwrap().resolution(), (64, 32));
    }

    #[test]
    fn test_populate_reports_allocation_failure() {
        let link = LoopbackLink::new();
        link.set_streams(vec![description("Empty", 1, 0, 0)]);
        let mut registry = registry();

        let report = registry.populate(&link, 3).unwrap();
        assert_eq!(report.failed, vec!["Empty".to_string()]);
        assert_eq!(registry.stream_count(), 0);
    }
}
