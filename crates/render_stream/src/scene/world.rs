//! Host-side scene graph seen by the scene selector
//!
//! A [`World`] is one loaded map: a persistent level with an optional root
//! actor, plus streaming sub-levels that load asynchronously and toggle
//! visibility. Actors live in a slot map arena and every cross-reference is
//! an [`ActorId`].

use slotmap::{new_key_type, SlotMap};

use super::property::ParameterActor;

new_key_type! {
    /// Stable handle of an actor in a [`World`]
    pub struct ActorId;
}

/// Short name of a level package: the last path segment, without an object suffix
pub fn short_level_name(package_name: &str) -> &str {
    let last = package_name.rsplit('/').next().unwrap_or(package_name);
    last.split('.').next().unwrap_or(last)
}

/// A streaming sub-level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingLevel {
    package_name: String,
    loaded: bool,
    visible: bool,
    load_requested: bool,
    root: Option<ActorId>,
}

impl StreamingLevel {
    /// Full package name
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Short name used to match scene names
    pub fn short_name(&self) -> &str {
        short_level_name(&self.package_name)
    }

    /// Whether the level has finished loading
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the level is shown
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether an asynchronous load is in flight
    pub const fn is_load_requested(&self) -> bool {
        self.load_requested
    }

    /// Level script actor, once loaded
    pub const fn root(&self) -> Option<ActorId> {
        self.root
    }
}

/// One loaded map with its actors and streaming sub-levels
pub struct World {
    map_name: String,
    actors: SlotMap<ActorId, Box<dyn ParameterActor>>,
    persistent_root: Option<ActorId>,
    streaming_levels: Vec<StreamingLevel>,
    pending_map: Option<String>,
}

impl World {
    /// Create an empty world for a map
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: map_name.into(),
            actors: SlotMap::with_key(),
            persistent_root: None,
            streaming_levels: Vec::new(),
            pending_map: None,
        }
    }

    /// Name of the loaded map
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Add an actor to the arena
    pub fn spawn_actor(&mut self, actor: Box<dyn ParameterActor>) -> ActorId {
        let id = self.actors.insert(actor);
        log::trace!("Spawned actor {:?}", id);
        id
    }

    /// Actor by id
    pub fn actor(&self, id: ActorId) -> Option<&dyn ParameterActor> {
        self.actors.get(id).map(AsRef::as_ref)
    }

    /// Mutable actor by id
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut (dyn ParameterActor + 'static)> {
        self.actors.get_mut(id).map(AsMut::as_mut)
    }

    /// Set the persistent level's script actor
    pub fn set_persistent_root(&mut self, id: ActorId) {
        self.persistent_root = Some(id);
    }

    /// Persistent level's script actor
    pub const fn persistent_root(&self) -> Option<ActorId> {
        self.persistent_root
    }

    /// Register an unloaded, hidden streaming sub-level
    pub fn add_streaming_level(&mut self, package_name: impl Into<String>) {
        self.streaming_levels.push(StreamingLevel {
            package_name: package_name.into(),
            loaded: false,
            visible: false,
            load_requested: false,
            root: None,
        });
    }

    /// Streaming sub-levels in registration order
    pub fn streaming_levels(&self) -> &[StreamingLevel] {
        &self.streaming_levels
    }

    /// Streaming sub-level by short name, case-insensitive
    pub fn find_streaming_level(&self, name: &str) -> Option<&StreamingLevel> {
        let name = short_level_name(name);
        self.streaming_levels
            .iter()
            .find(|level| level.short_name().eq_ignore_ascii_case(name))
    }

    fn find_streaming_level_mut(&mut self, name: &str) -> Option<&mut StreamingLevel> {
        let name = short_level_name(name);
        self.streaming_levels
            .iter_mut()
            .find(|level| level.short_name().eq_ignore_ascii_case(name))
    }

    /// Set the script actor a sub-level provides once loaded
    ///
    /// Returns false when no sub-level has that name.
    pub fn set_level_root(&mut self, name: &str, id: ActorId) -> bool {
        self.find_streaming_level_mut(name).map_or(false, |level| {
            level.root = Some(id);
            true
        })
    }

    /// Request an asynchronous load of a sub-level
    ///
    /// Returns false when no sub-level has that name.
    pub fn load_stream_level(&mut self, name: &str) -> bool {
        match self.find_streaming_level_mut(name) {
            Some(level) => {
                if !level.loaded && !level.load_requested {
                    log::info!("Loading streaming level '{}'", level.package_name);
                    level.load_requested = true;
                }
                true
            }
            None => false,
        }
    }

    /// Complete the load of one sub-level
    pub fn finish_level_load(&mut self, name: &str) -> bool {
        self.find_streaming_level_mut(name).map_or(false, |level| {
            level.loaded = true;
            level.load_requested = false;
            true
        })
    }

    /// Complete every requested sub-level load, returning how many finished
    pub fn complete_pending_loads(&mut self) -> usize {
        let mut finished = 0;
        for level in self.streaming_levels.iter_mut().filter(|level| level.load_requested) {
            level.loaded = true;
            level.load_requested = false;
            finished += 1;
        }
        finished
    }

    /// Show or hide a sub-level
    pub fn set_level_visible(&mut self, name: &str, visible: bool) -> bool {
        self.find_streaming_level_mut(name).map_or(false, |level| {
            if level.visible != visible {
                log::debug!("Streaming level '{}' visible: {visible}", level.package_name);
                level.visible = visible;
            }
            true
        })
    }

    /// Request travel to another map
    pub fn open_map(&mut self, map_name: &str) {
        if self.pending_map.as_deref() != Some(map_name) {
            log::info!("Opening map '{map_name}'");
            self.pending_map = Some(map_name.to_string());
        }
    }

    /// Map travel requested and not yet completed
    pub fn pending_map(&self) -> Option<&str> {
        self.pending_map.as_deref()
    }

    /// Complete a requested travel, replacing the world's contents
    ///
    /// Returns the name of the new map, or `None` when no travel was pending.
    pub fn finish_map_load(&mut self) -> Option<String> {
        let map_name = self.pending_map.take()?;
        self.actors.clear();
        self.persistent_root = None;
        self.streaming_levels.clear();
        self.map_name.clone_from(&map_name);
        Some(map_name)
    }

    /// Persistent root followed by the roots of every loaded sub-level
    pub fn all_level_roots(&self) -> Vec<ActorId> {
        self.persistent_root
            .into_iter()
            .chain(
                self.streaming_levels
                    .iter()
                    .filter(|level| level.loaded)
                    .filter_map(|level| level.root),
            )
            .collect()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("map_name", &self.map_name)
            .field("actors", &self.actors.len())
            .field("persistent_root", &self.persistent_root)
            .field("streaming_levels", &self.streaming_levels)
            .field("pending_map", &self.pending_map)
            .finish()
    }
}
