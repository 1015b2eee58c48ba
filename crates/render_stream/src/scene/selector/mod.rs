//! Scene selection
//!
//! The [`SceneSelector`] owns the active [`Schema`] and decides, per frame,
//! which actors receive the selected scene's parameters. How scenes map onto
//! the world is one of three strategies picked by [`SceneSelectorKind`].

mod maps;
mod none;
mod parameters;
mod streaming_levels;

pub use parameters::{describe_parameters, validate_parameters, ParameterApplier};

use crate::config::SceneSelectorKind;
use crate::error::Result;
use crate::link::{fetch_sized, Link};
use crate::scene::world::{ActorId, World};
use crate::schema::Schema;
use maps::MapScenes;
use none::SingleScene;
use streaming_levels::LevelScenes;

/// Everything a strategy needs to apply parameters for one frame
struct SceneApply<'a> {
    link: &'a dyn Link,
    schema: &'a Schema,
    applier: &'a mut ParameterApplier,
    delta_time: f64,
}

impl SceneApply<'_> {
    fn apply(&mut self, scene_id: usize, world: &mut World, actors: &[ActorId]) -> Result<()> {
        self.applier
            .apply_parameters(self.link, self.schema, scene_id, world, actors, self.delta_time)
    }
}

#[derive(Debug)]
enum Strategy {
    None(SingleScene),
    StreamingLevels(LevelScenes),
    Maps(MapScenes),
}

impl Strategy {
    fn new(kind: SceneSelectorKind) -> Self {
        match kind {
            SceneSelectorKind::None => Self::None(SingleScene::default()),
            SceneSelectorKind::StreamingLevels => Self::StreamingLevels(LevelScenes::default()),
            SceneSelectorKind::Maps => Self::Maps(MapScenes::default()),
        }
    }

    fn on_loaded_schema(&mut self, world: &World, schema: &Schema) -> bool {
        match self {
            Self::None(scenes) => scenes.on_loaded_schema(world, schema),
            Self::StreamingLevels(scenes) => scenes.on_loaded_schema(world, schema),
            Self::Maps(scenes) => scenes.on_loaded_schema(schema),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::None(scenes) => scenes.reset(),
            Self::StreamingLevels(scenes) => scenes.reset(),
            Self::Maps(scenes) => scenes.reset(),
        }
    }

    fn apply_scene(&mut self, apply: &mut SceneApply<'_>, world: &mut World, scene_id: usize) -> Result<()> {
        match self {
            Self::None(scenes) => scenes.apply_scene(apply, world, scene_id),
            Self::StreamingLevels(scenes) => scenes.apply_scene(apply, world, scene_id),
            Self::Maps(scenes) => scenes.apply_scene(apply, world, scene_id),
        }
    }
}

/// Owns the active schema and applies the selected scene each frame
pub struct SceneSelector {
    kind: SceneSelectorKind,
    strategy: Strategy,
    schema: Schema,
    fallback: bool,
    applier: ParameterApplier,
    max_attempts: u32,
}

impl SceneSelector {
    /// Create a selector with the fallback schema active
    ///
    /// # Arguments
    /// * `kind` - How scenes map onto the world
    /// * `applier` - Parameter application, owning the skeleton pipeline
    /// * `max_attempts` - Fill attempts for the two-call schema fetch
    pub fn new(kind: SceneSelectorKind, applier: ParameterApplier, max_attempts: u32) -> Self {
        Self {
            kind,
            strategy: Strategy::new(kind),
            schema: Schema::default_schema(),
            fallback: true,
            applier,
            max_attempts,
        }
    }

    /// Strategy in use
    pub const fn kind(&self) -> SceneSelectorKind {
        self.kind
    }

    /// Active schema
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether the synthetic default schema is active
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Parameter applier, for inspecting the skeleton cache
    pub const fn applier(&self) -> &ParameterApplier {
        &self.applier
    }

    /// Load the schema from the link, falling back to the default schema
    ///
    /// The fallback is pushed to the link with `set_schema` so the controller
    /// and host agree on its scene hash. Returns true when the link's schema
    /// was loaded and accepted.
    pub fn load_schemas(&mut self, link: &dyn Link, world: &World) -> bool {
        let loaded = match fetch_sized("schema", self.max_attempts, |out| link.load_schema(out)) {
            Ok(bytes) => match Schema::from_bytes(&bytes) {
                Ok(schema) if self.strategy.on_loaded_schema(world, &schema) => Some(schema),
                Ok(_) => {
                    log::error!("Incompatible schema");
                    None
                }
                Err(e) => {
                    log::error!("Unable to decode schema: {e}");
                    None
                }
            },
            Err(e) => {
                log::error!("Unable to load schema - {e}");
                None
            }
        };

        self.applier.reset();
        if let Some(schema) = loaded {
            log::info!("Loaded schema with {} scenes", schema.scenes.len());
            self.schema = schema;
            self.fallback = false;
            return true;
        }

        self.strategy.reset();
        let mut schema = Schema::default_schema();
        if let Err(e) = link.set_schema(&mut schema) {
            log::error!("Unable to set default schema - {e}");
        }
        self.schema = schema;
        self.fallback = true;
        false
    }

    /// Apply the selected scene for this frame
    ///
    /// May only request a level load or map travel and return; parameters
    /// are then applied on a later frame once the world has caught up.
    ///
    /// # Errors
    /// Returns [`RenderStreamError::SceneOutOfRange`](crate::error::RenderStreamError::SceneOutOfRange)
    /// when parameter application is asked for a scene the schema lacks.
    pub fn apply_scene(&mut self, link: &dyn Link, world: &mut World, scene_id: usize, delta_time: f64) -> Result<()> {
        if self.fallback {
            return Ok(());
        }
        let mut apply = SceneApply {
            link,
            schema: &self.schema,
            applier: &mut self.applier,
            delta_time,
        };
        self.strategy.apply_scene(&mut apply, world, scene_id)
    }
}
