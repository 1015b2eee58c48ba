//! One scene per streaming sub-level
//!
//! A scene whose name matches no sub-level is a base scene and applies to the
//! persistent level alone.

use super::{validate_parameters, SceneApply};
use crate::error::Result;
use crate::scene::world::{ActorId, World};
use crate::schema::{RemoteParameters, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    /// Sub-level not loaded yet
    Pending,
    Valid,
    Invalid,
}

#[derive(Debug)]
struct LevelScene {
    level: Option<String>,
    validation: Validation,
    /// Actors the last validation ran against
    validated_actors: Vec<ActorId>,
}

impl LevelScene {
    fn validate(&mut self, scene: &RemoteParameters, world: &World, actors: Vec<ActorId>) {
        self.validation = validate_level(scene, world, &actors);
        self.validated_actors = actors;
    }
}

fn scene_actors(world: &World, level: Option<&str>) -> Vec<ActorId> {
    let level_root = level
        .and_then(|name| world.find_streaming_level(name))
        .filter(|level| level.is_loaded())
        .and_then(|level| level.root());
    world.persistent_root().into_iter().chain(level_root).collect()
}

fn validate_level(scene: &RemoteParameters, world: &World, actors: &[ActorId]) -> Validation {
    log::info!(
        "Validating schema for '{}' with {} parameters",
        scene.name,
        scene.parameters.len()
    );
    if validate_parameters(scene, world, actors) {
        Validation::Valid
    } else {
        log::error!("Failed to validate schema for '{}'", scene.name);
        Validation::Invalid
    }
}

/// Scenes mapped to streaming sub-levels, shown one at a time
#[derive(Debug, Default)]
pub(super) struct LevelScenes {
    scenes: Vec<LevelScene>,
}

impl LevelScenes {
    pub(super) fn on_loaded_schema(&mut self, world: &World, schema: &Schema) -> bool {
        self.scenes = schema
            .scenes
            .iter()
            .map(|scene| {
                let level = world.find_streaming_level(&scene.name);
                let loaded = level.map_or(true, |level| level.is_loaded());
                let mut entry = LevelScene {
                    level: level.map(|level| level.short_name().to_string()),
                    validation: Validation::Pending,
                    validated_actors: Vec::new(),
                };
                if loaded {
                    let actors = scene_actors(world, entry.level.as_deref());
                    entry.validate(scene, world, actors);
                } else {
                    log::info!("Skipping validation of unloaded streaming level '{}'", scene.name);
                }
                entry
            })
            .collect();
        true
    }

    pub(super) fn reset(&mut self) {
        self.scenes.clear();
    }

    pub(super) fn apply_scene(&mut self, apply: &mut SceneApply<'_>, world: &mut World, scene_id: usize) -> Result<()> {
        let Some(entry) = self.scenes.get_mut(scene_id) else {
            log::error!("Unable to get frame parameters - scene id {scene_id} >= {}", self.scenes.len());
            return Ok(());
        };

        if let Some(level) = entry.level.as_deref() {
            let loaded = world.find_streaming_level(level).is_some_and(|level| level.is_loaded());
            if !loaded {
                entry.validation = Validation::Pending;
                world.load_stream_level(level);
                return Ok(());
            }
        }
        // Validation is redone whenever the level brings a different set of actors.
        let actors = scene_actors(world, entry.level.as_deref());
        if entry.validation == Validation::Pending || entry.validated_actors != actors {
            if let Some(scene) = apply.schema.scene(scene_id) {
                entry.validate(scene, world, actors.clone());
            }
        }

        let levels: Vec<String> = world
            .streaming_levels()
            .iter()
            .map(|level| level.short_name().to_string())
            .collect();
        for name in &levels {
            let visible = entry
                .level
                .as_deref()
                .is_some_and(|level| level.eq_ignore_ascii_case(name));
            world.set_level_visible(name, visible);
        }

        if entry.validation != Validation::Valid {
            return Ok(());
        }
        apply.apply(scene_id, world, &actors)
    }
}
