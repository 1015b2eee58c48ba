//! One scene per map

use super::{validate_parameters, SceneApply};
use crate::error::Result;
use crate::scene::world::{short_level_name, World};
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapValidation {
    Unchecked,
    Invalid,
    Valid,
}

#[derive(Debug)]
struct MapScene {
    name: String,
    validation: MapValidation,
}

/// Scenes mapped 1:1 to whole maps by name
#[derive(Debug, Default)]
pub(super) struct MapScenes {
    maps: Vec<MapScene>,
}

impl MapScenes {
    pub(super) fn on_loaded_schema(&mut self, schema: &Schema) -> bool {
        self.maps = schema
            .scenes
            .iter()
            .map(|scene| MapScene {
                name: scene.name.clone(),
                validation: MapValidation::Unchecked,
            })
            .collect();
        true
    }

    pub(super) fn reset(&mut self) {
        self.maps.clear();
    }

    pub(super) fn apply_scene(&mut self, apply: &mut SceneApply<'_>, world: &mut World, scene_id: usize) -> Result<()> {
        let Some(map) = self.maps.get_mut(scene_id) else {
            log::error!("Scene id {scene_id} out of range for {} maps", self.maps.len());
            return Ok(());
        };

        if !short_level_name(world.map_name()).eq_ignore_ascii_case(short_level_name(&map.name)) {
            world.open_map(&map.name);
            return Ok(());
        }

        let actors = world.all_level_roots();
        match map.validation {
            MapValidation::Unchecked => {
                let Some(scene) = apply.schema.scene(scene_id) else {
                    return apply.apply(scene_id, world, &actors);
                };
                log::info!(
                    "Validating schema for map '{}' with {} parameters",
                    scene.name,
                    scene.parameters.len()
                );
                if validate_parameters(scene, world, &actors) {
                    map.validation = MapValidation::Valid;
                    apply.apply(scene_id, world, &actors)
                } else {
                    log::error!("Failed to validate schema for map '{}'", scene.name);
                    map.validation = MapValidation::Invalid;
                    Ok(())
                }
            }
            MapValidation::Valid => apply.apply(scene_id, world, &actors),
            MapValidation::Invalid => Ok(()),
        }
    }
}
