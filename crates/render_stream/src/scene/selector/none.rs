//! Single-scene selection

use super::{validate_parameters, SceneApply};
use crate::error::Result;
use crate::scene::world::World;
use crate::schema::Schema;

/// One scene applied to the persistent level and every loaded sub-level
#[derive(Debug, Default)]
pub(super) struct SingleScene {
    parameter_count: usize,
}

impl SingleScene {
    pub(super) fn on_loaded_schema(&mut self, world: &World, schema: &Schema) -> bool {
        self.parameter_count = 0;
        match schema.scenes.as_slice() {
            [] => {
                log::info!("Schema has no scenes; parameters are not applied");
                true
            }
            [scene] => {
                if !validate_parameters(scene, world, &world.all_level_roots()) {
                    return false;
                }
                self.parameter_count = scene.parameters.len();
                true
            }
            scenes => {
                log::error!("Scene selector 'None' expects one scene, schema has {}", scenes.len());
                false
            }
        }
    }

    pub(super) fn reset(&mut self) {
        self.parameter_count = 0;
    }

    pub(super) fn apply_scene(&mut self, apply: &mut SceneApply<'_>, world: &mut World, scene_id: usize) -> Result<()> {
        if scene_id > 0 {
            log::error!("Unable to get frame parameters - scene id {scene_id} should be 0");
            return Ok(());
        }
        if self.parameter_count == 0 {
            return Ok(());
        }
        let actors = world.all_level_roots();
        apply.apply(scene_id, world, &actors)
    }
}
