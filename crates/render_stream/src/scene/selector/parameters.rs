//! Parameter schema generation, validation and per-frame application
//!
//! All three walk the same enumeration: actors in the order given, each
//! actor's exposed properties in declaration order, and each property's wire
//! slots in [`PropertyKind::slots`] order.

use std::collections::HashMap;

use crate::error::{RenderStreamError, Result};
use crate::foundation::coordinates::CoordinateConverter;
use crate::foundation::math::{Mat4, Rotator, Transform, Vec3};
use crate::link::{ImageFrameData, Link, SchemaHash};
use crate::scene::property::{slot_key, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::scene::world::{ActorId, World};
use crate::schema::{ParameterDefaults, ParameterType, RemoteParameter, RemoteParameters, Schema};
use crate::skeleton::SkeletonPipeline;

/// Exposed properties of the given actors, in traversal order
///
/// Ids that no longer resolve are skipped.
fn exposed_properties(world: &World, actors: &[ActorId]) -> Vec<(ActorId, String, PropertyDescriptor)> {
    actors
        .iter()
        .filter_map(|&id| world.actor(id).map(|actor| (id, actor)))
        .flat_map(|(id, actor)| {
            let actor_name = actor.name().to_string();
            actor
                .exposed_properties()
                .iter()
                .map(move |property| (id, actor_name.clone(), property.clone()))
        })
        .collect()
}

fn number_range(kind: PropertyKind) -> (f32, f32, f32) {
    match kind {
        PropertyKind::Bool => (0.0, 1.0, 1.0),
        PropertyKind::Byte => (0.0, 255.0, 1.0),
        PropertyKind::Int => (-1000.0, 1000.0, 1.0),
        PropertyKind::Vector => (-1000.0, 1000.0, 0.01),
        PropertyKind::Rotator => (-180.0, 180.0, 0.1),
        _ => (0.0, 1.0, 0.001),
    }
}

/// Generate the ordered schema parameters for a set of actors
///
/// Each parameter is grouped under its actor's name. Validating a scene built
/// from this list against the same actors always succeeds.
pub fn describe_parameters(world: &World, actors: &[ActorId]) -> Vec<RemoteParameter> {
    let mut parameters = Vec::new();
    for (_, actor_name, property) in exposed_properties(world, actors) {
        let (min, max, step) = number_range(property.kind);
        for &(suffix, parameter_type) in property.kind.slots() {
            let display_name = suffix.map_or_else(
                || property.name.clone(),
                |suffix| format!("{} {}", property.name, suffix.to_uppercase()),
            );
            let mut parameter = RemoteParameter::new(slot_key(&property.name, suffix), parameter_type)
                .with_group(actor_name.clone())
                .with_display_name(display_name);
            if parameter_type == ParameterType::Number {
                parameter.defaults = ParameterDefaults::Number {
                    min,
                    max,
                    step,
                    default: 0.0,
                };
            }
            parameters.push(parameter);
        }
    }
    parameters
}

/// Check that a scene's parameters mirror the actors' exposed properties exactly
///
/// Fails on the first key or type mismatch, when the schema runs out of
/// parameters, or when it has parameters left over.
pub fn validate_parameters(scene: &RemoteParameters, world: &World, actors: &[ActorId]) -> bool {
    let mut offset = 0;
    for (_, actor_name, property) in exposed_properties(world, actors) {
        for &(suffix, expected_type) in property.kind.slots() {
            let expected_key = slot_key(&property.name, suffix);
            let Some(parameter) = scene.parameters.get(offset) else {
                log::error!(
                    "Property {expected_key} of '{actor_name}' not exposed in schema for scene '{}'",
                    scene.name
                );
                return false;
            };
            if parameter.key != expected_key || parameter.parameter_type != expected_type {
                log::error!(
                    "Parameter mismatch - expected key {expected_key} of type {expected_type}, got key {} of type {}",
                    parameter.key,
                    parameter.parameter_type
                );
                return false;
            }
            offset += 1;
        }
    }

    if offset < scene.parameters.len() {
        log::error!(
            "Unexpected extra parameters in schema for scene '{}' ({offset} expected, {} present)",
            scene.name,
            scene.parameters.len()
        );
        return false;
    }
    true
}

#[derive(Debug, Default)]
struct Cursors {
    parameter: usize,
    float: usize,
    image: usize,
    text: usize,
    pose: usize,
}

impl Cursors {
    fn advance(&mut self, slots: &[(Option<&str>, ParameterType)]) {
        self.parameter += slots.len();
        for (_, parameter_type) in slots {
            self.float += parameter_type.float_count();
            match parameter_type {
                ParameterType::Image => self.image += 1,
                ParameterType::Text => self.text += 1,
                ParameterType::Skeleton => self.pose += 1,
                _ => {}
            }
        }
    }
}

fn color_channel(value: f32) -> u8 {
    // Clamped to 0..=255 first, so the cast cannot truncate
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let channel = (value * 255.0).round().clamp(0.0, 255.0) as u8;
    channel
}

/// Applies frame values to actor properties and fires edge-triggered events
pub struct ParameterApplier {
    converter: CoordinateConverter,
    skeletons: SkeletonPipeline,
    last_values: HashMap<SchemaHash, Vec<f32>>,
}

impl ParameterApplier {
    /// Create an applier that delegates skeleton parameters to `skeletons`
    pub fn new(converter: CoordinateConverter, skeletons: SkeletonPipeline) -> Self {
        Self {
            converter,
            skeletons,
            last_values: HashMap::new(),
        }
    }

    /// Skeleton pipeline used for skeleton parameters
    pub const fn skeletons(&self) -> &SkeletonPipeline {
        &self.skeletons
    }

    /// Forget previous frame values and cached skeleton layouts
    pub fn reset(&mut self) {
        self.last_values.clear();
        self.skeletons.clear();
    }

    /// Apply one frame of a scene's values to the actors
    ///
    /// Fetch failures skip the frame. Per-property decode failures skip that
    /// property only.
    ///
    /// # Arguments
    /// * `link` - Link to fetch values from
    /// * `schema` - Active schema
    /// * `scene_id` - Index of the scene to apply
    /// * `world` - World owning the actors
    /// * `actors` - Actors in traversal order
    /// * `delta_time` - Frame delta forwarded to skeleton subjects
    ///
    /// # Errors
    /// Returns [`RenderStreamError::SceneOutOfRange`] when the schema has no
    /// scene `scene_id`.
    pub fn apply_parameters(
        &mut self,
        link: &dyn Link,
        schema: &Schema,
        scene_id: usize,
        world: &mut World,
        actors: &[ActorId],
        delta_time: f64,
    ) -> Result<()> {
        let Some(scene) = schema.scene(scene_id) else {
            let count = schema.scenes.len();
            log::error!("Attempted to select scene {scene_id} out of {count} scenes");
            return Err(RenderStreamError::SceneOutOfRange {
                scene: scene_id,
                count,
            });
        };
        if scene.parameters.is_empty() {
            return Ok(());
        }

        let counts = scene.value_counts();
        let mut floats = vec![0.0_f32; counts.floats];
        if counts.floats > 0 {
            if let Err(e) = link.get_frame_parameters(scene.hash, &mut floats) {
                log::error!("Unable to get float frame parameters for '{}': {e}", scene.name);
                return Ok(());
            }
        }
        let mut images = vec![ImageFrameData::default(); counts.images];
        if counts.images > 0 {
            if let Err(e) = link.get_frame_image_data(scene.hash, &mut images) {
                log::error!("Unable to get image frame parameters for '{}': {e}", scene.name);
                return Ok(());
            }
        }

        let previous = self.last_values.remove(&scene.hash).filter(|previous| {
            if previous.len() == floats.len() {
                true
            } else {
                log::warn!(
                    "Value buffer for '{}' changed length from {} to {}; events skipped this frame",
                    scene.name,
                    previous.len(),
                    floats.len()
                );
                false
            }
        });

        let mut cursors = Cursors::default();
        for (actor_id, _, property) in exposed_properties(world, actors) {
            let slots = property.kind.slots();
            let Some(parameters) = scene.parameters.get(cursors.parameter..cursors.parameter + slots.len()) else {
                log::trace!("Schema for '{}' exhausted before property {}", scene.name, property.name);
                break;
            };
            let float_count: usize = slots.iter().map(|(_, ty)| ty.float_count()).sum();
            let values = floats.get(cursors.float..cursors.float + float_count);

            match property.kind {
                PropertyKind::Event => {
                    let rising = match (values, previous.as_ref()) {
                        (Some(&[value]), Some(previous)) => value > previous[cursors.float],
                        _ => false,
                    };
                    if rising {
                        log::debug!("Firing event {}", property.name);
                        if let Some(actor) = world.actor_mut(actor_id) {
                            if let Err(e) = actor.invoke_event(&property.name) {
                                log::trace!("Skipping event {}: {e}", property.name);
                            }
                        }
                    }
                }
                PropertyKind::Skeleton => {
                    if let Err(e) = self.skeletons.resolve_pose_for_parameter(
                        link,
                        scene.hash,
                        cursors.pose,
                        &parameters[0].key,
                        delta_time,
                    ) {
                        log::warn!("Unable to resolve skeleton {}: {e}", parameters[0].key);
                    }
                }
                kind => match self.decode(link, scene.hash, kind, values, &images, &cursors) {
                    Some(value) => {
                        if let Some(actor) = world.actor_mut(actor_id) {
                            if let Err(e) = actor.set_property(&property.name, value) {
                                log::trace!("Skipping property {}: {e}", property.name);
                            }
                        }
                    }
                    None => log::trace!("No value for property {}", property.name),
                },
            }
            cursors.advance(slots);
        }

        self.last_values.insert(scene.hash, floats);
        Ok(())
    }

    fn decode(
        &self,
        link: &dyn Link,
        hash: SchemaHash,
        kind: PropertyKind,
        values: Option<&[f32]>,
        images: &[ImageFrameData],
        cursors: &Cursors,
    ) -> Option<PropertyValue> {
        let value = match (kind, values?) {
            (PropertyKind::Bool, &[v]) => PropertyValue::Bool(v != 0.0),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            (PropertyKind::Byte, &[v]) => PropertyValue::Byte(v as u8),
            #[allow(clippy::cast_possible_truncation)]
            (PropertyKind::Int, &[v]) => PropertyValue::Int(v as i32),
            (PropertyKind::Float, &[v]) => PropertyValue::Float(v),
            (PropertyKind::Double, &[v]) => PropertyValue::Double(f64::from(v)),
            (PropertyKind::Vector, &[x, y, z]) => PropertyValue::Vector(Vec3::new(x, y, z)),
            (PropertyKind::Color, &[r, g, b, a]) => {
                PropertyValue::Color([color_channel(r), color_channel(g), color_channel(b), color_channel(a)])
            }
            (PropertyKind::LinearColor, &[r, g, b, a]) => PropertyValue::LinearColor([r, g, b, a]),
            (PropertyKind::Rotator, &[pitch, yaw, roll]) => PropertyValue::Rotator(Rotator::new(pitch, yaw, roll)),
            (PropertyKind::Transform | PropertyKind::Pose, matrix) if matrix.len() == 16 => {
                let host = self.converter.matrix_to_host(&Mat4::from_column_slice(matrix));
                PropertyValue::Transform(Transform::from_matrix(&host))
            }
            (PropertyKind::Image, _) => PropertyValue::Image(*images.get(cursors.image)?),
            (PropertyKind::Text, _) => match link.get_frame_text(hash, cursors.text) {
                Ok(text) => PropertyValue::Text(text),
                Err(e) => {
                    log::trace!("Unable to get text parameter {}: {e}", cursors.text);
                    return None;
                }
            },
            _ => return None,
        };
        Some(value)
    }
}
