//! Parameter schema shared with the controller
//!
//! A [`Schema`] lists every selectable scene. Each scene is a [`RemoteParameters`]
//! record whose ordered [`RemoteParameter`] list is the wire contract for the
//! flat per-frame value buffers: the order and types must mirror the exposed
//! properties of the scene's actors exactly.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::link::SchemaHash;

/// Wire type of one schema parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    /// One float
    Number,
    /// One image slot
    Image,
    /// Rotation and translation as 16 floats
    Pose,
    /// Full 4x4 transform as 16 floats
    Transform,
    /// One text slot
    Text,
    /// Edge-triggered event, one float
    Event,
    /// One skeleton pose slot
    Skeleton,
}

impl ParameterType {
    /// Human-readable type name for diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Image => "Image",
            Self::Pose => "Pose",
            Self::Transform => "Transform",
            Self::Text => "Text",
            Self::Event => "Event",
            Self::Skeleton => "Skeleton",
        }
    }

    /// Floats this parameter occupies in the frame value buffer
    pub const fn float_count(self) -> usize {
        match self {
            Self::Number | Self::Event => 1,
            Self::Pose | Self::Transform => 16,
            Self::Image | Self::Text | Self::Skeleton => 0,
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Controller-side behavior hints for a parameter
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ParameterFlags: u32 {
        /// Not keyframed on the controller timeline
        const NO_SEQUENCE = 1;
        /// Displayed but not editable on the controller
        const READ_ONLY = 2;
    }
}

/// DMX channel encoding hint, carried for round-trip fidelity only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DmxType {
    /// Controller default
    #[default]
    Default,
    /// One 8-bit channel
    Dmx8,
    /// Two channels, 16-bit big endian
    Dmx16BigEndian,
}

/// Type-specific default value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ParameterDefaults {
    /// Numeric range, step and default
    Number {
        /// Minimum value
        min: f32,
        /// Maximum value
        max: f32,
        /// Step size
        step: f32,
        /// Default value
        default: f32,
    },
    /// Default text
    Text {
        /// Default value
        default: String,
    },
    /// No defaults apply
    #[default]
    None,
}

/// One exposed parameter as seen by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteParameter {
    /// Grouping shown on the controller
    pub group: String,
    /// Display name
    pub display_name: String,
    /// Stable identifier, `<property>` or `<property>_<suffix>`
    pub key: String,
    /// Wire type
    pub parameter_type: ParameterType,
    /// Type-specific defaults
    pub defaults: ParameterDefaults,
    /// Enumeration options
    pub options: Vec<String>,
    /// DMX channel offset; -1 lets the controller assign one
    pub dmx_offset: i32,
    /// DMX encoding
    pub dmx_type: DmxType,
    /// Behavior hints
    pub flags: ParameterFlags,
}

impl RemoteParameter {
    /// Create a parameter with empty group, no options and automatic DMX offset
    pub fn new(key: impl Into<String>, parameter_type: ParameterType) -> Self {
        let key = key.into();
        let defaults = match parameter_type {
            ParameterType::Number => ParameterDefaults::Number {
                min: 0.0,
                max: 1.0,
                step: 0.001,
                default: 0.0,
            },
            ParameterType::Text => ParameterDefaults::Text {
                default: String::new(),
            },
            _ => ParameterDefaults::None,
        };
        Self {
            group: String::new(),
            display_name: key.clone(),
            key,
            parameter_type,
            defaults,
            options: Vec::new(),
            dmx_offset: -1,
            dmx_type: DmxType::Default,
            flags: ParameterFlags::empty(),
        }
    }

    /// Set the group
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Per-type slot counts for one scene's frame buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueCounts {
    /// Floats in the value buffer
    pub floats: usize,
    /// Image slots
    pub images: usize,
    /// Text slots
    pub texts: usize,
    /// Skeleton pose slots
    pub poses: usize,
}

/// One selectable scene and its ordered parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteParameters {
    /// Scene name
    pub name: String,
    /// Ordered parameters; the order is the wire contract
    pub parameters: Vec<RemoteParameter>,
    /// Content hash assigned by the link, used to key per-frame fetches
    pub hash: SchemaHash,
}

impl RemoteParameters {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Partition the scene's parameters into per-type buffer sizes
    pub fn value_counts(&self) -> ValueCounts {
        self.parameters
            .iter()
            .fold(ValueCounts::default(), |mut counts, parameter| {
                counts.floats += parameter.parameter_type.float_count();
                match parameter.parameter_type {
                    ParameterType::Image => counts.images += 1,
                    ParameterType::Text => counts.texts += 1,
                    ParameterType::Skeleton => counts.poses += 1,
                    _ => {}
                }
                counts
            })
    }
}

/// Full parameter schema
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Host engine name
    pub engine_name: String,
    /// Host engine version
    pub engine_version: String,
    /// Free-form project info
    pub info: String,
    /// Camera channels the project offers
    pub channels: Vec<String>,
    /// Selectable scenes
    pub scenes: Vec<RemoteParameters>,
}

/// Schema blob could not be encoded or decoded
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    /// Encoding failed
    #[error("Schema encode error: {0}")]
    Encode(String),

    /// Decoding failed
    #[error("Schema decode error: {0}")]
    Decode(String),
}

impl Schema {
    /// Name of the single scene in the fallback schema
    pub const DEFAULT_SCENE: &'static str = "Default";

    /// Single-scene, zero-parameter schema used when nothing else is available
    pub fn default_schema() -> Self {
        Self {
            engine_name: env!("CARGO_PKG_NAME").to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            info: String::new(),
            channels: Vec::new(),
            scenes: vec![RemoteParameters::new(Self::DEFAULT_SCENE)],
        }
    }

    /// Whether this is the fallback shape: one scene without parameters
    pub fn is_default_shape(&self) -> bool {
        self.scenes.len() == 1 && self.scenes[0].parameters.is_empty()
    }

    /// Scene by index
    pub fn scene(&self, index: usize) -> Option<&RemoteParameters> {
        self.scenes.get(index)
    }

    /// Encode as the opaque blob exchanged with the link
    pub fn to_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        bincode::serialize(self).map_err(|e| SchemaError::Encode(e.to_string()))
    }

    /// Decode from the opaque blob exchanged with the link
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchemaError> {
        bincode::deserialize(bytes).map_err(|e| SchemaError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> RemoteParameters {
        RemoteParameters {
            name: "Stage".to_string(),
            parameters: vec![
                RemoteParameter::new("intensity", ParameterType::Number),
                RemoteParameter::new("rig", ParameterType::Transform),
                RemoteParameter::new("backdrop", ParameterType::Image),
                RemoteParameter::new("caption", ParameterType::Text),
                RemoteParameter::new("actor", ParameterType::Skeleton),
                RemoteParameter::new("flash", ParameterType::Event),
            ],
            hash: 7,
        }
    }

    #[test]
    fn test_value_counts_partition_by_type() {
        let counts = sample_scene().value_counts();
        assert_eq!(
            counts,
            ValueCounts {
                floats: 18,
                images: 1,
                texts: 1,
                poses: 1,
            }
        );
    }

    #[test]
    fn test_default_schema_shape() {
        let schema = Schema::default_schema();
        assert!(schema.is_default_shape());
        assert_eq!(schema.scenes[0].name, "Default");
    }

    #[test]
    fn test_blob_preserves_dmx_hints_and_flags() {
        let mut parameter = RemoteParameter::new("dimmer", ParameterType::Number);
        parameter.dmx_offset = 12;
        parameter.dmx_type = DmxType::Dmx16BigEndian;
        parameter.flags = ParameterFlags::READ_ONLY | ParameterFlags::NO_SEQUENCE;
        parameter.options = vec!["low".to_string(), "high".to_string()];
        let mut scene = sample_scene();
        scene.parameters.push(parameter);
        let schema = Schema {
            scenes: vec![scene],
            channels: vec!["main".to_string()],
            ..Schema::default_schema()
        };

        let decoded = Schema::from_bytes(&schema.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, schema);
    }

    #[test]
    fn test_garbage_blob_is_rejected() {
        assert!(Schema::from_bytes(&[0xff, 0x01, 0x02]).is_err());
    }
}
