//! Exposed properties and the actors that own them
//!
//! An actor lists its exposed properties as ordered [`PropertyDescriptor`]s.
//! That list is the single source for schema generation, validation and
//! per-frame application, so the three always agree on order and types.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::math::{Rotator, Transform, Vec3};
use crate::link::ImageFrameData;
use crate::schema::ParameterType;

/// Closed set of property types that can be exposed to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Boolean, one number
    Bool,
    /// Unsigned byte, one number
    Byte,
    /// 32-bit integer, one number
    Int,
    /// 32-bit float, one number
    Float,
    /// 64-bit float, one number
    Double,
    /// Three numbers `_x`, `_y`, `_z`
    Vector,
    /// 8-bit color, four numbers `_r`, `_g`, `_b`, `_a` in 0..1
    Color,
    /// Linear float color, four numbers `_r`, `_g`, `_b`, `_a`
    LinearColor,
    /// Three numbers `_pitch`, `_yaw`, `_roll` in degrees
    Rotator,
    /// Full transform, 16 floats
    Transform,
    /// Rotation and translation, 16 floats
    Pose,
    /// Image reference
    Image,
    /// Text
    Text,
    /// Skeleton pose published to the pose sink
    Skeleton,
    /// Callable fired when its value rises
    Event,
}

const SCALAR: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Number)];
const VECTOR: &[(Option<&str>, ParameterType)] = &[
    (Some("x"), ParameterType::Number),
    (Some("y"), ParameterType::Number),
    (Some("z"), ParameterType::Number),
];
const COLOR: &[(Option<&str>, ParameterType)] = &[
    (Some("r"), ParameterType::Number),
    (Some("g"), ParameterType::Number),
    (Some("b"), ParameterType::Number),
    (Some("a"), ParameterType::Number),
];
const ROTATOR: &[(Option<&str>, ParameterType)] = &[
    (Some("pitch"), ParameterType::Number),
    (Some("yaw"), ParameterType::Number),
    (Some("roll"), ParameterType::Number),
];
const TRANSFORM: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Transform)];
const POSE: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Pose)];
const IMAGE: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Image)];
const TEXT: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Text)];
const SKELETON: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Skeleton)];
const EVENT: &[(Option<&str>, ParameterType)] = &[(None, ParameterType::Event)];

impl PropertyKind {
    /// Wire slots the property occupies: key suffix and type, in order
    pub const fn slots(self) -> &'static [(Option<&'static str>, ParameterType)] {
        match self {
            Self::Bool | Self::Byte | Self::Int | Self::Float | Self::Double => SCALAR,
            Self::Vector => VECTOR,
            Self::Color | Self::LinearColor => COLOR,
            Self::Rotator => ROTATOR,
            Self::Transform => TRANSFORM,
            Self::Pose => POSE,
            Self::Image => IMAGE,
            Self::Text => TEXT,
            Self::Skeleton => SKELETON,
            Self::Event => EVENT,
        }
    }

    /// Whether a value can be written to a property of this kind
    pub const fn accepts(self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (Self::Bool, PropertyValue::Bool(_))
                | (Self::Byte, PropertyValue::Byte(_))
                | (Self::Int, PropertyValue::Int(_))
                | (Self::Float, PropertyValue::Float(_))
                | (Self::Double, PropertyValue::Double(_))
                | (Self::Vector, PropertyValue::Vector(_))
                | (Self::Color, PropertyValue::Color(_))
                | (Self::LinearColor, PropertyValue::LinearColor(_))
                | (Self::Rotator, PropertyValue::Rotator(_))
                | (Self::Transform | Self::Pose, PropertyValue::Transform(_))
                | (Self::Image, PropertyValue::Image(_))
                | (Self::Text, PropertyValue::Text(_))
        )
    }
}

/// Wire key of one slot: the property name, plus `_suffix` when present
pub fn slot_key(property: &str, suffix: Option<&str>) -> String {
    suffix.map_or_else(|| property.to_string(), |suffix| format!("{property}_{suffix}"))
}

/// One exposed property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name
    pub name: String,
    /// Property type
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Decoded property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean
    Bool(bool),
    /// Unsigned byte
    Byte(u8),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// Double
    Double(f64),
    /// Vector
    Vector(Vec3),
    /// 8-bit RGBA
    Color([u8; 4]),
    /// Linear RGBA
    LinearColor([f32; 4]),
    /// Euler rotation
    Rotator(Rotator),
    /// Transform or pose, in host space
    Transform(Transform),
    /// Image reference
    Image(ImageFrameData),
    /// Text
    Text(String),
}

/// A late-bound property write failed
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// No exposed property or event has that name
    #[error("unknown property '{0}'")]
    Unknown(String),

    /// The value does not fit the property's kind
    #[error("property '{name}' of kind {kind:?} cannot take this value")]
    TypeMismatch {
        /// Property name
        name: String,
        /// Property kind
        kind: PropertyKind,
    },
}

/// Entity owning exposed parameters
pub trait ParameterActor: Send {
    /// Actor name for diagnostics
    fn name(&self) -> &str;

    /// Exposed properties in their fixed traversal order
    fn exposed_properties(&self) -> &[PropertyDescriptor];

    /// Write a property value
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError>;

    /// Fire an event property
    fn invoke_event(&mut self, name: &str) -> Result<(), PropertyError>;
}

#[derive(Debug, Default)]
struct ScriptValues {
    values: HashMap<String, PropertyValue>,
    fired_events: Vec<String>,
}

/// Actor backed by a property table, for level scripts assembled at runtime
///
/// Clones share one value table, so a handle kept outside the [`World`]
/// observes everything applied to the spawned actor.
///
/// [`World`]: super::world::World
#[derive(Debug, Clone, Default)]
pub struct ScriptActor {
    name: String,
    properties: Vec<PropertyDescriptor>,
    state: Arc<Mutex<ScriptValues>>,
}

impl ScriptActor {
    /// Create an actor without properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an exposed property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.push(PropertyDescriptor::new(name, kind));
        self
    }

    fn state(&self) -> MutexGuard<'_, ScriptValues> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last value written to a property
    pub fn value(&self, name: &str) -> Option<PropertyValue> {
        self.state().values.get(name).cloned()
    }

    /// Events fired so far, oldest first
    pub fn fired_events(&self) -> Vec<String> {
        self.state().fired_events.clone()
    }
}

impl ParameterActor for ScriptActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn exposed_properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        let kind = self
            .properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| property.kind)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        if !kind.accepts(&value) {
            return Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                kind,
            });
        }
        log::trace!("{}.{name} = {value:?}", self.name);
        self.state().values.insert(name.to_string(), value);
        Ok(())
    }

    fn invoke_event(&mut self, name: &str) -> Result<(), PropertyError> {
        let is_event = self
            .properties
            .iter()
            .any(|property| property.name == name && property.kind == PropertyKind::Event);
        if !is_event {
            return Err(PropertyError::Unknown(name.to_string()));
        }
        self.state().fired_events.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counts() {
        let floats = |kind: PropertyKind| -> usize {
            kind.slots().iter().map(|(_, ty)| ty.float_count()).sum()
        };
        assert_eq!(PropertyKind::Bool.slots().len(), 1);
        assert_eq!(PropertyKind::Vector.slots().len(), 3);
        assert_eq!(PropertyKind::Color.slots().len(), 4);
        assert_eq!(PropertyKind::Rotator.slots().len(), 3);
        assert_eq!(floats(PropertyKind::Transform), 16);
        assert_eq!(floats(PropertyKind::Event), 1);
        assert_eq!(floats(PropertyKind::Image), 0);
    }

    #[test]
    fn test_slot_keys() {
        assert_eq!(slot_key("Speed", None), "Speed");
        assert_eq!(slot_key("Offset", Some("x")), "Offset_x");
    }

    #[test]
    fn test_script_actor_checks_kinds() {
        let mut actor = ScriptActor::new("Stage")
            .with_property("Visible", PropertyKind::Bool)
            .with_property("Flash", PropertyKind::Event);

        actor.set_property("Visible", PropertyValue::Bool(true)).unwrap();
        assert_eq!(actor.value("Visible"), Some(PropertyValue::Bool(true)));
        assert!(matches!(
            actor.set_property("Visible", PropertyValue::Int(1)),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(matches!(
            actor.set_property("Missing", PropertyValue::Int(1)),
            Err(PropertyError::Unknown(_))
        ));

        actor.invoke_event("Flash").unwrap();
        assert!(actor.invoke_event("Visible").is_err());
        assert_eq!(actor.fired_events(), vec!["Flash".to_string()]);
    }
}
