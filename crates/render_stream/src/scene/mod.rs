//! Scene graph, exposed properties and scene selection

pub mod property;
pub mod selector;
pub mod world;

pub use property::{ParameterActor, PropertyDescriptor, PropertyError, PropertyKind, PropertyValue, ScriptActor};
pub use selector::{describe_parameters, validate_parameters, ParameterApplier, SceneSelector};
pub use world::{ActorId, StreamingLevel, World};
