//! Fatal module errors

use crate::config::ConfigError;
use crate::link::LinkError;

/// Condition that leaves the node unable to run
#[derive(thiserror::Error, Debug)]
pub enum RenderStreamError {
    /// The link speaks a different protocol version
    #[error("link does not support protocol version {major}.{minor}")]
    VersionMismatch {
        /// Host major version
        major: u32,
        /// Host minor version
        minor: u32,
    },

    /// The link failed to initialise
    #[error("failed to initialise link: {0}")]
    LinkInit(#[source] LinkError),

    /// A frame selected a scene the schema does not have
    #[error("scene {scene} out of range, schema has {count} scenes")]
    SceneOutOfRange {
        /// Requested scene index
        scene: usize,
        /// Scenes in the schema
        count: usize,
    },

    /// Settings could not be loaded or are invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for fatal module operations
pub type Result<T> = std::result::Result<T, RenderStreamError>;
