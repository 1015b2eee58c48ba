//! Configuration system
//!
//! Settings files are TOML or RON, chosen by extension.

mod settings;

use std::path::Path;

pub use serde::{Deserialize, Serialize};
pub use settings::{
    CameraTemplateConfig, ChannelConfig, ClusterRole, RenderStreamSettings, SceneSelectorKind,
    ViewportConfig,
};

/// On-disk settings format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Format for `path`, matched case-insensitively on its extension
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, contents: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Self::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    fn render<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string())),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// Settings loadable from and savable to TOML or RON files
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load settings from a file
    ///
    /// # Errors
    /// Fails on I/O errors, unknown extensions and parse errors.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Parsing {format:?} settings from {}", path.display());
        format.parse(&contents)
    }

    /// Parse settings text in the format `path`'s extension names
    ///
    /// # Errors
    /// Fails on unknown extensions and parse errors.
    fn from_str_with_format(contents: &str, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigFormat::from_path(path.as_ref())?.parse(contents)
    }

    /// Write settings to a file
    ///
    /// # Errors
    /// Fails on I/O errors, unknown extensions and serialization errors.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = ConfigFormat::from_path(path)?.render(self)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but are not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("node.TOML")).ok(), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("cfg/node.ron")).ok(), Some(ConfigFormat::Ron));
        assert!(ConfigFormat::from_path(Path::new("node")).is_err());
    }

    #[test]
    fn test_saved_settings_load_back() {
        let path = std::env::temp_dir().join(format!("render_stream_settings_{}.ron", std::process::id()));
        let settings = RenderStreamSettings::default()
            .with_scene_selector(SceneSelectorKind::Maps)
            .with_viewport("Main", 1280, 720);

        settings.save_to_file(&path).unwrap();
        let loaded = RenderStreamSettings::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
    }
}
