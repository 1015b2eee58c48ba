//! Module settings

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::coordinates::DistanceUnit;
use crate::link::DEFAULT_MAX_ATTEMPTS;

/// How schema scenes map onto host content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SceneSelectorKind {
    /// One scene: the persistent level and everything streamed into it
    #[default]
    None,
    /// One scene per streaming sub-level
    StreamingLevels,
    /// One scene per map
    Maps,
}

/// Role of this node in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClusterRole {
    /// Pulls frame data from the link and broadcasts it
    #[default]
    Controller,
    /// Receives frame data through the cluster broadcast
    Follower,
}

/// Camera created for viewports bound to a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraTemplateConfig {
    /// Plain perspective camera driven by field of view
    Perspective {
        /// Initial horizontal field of view in degrees
        fov_degrees: f32,
    },
    /// Camera driven directly by sensor size and focal length
    Cine {
        /// Sensor width in millimeters
        sensor_width: f32,
        /// Sensor height in millimeters
        sensor_height: f32,
        /// Focal length in millimeters
        focal_length: f32,
    },
}

impl Default for CameraTemplateConfig {
    fn default() -> Self {
        Self::Perspective { fov_degrees: 90.0 }
    }
}

/// Named camera channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel name as used by the controller
    pub name: String,
    /// Camera template
    #[serde(default)]
    pub camera: CameraTemplateConfig,
}

/// Viewport whose capture is published as a stream of the same name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Viewport id, matched case-insensitively against stream names
    pub id: String,
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
    /// Capture offset X in pixels
    #[serde(default)]
    pub x: u32,
    /// Capture offset Y in pixels
    #[serde(default)]
    pub y: u32,
    /// Channel used until the link binds one
    #[serde(default)]
    pub channel: Option<String>,
}

/// Settings for the render stream module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStreamSettings {
    /// Scene selection policy
    pub scene_selector: SceneSelectorKind,
    /// Host distance unit
    pub distance_unit: DistanceUnit,
    /// Timeout for each frame await, in milliseconds
    pub await_timeout_ms: u32,
    /// Fill attempts for two-call link queries
    pub max_fetch_attempts: u32,
    /// Role of this node
    pub cluster_role: ClusterRole,
    /// Local viewports
    pub viewports: Vec<ViewportConfig>,
    /// Camera channels
    pub channels: Vec<ChannelConfig>,
}

impl Default for RenderStreamSettings {
    fn default() -> Self {
        Self {
            scene_selector: SceneSelectorKind::None,
            distance_unit: DistanceUnit::Centimeters,
            await_timeout_ms: 500,
            max_fetch_attempts: DEFAULT_MAX_ATTEMPTS,
            cluster_role: ClusterRole::Controller,
            viewports: Vec::new(),
            channels: Vec::new(),
        }
    }
}

impl Config for RenderStreamSettings {}

impl RenderStreamSettings {
    /// Set the scene selector
    #[must_use]
    pub const fn with_scene_selector(mut self, kind: SceneSelectorKind) -> Self {
        self.scene_selector = kind;
        self
    }

    /// Set the cluster role
    #[must_use]
    pub const fn with_cluster_role(mut self, role: ClusterRole) -> Self {
        self.cluster_role = role;
        self
    }

    /// Add a viewport
    #[must_use]
    pub fn with_viewport(mut self, id: impl Into<String>, width: u32, height: u32) -> Self {
        self.viewports.push(ViewportConfig {
            id: id.into(),
            width,
            height,
            ..ViewportConfig::default()
        });
        self
    }

    /// Add a channel
    #[must_use]
    pub fn with_channel(mut self, name: impl Into<String>, camera: CameraTemplateConfig) -> Self {
        self.channels.push(ChannelConfig {
            name: name.into(),
            camera,
        });
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.await_timeout_ms == 0 {
            return Err("Await timeout must be greater than 0".to_string());
        }
        if self.max_fetch_attempts == 0 {
            return Err("Max fetch attempts must be greater than 0".to_string());
        }
        for viewport in &self.viewports {
            if viewport.id.is_empty() {
                return Err("Viewport id must not be empty".to_string());
            }
            if viewport.width == 0 || viewport.height == 0 {
                return Err(format!("Viewport '{}' must have a non-zero size", viewport.id));
            }
        }
        for (index, viewport) in self.viewports.iter().enumerate() {
            if self.viewports[..index]
                .iter()
                .any(|other| other.id.eq_ignore_ascii_case(&viewport.id))
            {
                return Err(format!("Duplicate viewport id '{}'", viewport.id));
            }
        }
        for channel in &self.channels {
            if let CameraTemplateConfig::Cine {
                sensor_width,
                sensor_height,
                focal_length,
            } = channel.camera
            {
                if sensor_width <= 0.0 || sensor_height <= 0.0 || focal_length <= 0.0 {
                    return Err(format!("Channel '{}' has a non-positive cine sensor", channel.name));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RenderStreamSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.await_timeout_ms, 500);
        assert_eq!(settings.max_fetch_attempts, 3);
        assert_eq!(settings.scene_selector, SceneSelectorKind::None);
    }

    #[test]
    fn test_duplicate_viewports_rejected() {
        let settings = RenderStreamSettings::default()
            .with_viewport("Left", 1920, 1080)
            .with_viewport("left", 1920, 1080);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_settings_parse() {
        let text = r#"
            scene_selector = "StreamingLevels"
            distance_unit = "Meters"
            cluster_role = "Follower"

            [[viewports]]
            id = "Left"
            width = 1920
            height = 1080
            channel = "main"

            [[channels]]
            name = "main"
            camera = { Cine = { sensor_width = 36.0, sensor_height = 24.0, focal_length = 35.0 } }
        "#;

        let settings = RenderStreamSettings::from_str_with_format(text, "node.toml").unwrap();
        assert_eq!(settings.scene_selector, SceneSelectorKind::StreamingLevels);
        assert_eq!(settings.distance_unit, DistanceUnit::Meters);
        assert_eq!(settings.cluster_role, ClusterRole::Follower);
        assert_eq!(settings.await_timeout_ms, 500);
        assert_eq!(settings.viewports[0].channel.as_deref(), Some("main"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_selector_rejected() {
        let result = RenderStreamSettings::from_str_with_format("scene_selector = \"Levels\"", "node.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_ron_settings_parse() {
        let text = "(scene_selector: Maps, await_timeout_ms: 250)";
        let settings = RenderStreamSettings::from_str_with_format(text, "node.ron").unwrap();
        assert_eq!(settings.scene_selector, SceneSelectorKind::Maps);
        assert_eq!(settings.await_timeout_ms, 250);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = RenderStreamSettings::from_str_with_format("", "node.json");
        assert!(matches!(result, Err(super::super::ConfigError::UnsupportedFormat(_))));
    }
}
