//! Renderer configuration
//!
//! Typed configuration for the presentation core with TOML loading,
//! validation and sensible defaults. Only concerns this core actually
//! consumes live here: instance metadata, the initial drawable extent,
//! the validation-layer toggle and the clear color. Shader paths, asset
//! directories and the like belong to the systems that own them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the renderer cannot work with
    #[error("invalid config value: {reason}")]
    Invalid {
        /// Description of the offending field and value
        reason: String,
    },
}

/// Configuration for the Vulkan presentation core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name passed to Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Initial drawable width in pixels
    pub width: u32,
    /// Initial drawable height in pixels
    pub height: u32,
    /// Whether to enable Vulkan validation layers; `None` means
    /// debug builds only
    pub enable_validation: Option<bool>,
    /// Clear color applied at the start of the swapchain render pass
    pub clear_color: [f32; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "cinder".to_string(),
            application_version: (0, 1, 0),
            width: 800,
            height: 600,
            enable_validation: None,
            clear_color: [0.01, 0.01, 0.01],
        }
    }
}

impl RendererConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "application_name must not be empty".to_string(),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                reason: format!("drawable extent {}x{} has a zero dimension", self.width, self.height),
            });
        }
        for channel in self.clear_color {
            if !(0.0..=1.0).contains(&channel) {
                return Err(ConfigError::Invalid {
                    reason: format!("clear_color channel {channel} outside [0, 1]"),
                });
            }
        }
        Ok(())
    }

    /// Whether validation layers should be enabled for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = RendererConfig::from_toml_str(
            r#"
            application_name = "sprite-bridge"
            width = 1280
            height = 720
            "#,
        )
        .unwrap();
        assert_eq!(config.application_name, "sprite-bridge");
        assert_eq!(config.width, 1280);
        // unspecified fields fall back to defaults
        assert_eq!(config.application_version, (0, 1, 0));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let result = RendererConfig::from_toml_str("width = 0");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_clear_color_range_rejected() {
        let result = RendererConfig::from_toml_str("clear_color = [0.0, 2.0, 0.0]");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validation_default_tracks_build() {
        let config = RendererConfig::default();
        assert_eq!(config.validation_enabled(), cfg!(debug_assertions));
        let forced = RendererConfig {
            enable_validation: Some(true),
            ..RendererConfig::default()
        };
        assert!(forced.validation_enabled());
    }
}
