//! Configuration parsing and management for holorig

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, HolorigError};
use crate::graph::SideConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub graph: GraphConfig,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            graph: GraphConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HolorigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, HolorigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, HolorigError> {
        // Try config paths in order
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), HolorigError> {
        if self.capture.target_fps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.target_fps".to_string(),
                message: "Target fps must be greater than 0".to_string(),
            }
            .into());
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.width/height".to_string(),
                message: "Frame dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !matches!(self.graph.input_rotation, 0 | 90 | 180 | 270) {
            return Err(ConfigError::InvalidValue {
                field: "graph.input_rotation".to_string(),
                message: "Rotation must be 0, 90, 180 or 270 degrees".to_string(),
            }
            .into());
        }

        if !(0..=2).contains(&self.graph.model_complexity) {
            return Err(ConfigError::InvalidValue {
                field: "graph.model_complexity".to_string(),
                message: "Model complexity must be between 0 and 2".to_string(),
            }
            .into());
        }

        if self.session.registry_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.registry_capacity".to_string(),
                message: "Registry capacity must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Frame capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target inference rate in frames per second
    pub target_fps: u32,
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Inference graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Track hand landmarks in addition to pose and face
    pub track_hands: bool,
    /// Input rotation in degrees (0, 90, 180, 270)
    pub input_rotation: i32,
    /// Mirror the input horizontally
    pub flip_horizontal: bool,
    /// Mirror the input vertically
    pub flip_vertical: bool,
    /// Use the refined face mesh with iris landmarks
    pub refine_face_landmarks: bool,
    /// Pose model complexity (0 = lite, 1 = full, 2 = heavy)
    pub model_complexity: i32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            track_hands: true,
            input_rotation: 180,
            flip_horizontal: true,
            flip_vertical: false,
            refine_face_landmarks: true,
            model_complexity: 0,
        }
    }
}

impl GraphConfig {
    /// Side inputs for graph startup
    pub fn side_config(&self) -> SideConfig {
        SideConfig {
            input_rotation: self.input_rotation,
            input_horizontally_flipped: self.flip_horizontal,
            input_vertically_flipped: self.flip_vertical,
            refine_face_landmarks: self.refine_face_landmarks,
            model_complexity: self.model_complexity,
        }
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of concurrently registered sessions
    pub registry_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            registry_capacity: 20,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("holorig");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/holorig");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/holorig");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("holorig");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capture.target_fps, 30);
        assert_eq!(config.capture.width, 640);
        assert!(config.graph.track_hands);
        assert!(config.graph.flip_horizontal);
        assert_eq!(config.graph.input_rotation, 180);
        assert_eq!(config.session.registry_capacity, 20);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [capture]
            target_fps = 24
            width = 1280

            [graph]
            track_hands = false
            refine_face_landmarks = false
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.capture.target_fps, 24);
        assert_eq!(config.capture.width, 1280);
        // Unset fields keep their defaults.
        assert_eq!(config.capture.height, 480);
        assert!(!config.graph.track_hands);
        assert!(!config.graph.refine_face_landmarks);
        assert_eq!(config.graph.model_complexity, 0);
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let mut config = Config::default();
        config.graph.input_rotation = 45;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_fps_rejected() {
        let mut config = Config::default();
        config.capture.target_fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_side_config_mapping() {
        let mut config = Config::default();
        config.graph.flip_horizontal = false;
        config.graph.model_complexity = 1;

        let side = config.graph.side_config();
        assert!(!side.input_horizontally_flipped);
        assert_eq!(side.model_complexity, 1);
        assert_eq!(side.input_rotation, 180);
    }
}
