//! Configuration module for audioled-rs
//!
//! This module handles engine configuration including:
//! - Engine settings (graph dispatch, resolution, frame rate) stored as TOML
//! - Project files (.audioledproj) bundling settings with a saved graph
//!
//! # App Data Location
//!
//! The default engine configuration lives in the platform data directory:
//! - **Linux**: `~/.local/share/audioled-rs/`
//! - **macOS**: `~/Library/Application Support/audioled-rs/`
//! - **Windows**: `%APPDATA%\audioled-rs\`
//!
//! # Example
//!
//! ```ignore
//! use audioled_rs::config::{EngineConfig, ProjectFile};
//!
//! let config = EngineConfig::load_or_default(&audioled_rs::config::default_config_path()?);
//! let project = ProjectFile::load("show.audioledproj")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{AudioledError, Result};
use crate::graph::GraphState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "audioled-rs";

/// Engine configuration filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Project file extension
pub const PROJECT_FILE_EXTENSION: &str = "audioledproj";

/// Current project file format version
pub const PROJECT_VERSION: u32 = 1;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Path of the engine configuration inside the app data directory
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AudioledError::Config(format!("Failed to create directory {:?}: {}", parent, e))
        })?;
    }
    Ok(())
}

// ==================== Engine Config ====================

/// Complete engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub driver: DriverConfig,
}

impl EngineConfig {
    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AudioledError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            AudioledError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save as TOML, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| AudioledError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            AudioledError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }
}

// ==================== Project File ====================

/// Project file format for saving a complete show
///
/// Projects carry the engine settings alongside the serialized graph, so a
/// project reproduces both the effect chain and the output it was made for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Project file format version for future compatibility
    #[serde(default = "default_project_version")]
    pub version: u32,

    /// Project name
    #[serde(default)]
    pub name: String,

    /// Last save time
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,

    /// Engine settings
    #[serde(default)]
    pub config: EngineConfig,

    /// The filter graph
    #[serde(default)]
    pub graph: GraphState,
}

fn default_project_version() -> u32 {
    PROJECT_VERSION
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            version: PROJECT_VERSION,
            name: "Untitled Project".to_string(),
            saved_at: Utc::now(),
            config: EngineConfig::default(),
            graph: GraphState::default(),
        }
    }
}

impl ProjectFile {
    /// Create an empty project with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a project from a configuration and a graph snapshot
    pub fn from_parts(name: impl Into<String>, config: EngineConfig, graph: GraphState) -> Self {
        Self {
            version: PROJECT_VERSION,
            name: name.into(),
            saved_at: Utc::now(),
            config,
            graph,
        }
    }

    /// Load a project file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AudioledError::Config(format!("Failed to read project file {:?}: {}", path, e))
        })?;

        let project: Self = serde_json::from_str(&content).map_err(|e| {
            AudioledError::Config(format!("Failed to parse project file {:?}: {}", path, e))
        })?;
        if project.version > PROJECT_VERSION {
            tracing::warn!(
                "Project {:?} has format version {}, newer than {}",
                path,
                project.version,
                PROJECT_VERSION
            );
        }
        Ok(project)
    }

    /// Save the project as JSON, stamping the save time
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        self.saved_at = Utc::now();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AudioledError::Serialization(format!("Failed to serialize project: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            AudioledError::Config(format!("Failed to write project file {:?}: {}", path, e))
        })?;
        tracing::info!("Saved project '{}' to {:?}", self.name, path);
        Ok(())
    }
}
