//! # Engine Configuration
//!
//! Serializable settings consumed by [`crate::sdk::Sdk`] and the render system.
//! Files are loaded through the [`Config`] trait (TOML or RON).
//!
//! ```toml
//! log_level = "debug"
//! server_mode = false
//!
//! [render]
//! technique = "Deferred"
//! max_lights_per_pass = 3
//! light_meshes_drawing = false
//! ambient_color = { r = 25, g = 25, b = 25, a = 255 }
//! background_color = { r = 0, g = 0, b = 0, a = 255 }
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::color::Color;

/// Which render technique the render system drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TechniqueKind {
    /// Multi-pass forward shading, a few lights per pass
    #[default]
    Forward,
    /// G-buffer geometry pass followed by Phong light accumulation
    Deferred,
}

/// # Render Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Active render technique
    pub technique: TechniqueKind,
    /// Scene ambient colour
    pub ambient_color: Color,
    /// Clear colour used when a camera has no custom background
    pub background_color: Color,
    /// Lights shaded per forward pass
    pub max_lights_per_pass: usize,
    /// Draw light volumes as wireframes on top of the deferred lighting
    pub light_meshes_drawing: bool,
}

impl RenderConfig {
    /// Create a new render configuration
    pub fn new() -> Self {
        Self {
            technique: TechniqueKind::Forward,
            ambient_color: Color::rgb(25, 25, 25),
            background_color: Color::BLACK,
            max_lights_per_pass: 3,
            light_meshes_drawing: false,
        }
    }

    /// Set the render technique
    pub fn with_technique(mut self, technique: TechniqueKind) -> Self {
        self.technique = technique;
        self
    }

    /// Enable or disable light volume debug drawing
    pub fn with_light_meshes_drawing(mut self, enabled: bool) -> Self {
        self.light_meshes_drawing = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lights_per_pass == 0 {
            return Err(ConfigError::Invalid("max_lights_per_pass must be at least 1".to_string()));
        }

        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// Core engine behavior: logging and which module set is brought up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Headless mode, client-only modules, components and systems are skipped
    pub server_mode: bool,
    /// Rendering configuration
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            server_mode: false,
            render: RenderConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable server mode
    pub fn with_server_mode(mut self, enabled: bool) -> Self {
        self.server_mode = enabled;
        self
    }

    /// Set the render configuration
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }

        self.render.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
