//! Compositor configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! default_background = "#202020"
//! incremental = true
//! layer_warn_threshold = 256
//! screen_width = 640
//! screen_height = 480
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vellum_core::{Color, Size};

use crate::error::{CompositeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompositorConfig {
    /// Background for surfaces created without an explicit color, `#RRGGBB[AA]`
    #[serde(default = "default_background")]
    pub default_background: String,
    /// When false every composite redraws the whole visible area
    #[serde(default = "default_true")]
    pub incremental: bool,
    /// Warn once a layer set holds more layers than this
    #[serde(default = "default_layer_warn_threshold")]
    pub layer_warn_threshold: usize,
    #[serde(default = "default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "default_screen_height")]
    pub screen_height: i32,
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_layer_warn_threshold() -> usize {
    256
}

fn default_screen_width() -> i32 {
    640
}

fn default_screen_height() -> i32 {
    480
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            default_background: default_background(),
            incremental: default_true(),
            layer_warn_threshold: default_layer_warn_threshold(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

impl CompositorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CompositorConfig =
            toml::from_str(content).map_err(|e| CompositeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CompositeError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CompositeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.background_color()?;
        if !self.screen_size().is_valid() {
            return Err(CompositeError::Config(format!(
                "invalid screen size {}",
                self.screen_size()
            )));
        }
        Ok(())
    }

    pub fn background_color(&self) -> Result<Color> {
        Color::parse_hex(&self.default_background).ok_or_else(|| {
            CompositeError::Config(format!(
                "invalid default_background {:?}",
                self.default_background
            ))
        })
    }

    pub fn screen_size(&self) -> Size {
        Size::new(self.screen_width, self.screen_height)
    }
}
