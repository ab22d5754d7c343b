use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// Rendering settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory for per-node image files, created on demand.
    pub scratch_dir: PathBuf,
    /// Graphviz program used for layout and drawing.
    pub layout_program: String,
    /// Size of image value nodes, in inches.
    pub image_width: f64,
    pub image_height: f64,
    /// Shape of text and image value nodes.
    pub value_shape: String,
    /// Arrays smaller than this on their short side are upscaled.
    pub min_image_pixels: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("_treedata"),
            layout_program: "dot".to_string(),
            image_width: 2.0,
            image_height: 2.0,
            value_shape: "plaintext".to_string(),
            min_image_pixels: 64,
        }
    }
}

impl RenderConfig {
    /// Load from a JSON file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TreeError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config: RenderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout_program.trim().is_empty() {
            return Err(TreeError::Config("layout_program must not be empty".to_string()));
        }
        if !(self.image_width > 0.0 && self.image_height > 0.0) {
            return Err(TreeError::Config(format!(
                "image size must be positive, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        Ok(())
    }
}
