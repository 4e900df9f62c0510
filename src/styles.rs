//! Data-driven terrain styles.
//!
//! A style decides how a tile whose center node is a given material is drawn:
//! its base layer, which atlas and marching layout supply the blended overlay,
//! which detail sprites may be scattered on it, and whether it blocks movement.
//! Defaults are embedded in the binary via `include_str!`; a `styles.json` in
//! an override directory can replace or add layouts and styles.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::marching::MarchingLayout;
use crate::material::Material;

const DEFAULT_STYLES_JSON: &str = include_str!("../data/defaults/styles.json");

/// Name of the override file looked up by [`StyleRegistry::load_from`].
pub const STYLES_FILE: &str = "styles.json";

/// Bottom layer of a composited tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseLayer {
    /// A full-tile image looked up by key
    Image(String),
    /// A flat RGBA color
    Fill([u8; 4]),
}

/// How tiles of one center material are drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainStyle {
    pub base: BaseLayer,
    /// Atlas supplying marching sub-tiles; `None` disables the overlay
    #[serde(default)]
    pub atlas: Option<String>,
    /// Layout name in the registry, required when `atlas` is set
    #[serde(default)]
    pub layout: Option<String>,
    /// Detail sprite set scattered on uniform tiles
    #[serde(default)]
    pub detail_key: Option<String>,
    #[serde(default)]
    pub obstructed: bool,
    #[serde(default)]
    pub tillable: bool,
}

impl TerrainStyle {
    /// Atlas and layout names when this style draws a marching overlay.
    pub fn overlay(&self) -> Option<(&str, &str)> {
        match (&self.atlas, &self.layout) {
            (Some(atlas), Some(layout)) => Some((atlas.as_str(), layout.as_str())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StylesFile {
    #[serde(default)]
    layouts: BTreeMap<String, MarchingLayout>,
    #[serde(default)]
    styles: BTreeMap<Material, TerrainStyle>,
}

/// All marching layouts and per-material styles of a world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRegistry {
    pub layouts: BTreeMap<String, MarchingLayout>,
    pub styles: BTreeMap<Material, TerrainStyle>,
}

impl StyleRegistry {
    /// Load from the defaults compiled into the binary.
    pub fn defaults() -> Result<Self> {
        let file: StylesFile = serde_json::from_str(DEFAULT_STYLES_JSON)?;
        let registry = Self {
            layouts: file.layouts,
            styles: file.styles,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Parse a complete registry from JSON, without merging defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: StylesFile = serde_json::from_str(json)?;
        let registry = Self {
            layouts: file.layouts,
            styles: file.styles,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Load defaults, then merge `styles.json` from `dir` if present.
    ///
    /// Layouts and styles in the file replace defaults of the same name.
    /// An unreadable or malformed file is reported and ignored.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut registry = Self::defaults()?;

        let path = dir.join(STYLES_FILE);
        if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|s| serde_json::from_str::<StylesFile>(&s).map_err(Error::from))
            {
                Ok(file) => {
                    log::info!(
                        "Loaded {} layouts and {} styles from {}",
                        file.layouts.len(),
                        file.styles.len(),
                        path.display()
                    );
                    registry.layouts.extend(file.layouts);
                    registry.styles.extend(file.styles);
                }
                Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
            }
        }

        registry.validate()?;
        Ok(registry)
    }

    pub fn style(&self, material: Material) -> Result<&TerrainStyle> {
        self.styles.get(&material).ok_or(Error::MissingStyle(material))
    }

    pub fn layout(&self, name: &str) -> Result<&MarchingLayout> {
        self.layouts
            .get(name)
            .ok_or_else(|| Error::MissingLayout(name.to_string()))
    }

    /// Every layout is well formed and every style's layout exists.
    pub fn validate(&self) -> Result<()> {
        for (name, layout) in &self.layouts {
            layout.validate(name)?;
            let missing = layout.missing_masks();
            if !missing.is_empty() {
                log::warn!(
                    "Layout '{}' has no entry for masks {:?}; they will use the fallback",
                    name,
                    missing.iter().map(|m| m.bits()).collect::<Vec<_>>()
                );
            }
        }
        for (material, style) in &self.styles {
            if style.atlas.is_some() != style.layout.is_some() {
                return Err(Error::InvalidConfig(format!(
                    "style for {:?} must set both atlas and layout, or neither",
                    material
                )));
            }
            if let Some(layout) = &style.layout {
                self.layout(layout)?;
            }
        }
        Ok(())
    }
}
