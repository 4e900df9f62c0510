//! Level generation settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carve::{BlobParams, PondParams};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::node_map::MIN_NODE_DIM;
use crate::tileset::DEFAULT_TILE_SIZE;

/// Tuning for node map carving and tile generation.
///
/// Loadable from JSON; omitted fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Edge length of a generated node map, in nodes
    pub map_size: usize,
    /// Material the node map starts as
    pub base_material: Material,
    /// Material stamped by the carve passes
    pub carve_material: Material,
    /// Blob passes applied in order, usually largest first
    pub carves: Vec<BlobParams>,
    /// Water passes applied after the blobs
    pub ponds: Vec<PondParams>,
    /// Material counted as active in corner masks
    pub foreground: Material,
    /// Probability that a uniform tile receives a detail sprite
    pub detail_chance: f64,
    /// Window nodes (of 9) that must match the center before details are allowed
    pub detail_majority: usize,
    /// Tile edge in pixels
    pub tile_size: u32,
    /// Tile-grid coordinate where the player starts
    pub spawn_tile: (usize, usize),
    /// Generate tiles on the rayon pool
    pub parallel: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            map_size: 32,
            base_material: Material::Grass,
            carve_material: Material::Dirt,
            carves: vec![
                BlobParams::new(8, 4),
                BlobParams::new(4, 1),
                BlobParams::new(4, 0),
            ],
            ponds: Vec::new(),
            foreground: Material::Grass,
            detail_chance: 0.2,
            detail_majority: 6,
            tile_size: DEFAULT_TILE_SIZE,
            spawn_tile: (1, 1),
            parallel: true,
        }
    }
}

impl LevelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LevelConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.map_size < MIN_NODE_DIM {
            return Err(Error::InvalidConfig(format!(
                "map_size {} is below the minimum of {}",
                self.map_size, MIN_NODE_DIM
            )));
        }
        if self.tile_size == 0 || self.tile_size % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "tile_size {} must be even and positive",
                self.tile_size
            )));
        }
        if !(0.0..=1.0).contains(&self.detail_chance) {
            return Err(Error::InvalidConfig(format!(
                "detail_chance {} must be within [0, 1]",
                self.detail_chance
            )));
        }
        if self.detail_majority > 9 {
            return Err(Error::InvalidConfig(format!(
                "detail_majority {} exceeds the 9 nodes of a window",
                self.detail_majority
            )));
        }
        Ok(())
    }
}
