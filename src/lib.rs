//! Marching-squares terrain generation library
//!
//! Carves a node map of materials, then turns it into a grid of composited
//! tiles whose edges blend through per-quadrant corner masks.

pub mod assemble;
pub mod carve;
pub mod config;
pub mod error;
pub mod export;
pub mod level;
pub mod logging;
pub mod marching;
pub mod material;
pub mod node_map;
pub mod seeds;
pub mod styles;
pub mod tilemap;
pub mod tileset;

pub use config::LevelConfig;
pub use error::{Error, Result};
pub use level::{generate_level, Level, MapSource, Tile};
pub use material::Material;
pub use node_map::NodeMap;
pub use seeds::LevelSeeds;
pub use styles::StyleRegistry;
pub use tileset::TileAssets;
