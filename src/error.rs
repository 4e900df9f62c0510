//! Error types for terrain generation

use thiserror::Error;

use crate::material::Material;

/// Main error type for the generator
#[derive(Debug, Error)]
pub enum Error {
    #[error("node map is {width}x{height}, but at least 3x3 nodes are needed to form a tile")]
    MapTooSmall { width: usize, height: usize },

    #[error("node map row {row} has {found} nodes, expected {expected}")]
    RaggedNodeMap {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown material code {0}")]
    UnknownMaterial(u8),

    #[error("no terrain style registered for {0:?}")]
    MissingStyle(Material),

    #[error("marching layout '{0}' is not registered")]
    MissingLayout(String),

    #[error("tile atlas '{0}' is not loaded")]
    MissingAtlas(String),

    #[error(
        "atlas '{atlas}' has {len} sub-tiles, but mask {mask} references ({row}, {col}) = index {index}"
    )]
    AtlasIndexOutOfRange {
        atlas: String,
        mask: u8,
        row: u32,
        col: u32,
        index: usize,
        len: usize,
    },

    #[error("rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(u32),

    #[error("atlas '{atlas}' sub-tiles are {found}px, expected {expected}px")]
    SubImageSize {
        atlas: String,
        expected: u32,
        found: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
