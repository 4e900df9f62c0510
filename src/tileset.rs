//! Tile atlases and detail sprites
//!
//! The generator never loads art by itself; it indexes into atlases handed to
//! it. [`SpriteAtlas`] slices a sprite sheet region into equally sized
//! sub-tiles addressed by `(row, col)`, [`DetailBank`] holds decorative sprite
//! sets, and [`TileAssets`] bundles everything generation reads.

use std::collections::HashMap;
use std::path::Path;

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::marching::{CornerMask, MarchingLayout};
use crate::styles::{BaseLayer, StyleRegistry};

/// Default tile edge in pixels; quadrants are half of this
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Grass green used by placeholder art
pub const PLACEHOLDER_GRASS: Rgba<u8> = Rgba([92, 204, 97, 255]);
/// Dirt brown used by placeholder art and as the missing-base fallback
pub const PLACEHOLDER_DIRT: Rgba<u8> = Rgba([139, 69, 19, 255]);
/// Tilled soil used by placeholder art
pub const PLACEHOLDER_TILLED: Rgba<u8> = Rgba([66, 31, 19, 255]);

/// Source of marching sub-tiles.
pub trait AtlasProvider: Send + Sync {
    /// Sub-tiles per atlas row
    fn sheet_width(&self) -> usize;
    /// Total sub-tiles
    fn len(&self) -> usize;
    /// Edge length of every sub-tile in pixels
    fn sub_tile_size(&self) -> u32;
    fn get_subimage(&self, row: u32, col: u32) -> Option<&RgbaImage>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of decorative detail sprites.
pub trait DetailProvider: Send + Sync {
    /// A random sprite from set `key`, or `None` if the set is missing or empty.
    fn get_random_detail(&self, key: &str, rng: &mut dyn RngCore) -> Option<&RgbaImage>;
}

/// A sprite sheet region sliced into square sub-tiles.
#[derive(Clone, Debug)]
pub struct SpriteAtlas {
    tiles: Vec<RgbaImage>,
    sheet_width: usize,
    sub_tile_size: u32,
}

impl SpriteAtlas {
    /// Slice the region `(x, y, width, height)` of `img` into `cell` pixel
    /// squares, row by row, scaling each by `scale`.
    pub fn from_image(img: &DynamicImage, region: (u32, u32, u32, u32), cell: u32, scale: u32) -> Result<Self> {
        let (x0, y0, width, height) = region;
        if cell == 0 || scale == 0 {
            return Err(Error::InvalidConfig("atlas cell size and scale must be positive".into()));
        }
        if x0 + width > img.width() || y0 + height > img.height() {
            return Err(Error::InvalidConfig(format!(
                "atlas region {}x{} at ({}, {}) exceeds {}x{} sheet",
                width,
                height,
                x0,
                y0,
                img.width(),
                img.height()
            )));
        }

        let cols = width / cell;
        let rows = height / cell;
        let size = cell * scale;
        let mut tiles = Vec::with_capacity((cols * rows) as usize);

        for row in 0..rows {
            for col in 0..cols {
                let tile = img.crop_imm(x0 + col * cell, y0 + row * cell, cell, cell).to_rgba8();
                let tile = if scale == 1 {
                    tile
                } else {
                    imageops::resize(&tile, size, size, imageops::FilterType::Nearest)
                };
                tiles.push(tile);
            }
        }

        Ok(Self {
            tiles,
            sheet_width: cols as usize,
            sub_tile_size: size,
        })
    }

    /// Load a whole sheet file as an atlas.
    pub fn load(path: &Path, cell: u32, scale: u32) -> Result<Self> {
        let img = image::open(path)?;
        let region = (0, 0, img.width(), img.height());
        Self::from_image(&img, region, cell, scale)
    }

    /// Build from already sliced sub-tiles.
    pub fn from_tiles(tiles: Vec<RgbaImage>, sheet_width: usize, sub_tile_size: u32) -> Self {
        Self {
            tiles,
            sheet_width,
            sub_tile_size,
        }
    }

    /// Synthesize an atlas for `layout`: every referenced sub-tile is painted
    /// with the corner pattern of its mask, pre-rotated so that applying the
    /// entry's rotation yields the right shape. Unreferenced cells stay clear.
    pub fn placeholder(layout: &MarchingLayout, sheet_width: usize, rows: usize, size: u32, color: Rgba<u8>) -> Self {
        let mut tiles = vec![RgbaImage::new(size, size); sheet_width * rows];

        for (mask, entry) in layout.entries() {
            let index = entry.atlas_index(sheet_width);
            if entry.col as usize >= sheet_width || index >= tiles.len() {
                continue;
            }
            let Some(mask) = CornerMask::new(mask) else { continue };
            let art = mask.rotated((360 - entry.rotation % 360) % 360);
            tiles[index] = paint_corners(art, size, color);
        }

        Self {
            tiles,
            sheet_width,
            sub_tile_size: size,
        }
    }
}

/// Marching-squares contour of one mask: bilinear blend of the corner values,
/// foreground where the blend reaches one half.
fn paint_corners(mask: CornerMask, size: u32, color: Rgba<u8>) -> RgbaImage {
    let [nw, ne, sw, se] = mask.corners().map(|c| if c { 1.0f32 } else { 0.0 });
    RgbaImage::from_fn(size, size, |px, py| {
        let u = (px as f32 + 0.5) / size as f32;
        let v = (py as f32 + 0.5) / size as f32;
        let top = nw * (1.0 - u) + ne * u;
        let bottom = sw * (1.0 - u) + se * u;
        if top * (1.0 - v) + bottom * v >= 0.5 {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

impl AtlasProvider for SpriteAtlas {
    fn sheet_width(&self) -> usize {
        self.sheet_width
    }

    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn sub_tile_size(&self) -> u32 {
        self.sub_tile_size
    }

    fn get_subimage(&self, row: u32, col: u32) -> Option<&RgbaImage> {
        if col as usize >= self.sheet_width {
            return None;
        }
        self.tiles.get(row as usize * self.sheet_width + col as usize)
    }
}

/// Named sets of detail sprites (pebbles, flowers, tufts).
#[derive(Clone, Debug, Default)]
pub struct DetailBank {
    sets: HashMap<String, Vec<RgbaImage>>,
}

impl DetailBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, sprites: Vec<RgbaImage>) {
        self.sets.entry(key.into()).or_default().extend(sprites);
    }

    /// Slice a sheet region into detail sprites of `cell_w x cell_h` and add them to `key`.
    pub fn add_from_sheet(
        &mut self,
        key: &str,
        img: &DynamicImage,
        region: (u32, u32, u32, u32),
        cell: (u32, u32),
    ) {
        let (x0, y0, width, height) = region;
        let (cell_w, cell_h) = cell;
        if cell_w == 0 || cell_h == 0 {
            return;
        }
        let mut sprites = Vec::new();
        for row in 0..height / cell_h {
            for col in 0..width / cell_w {
                let (x, y) = (x0 + col * cell_w, y0 + row * cell_h);
                if x + cell_w <= img.width() && y + cell_h <= img.height() {
                    sprites.push(img.crop_imm(x, y, cell_w, cell_h).to_rgba8());
                }
            }
        }
        self.insert(key, sprites);
    }

    pub fn len(&self, key: &str) -> usize {
        self.sets.get(key).map_or(0, Vec::len)
    }
}

impl DetailProvider for DetailBank {
    fn get_random_detail(&self, key: &str, rng: &mut dyn RngCore) -> Option<&RgbaImage> {
        self.sets.get(key)?.choose(rng)
    }
}

/// Everything tile generation reads: atlases, base images, details, overlays.
pub struct TileAssets {
    pub tile_size: u32,
    atlases: HashMap<String, Box<dyn AtlasProvider>>,
    base_images: HashMap<String, RgbaImage>,
    details: Box<dyn DetailProvider>,
    tilled: Option<RgbaImage>,
}

impl TileAssets {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            atlases: HashMap::new(),
            base_images: HashMap::new(),
            details: Box::new(DetailBank::new()),
            tilled: None,
        }
    }

    pub fn with_atlas(mut self, name: impl Into<String>, atlas: impl AtlasProvider + 'static) -> Self {
        self.atlases.insert(name.into(), Box::new(atlas));
        self
    }

    pub fn with_base_image(mut self, key: impl Into<String>, image: RgbaImage) -> Self {
        self.base_images.insert(key.into(), image);
        self
    }

    pub fn with_details(mut self, details: impl DetailProvider + 'static) -> Self {
        self.details = Box::new(details);
        self
    }

    pub fn with_tilled_overlay(mut self, image: RgbaImage) -> Self {
        self.tilled = Some(image);
        self
    }

    pub fn atlas(&self, name: &str) -> Result<&dyn AtlasProvider> {
        self.atlases
            .get(name)
            .map(|a| a.as_ref())
            .ok_or_else(|| Error::MissingAtlas(name.to_string()))
    }

    pub fn base_image(&self, key: &str) -> Option<&RgbaImage> {
        self.base_images.get(key)
    }

    pub fn details(&self) -> &dyn DetailProvider {
        self.details.as_ref()
    }

    pub fn tilled_overlay(&self) -> Option<&RgbaImage> {
        self.tilled.as_ref()
    }

    /// Check every layout entry of every style against its atlas.
    ///
    /// Runs before generation so a corrupt or incomplete atlas stops the
    /// level from loading instead of producing broken tiles.
    pub fn validate(&self, registry: &StyleRegistry) -> Result<()> {
        if self.tile_size == 0 || self.tile_size % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "tile size {} must be even and positive",
                self.tile_size
            )));
        }
        let half = self.tile_size / 2;

        for (material, style) in &registry.styles {
            if let BaseLayer::Image(key) = &style.base {
                if self.base_image(key).is_none() {
                    log::warn!("Base image '{}' for {:?} is missing; tiles use a flat fill", key, material);
                }
            }

            let Some((atlas_name, layout_name)) = style.overlay() else {
                continue;
            };
            let atlas = self.atlas(atlas_name)?;
            let layout = registry.layout(layout_name)?;

            if atlas.sub_tile_size() != half {
                return Err(Error::SubImageSize {
                    atlas: atlas_name.to_string(),
                    expected: half,
                    found: atlas.sub_tile_size(),
                });
            }

            for (mask, entry) in layout.entries() {
                if atlas.get_subimage(entry.row, entry.col).is_none() {
                    return Err(Error::AtlasIndexOutOfRange {
                        atlas: atlas_name.to_string(),
                        mask,
                        row: entry.row,
                        col: entry.col,
                        index: entry.atlas_index(atlas.sheet_width()),
                        len: atlas.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Self-contained placeholder art for every style in `registry`, so levels
    /// can be generated and exported without sprite sheets.
    pub fn placeholder(registry: &StyleRegistry, tile_size: u32) -> Self {
        let half = tile_size / 2;
        let mut assets = TileAssets::new(tile_size);

        for style in registry.styles.values() {
            if let BaseLayer::Image(key) = &style.base {
                assets
                    .base_images
                    .entry(key.clone())
                    .or_insert_with(|| RgbaImage::from_pixel(tile_size, tile_size, PLACEHOLDER_DIRT));
            }
            let Some((atlas_name, layout_name)) = style.overlay() else {
                continue;
            };
            if assets.atlases.contains_key(atlas_name) {
                continue;
            }
            if let Ok(layout) = registry.layout(layout_name) {
                let (cols, rows) = layout_extent(layout);
                let atlas = SpriteAtlas::placeholder(layout, cols, rows, half, PLACEHOLDER_GRASS);
                assets.atlases.insert(atlas_name.to_string(), Box::new(atlas));
            }
        }

        let mut details = DetailBank::new();
        details.insert("Grass", vec![
            dot_sprite(tile_size / 4, Rgba([255, 215, 0, 255])),
            dot_sprite(tile_size / 6, Rgba([250, 250, 250, 255])),
        ]);
        details.insert("Dirt", vec![dot_sprite(tile_size / 5, Rgba([150, 150, 150, 255]))]);
        assets.details = Box::new(details);

        let inset = tile_size * 3 / 4;
        assets.tilled = Some(RgbaImage::from_pixel(inset, inset, PLACEHOLDER_TILLED));
        assets
    }
}

/// Columns and rows needed to hold every entry of `layout`.
fn layout_extent(layout: &MarchingLayout) -> (usize, usize) {
    layout.entries().fold((1, 1), |(cols, rows), (_, e)| {
        (cols.max(e.col as usize + 1), rows.max(e.row as usize + 1))
    })
}

fn dot_sprite(size: u32, color: Rgba<u8>) -> RgbaImage {
    let size = size.max(2);
    let r = size as f32 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - r;
        let dy = y as f32 + 0.5 - r;
        if dx * dx + dy * dy <= r * r {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
