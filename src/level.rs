//! Level orchestration
//!
//! Turns a node map into a grid of composited tiles:
//! 1. Read the 3x3 node window of each tile
//! 2. Pick the terrain style from the window's center material
//! 3. Resolve the four quadrant masks against the style's marching layout
//! 4. Roll for a detail sprite on uniform tiles
//! 5. Composite the tile image
//!
//! Every random draw is seeded from the tile's grid coordinate, so tiles can
//! be produced on the rayon pool without changing the result.

use image::RgbaImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::assemble::{self, QuadrantLayer, TileLayers};
use crate::config::LevelConfig;
use crate::error::{Error, Result};
use crate::marching::{self, CornerMask, ResolvedQuadrant};
use crate::material::Material;
use crate::node_map::{self, NodeMap};
use crate::seeds::LevelSeeds;
use crate::styles::{StyleRegistry, TerrainStyle};
use crate::tileset::TileAssets;

/// A generated terrain tile.
#[derive(Clone, Debug)]
pub struct Tile {
    /// Tile-grid coordinate `(tx, ty)`
    pub grid_position: (usize, usize),
    /// Top-left corner in pixels
    pub pixel_position: (u32, u32),
    /// Center material of the window, which selected the style
    pub material: Material,
    pub image: RgbaImage,
    /// Blocks movement (water)
    pub obstructed: bool,
    /// Farming overlay state
    pub tilled: bool,
    /// The 3x3 node window the tile was last drawn from
    pub window: [Material; 9],
    /// Masks and baked variant choices, for styles with a marching layout
    pub quadrants: Option<[ResolvedQuadrant; 4]>,
    /// Baked detail sprite, drawn while the tile is untilled
    pub detail: Option<RgbaImage>,
    seed: u64,
}

impl Tile {
    pub fn masks(&self) -> Option<[CornerMask; 4]> {
        self.quadrants.map(|q| q.map(|r| r.mask))
    }
}

/// Where the node map of a new level comes from.
#[derive(Clone, Debug)]
pub enum MapSource {
    /// Carve a fresh map from the level seeds
    Generate,
    /// Use a supplied (e.g. loaded) map
    Supplied(NodeMap),
}

/// Shared, read-only inputs of tile generation.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    pub config: &'a LevelConfig,
    pub styles: &'a StyleRegistry,
    pub assets: &'a TileAssets,
    pub seeds: &'a LevelSeeds,
}

fn foreground_window(window: &[Material; 9], foreground: Material) -> [bool; 9] {
    window.map(|m| m == foreground)
}

/// Draw a tile's image from its current state.
fn render_tile(tile: &Tile, style: &TerrainStyle, ctx: &GenerationContext<'_>) -> Result<RgbaImage> {
    let fg = foreground_window(&tile.window, ctx.config.foreground);

    // No overlay at all when none of the nine nodes is foreground
    let marching = match (style.overlay(), &tile.quadrants) {
        (Some((atlas_name, _)), Some(quadrants)) if fg.iter().any(|&b| b) => Some(QuadrantLayer {
            atlas_name,
            atlas: ctx.assets.atlas(atlas_name)?,
            quadrants,
        }),
        _ => None,
    };

    let layers = TileLayers {
        base: &style.base,
        marching,
        tilled: tile.tilled,
        tilled_overlay: ctx.assets.tilled_overlay(),
        detail: tile.detail.as_ref(),
    };
    assemble::assemble_tile(&layers, ctx.assets)
}

fn resolve_for_style(
    style: &TerrainStyle,
    window: &[Material; 9],
    seed: u64,
    ctx: &GenerationContext<'_>,
) -> Result<Option<[ResolvedQuadrant; 4]>> {
    let Some((_, layout_name)) = style.overlay() else {
        return Ok(None);
    };
    let layout = ctx.styles.layout(layout_name)?;
    let fg = foreground_window(window, ctx.config.foreground);
    Ok(Some(marching::resolve_quadrants(&fg, layout, seed)))
}

/// Roll for a detail sprite. Only tiles whose window mostly matches the
/// center get one, which keeps transition tiles clean.
fn pick_detail(
    style: &TerrainStyle,
    window: &[Material; 9],
    tx: usize,
    ty: usize,
    ctx: &GenerationContext<'_>,
) -> Option<RgbaImage> {
    let key = style.detail_key.as_deref()?;
    let center = window[4];
    let same_type_count = window.iter().filter(|&&m| m == center).count();
    if same_type_count < ctx.config.detail_majority {
        return None;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(ctx.seeds.detail_seed(tx, ty));
    if rng.gen::<f64>() >= ctx.config.detail_chance {
        return None;
    }
    ctx.assets.details().get_random_detail(key, &mut rng).cloned()
}

fn build_tile(node_map: &NodeMap, tx: usize, ty: usize, ctx: &GenerationContext<'_>) -> Result<Tile> {
    let window = node_map.tile_window(tx, ty).ok_or(Error::MapTooSmall {
        width: node_map.width,
        height: node_map.height,
    })?;
    let material = window[4];
    let style = ctx.styles.style(material)?;
    let seed = ctx.seeds.tile_seed(tx, ty);
    let size = ctx.config.tile_size;

    let mut tile = Tile {
        grid_position: (tx, ty),
        pixel_position: (tx as u32 * size, ty as u32 * size),
        material,
        image: RgbaImage::new(0, 0),
        obstructed: style.obstructed,
        tilled: false,
        window,
        quadrants: resolve_for_style(style, &window, seed, ctx)?,
        detail: pick_detail(style, &window, tx, ty, ctx),
        seed,
    };
    tile.image = render_tile(&tile, style, ctx)?;
    Ok(tile)
}

/// Generate every tile of `node_map`, row-major, plus the spawn pixel position.
pub fn generate(node_map: &NodeMap, ctx: &GenerationContext<'_>) -> Result<(Vec<Tile>, (u32, u32))> {
    node_map.validate_dimensions()?;
    let (cols, rows) = node_map.tile_dims();
    let count = cols * rows;

    let tiles = if ctx.config.parallel {
        (0..count)
            .into_par_iter()
            .map(|i| build_tile(node_map, i % cols, i / cols, ctx))
            .collect::<Result<Vec<_>>>()?
    } else {
        (0..count)
            .map(|i| build_tile(node_map, i % cols, i / cols, ctx))
            .collect::<Result<Vec<_>>>()?
    };

    let (sx, sy) = spawn_tile(ctx.config.spawn_tile, cols, rows);
    let size = ctx.config.tile_size;
    Ok((tiles, (sx as u32 * size, sy as u32 * size)))
}

/// Clamp the configured spawn tile into a `cols x rows` grid.
fn spawn_tile(requested: (usize, usize), cols: usize, rows: usize) -> (usize, usize) {
    (
        requested.0.min(cols.saturating_sub(1)),
        requested.1.min(rows.saturating_sub(1)),
    )
}

/// Redraw a tile after its node window changed (tilling, terrain edits).
///
/// The tile keeps its grid identity and, for quadrants whose mask did not
/// change, its baked variant choice. Calling this twice with the same window
/// produces the same image.
pub fn regenerate_tile_visual(tile: &mut Tile, window: &[Material; 9], ctx: &GenerationContext<'_>) -> Result<()> {
    let material = window[4];
    let style = ctx.styles.style(material)?;
    let fg = foreground_window(window, ctx.config.foreground);

    if material != tile.material {
        tile.quadrants = resolve_for_style(style, window, tile.seed, ctx)?;
        tile.detail = None;
        tile.material = material;
        tile.obstructed = style.obstructed;
    } else if let (Some(previous), Some((_, layout_name))) = (&tile.quadrants, style.overlay()) {
        let layout = ctx.styles.layout(layout_name)?;
        tile.quadrants = Some(marching::reresolve_quadrants(previous, &fg, layout, tile.seed));
    }

    if !style.tillable {
        tile.tilled = false;
    }
    tile.window = *window;
    tile.image = render_tile(tile, style, ctx)?;
    Ok(())
}

/// A generated level: the node map and every tile drawn from it.
pub struct Level {
    pub node_map: NodeMap,
    /// Row-major, `columns * rows` long
    pub tiles: Vec<Tile>,
    pub columns: usize,
    pub rows: usize,
    pub spawn_tile: (usize, usize),
    /// Pixel position where the player starts
    pub spawn_position: (u32, u32),
    pub seeds: LevelSeeds,
    pub config: LevelConfig,
    pub styles: StyleRegistry,
}

/// Build a level end to end: validate the configuration and assets, obtain the
/// node map, and generate all tiles.
pub fn generate_level(
    source: MapSource,
    seeds: LevelSeeds,
    config: LevelConfig,
    styles: StyleRegistry,
    assets: &TileAssets,
) -> Result<Level> {
    config.validate()?;
    if assets.tile_size != config.tile_size {
        return Err(Error::InvalidConfig(format!(
            "assets are built for {}px tiles, config asks for {}px",
            assets.tile_size, config.tile_size
        )));
    }
    assets.validate(&styles)?;

    let node_map = match source {
        MapSource::Generate => {
            log::info!("Generating new {}x{} node map", config.map_size, config.map_size);
            let mut rng = ChaCha8Rng::seed_from_u64(seeds.carve);
            node_map::create_node_map_with_ponds(
                config.map_size,
                config.base_material,
                config.carve_material,
                &config.carves,
                &config.ponds,
                &mut rng,
            )
        }
        MapSource::Supplied(map) => {
            log::info!("Using supplied {}x{} node map", map.width, map.height);
            map
        }
    };
    node_map.validate_dimensions()?;

    let ctx = GenerationContext {
        config: &config,
        styles: &styles,
        assets,
        seeds: &seeds,
    };
    let (tiles, spawn_position) = generate(&node_map, &ctx)?;
    let (columns, rows) = node_map.tile_dims();
    let spawn_tile = spawn_tile(config.spawn_tile, columns, rows);

    log::info!(
        "Level generated: {}x{} tiles, spawn at tile {:?}",
        columns,
        rows,
        spawn_tile
    );

    Ok(Level {
        node_map,
        tiles,
        columns,
        rows,
        spawn_tile,
        spawn_position,
        seeds,
        config,
        styles,
    })
}

impl Level {
    fn index(&self, tx: usize, ty: usize) -> Option<usize> {
        (tx < self.columns && ty < self.rows).then(|| ty * self.columns + tx)
    }

    pub fn tile(&self, tx: usize, ty: usize) -> Option<&Tile> {
        self.index(tx, ty).map(|i| &self.tiles[i])
    }

    /// The tile under pixel `(x, y)`, for collision lookups.
    pub fn tile_at_pixel(&self, x: u32, y: u32) -> Option<&Tile> {
        let size = self.config.tile_size;
        self.tile((x / size) as usize, (y / size) as usize)
    }

    /// Redraw tile `(tx, ty)` from the current node map.
    pub fn retile(&mut self, tx: usize, ty: usize, assets: &TileAssets) -> Result<()> {
        let (Some(i), Some(window)) = (self.index(tx, ty), self.node_map.tile_window(tx, ty)) else {
            return Ok(());
        };
        let ctx = GenerationContext {
            config: &self.config,
            styles: &self.styles,
            assets,
            seeds: &self.seeds,
        };
        regenerate_tile_visual(&mut self.tiles[i], &window, &ctx)
    }

    /// Till a ground tile. Returns `false` if the tile does not exist or its
    /// style is not tillable.
    pub fn till(&mut self, tx: usize, ty: usize, assets: &TileAssets) -> Result<bool> {
        let Some(i) = self.index(tx, ty) else {
            return Ok(false);
        };
        let style = self.styles.style(self.tiles[i].material)?;
        if !style.tillable {
            return Ok(false);
        }
        self.tiles[i].tilled = true;
        self.retile(tx, ty, assets)?;
        Ok(true)
    }

    /// Change one node and redraw every tile whose window contains it.
    /// Returns the redrawn tiles.
    pub fn set_node(&mut self, x: usize, y: usize, material: Material, assets: &TileAssets) -> Result<Vec<(usize, usize)>> {
        if !self.node_map.in_bounds(x, y) {
            return Ok(Vec::new());
        }
        self.node_map.set(x, y, material);
        let touched = self.node_map.tiles_touching(x, y);
        for &(tx, ty) in &touched {
            self.retile(tx, ty, assets)?;
        }
        log::debug!("Node ({}, {}) set to {:?}, retiled {} tiles", x, y, material, touched.len());
        Ok(touched)
    }
}
