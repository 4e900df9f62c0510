//! Tile compositing.
//!
//! Layers, bottom to top:
//! 1. the style's base layer (full-tile image or flat fill)
//! 2. the tilled-soil overlay, centered, when the tile is tilled and one is supplied
//! 3. the four marching sub-tiles at their quadrant offsets, each rotated
//! 4. a static detail sprite, centered, only on untilled tiles
//!
//! Grass curves over tilled soil because the marching layer sits above it.

use std::borrow::Cow;

use image::{imageops, RgbaImage};

use crate::error::{Error, Result};
use crate::marching::{Quadrant, ResolvedQuadrant};
use crate::styles::BaseLayer;
use crate::tileset::{AtlasProvider, TileAssets, PLACEHOLDER_DIRT};

/// The marching layer of a tile: resolved quadrants and the atlas they index.
pub struct QuadrantLayer<'a> {
    pub atlas_name: &'a str,
    pub atlas: &'a dyn AtlasProvider,
    pub quadrants: &'a [ResolvedQuadrant; 4],
}

/// Everything that goes into one tile image.
pub struct TileLayers<'a> {
    pub base: &'a BaseLayer,
    pub marching: Option<QuadrantLayer<'a>>,
    /// Farmed state; hides the detail even without an overlay image
    pub tilled: bool,
    pub tilled_overlay: Option<&'a RgbaImage>,
    pub detail: Option<&'a RgbaImage>,
}

/// Rotate counter-clockwise by a multiple of 90 degrees.
pub fn rotate_ccw(img: &RgbaImage, degrees: u32) -> Result<Cow<'_, RgbaImage>> {
    match degrees % 360 {
        0 => Ok(Cow::Borrowed(img)),
        90 => Ok(Cow::Owned(imageops::rotate270(img))),
        180 => Ok(Cow::Owned(imageops::rotate180(img))),
        270 => Ok(Cow::Owned(imageops::rotate90(img))),
        other => Err(Error::InvalidRotation(other)),
    }
}

fn base_image(base: &BaseLayer, assets: &TileAssets) -> RgbaImage {
    let size = assets.tile_size;
    match base {
        BaseLayer::Fill(rgba) => RgbaImage::from_pixel(size, size, image::Rgba(*rgba)),
        BaseLayer::Image(key) => match assets.base_image(key) {
            Some(img) if img.dimensions() == (size, size) => img.clone(),
            Some(img) => imageops::resize(img, size, size, imageops::FilterType::Nearest),
            None => RgbaImage::from_pixel(size, size, PLACEHOLDER_DIRT),
        },
    }
}

fn overlay_centered(canvas: &mut RgbaImage, sprite: &RgbaImage) {
    let x = (canvas.width() as i64 - sprite.width() as i64) / 2;
    let y = (canvas.height() as i64 - sprite.height() as i64) / 2;
    imageops::overlay(canvas, sprite, x, y);
}

/// Composite one tile. Pure: the same layers always give the same image.
pub fn assemble_tile(layers: &TileLayers<'_>, assets: &TileAssets) -> Result<RgbaImage> {
    let mut canvas = base_image(layers.base, assets);
    let half = assets.tile_size / 2;

    if layers.tilled {
        if let Some(overlay) = layers.tilled_overlay {
            overlay_centered(&mut canvas, overlay);
        }
    }

    if let Some(marching) = &layers.marching {
        for quadrant in Quadrant::ALL {
            let resolved = marching.quadrants[quadrant.index()];
            let entry = resolved.entry;
            let sub_tile = marching
                .atlas
                .get_subimage(entry.row, entry.col)
                .ok_or_else(|| Error::AtlasIndexOutOfRange {
                    atlas: marching.atlas_name.to_string(),
                    mask: resolved.mask.bits(),
                    row: entry.row,
                    col: entry.col,
                    index: entry.atlas_index(marching.atlas.sheet_width()),
                    len: marching.atlas.len(),
                })?;
            let sub_tile = rotate_ccw(sub_tile, entry.rotation)?;
            let (x, y) = quadrant.offset(half);
            imageops::overlay(&mut canvas, sub_tile.as_ref(), x as i64, y as i64);
        }
    }

    if !layers.tilled {
        if let Some(detail) = layers.detail {
            overlay_centered(&mut canvas, detail);
        }
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marching::{CornerMask, VariantEntry};
    use crate::tileset::{SpriteAtlas, PLACEHOLDER_TILLED};
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// Two 4px sub-tiles: a solid red one, and a clear one with a blue top row.
    fn test_atlas() -> SpriteAtlas {
        let solid = RgbaImage::from_pixel(4, 4, RED);
        let marked = RgbaImage::from_fn(4, 4, |_, y| if y == 0 { BLUE } else { CLEAR });
        SpriteAtlas::from_tiles(vec![solid, marked], 2, 4)
    }

    fn resolved(entry: VariantEntry) -> [ResolvedQuadrant; 4] {
        [ResolvedQuadrant { mask: CornerMask::FULL, entry }; 4]
    }

    #[test]
    fn test_rotation_directions() {
        let img = RgbaImage::from_fn(2, 2, |x, y| if (x, y) == (1, 0) { BLUE } else { CLEAR });
        // top-right pixel moves to top-left after a quarter turn counter-clockwise
        assert_eq!(*rotate_ccw(&img, 90).unwrap().get_pixel(0, 0), BLUE);
        assert_eq!(*rotate_ccw(&img, 180).unwrap().get_pixel(0, 1), BLUE);
        assert_eq!(*rotate_ccw(&img, 270).unwrap().get_pixel(1, 1), BLUE);
        assert!(matches!(rotate_ccw(&img, 0).unwrap(), Cow::Borrowed(_)));
        assert!(rotate_ccw(&img, 45).is_err());
    }

    #[test]
    fn test_quadrants_cover_tile() {
        let assets = TileAssets::new(8);
        let atlas = test_atlas();
        let quadrants = resolved(VariantEntry::new(0, 0));
        let layers = TileLayers {
            base: &BaseLayer::Fill([0, 255, 0, 255]),
            marching: Some(QuadrantLayer { atlas_name: "test", atlas: &atlas, quadrants: &quadrants }),
            tilled: false,
            tilled_overlay: None,
            detail: None,
        };
        let tile = assemble_tile(&layers, &assets).unwrap();
        assert_eq!(tile.dimensions(), (8, 8));
        assert!(tile.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_transparent_subtile_shows_base_and_rotation_applies() {
        let assets = TileAssets::new(8);
        let atlas = test_atlas();
        let quadrants = resolved(VariantEntry::rotated(0, 1, 180));
        let layers = TileLayers {
            base: &BaseLayer::Fill([0, 255, 0, 255]),
            marching: Some(QuadrantLayer { atlas_name: "test", atlas: &atlas, quadrants: &quadrants }),
            tilled: false,
            tilled_overlay: None,
            detail: None,
        };
        let tile = assemble_tile(&layers, &assets).unwrap();
        // blue row now sits at the bottom of each quadrant
        assert_eq!(*tile.get_pixel(0, 3), BLUE);
        assert_eq!(*tile.get_pixel(5, 7), BLUE);
        assert_eq!(*tile.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_bad_atlas_index_is_error() {
        let assets = TileAssets::new(8);
        let atlas = test_atlas();
        let quadrants = resolved(VariantEntry::new(5, 0));
        let layers = TileLayers {
            base: &BaseLayer::Fill([0, 0, 0, 255]),
            marching: Some(QuadrantLayer { atlas_name: "test", atlas: &atlas, quadrants: &quadrants }),
            tilled: false,
            tilled_overlay: None,
            detail: None,
        };
        assert!(matches!(
            assemble_tile(&layers, &assets),
            Err(Error::AtlasIndexOutOfRange { index: 10, len: 2, .. })
        ));
    }

    #[test]
    fn test_detail_centered_and_hidden_when_tilled() {
        let assets = TileAssets::new(8);
        let detail = RgbaImage::from_pixel(2, 2, BLUE);
        let tilled = RgbaImage::from_pixel(4, 4, PLACEHOLDER_TILLED);
        let base = BaseLayer::Fill([0, 255, 0, 255]);

        let plain = assemble_tile(
            &TileLayers { base: &base, marching: None, tilled: false, tilled_overlay: None, detail: Some(&detail) },
            &assets,
        )
        .unwrap();
        assert_eq!(*plain.get_pixel(3, 3), BLUE);
        assert_eq!(*plain.get_pixel(4, 4), BLUE);
        assert_eq!(*plain.get_pixel(2, 2), Rgba([0, 255, 0, 255]));

        let farmed = assemble_tile(
            &TileLayers { base: &base, marching: None, tilled: true, tilled_overlay: Some(&tilled), detail: Some(&detail) },
            &assets,
        )
        .unwrap();
        assert_eq!(*farmed.get_pixel(3, 3), PLACEHOLDER_TILLED);
        assert_eq!(*farmed.get_pixel(0, 0), Rgba([0, 255, 0, 255]));

        // no overlay art, but the tilled state still hides the detail
        let bare = assemble_tile(
            &TileLayers { base: &base, marching: None, tilled: true, tilled_overlay: None, detail: Some(&detail) },
            &assets,
        )
        .unwrap();
        assert!(bare.pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn test_missing_base_image_uses_fill() {
        let assets = TileAssets::new(4);
        let tile = assemble_tile(
            &TileLayers { base: &BaseLayer::Image("nope".into()), marching: None, tilled: false, tilled_overlay: None, detail: None },
            &assets,
        )
        .unwrap();
        assert!(tile.pixels().all(|p| *p == PLACEHOLDER_DIRT));
    }

    #[test]
    fn test_base_image_scaled_to_tile() {
        let assets = TileAssets::new(8).with_base_image("dirt", RgbaImage::from_pixel(2, 2, RED));
        let tile = assemble_tile(
            &TileLayers { base: &BaseLayer::Image("dirt".into()), marching: None, tilled: false, tilled_overlay: None, detail: None },
            &assets,
        )
        .unwrap();
        assert_eq!(tile.dimensions(), (8, 8));
        assert!(tile.pixels().all(|p| *p == RED));
    }
}
