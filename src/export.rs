//! Level export: full-map PNG and ASCII node dumps.

use std::path::Path;

use image::{imageops, RgbaImage};

use crate::error::Result;
use crate::level::Level;
use crate::node_map::NodeMap;

/// Composite every tile of `level` into one image.
pub fn render_level(level: &Level) -> RgbaImage {
    let size = level.config.tile_size;
    let mut img = RgbaImage::new(level.columns as u32 * size, level.rows as u32 * size);

    for tile in &level.tiles {
        let (x, y) = tile.pixel_position;
        imageops::replace(&mut img, &tile.image, x as i64, y as i64);
    }

    img
}

/// Render `level` and write it as a PNG.
pub fn save_png(level: &Level, path: &Path) -> Result<()> {
    let img = render_level(level);
    img.save(path)?;
    log::info!("Exported {}x{} level image to {}", img.width(), img.height(), path.display());
    Ok(())
}

/// One glyph per node, one line per node row.
pub fn ascii_node_map(node_map: &NodeMap) -> String {
    let mut out = String::with_capacity((node_map.width + 1) * node_map.height);
    for y in 0..node_map.height {
        out.extend(node_map.row(y).iter().map(|m| m.glyph()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::level::{generate_level, MapSource};
    use crate::material::Material;
    use crate::seeds::LevelSeeds;
    use crate::styles::StyleRegistry;
    use crate::tileset::TileAssets;

    #[test]
    fn test_ascii_glyphs() {
        let mut map = NodeMap::new_with(3, 2, Material::Grass);
        map.set(0, 0, Material::Dirt);
        map.set(2, 1, Material::Water);
        assert_eq!(ascii_node_map(&map), ".\"\"\n\"\"~\n");
    }

    #[test]
    fn test_render_places_tiles() {
        let styles = StyleRegistry::defaults().unwrap();
        let assets = TileAssets::placeholder(&styles, 16);
        let config = LevelConfig { tile_size: 16, detail_chance: 0.0, ..Default::default() };

        let mut map = NodeMap::new_with(5, 3, Material::Grass);
        map.set(3, 1, Material::Water);
        let level = generate_level(MapSource::Supplied(map), LevelSeeds::from_master(9), config, styles, &assets).unwrap();

        let img = render_level(&level);
        assert_eq!(img.dimensions(), (32, 16));
        assert_eq!(img.get_pixel(8, 8).0, crate::tileset::PLACEHOLDER_GRASS.0);
        assert_eq!(img.get_pixel(24, 8).0, [56, 220, 245, 255]);
    }

    #[test]
    fn test_save_png() {
        let styles = StyleRegistry::defaults().unwrap();
        let assets = TileAssets::placeholder(&styles, 16);
        let config = LevelConfig { tile_size: 16, map_size: 9, ..Default::default() };
        let level = generate_level(MapSource::Generate, LevelSeeds::from_master(1), config, styles, &assets).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.png");
        save_png(&level, &path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (64, 64));
    }
}
