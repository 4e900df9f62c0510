//! Noise-distorted blob carving
//!
//! Stamps organically shaped patches of one material onto a node map. Each blob
//! is a circle whose radius is perturbed by a three-lobed angular wave plus
//! per-node jitter, so repeated carves of decreasing size build up natural
//! looking clearings. Carving never fails: a blob that cannot fit inside the
//! padded interior is skipped.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::material::Material;
use crate::node_map::NodeMap;

/// Number of bulges in the angular distortion wave.
const LOBES: f64 = 3.0;
/// Amplitude of the angular wave.
const LOBE_AMPLITUDE: f64 = 0.5;
/// Amplitude of the per-node jitter.
const JITTER_AMPLITUDE: f64 = 0.5;
/// Overall scale applied to wave + jitter.
const NOISE_SCALE: f64 = 2.0;
/// Extra margin around the radius scanned for qualifying nodes.
const SCAN_MARGIN: i64 = 2;

/// One carving pass: a blob of `radius` kept `padding` nodes away from the edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobParams {
    pub radius: usize,
    pub padding: usize,
}

impl BlobParams {
    pub const fn new(radius: usize, padding: usize) -> Self {
        Self { radius, padding }
    }
}

/// A pond pass: a water blob with a random radius and no edge padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PondParams {
    pub min_radius: usize,
    pub max_radius: usize,
}

/// Distortion added to the blob radius for a node at `(dx, dy)` from the center.
/// `jitter` is a uniform sample in `[0, 1)`.
fn radius_noise(dx: f64, dy: f64, jitter: f64) -> f64 {
    let angle = dy.atan2(dx);
    let distortion = (angle * LOBES).cos() * LOBE_AMPLITUDE;
    (distortion + jitter * JITTER_AMPLITUDE) * NOISE_SCALE
}

/// Pick a random center inside the padded interior and overwrite every node
/// within the distorted radius with `material`.
///
/// Returns the chosen center, or `None` if the map has no safe interior for
/// this radius and padding (in which case the map is untouched).
pub fn draw_blob<R: Rng + ?Sized>(
    node_map: &mut NodeMap,
    radius: usize,
    material: Material,
    padding: usize,
    rng: &mut R,
) -> Option<(usize, usize)> {
    let width = node_map.width as i64;
    let height = node_map.height as i64;
    let margin = (radius + padding) as i64;

    let (max_x, max_y) = (width - 1 - margin, height - 1 - margin);
    if margin > max_x || margin > max_y {
        log::debug!(
            "Blob r={} pad={} does not fit a {}x{} map, skipping",
            radius, padding, width, height
        );
        return None;
    }

    let center_x = rng.gen_range(margin..=max_x);
    let center_y = rng.gen_range(margin..=max_y);
    let r = radius as i64;

    let y_range = (center_y - r - SCAN_MARGIN).max(0)..(center_y + r + SCAN_MARGIN + 1).min(height);
    let x_range = (center_x - r - SCAN_MARGIN).max(0)..(center_x + r + SCAN_MARGIN + 1).min(width);

    let mut carved = 0usize;
    for y in y_range {
        for x in x_range.clone() {
            let dx = (x - center_x) as f64;
            let dy = (y - center_y) as f64;
            let distance_sq = dx * dx + dy * dy;

            let effective_radius = radius as f64 + radius_noise(dx, dy, rng.gen::<f64>());
            if distance_sq < effective_radius * effective_radius {
                node_map.set(x as usize, y as usize, material);
                carved += 1;
            }
        }
    }

    log::debug!(
        "Carved {:?} blob r={} at ({}, {}): {} nodes",
        material, radius, center_x, center_y, carved
    );
    Some((center_x as usize, center_y as usize))
}

/// Carve a water blob with a radius drawn from `[min_radius, max_radius]`.
pub fn draw_pond<R: Rng + ?Sized>(
    node_map: &mut NodeMap,
    pond: PondParams,
    rng: &mut R,
) -> Option<(usize, usize)> {
    let (lo, hi) = if pond.min_radius <= pond.max_radius {
        (pond.min_radius, pond.max_radius)
    } else {
        (pond.max_radius, pond.min_radius)
    };
    let radius = rng.gen_range(lo..=hi);
    draw_blob(node_map, radius, Material::Water, 0, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grass(size: usize) -> NodeMap {
        NodeMap::new_with(size, size, Material::Grass)
    }

    fn count(map: &NodeMap, material: Material) -> usize {
        map.iter().filter(|(_, _, m)| **m == material).count()
    }

    #[test]
    fn test_oversized_blob_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for size in [3, 5, 8, 16] {
            let mut map = grass(size);
            let center = draw_blob(&mut map, size, Material::Dirt, 0, &mut rng);
            assert!(center.is_none());
            assert_eq!(count(&map, Material::Dirt), 0);
        }
    }

    #[test]
    fn test_blob_stays_in_bounds_for_all_params() {
        // Tilemap::set panics on out-of-range writes, so completing every
        // combination proves containment.
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for size in [3usize, 4, 7, 12, 20] {
            for radius in 0..=size {
                for padding in 0..4 {
                    let mut map = grass(size);
                    draw_blob(&mut map, radius, Material::Dirt, padding, &mut rng);
                    assert_eq!(map.width, size);
                    assert_eq!(map.height, size);
                }
            }
        }
    }

    #[test]
    fn test_blob_center_respects_padding() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let mut map = grass(32);
            let (cx, cy) = draw_blob(&mut map, 8, Material::Dirt, 4, &mut rng).unwrap();
            assert!((12..=19).contains(&cx));
            assert!((12..=19).contains(&cy));
            assert_eq!(*map.get(cx, cy), Material::Dirt);
        }
    }

    #[test]
    fn test_blob_covers_core_and_spares_far_nodes() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut map = grass(32);
        let (cx, cy) = draw_blob(&mut map, 6, Material::Dirt, 4, &mut rng).unwrap();

        // Noise only ranges over [-1, 2), so radius - 1 is always carved and
        // anything at radius + 2 or further never is.
        for (x, y, m) in map.iter() {
            let dx = x as f64 - cx as f64;
            let dy = y as f64 - cy as f64;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < 5.0 {
                assert_eq!(*m, Material::Dirt, "({}, {}) inside core", x, y);
            }
            if dist >= 8.0 {
                assert_eq!(*m, Material::Grass, "({}, {}) outside reach", x, y);
            }
        }
    }

    #[test]
    fn test_same_seed_same_blob() {
        let mut a = grass(24);
        let mut b = grass(24);
        draw_blob(&mut a, 5, Material::Dirt, 2, &mut ChaCha8Rng::seed_from_u64(9));
        draw_blob(&mut b, 5, Material::Dirt, 2, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pond_carves_water() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut map = grass(32);
        let pond = PondParams { min_radius: 3, max_radius: 5 };
        assert!(draw_pond(&mut map, pond, &mut rng).is_some());
        assert!(count(&map, Material::Water) > 0);
        assert_eq!(count(&map, Material::Dirt), 0);
    }

    #[test]
    fn test_radius_noise_is_three_lobed() {
        // Peaks of the wave at 0, 120 and 240 degrees with zero jitter
        for deg in [0.0f64, 120.0, 240.0] {
            let (s, c) = deg.to_radians().sin_cos();
            assert!((radius_noise(c, s, 0.0) - 1.0).abs() < 1e-9);
        }
        let (s, c) = 60f64.to_radians().sin_cos();
        assert!((radius_noise(c, s, 0.0) + 1.0).abs() < 1e-9);
    }
}
