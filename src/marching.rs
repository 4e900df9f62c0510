//! Marching-squares corner masks and variant resolution
//!
//! A tile reads a 3x3 window of nodes and is split into four quadrants. Each
//! quadrant samples the 2x2 nodes at its corners, all four sharing the window
//! center, and turns them into a 4-bit corner mask:
//!
//! ```text
//!   node[0] node[1] node[2]        NW = 1   NE = 2
//!   node[3] node[4] node[5]        SW = 4   SE = 8
//!   node[6] node[7] node[8]
//! ```
//!
//! The mask is looked up in a [`MarchingLayout`], a per-terrain-style table of
//! atlas sub-tiles. Masks with several interchangeable renderings pick one at
//! random, once, when the tile is generated.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::seeds::quadrant_seed;

/// One of the four sub-regions of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    pub fn index(self) -> usize {
        match self {
            Quadrant::NorthWest => 0,
            Quadrant::NorthEast => 1,
            Quadrant::SouthWest => 2,
            Quadrant::SouthEast => 3,
        }
    }

    /// Window indices of this quadrant's corners, ordered NW, NE, SW, SE.
    pub fn window_indices(self) -> [usize; 4] {
        match self {
            Quadrant::NorthWest => [0, 1, 3, 4],
            Quadrant::NorthEast => [1, 2, 4, 5],
            Quadrant::SouthWest => [3, 4, 6, 7],
            Quadrant::SouthEast => [4, 5, 7, 8],
        }
    }

    /// Pixel offset of the quadrant inside a tile whose half-size is `half`.
    pub fn offset(self, half: u32) -> (u32, u32) {
        match self {
            Quadrant::NorthWest => (0, 0),
            Quadrant::NorthEast => (half, 0),
            Quadrant::SouthWest => (0, half),
            Quadrant::SouthEast => (half, half),
        }
    }
}

/// Which of a quadrant's four corners are foreground. Always in `0..=15`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CornerMask(u8);

impl CornerMask {
    pub const NW: u8 = 1;
    pub const NE: u8 = 2;
    pub const SW: u8 = 4;
    pub const SE: u8 = 8;

    pub const EMPTY: CornerMask = CornerMask(0);
    pub const FULL: CornerMask = CornerMask(15);

    /// Build from corners given as NW, NE, SW, SE.
    pub fn from_corners(corners: [bool; 4]) -> Self {
        CornerMask(
            corners[0] as u8 * Self::NW
                + corners[1] as u8 * Self::NE
                + corners[2] as u8 * Self::SW
                + corners[3] as u8 * Self::SE,
        )
    }

    /// Returns `None` for values above 15.
    pub fn new(bits: u8) -> Option<Self> {
        (bits <= 15).then_some(CornerMask(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn corners(self) -> [bool; 4] {
        [
            self.0 & Self::NW != 0,
            self.0 & Self::NE != 0,
            self.0 & Self::SW != 0,
            self.0 & Self::SE != 0,
        ]
    }

    pub fn complement(self) -> Self {
        CornerMask(15 - self.0)
    }

    /// The mask seen after rotating the quadrant 90 degrees counter-clockwise.
    pub fn rotated_ccw(self) -> Self {
        let [nw, ne, sw, se] = self.corners();
        // NE moves to NW, SE to NE, NW to SW, SW to SE
        CornerMask::from_corners([ne, se, nw, sw])
    }

    /// Rotate counter-clockwise by a multiple of 90 degrees.
    pub fn rotated(self, degrees: u32) -> Self {
        (0..(degrees / 90) % 4).fold(self, |mask, _| mask.rotated_ccw())
    }

    pub fn all() -> impl Iterator<Item = CornerMask> {
        (0..=15).map(CornerMask)
    }
}

/// Location of a sub-tile in an atlas plus a counter-clockwise rotation in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub struct VariantEntry {
    pub row: u32,
    pub col: u32,
    pub rotation: u32,
}

impl VariantEntry {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col, rotation: 0 }
    }

    pub const fn rotated(row: u32, col: u32, rotation: u32) -> Self {
        Self { row, col, rotation }
    }

    /// Linear sub-image index in an atlas `sheet_width` sub-tiles wide.
    pub fn atlas_index(&self, sheet_width: usize) -> usize {
        self.row as usize * sheet_width + self.col as usize
    }
}

/// Layout files write entries as `[row, col]` or `[row, col, rotation]`.
/// Negative rotations are clockwise.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Pair(u32, u32),
    Triple(u32, u32, i32),
}

impl TryFrom<RawEntry> for VariantEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        let (row, col, rotation) = match raw {
            RawEntry::Pair(row, col) => (row, col, 0),
            RawEntry::Triple(row, col, rotation) => (row, col, rotation),
        };
        let rotation = rotation.rem_euclid(360) as u32;
        if rotation % 90 != 0 {
            return Err(Error::InvalidRotation(rotation).to_string());
        }
        Ok(VariantEntry { row, col, rotation })
    }
}

impl From<VariantEntry> for RawEntry {
    fn from(entry: VariantEntry) -> Self {
        if entry.rotation == 0 {
            RawEntry::Pair(entry.row, entry.col)
        } else {
            RawEntry::Triple(entry.row, entry.col, entry.rotation as i32)
        }
    }
}

/// What a mask maps to: one fixed sub-tile, or a set of equivalent ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutSlot {
    Single(VariantEntry),
    Choice(Vec<VariantEntry>),
}

impl LayoutSlot {
    pub fn entries(&self) -> &[VariantEntry] {
        match self {
            LayoutSlot::Single(entry) => std::slice::from_ref(entry),
            LayoutSlot::Choice(entries) => entries,
        }
    }

    /// Pick the entry to bake into a tile. `None` only for an empty choice list.
    pub fn pick<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Option<VariantEntry> {
        match self {
            LayoutSlot::Single(entry) => Some(*entry),
            LayoutSlot::Choice(entries) => entries.choose(rng).copied(),
        }
    }
}

/// Table from corner mask to atlas sub-tiles for one terrain style.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarchingLayout {
    /// Keyed by mask value `0..=15`
    pub slots: BTreeMap<u8, LayoutSlot>,
    /// Used for masks without a slot; defaults to the first mask-0 entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<VariantEntry>,
}

impl MarchingLayout {
    pub fn new(slots: BTreeMap<u8, LayoutSlot>) -> Self {
        Self { slots, fallback: None }
    }

    pub fn slot(&self, mask: CornerMask) -> Option<&LayoutSlot> {
        self.slots.get(&mask.bits())
    }

    /// The entry used when a mask has no slot.
    pub fn fallback(&self) -> Option<VariantEntry> {
        self.fallback.or_else(|| {
            self.slot(CornerMask::EMPTY)
                .and_then(|slot| slot.entries().first().copied())
        })
    }

    /// Masks in `0..=15` without a slot.
    pub fn missing_masks(&self) -> Vec<CornerMask> {
        CornerMask::all().filter(|m| self.slot(*m).is_none()).collect()
    }

    /// Every entry the table can produce, with the mask it belongs to.
    pub fn entries(&self) -> impl Iterator<Item = (u8, &VariantEntry)> {
        self.slots
            .iter()
            .flat_map(|(mask, slot)| slot.entries().iter().map(move |e| (*mask, e)))
            .chain(self.fallback.iter().map(|e| (0, e)))
    }

    /// Structural checks: keys in range, no empty choice lists, a usable fallback.
    pub fn validate(&self, name: &str) -> Result<()> {
        for (mask, slot) in &self.slots {
            if *mask > 15 {
                return Err(Error::InvalidConfig(format!(
                    "layout '{}' has mask key {} outside 0..=15",
                    name, mask
                )));
            }
            if slot.entries().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "layout '{}' has an empty variant list for mask {}",
                    name, mask
                )));
            }
        }
        if self.fallback().is_none() {
            return Err(Error::InvalidConfig(format!(
                "layout '{}' has neither a fallback nor a mask-0 entry",
                name
            )));
        }
        // entries built in code skip the deserialization check
        if let Some((_, entry)) = self.entries().find(|(_, e)| e.rotation % 90 != 0) {
            return Err(Error::InvalidRotation(entry.rotation));
        }
        Ok(())
    }

    /// Resolve a mask to a concrete entry, drawing from `rng` for choice slots.
    ///
    /// Unmapped masks fall back to [`MarchingLayout::fallback`]; a complete table
    /// never takes that path, so it is logged in debug builds.
    pub fn resolve<R: rand::Rng + ?Sized>(&self, mask: CornerMask, rng: &mut R) -> VariantEntry {
        if let Some(entry) = self.slot(mask).and_then(|slot| slot.pick(rng)) {
            return entry;
        }
        if cfg!(debug_assertions) {
            log::warn!("Corner mask {} has no layout entry, using fallback", mask.bits());
        }
        self.fallback().unwrap_or(VariantEntry::new(0, 0))
    }
}

/// A quadrant's mask together with the sub-tile chosen for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedQuadrant {
    pub mask: CornerMask,
    pub entry: VariantEntry,
}

/// The four corners of `quadrant`, ordered NW, NE, SW, SE.
pub fn quadrant_corners(window: &[bool; 9], quadrant: Quadrant) -> [bool; 4] {
    quadrant.window_indices().map(|i| window[i])
}

/// Corner masks for all four quadrants of a window, in [`Quadrant::ALL`] order.
pub fn quadrant_masks(window: &[bool; 9]) -> [CornerMask; 4] {
    Quadrant::ALL.map(|q| CornerMask::from_corners(quadrant_corners(window, q)))
}

fn resolve_one(layout: &MarchingLayout, quadrant: Quadrant, mask: CornerMask, tile_seed: u64) -> VariantEntry {
    let mut rng = ChaCha8Rng::seed_from_u64(quadrant_seed(tile_seed, quadrant.index()));
    layout.resolve(mask, &mut rng)
}

/// Resolve all four quadrants of a window.
///
/// Each quadrant draws its tie-break from a generator seeded by `tile_seed`
/// and the quadrant, so the result depends only on the tile, never on the
/// order tiles are generated in.
pub fn resolve_quadrants(window: &[bool; 9], layout: &MarchingLayout, tile_seed: u64) -> [ResolvedQuadrant; 4] {
    let masks = quadrant_masks(window);
    Quadrant::ALL.map(|q| {
        let mask = masks[q.index()];
        ResolvedQuadrant {
            mask,
            entry: resolve_one(layout, q, mask, tile_seed),
        }
    })
}

/// Re-resolve after the window changed, keeping the baked entry of every
/// quadrant whose mask is unchanged.
pub fn reresolve_quadrants(
    previous: &[ResolvedQuadrant; 4],
    window: &[bool; 9],
    layout: &MarchingLayout,
    tile_seed: u64,
) -> [ResolvedQuadrant; 4] {
    let masks = quadrant_masks(window);
    Quadrant::ALL.map(|q| {
        let old = previous[q.index()];
        let mask = masks[q.index()];
        if old.mask == mask {
            old
        } else {
            ResolvedQuadrant {
                mask,
                entry: resolve_one(layout, q, mask, tile_seed),
            }
        }
    })
}
