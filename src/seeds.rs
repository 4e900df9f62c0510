//! Seed management for level generation
//!
//! Each generation system gets its own seed derived from a master seed, so the
//! node map can be kept fixed while tile variants or detail scatter are re-rolled.
//! Per-tile seeds are derived from grid coordinates, which keeps tile output
//! independent of the order tiles are generated in.
//!
//! Mixing is splitmix64 over FNV-1a system names, so a stored master seed
//! reproduces the same level on every build.

/// Seeds for all level generation systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Blob and pond carving of the node map
    pub carve: u64,
    /// Marching-squares tie-breaks between equivalent variants
    pub tiles: u64,
    /// Detail sprite density rolls and sprite choice
    pub details: u64,
}

impl LevelSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            carve: derive_seed(master, "carve"),
            tiles: derive_seed(master, "tiles"),
            details: derive_seed(master, "details"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> LevelSeedsBuilder {
        LevelSeedsBuilder::new(master)
    }

    /// Seed for the tie-break generator of tile `(tx, ty)`.
    pub fn tile_seed(&self, tx: usize, ty: usize) -> u64 {
        derive_coord_seed(self.tiles, tx, ty)
    }

    /// Seed for the detail generator of tile `(tx, ty)`.
    pub fn detail_seed(&self, tx: usize, ty: usize) -> u64 {
        derive_coord_seed(self.details, tx, ty)
    }
}

impl Default for LevelSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct LevelSeedsBuilder {
    seeds: LevelSeeds,
}

impl LevelSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: LevelSeeds::from_master(master),
        }
    }

    /// Override the carve seed
    pub fn carve(mut self, seed: u64) -> Self {
        self.seeds.carve = seed;
        self
    }

    /// Override the tie-break seed
    pub fn tiles(mut self, seed: u64) -> Self {
        self.seeds.tiles = seed;
        self
    }

    /// Override the detail seed
    pub fn details(mut self, seed: u64) -> Self {
        self.seeds.details = seed;
        self
    }

    pub fn build(self) -> LevelSeeds {
        self.seeds
    }
}

/// splitmix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

fn combine(seed: u64, value: u64) -> u64 {
    mix(seed ^ mix(value))
}

/// FNV-1a hash of a system name.
fn name_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

/// Derive a sub-seed from a master seed and a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    combine(master, name_hash(system))
}

fn derive_coord_seed(base: u64, x: usize, y: usize) -> u64 {
    combine(combine(base, x as u64), y as u64)
}

/// Seed for one quadrant's tie-break, derived from its tile's seed.
pub fn quadrant_seed(tile_seed: u64, quadrant: usize) -> u64 {
    combine(tile_seed, quadrant as u64)
}

impl std::fmt::Display for LevelSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LevelSeeds {{ master: {}, carve: {}, tiles: {}, details: {} }}",
            self.master, self.carve, self.tiles, self.details,
        )
    }
}
