use std::path::PathBuf;

use clap::Parser;

use marching_meadow::carve::PondParams;
use marching_meadow::tileset::{AtlasProvider, SpriteAtlas};
use marching_meadow::{export, logging, Error, LevelConfig, LevelSeeds, MapSource, NodeMap, Result, StyleRegistry, TileAssets};

#[derive(Parser, Debug)]
#[command(name = "marching_meadow")]
#[command(about = "Generate marching-squares terrain levels")]
struct Args {
    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Node map edge length (overrides the config file)
    #[arg(long)]
    size: Option<usize>,

    /// Level config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with a styles.json override
    #[arg(long)]
    styles_dir: Option<PathBuf>,

    /// Sprite sheet PNG used as the marching atlas (placeholder art if not specified)
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Name the atlas is registered under
    #[arg(long, default_value = "grass_a")]
    atlas_name: String,

    /// Sheet cell size in pixels; cells are scaled up to half a tile
    #[arg(long, default_value = "16")]
    atlas_cell: u32,

    /// Load the node map from JSON instead of carving one
    #[arg(long)]
    load_map: Option<PathBuf>,

    /// Save the node map as JSON
    #[arg(long)]
    save_map: Option<PathBuf>,

    /// Write the rendered level to this PNG
    #[arg(short, long, default_value = "level.png")]
    output: PathBuf,

    /// Print the node map as ASCII
    #[arg(long)]
    ascii: bool,

    /// Number of ponds to carve after the dirt blobs
    #[arg(long, default_value = "0")]
    ponds: usize,

    /// Generate tiles on one thread
    #[arg(long)]
    sequential: bool,
}

fn load_assets(args: &Args, styles: &StyleRegistry, tile_size: u32) -> Result<TileAssets> {
    let assets = TileAssets::placeholder(styles, tile_size);
    let Some(path) = &args.atlas else {
        log::info!("No atlas given, using placeholder art");
        return Ok(assets);
    };

    let half = tile_size / 2;
    if args.atlas_cell == 0 || half % args.atlas_cell != 0 {
        return Err(Error::InvalidConfig(format!(
            "atlas cell {} does not scale to {}px sub-tiles",
            args.atlas_cell, half
        )));
    }
    let atlas = SpriteAtlas::load(path, args.atlas_cell, half / args.atlas_cell)?;
    log::info!("Loaded atlas '{}' from {} ({} sub-tiles)", args.atlas_name, path.display(), atlas.len());
    Ok(assets.with_atlas(args.atlas_name.clone(), atlas))
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => LevelConfig::load(path)?,
        None => LevelConfig::default(),
    };
    if let Some(size) = args.size {
        config.map_size = size;
    }
    if args.sequential {
        config.parallel = false;
    }
    config
        .ponds
        .extend(std::iter::repeat(PondParams { min_radius: 2, max_radius: 4 }).take(args.ponds));

    let styles = match &args.styles_dir {
        Some(dir) => StyleRegistry::load_from(dir)?,
        None => StyleRegistry::defaults()?,
    };
    let assets = load_assets(&args, &styles, config.tile_size)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let seeds = LevelSeeds::from_master(seed);
    log::info!("Generating level with seed: {}", seed);

    let source = match &args.load_map {
        Some(path) => MapSource::Supplied(NodeMap::load_json(path)?),
        None => MapSource::Generate,
    };

    let level = marching_meadow::generate_level(source, seeds, config, styles, &assets)?;

    if let Some(path) = &args.save_map {
        level.node_map.save_json(path)?;
        log::info!("Saved node map to {}", path.display());
    }
    if args.ascii {
        print!("{}", export::ascii_node_map(&level.node_map));
    }

    let obstructed = level.tiles.iter().filter(|t| t.obstructed).count();
    let detailed = level.tiles.iter().filter(|t| t.detail.is_some()).count();
    log::info!(
        "{} tiles ({} obstructed, {} with details), spawn at {:?}",
        level.tiles.len(),
        obstructed,
        detailed,
        level.spawn_position
    );

    export::save_png(&level, &args.output)
}

fn main() {
    logging::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
