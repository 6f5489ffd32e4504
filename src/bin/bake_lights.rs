//! Samples a lighting tileset image into the palette file the game reads

use anyhow::{bail, Context, Result};
use clap::Parser;
use crawlspace::level::lightmap::palette_from_image;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bake_lights", about = "Bake a lighting tileset into a palette file")]
struct Args {
    /// Lighting tileset image
    input: PathBuf,

    /// Where to write the JSON palette
    #[arg(short, long, default_value = "assets/sprites/lights/palette.json")]
    output: PathBuf,

    /// Pixel size of one tile
    #[arg(long, default_value_t = 16)]
    tile_size: u32,

    /// Tiles per row
    #[arg(long, default_value_t = 16)]
    columns: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let image = image::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?
        .to_rgba8();
    let palette = palette_from_image(&image, args.tile_size, args.columns);
    if palette.is_empty() {
        bail!(
            "{} ({}x{}) holds no {}px tiles",
            args.input.display(),
            image.width(),
            image.height(),
            args.tile_size
        );
    }

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&args.output, serde_json::to_string(&palette)?)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!("Baked {} lights into {}", palette.len(), args.output.display());
    Ok(())
}
