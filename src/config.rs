use crate::tiles::CHUNK_SIZE;
use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;

/// Command line options for the game binary
#[derive(Parser, Debug, Clone)]
#[command(name = "crawlspace", about = "First-person tile dungeon")]
pub struct Args {
    /// Directory every other path is relative to
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Tiled JSON map to play
    #[arg(long, default_value = "levels/playground/playground.json")]
    pub level: PathBuf,

    /// Light palette JSON (see `bake_lights`)
    #[arg(long, default_value = "sprites/lights/palette.json")]
    pub palette: PathBuf,

    /// Cells per chunk side
    #[arg(long, default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Split the window and show the level from above in the bottom half
    #[arg(long)]
    pub debug: bool,
}

/// Where the level comes from and how it is shown
#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub assets_dir: PathBuf,
    /// Map path relative to `assets_dir`
    pub level: PathBuf,
    /// Palette path relative to `assets_dir`
    pub palette: PathBuf,
    pub chunk_size: usize,
    pub debug: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            level: PathBuf::from("levels/playground/playground.json"),
            palette: PathBuf::from("sprites/lights/palette.json"),
            chunk_size: CHUNK_SIZE,
            debug: false,
        }
    }
}

impl From<Args> for GameConfig {
    fn from(args: Args) -> Self {
        Self {
            assets_dir: args.assets,
            level: args.level,
            palette: args.palette,
            // A zero-sized chunk would never cover the map
            chunk_size: args.chunk_size.max(1),
            debug: args.debug,
        }
    }
}

impl GameConfig {
    pub fn level_path(&self) -> PathBuf {
        self.assets_dir.join(&self.level)
    }

    pub fn palette_path(&self) -> PathBuf {
        self.assets_dir.join(&self.palette)
    }
}

#[cfg(test)]
impl GameConfig {
    /// Config reading the sample assets shipped with the crate
    pub(crate) fn sample() -> Self {
        Self {
            assets_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"),
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let config = GameConfig::from(Args::parse_from(["crawlspace"]));
        let default = GameConfig::default();

        assert_eq!(config.level, default.level);
        assert_eq!(config.palette, default.palette);
        assert_eq!(config.chunk_size, default.chunk_size);
        assert!(!config.debug);
    }

    #[test]
    fn test_paths_resolve_under_assets() {
        let config = GameConfig::from(Args::parse_from([
            "crawlspace",
            "--assets",
            "data",
            "--level",
            "levels/a.json",
            "--chunk-size",
            "0",
            "--debug",
        ]));

        assert_eq!(config.level_path(), PathBuf::from("data/levels/a.json"));
        assert_eq!(config.chunk_size, 1);
        assert!(config.debug);
    }
}
