use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or compiling a level
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("map has no `{0}` layer")]
    MissingLayer(&'static str),

    #[error("layer `{name}` holds {actual} cells, map is {width}x{height}")]
    LayerSize {
        name: String,
        actual: usize,
        width: usize,
        height: usize,
    },

    #[error("map has no tileset for `{0}` (expected a source or name containing it)")]
    MissingTileset(&'static str),

    #[error("tileset `{source_name}` (firstgid {first_id}) cannot be used: {reason}")]
    MalformedTileset {
        source_name: String,
        first_id: u32,
        reason: String,
    },

    #[error("chunk size must be at least one cell")]
    ZeroChunkSize,

    #[error("tileset source `{0}` is not a JSON tileset (.json or .tsj)")]
    UnsupportedTileset(String),
}

impl LevelError {
    pub fn malformed(source_name: impl Into<String>, first_id: u32, reason: impl Into<String>) -> Self {
        LevelError::MalformedTileset {
            source_name: source_name.into(),
            first_id,
            reason: reason.into(),
        }
    }
}
