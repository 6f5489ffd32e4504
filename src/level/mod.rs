pub mod collision;
pub mod error;
pub mod lightmap;
pub mod loader;
pub mod map;
pub mod runtime;

pub use collision::CollisionMap;
pub use error::LevelError;
pub use lightmap::LightMap;
pub use loader::{LevelAssets, LevelPlugin};
pub use map::{MapDefinition, ObjectSpawn, Properties, TileLayer};
pub use runtime::{EntityKind, LevelRuntime, SpawnToken};

use bevy::prelude::*;

/// Marker for everything a level spawns, despawned when the level is torn down
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LevelEntity;
