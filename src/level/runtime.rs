use super::collision::CollisionMap;
use super::error::LevelError;
use super::lightmap::{load_palette, LightMap};
use super::map::{MapDefinition, ObjectSpawn};
use crate::config::GameConfig;
use crate::tiles::atlas::{first_id_for, TileAtlas, TilesetRef, TilesetRole};
use crate::tiles::chunk::{ChunkMesh, ChunkMesher, Face, LayerView};
use crate::tiles::*;
use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between a level and the spawns it scheduled
#[derive(Debug, Clone, Default)]
pub struct SpawnToken(Arc<AtomicBool>);

impl SpawnToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Entity types the `entities` layer can place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Trigger,
    Shaman,
}

impl EntityKind {
    /// Kind named by an object's type tag
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "Player" => Some(EntityKind::Player),
            "Trigger" => Some(EntityKind::Trigger),
            "Shaman" => Some(EntityKind::Shaman),
            _ => None,
        }
    }
}

/// What the level does with an object when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Spawn(EntityKind),
    /// Known type that waits to be spawned by a trigger
    Dormant,
    Unknown,
}

impl Dispatch {
    pub fn of(object: &ObjectSpawn) -> Self {
        match EntityKind::from_type(&object.kind) {
            Some(EntityKind::Shaman) if !object.properties.flag("autoSpawn") => Dispatch::Dormant,
            Some(kind) => Dispatch::Spawn(kind),
            None => Dispatch::Unknown,
        }
    }
}

/// A loaded level: map data, lookups, compiled chunks and live entities
#[derive(Resource)]
pub struct LevelRuntime {
    pub map: MapDefinition,
    pub atlas: TileAtlas,
    pub chunk_size: usize,
    lights: LightMap,
    collision: CollisionMap,
    chunks: Vec<ChunkMesh>,
    /// Chunk positions to their spawned entities
    pub active_chunks: HashMap<ChunkPos, Entity>,
    /// Every entity the level spawned from its object layer
    pub entities: Vec<Entity>,
    spawn_token: SpawnToken,
}

impl LevelRuntime {
    /// Load the configured map, tilesets and palette from disk and compile every chunk
    pub fn load(config: &GameConfig) -> Result<Self, LevelError> {
        let map = MapDefinition::load(&config.level_path())?;
        let tilesets = map.resolve_tilesets(&config.assets_dir, &config.level)?;
        let palette = load_palette(&config.palette_path())?;
        Self::build(map, &tilesets, palette, config.chunk_size)
    }

    /// Assemble a level from already parsed parts
    pub fn build(
        map: MapDefinition,
        tilesets: &[TilesetRef],
        palette: Vec<Color>,
        chunk_size: usize,
    ) -> Result<Self, LevelError> {
        if chunk_size == 0 {
            return Err(LevelError::ZeroChunkSize);
        }
        let atlas = TileAtlas::from_tilesets(tilesets)?;

        let lights = LightMap::new(
            map.require_tile_layer(LAYER_LIGHTING)?.clone(),
            first_id_for(tilesets, TilesetRole::Lights)?,
            palette,
        );
        let collision_layer = map.require_tile_layer(LAYER_COLLISION)?.clone();
        let collision = CollisionMap::new(
            collision_layer.clone(),
            first_id_for(tilesets, TilesetRole::Collision)?,
        );

        let floor = map.require_tile_layer(LAYER_FLOOR)?.clone();
        let ceiling = map.tile_layer_or_empty(LAYER_CEILING);
        let walls = map.tile_layer_or_empty(LAYER_WALLS);
        let cliff = map.tile_layer_or_empty(LAYER_CLIFF);
        let view = LayerView {
            floor: &floor,
            ceiling: &ceiling,
            walls: &walls,
            cliff: &cliff,
            collision: &collision_layer,
            lights: &lights,
        };

        let mesher = ChunkMesher::new(chunk_size);
        let chunks: Vec<ChunkMesh> = ChunkPos::covering(map.width, map.height, chunk_size)
            .into_iter()
            .map(|position| mesher.mesh(&view, position))
            .collect();

        info!(
            "Level compiled: {}x{} cells, {} chunks, {} tiles, {} lights",
            map.width,
            map.height,
            chunks.len(),
            atlas.len(),
            lights.palette_len()
        );

        Ok(Self {
            map,
            atlas,
            chunk_size,
            lights,
            collision,
            chunks,
            active_chunks: HashMap::new(),
            entities: Vec::new(),
            spawn_token: SpawnToken::default(),
        })
    }

    pub fn light_by_index(&self, index: usize) -> Color {
        self.lights.by_index(index)
    }

    pub fn light_by_coordinate(&self, x: f32, y: f32) -> Color {
        self.lights.by_coordinate(x, y)
    }

    pub fn solid_by_index(&self, index: usize) -> bool {
        self.collision.is_solid_by_index(index)
    }

    pub fn solid_by_coordinate(&self, x: f32, y: f32) -> bool {
        self.collision.is_solid_by_coordinate(x, y)
    }

    pub fn chunks(&self) -> &[ChunkMesh] {
        &self.chunks
    }

    /// Every wall face of every chunk
    pub fn walls(&self) -> Vec<&Face> {
        self.chunks.iter().flat_map(ChunkMesh::walls).collect()
    }

    /// Objects of the `entities` layer
    pub fn objects(&self) -> &[ObjectSpawn] {
        self.map
            .object_layer(LAYER_ENTITIES)
            .map(|layer| layer.objects.as_slice())
            .unwrap_or(&[])
    }

    /// First object of the `entities` layer with the given name
    pub fn find_spawn(&self, name: &str) -> Option<&ObjectSpawn> {
        self.objects().iter().find(|object| object.name == name)
    }

    /// Objects to instantiate when the level starts. Unknown types are reported and
    /// left out.
    pub fn initial_spawns(&self) -> Vec<(EntityKind, &ObjectSpawn)> {
        self.objects()
            .iter()
            .filter_map(|object| match Dispatch::of(object) {
                Dispatch::Spawn(kind) => Some((kind, object)),
                Dispatch::Dormant => None,
                Dispatch::Unknown => {
                    warn!(
                        "Entity {} has an unknown type: {:?}",
                        object.name, object.kind
                    );
                    None
                }
            })
            .collect()
    }

    /// Register a chunk entity
    pub fn register_chunk(&mut self, pos: ChunkPos, entity: Entity) {
        self.active_chunks.insert(pos, entity);
    }

    pub fn spawn_token(&self) -> SpawnToken {
        self.spawn_token.clone()
    }

    /// Cancel every spawn this level scheduled that has not run yet
    pub fn shutdown(&mut self) {
        self.spawn_token.cancel();
        self.active_chunks.clear();
        self.entities.clear();
    }
}
