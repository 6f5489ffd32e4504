use super::constants::{COLLISION_TILESET_TAG, LIGHTS_TILESET_TAG};
use super::types::TileId;
use crate::level::error::LevelError;
use bevy::prelude::*;
use std::collections::HashMap;

/// Index of an atlas image; every image gets exactly one material
pub type AtlasImageId = usize;

/// What a tileset is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilesetRole {
    /// Rendered tiles
    Visual,
    /// Collision layer ids, never rendered
    Collision,
    /// Lighting layer ids, never rendered
    Lights,
}

impl TilesetRole {
    /// Classify a tileset by its source path or name
    pub fn classify(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.contains(COLLISION_TILESET_TAG) {
            TilesetRole::Collision
        } else if label.contains(LIGHTS_TILESET_TAG) {
            TilesetRole::Lights
        } else {
            TilesetRole::Visual
        }
    }
}

/// A fully resolved tileset
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetRef {
    pub first_id: TileId,
    pub name: String,
    /// Atlas image path relative to the asset directory (visual tilesets only)
    pub image: Option<String>,
    pub columns: u32,
    pub tile_count: u32,
    pub role: TilesetRole,
}

impl TilesetRef {
    pub fn rows(&self) -> u32 {
        if self.columns == 0 {
            0
        } else {
            self.tile_count / self.columns
        }
    }
}

/// Atlas region of one tile
///
/// `uv_origin` is the bottom-left corner of the region with v = 0 at the bottom of the
/// image; [`TileVisual::map_uv`] flips into bevy's top-left convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileVisual {
    pub image: AtlasImageId,
    pub uv_origin: Vec2,
    pub uv_extent: Vec2,
}

impl TileVisual {
    /// Map a face-local uv (0..1, v up) into this tile's region as a bevy texture coordinate
    pub fn map_uv(&self, local: Vec2) -> [f32; 2] {
        let uv = self.uv_origin + local * self.uv_extent;
        [uv.x, 1.0 - uv.y]
    }
}

/// Lookup from global tile id to atlas region, plus the list of atlas images
#[derive(Debug, Clone, Default)]
pub struct TileAtlas {
    images: Vec<String>,
    visuals: HashMap<TileId, TileVisual>,
}

impl TileAtlas {
    /// Build the atlas from resolved tilesets, skipping data-only tilesets
    pub fn from_tilesets(tilesets: &[TilesetRef]) -> Result<Self, LevelError> {
        let mut atlas = TileAtlas::default();

        for tileset in tilesets.iter().filter(|t| t.role == TilesetRole::Visual) {
            let image = tileset
                .image
                .clone()
                .ok_or_else(|| LevelError::malformed(&tileset.name, tileset.first_id, "no image"))?;
            if tileset.columns == 0 {
                return Err(LevelError::malformed(&tileset.name, tileset.first_id, "columns is 0"));
            }
            if tileset.tile_count == 0 {
                return Err(LevelError::malformed(&tileset.name, tileset.first_id, "tilecount is 0"));
            }
            if tileset.tile_count % tileset.columns != 0 {
                return Err(LevelError::malformed(
                    &tileset.name,
                    tileset.first_id,
                    format!(
                        "tilecount {} is not a multiple of {} columns",
                        tileset.tile_count, tileset.columns
                    ),
                ));
            }

            // Tilesets sharing an image share its material
            let image_id = match atlas.images.iter().position(|i| *i == image) {
                Some(id) => id,
                None => {
                    atlas.images.push(image);
                    atlas.images.len() - 1
                }
            };

            let columns = tileset.columns as f32;
            let rows = tileset.rows() as f32;
            for local in 0..tileset.tile_count {
                let column = (local % tileset.columns) as f32;
                let row = (local / tileset.columns) as f32;
                atlas.visuals.insert(
                    tileset.first_id + local,
                    TileVisual {
                        image: image_id,
                        uv_origin: Vec2::new(column / columns, 1.0 - (row + 1.0) / rows),
                        uv_extent: Vec2::new(1.0 / columns, 1.0 / rows),
                    },
                );
            }
        }

        debug!(
            "Tile atlas built: {} tiles across {} images",
            atlas.visuals.len(),
            atlas.images.len()
        );
        Ok(atlas)
    }

    pub fn visual(&self, id: TileId) -> Option<&TileVisual> {
        self.visuals.get(&id)
    }

    /// Atlas image paths, indexed by [`AtlasImageId`]
    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }
}

/// First id of the single tileset with the given role
pub fn first_id_for(tilesets: &[TilesetRef], role: TilesetRole) -> Result<TileId, LevelError> {
    tilesets
        .iter()
        .find(|t| t.role == role)
        .map(|t| t.first_id)
        .ok_or(LevelError::MissingTileset(match role {
            TilesetRole::Collision => COLLISION_TILESET_TAG,
            TilesetRole::Lights => LIGHTS_TILESET_TAG,
            TilesetRole::Visual => "tiles",
        }))
}
