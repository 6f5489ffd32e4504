use super::error::LevelError;
use crate::tiles::atlas::{TilesetRef, TilesetRole};
use crate::tiles::{cell_index, TileId, TILE_EMPTY, TILE_FLIP_FLAGS};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path};

/// A Tiled JSON map, normalized so object layers are measured in cells
#[derive(Debug, Clone, Deserialize)]
pub struct MapDefinition {
    pub width: usize,
    pub height: usize,
    /// Pixel size of a cell. Object layers are divided by it on load.
    #[serde(rename = "tileheight")]
    pub tile_size: f32,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub tilesets: Vec<TilesetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "tilelayer")]
    Tiles(TileLayer),
    #[serde(rename = "objectgroup")]
    Objects(ObjectLayer),
    /// Image layers, groups and anything newer Tiled versions add
    #[serde(other)]
    Other,
}

/// Row-major grid of tile ids; index 0 is the top-left cell
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TileLayer {
    pub name: String,
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub height: usize,
    pub data: Vec<TileId>,
}

impl TileLayer {
    /// Build a layer directly from cell data (fixtures and generated maps)
    pub fn new(name: impl Into<String>, width: usize, height: usize, data: Vec<TileId>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            data,
        }
    }

    /// Empty stand-in for optional layers the map does not define
    pub fn empty(name: impl Into<String>, width: usize, height: usize) -> Self {
        Self::new(name, width, height, vec![TILE_EMPTY; width * height])
    }

    /// Tile at a cell index, `TILE_EMPTY` outside the layer
    pub fn by_index(&self, index: usize) -> TileId {
        self.data.get(index).copied().unwrap_or(TILE_EMPTY)
    }

    /// Tile at cell coordinates; anything outside the map reads as empty
    pub fn get(&self, x: i32, y: i32) -> TileId {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return TILE_EMPTY;
        }
        self.by_index(cell_index(x as usize, y as usize, self.width))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectLayer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectSpawn>,
}

/// A placed object from an object layer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectSpawn {
    #[serde(default)]
    pub name: String,
    /// Entity type tag (`type` in older Tiled files, `class` in newer ones)
    #[serde(rename = "type", alias = "class", default)]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub properties: Properties,
}

impl ObjectSpawn {
    /// Centre of the object's footprint on the x/z plane
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Free-form object properties, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawProperties")]
pub struct Properties(HashMap<String, Value>);

/// Tiled wrote properties as a plain object before 1.2 and as a list of
/// `{name, type, value}` records since
#[derive(Deserialize)]
#[serde(untagged)]
enum RawProperties {
    List(Vec<PropertyEntry>),
    Map(HashMap<String, Value>),
}

#[derive(Deserialize)]
struct PropertyEntry {
    name: String,
    value: Value,
}

impl From<RawProperties> for Properties {
    fn from(raw: RawProperties) -> Self {
        match raw {
            RawProperties::List(entries) => {
                Properties(entries.into_iter().map(|e| (e.name, e.value)).collect())
            }
            RawProperties::Map(map) => Properties(map),
        }
    }
}

impl Properties {
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Truthiness of a property; absent, false, zero and empty values are false
    pub fn flag(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "false",
            _ => false,
        }
    }

    /// Numeric property; numeric strings are accepted too
    pub fn number(&self, name: &str) -> Option<f32> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_f64().map(|v| v as f32),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Tileset reference as written in the map: embedded, or an external `source`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TilesetEntry {
    pub firstgid: TileId,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    pub tilecount: Option<u32>,
}

/// External JSON tileset file
#[derive(Debug, Deserialize)]
struct TilesetFile {
    #[serde(default)]
    name: String,
    image: String,
    columns: u32,
    tilecount: u32,
}

impl MapDefinition {
    /// Read and normalize a map from disk
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Parse and normalize a map; `path` is only used for error messages
    pub fn from_json(text: &str, path: &Path) -> Result<Self, LevelError> {
        let definition: MapDefinition =
            serde_json::from_str(text).map_err(|source| LevelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        definition.preprocess()
    }

    /// Scale object layers from pixels to cells, strip flip flags from tile ids and
    /// check every tile layer covers the whole map
    fn preprocess(mut self) -> Result<Self, LevelError> {
        let tile_size = if self.tile_size > 0.0 { self.tile_size } else { 1.0 };
        let (width, height) = (self.width, self.height);

        for layer in &mut self.layers {
            match layer {
                Layer::Tiles(tiles) => {
                    if tiles.data.len() != width * height {
                        return Err(LevelError::LayerSize {
                            name: tiles.name.clone(),
                            actual: tiles.data.len(),
                            width,
                            height,
                        });
                    }
                    tiles.width = width;
                    tiles.height = height;
                    for id in &mut tiles.data {
                        *id &= !TILE_FLIP_FLAGS;
                    }
                }
                Layer::Objects(objects) => {
                    for object in &mut objects.objects {
                        object.x /= tile_size;
                        object.y /= tile_size;
                        object.width /= tile_size;
                        object.height /= tile_size;
                    }
                }
                Layer::Other => {}
            }
        }

        Ok(self)
    }

    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Tiles(tiles) if tiles.name == name => Some(tiles),
            _ => None,
        })
    }

    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Objects(objects) if objects.name == name => Some(objects),
            _ => None,
        })
    }

    /// Tile layer that must exist for the level to make sense
    pub fn require_tile_layer(&self, name: &'static str) -> Result<&TileLayer, LevelError> {
        self.tile_layer(name).ok_or(LevelError::MissingLayer(name))
    }

    /// Tile layer or an all-empty stand-in
    pub fn tile_layer_or_empty(&self, name: &str) -> TileLayer {
        self.tile_layer(name)
            .cloned()
            .unwrap_or_else(|| TileLayer::empty(name, self.width, self.height))
    }

    /// Resolve every tileset entry into a full description. `map_path` is the map's
    /// path relative to `assets_dir`; image paths come back relative to `assets_dir`
    /// too, ready for the asset server.
    pub fn resolve_tilesets(
        &self,
        assets_dir: &Path,
        map_path: &Path,
    ) -> Result<Vec<TilesetRef>, LevelError> {
        let map_dir = map_path.parent().unwrap_or(Path::new(""));
        self.tilesets
            .iter()
            .map(|entry| entry.resolve(assets_dir, map_dir))
            .collect()
    }
}

impl TilesetEntry {
    fn label(&self) -> String {
        self.source
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("tileset@{}", self.firstgid))
    }

    fn resolve(&self, assets_dir: &Path, map_dir: &Path) -> Result<TilesetRef, LevelError> {
        let label = self.label();
        let role = TilesetRole::classify(&label);

        // Collision and lighting tilesets are read as raw ids, never rendered
        if role != TilesetRole::Visual {
            return Ok(TilesetRef {
                first_id: self.firstgid,
                name: label,
                image: None,
                columns: 0,
                tile_count: 0,
                role,
            });
        }

        match &self.source {
            None => {
                let image = self
                    .image
                    .as_deref()
                    .ok_or_else(|| LevelError::malformed(&label, self.firstgid, "no image"))?;
                let columns = self
                    .columns
                    .ok_or_else(|| LevelError::malformed(&label, self.firstgid, "no columns"))?;
                let tile_count = self
                    .tilecount
                    .ok_or_else(|| LevelError::malformed(&label, self.firstgid, "no tilecount"))?;
                Ok(TilesetRef {
                    first_id: self.firstgid,
                    name: self.name.clone().unwrap_or(label),
                    image: Some(normalize_asset_path(&map_dir.join(image))),
                    columns,
                    tile_count,
                    role,
                })
            }
            Some(source) => {
                let relative = map_dir.join(source);
                let is_json = matches!(
                    relative.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("tsj")
                );
                if !is_json {
                    return Err(LevelError::UnsupportedTileset(source.clone()));
                }

                let fs_path = assets_dir.join(normalize_asset_path(&relative));
                let text = fs::read_to_string(&fs_path).map_err(|source| LevelError::Io {
                    path: fs_path.clone(),
                    source,
                })?;
                let file: TilesetFile =
                    serde_json::from_str(&text).map_err(|source| LevelError::Parse {
                        path: fs_path.clone(),
                        source,
                    })?;

                let tileset_dir = relative.parent().unwrap_or(Path::new(""));
                Ok(TilesetRef {
                    first_id: self.firstgid,
                    name: if file.name.is_empty() { label } else { file.name },
                    image: Some(normalize_asset_path(&tileset_dir.join(&file.image))),
                    columns: file.columns,
                    tile_count: file.tilecount,
                    role,
                })
            }
        }
    }
}

/// Collapse `.` and `..` components and join with `/`, the form the asset server expects
pub fn normalize_asset_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => {}
        }
    }
    parts.join("/")
}
