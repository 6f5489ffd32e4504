use bevy::color::Color;

/// Default size of each chunk in cells (width and depth)
pub const CHUNK_SIZE: usize = 8;

/// Empty tile: no floor, no wall, no ceiling
pub const TILE_EMPTY: u32 = 0;

/// Tiled stores horizontal/vertical/diagonal flip flags in the top three bits of a gid
pub const TILE_FLIP_FLAGS: u32 = 0xE000_0000;

/// Height of the floor plane in world units
pub const FLOOR_HEIGHT: f32 = 0.0;

/// Height of the ceiling plane in world units
pub const CEILING_HEIGHT: f32 = 1.0;

/// Centre height of a wall quad spanning floor to ceiling
pub const WALL_CENTER_HEIGHT: f32 = 0.5;

/// Lowest and highest storey offsets a cliff column fills (offset 0 is the wall itself)
pub const CLIFF_MIN_OFFSET: i32 = -5;
pub const CLIFF_MAX_OFFSET: i32 = 9;

/// Tilesets with these fragments in their source or name are data-only layers
pub const COLLISION_TILESET_TAG: &str = "collision";
pub const LIGHTS_TILESET_TAG: &str = "lights";

/// Sentinel for a lighting id missing from the palette. Loud on purpose.
pub const LIGHT_FALLBACK: Color = Color::srgb(1.0, 0.0, 1.0);

/// Tile used to texture monsters
pub const SHAMAN_TILE: u32 = 10;

// Layer names consumed from the map
pub const LAYER_FLOOR: &str = "floor";
pub const LAYER_CEILING: &str = "ceiling";
pub const LAYER_WALLS: &str = "walls";
pub const LAYER_CLIFF: &str = "cliff";
pub const LAYER_COLLISION: &str = "collision";
pub const LAYER_LIGHTING: &str = "lighting";
pub const LAYER_ENTITIES: &str = "entities";
