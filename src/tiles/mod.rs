pub mod atlas;
pub mod chunk;
pub mod constants;
pub mod types;

// Re-export commonly used items
pub use atlas::{TileAtlas, TileVisual};
pub use chunk::{build_mesh_from_data, Chunk, ChunkMesh, ChunkMesher};
pub use constants::*;
pub use types::{cell_index, ChunkPos, TileId};
