use bevy::prelude::*;

/// Global tile id across every tileset of a map (0 = no tile)
pub type TileId = u32;

/// Chunk position in chunk coordinates (not world/cell coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert from a world position (x/z plane, in cells) to chunk position
    pub fn from_world(world_pos: Vec2, chunk_size: usize) -> Self {
        let size = chunk_size as f32;
        Self {
            x: (world_pos.x / size).floor() as i32,
            y: (world_pos.y / size).floor() as i32,
        }
    }

    /// Global cell of this chunk's first (top-left) cell
    pub fn origin_cell(&self, chunk_size: usize) -> IVec2 {
        IVec2::new(self.x, self.y) * chunk_size as i32
    }

    /// World position of the chunk root. Cell centres sit on half units, so the root is
    /// shifted by half a cell and local cell `(x, y)` lands on `x`/`y` in the mesh.
    pub fn to_world(&self, chunk_size: usize) -> Vec3 {
        let origin = self.origin_cell(chunk_size).as_vec2() + Vec2::splat(0.5);
        Vec3::new(origin.x, 0.0, origin.y)
    }

    /// Every chunk needed to cover a `width × height` cell map, row by row
    pub fn covering(width: usize, height: usize, chunk_size: usize) -> Vec<ChunkPos> {
        let columns = width.div_ceil(chunk_size) as i32;
        let rows = height.div_ceil(chunk_size) as i32;
        let mut chunks = Vec::with_capacity((columns * rows) as usize);
        for y in 0..rows {
            for x in 0..columns {
                chunks.push(ChunkPos::new(x, y));
            }
        }
        chunks
    }
}

/// Row-major cell index for a map `width` cells wide
#[inline]
pub fn cell_index(x: usize, y: usize, width: usize) -> usize {
    y * width + x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world() {
        // Origin chunk
        let pos = ChunkPos::from_world(Vec2::new(0.0, 0.0), 8);
        assert_eq!(pos, ChunkPos::new(0, 0));

        // Last cell of the first chunk
        let pos = ChunkPos::from_world(Vec2::new(7.9, 7.9), 8);
        assert_eq!(pos, ChunkPos::new(0, 0));

        // Positive chunks
        let pos = ChunkPos::from_world(Vec2::new(8.0, 16.5), 8);
        assert_eq!(pos, ChunkPos::new(1, 2));

        // Negative chunks
        let pos = ChunkPos::from_world(Vec2::new(-0.5, -8.0), 8);
        assert_eq!(pos, ChunkPos::new(-1, -1));
    }

    #[test]
    fn test_covering_rounds_up() {
        assert_eq!(ChunkPos::covering(16, 8, 8).len(), 2);

        // A partial chunk still needs meshing
        let chunks = ChunkPos::covering(10, 9, 8);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3], ChunkPos::new(1, 1));
    }

    #[test]
    fn test_to_world_offsets_half_a_cell() {
        let world = ChunkPos::new(1, 2).to_world(4);
        assert_eq!(world, Vec3::new(4.5, 0.0, 8.5));
    }

    #[test]
    fn test_cell_index() {
        assert_eq!(cell_index(0, 0, 4), 0);
        assert_eq!(cell_index(3, 1, 4), 7);
    }
}
