use super::map::TileLayer;
use crate::tiles::{TileId, TILE_EMPTY};

/// Per-cell solidity decoded from the collision layer
///
/// A cell is solid when its id is past the collision tileset's first tile. Empty cells
/// and cells painted with the first tile are open; everything outside the map is solid.
#[derive(Debug, Clone)]
pub struct CollisionMap {
    layer: TileLayer,
    first_id: TileId,
}

impl CollisionMap {
    pub fn new(layer: TileLayer, first_id: TileId) -> Self {
        Self { layer, first_id }
    }

    pub fn is_solid_by_index(&self, index: usize) -> bool {
        match self.layer.data.get(index) {
            Some(&raw) => self.decode(raw),
            None => true,
        }
    }

    /// Solidity at a position in cells; fractional input is floored
    pub fn is_solid_by_coordinate(&self, x: f32, y: f32) -> bool {
        let (x, y) = (x.floor(), y.floor());
        if x < 0.0 || y < 0.0 || x >= self.layer.width as f32 || y >= self.layer.height as f32 {
            return true;
        }
        self.is_solid_by_index(y as usize * self.layer.width + x as usize)
    }

    fn decode(&self, raw: TileId) -> bool {
        raw != TILE_EMPTY && raw != self.first_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collision_map() -> CollisionMap {
        // Collision tileset starts at 17: 17 is open, 18 is a wall
        let layer = TileLayer::new("collision", 3, 2, vec![18, 0, 17, 18, 18, 0]);
        CollisionMap::new(layer, 17)
    }

    #[test]
    fn test_decoding() {
        let map = collision_map();
        assert!(map.is_solid_by_index(0));
        assert!(!map.is_solid_by_index(1));
        assert!(!map.is_solid_by_index(2));
        assert!(map.is_solid_by_index(4));
    }

    #[test]
    fn test_index_and_coordinate_agree() {
        let map = collision_map();
        for y in 0..2usize {
            for x in 0..3usize {
                assert_eq!(
                    map.is_solid_by_index(y * 3 + x),
                    map.is_solid_by_coordinate(x as f32 + 0.5, y as f32 + 0.99)
                );
            }
        }
    }

    #[test]
    fn test_outside_the_map_is_solid() {
        let map = collision_map();
        assert!(map.is_solid_by_coordinate(-0.1, 0.0));
        assert!(map.is_solid_by_coordinate(3.0, 0.0));
        assert!(map.is_solid_by_coordinate(0.0, 2.0));
        assert!(map.is_solid_by_index(6));
    }
}
