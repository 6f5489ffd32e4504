use super::error::LevelError;
use super::map::TileLayer;
use crate::tiles::{TileId, LIGHT_FALLBACK};
use bevy::prelude::*;
use image::RgbaImage;
use std::fs;
use std::path::Path;

/// Per-cell light color baked from the lighting layer
#[derive(Debug, Clone)]
pub struct LightMap {
    layer: TileLayer,
    first_id: TileId,
    palette: Vec<Color>,
}

impl LightMap {
    pub fn new(layer: TileLayer, first_id: TileId, palette: Vec<Color>) -> Self {
        Self {
            layer,
            first_id,
            palette,
        }
    }

    /// Light of a cell by row-major index
    pub fn by_index(&self, index: usize) -> Color {
        self.lookup(self.layer.by_index(index))
    }

    /// Light at a position in cells; fractional input is floored
    pub fn by_coordinate(&self, x: f32, y: f32) -> Color {
        self.lookup(self.layer.get(x.floor() as i32, y.floor() as i32))
    }

    fn lookup(&self, raw: TileId) -> Color {
        raw.checked_sub(self.first_id)
            .and_then(|offset| self.palette.get(offset as usize))
            .copied()
            .unwrap_or(LIGHT_FALLBACK)
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

/// Pack an 8-bit RGB triple the way palette files store it
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

pub fn unpack_rgb(packed: u32) -> Color {
    Color::srgb_u8((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
}

/// Read a palette file: a JSON array of packed RGB integers
pub fn load_palette(path: &Path) -> Result<Vec<Color>, LevelError> {
    let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let packed: Vec<u32> = serde_json::from_str(&text).map_err(|source| LevelError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(packed.into_iter().map(unpack_rgb).collect())
}

/// Sample the top-left pixel of every `tile_size` tile in a lighting image, row by row
/// across `columns` tiles, and pack each sample
pub fn palette_from_image(image: &RgbaImage, tile_size: u32, columns: u32) -> Vec<u32> {
    if tile_size == 0 {
        return Vec::new();
    }
    let columns = columns.min(image.width() / tile_size);
    let rows = image.height() / tile_size;

    let mut palette = Vec::with_capacity((rows * columns) as usize);
    for row in 0..rows {
        for column in 0..columns {
            let [r, g, b, _] = image.get_pixel(column * tile_size, row * tile_size).0;
            palette.push(pack_rgb(r, g, b));
        }
    }
    palette
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn light_map() -> LightMap {
        // 2x2 lighting layer, lights tileset starts at 20
        let layer = TileLayer::new("lighting", 2, 2, vec![20, 21, 0, 99]);
        let palette = vec![Color::srgb(1.0, 1.0, 1.0), Color::srgb(0.5, 0.25, 0.0)];
        LightMap::new(layer, 20, palette)
    }

    #[test]
    fn test_index_and_coordinate_agree() {
        let lights = light_map();
        for y in 0..2usize {
            for x in 0..2usize {
                assert_eq!(
                    lights.by_index(y * 2 + x),
                    lights.by_coordinate(x as f32 + 0.7, y as f32 + 0.2)
                );
            }
        }
        assert_eq!(lights.by_index(1), Color::srgb(0.5, 0.25, 0.0));
    }

    #[test]
    fn test_missing_entries_fall_back_to_magenta() {
        let lights = light_map();
        // Raw 0 has no tile, 99 is past the palette
        assert_eq!(lights.by_index(2), LIGHT_FALLBACK);
        assert_eq!(lights.by_index(3), LIGHT_FALLBACK);
        assert_eq!(lights.by_coordinate(-1.0, 0.0), LIGHT_FALLBACK);
        assert_eq!(lights.by_coordinate(5.0, 5.0), LIGHT_FALLBACK);
    }

    #[test]
    fn test_pack_round_trip() {
        assert_eq!(pack_rgb(0x12, 0x34, 0x56), 0x123456);
        assert_eq!(unpack_rgb(0xff00ff), LIGHT_FALLBACK);
    }

    #[test]
    fn test_palette_from_image_samples_tile_corners() {
        // 2 tiles wide, 2 tall, 4px tiles; each tile's top-left pixel is distinct
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(4, 0, Rgba([0, 255, 0, 255]));
        image.put_pixel(0, 4, Rgba([0, 0, 255, 255]));
        image.put_pixel(5, 5, Rgba([9, 9, 9, 255]));

        let palette = palette_from_image(&image, 4, 16);
        assert_eq!(palette, vec![0xff0000, 0x00ff00, 0x0000ff, 0x000000]);
    }

    #[test]
    fn test_sample_palette_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/sprites/lights/palette.json");
        let palette = load_palette(&path).unwrap();
        assert!(!palette.is_empty());
    }
}
