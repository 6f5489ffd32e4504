use super::atlas::{AtlasImageId, TileAtlas};
use super::{constants::*, types::*};
use crate::level::lightmap::LightMap;
use crate::level::map::TileLayer;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, PI};

/// Component marking a chunk entity with its position
#[derive(Component, Debug, Clone, Copy)]
pub struct Chunk {
    pub position: ChunkPos,
}

impl Chunk {
    pub fn new(position: ChunkPos) -> Self {
        Self { position }
    }
}

/// Which surface a face belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceKind {
    Floor,
    Ceiling,
    Wall,
    Cliff,
}

/// Cardinal neighbour offsets and the yaw that turns a wall quad back into the cell
const DIRECTIONS: [(IVec2, f32); 4] = [
    (IVec2::new(0, -1), 0.0),       // North
    (IVec2::new(-1, 0), FRAC_PI_2), // East
    (IVec2::new(0, 1), PI),         // South
    (IVec2::new(1, 0), -FRAC_PI_2), // West
];

// Unit quad in the XY plane facing +Z, counter-clockwise from the bottom-left
const QUAD_CORNERS: [Vec3; 4] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(-0.5, 0.5, 0.0),
];
const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// One unit quad of chunk geometry, positioned relative to the chunk root
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub kind: FaceKind,
    pub tile: TileId,
    /// Global cell the face was emitted for
    pub cell: IVec2,
    pub center: Vec3,
    pub rotation: Quat,
    pub color: Color,
}

impl Face {
    pub fn normal(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn corners(&self) -> [Vec3; 4] {
        QUAD_CORNERS.map(|corner| self.center + self.rotation * corner)
    }
}

/// The tile layers a chunk is compiled from
pub struct LayerView<'a> {
    pub floor: &'a TileLayer,
    pub ceiling: &'a TileLayer,
    pub walls: &'a TileLayer,
    pub cliff: &'a TileLayer,
    pub collision: &'a TileLayer,
    pub lights: &'a LightMap,
}

/// Compiled contents of one chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkMesh {
    pub position: ChunkPos,
    pub faces: Vec<Face>,
    /// Global cells that need a static wall box
    pub solid_cells: Vec<IVec2>,
}

impl ChunkMesh {
    pub fn walls(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|f| f.kind == FaceKind::Wall)
    }

    /// Merge every face into one vertex buffer per atlas image. Faces whose tile has
    /// no atlas region are left out.
    pub fn mesh_data(&self, atlas: &TileAtlas) -> BTreeMap<AtlasImageId, MeshData> {
        let mut meshes: BTreeMap<AtlasImageId, MeshData> = BTreeMap::new();
        let mut missing = 0;

        for face in &self.faces {
            let Some(visual) = atlas.visual(face.tile) else {
                missing += 1;
                continue;
            };
            meshes
                .entry(visual.image)
                .or_insert_with(MeshData::empty)
                .push_quad(face, |uv| visual.map_uv(uv));
        }

        if missing > 0 {
            warn!(
                "Chunk ({}, {}): {} faces reference tiles outside every tileset",
                self.position.x, self.position.y, missing
            );
        }
        meshes
    }
}

/// Builds chunk geometry from map layers
#[derive(Debug, Clone, Copy)]
pub struct ChunkMesher {
    pub chunk_size: usize,
}

impl Default for ChunkMesher {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl ChunkMesher {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn mesh(&self, layers: &LayerView, position: ChunkPos) -> ChunkMesh {
        let mut chunk = ChunkMesh {
            position,
            ..default()
        };
        let origin = position.origin_cell(self.chunk_size);

        // x outer, y inner, the order faces were always emitted in
        for x in 0..self.chunk_size as i32 {
            for y in 0..self.chunk_size as i32 {
                let local = Vec2::new(x as f32, y as f32);
                let cell = origin + IVec2::new(x, y);
                self.mesh_cell(layers, cell, local, &mut chunk);
            }
        }

        chunk
    }

    fn mesh_cell(&self, layers: &LayerView, cell: IVec2, local: Vec2, chunk: &mut ChunkMesh) {
        let floor = layers.floor.get(cell.x, cell.y);
        let ceiling = layers.ceiling.get(cell.x, cell.y);
        let cliff = layers.cliff.get(cell.x, cell.y);
        let color = layers.lights.by_coordinate(cell.x as f32, cell.y as f32);

        let mut push = |kind, tile, center: Vec3, rotation| {
            chunk.faces.push(Face {
                kind,
                tile,
                cell,
                center,
                rotation,
                color,
            });
        };

        if floor != TILE_EMPTY {
            push(
                FaceKind::Floor,
                floor,
                Vec3::new(local.x, FLOOR_HEIGHT, local.y),
                Quat::from_rotation_x(-FRAC_PI_2),
            );
        }

        if ceiling != TILE_EMPTY {
            push(
                FaceKind::Ceiling,
                ceiling,
                Vec3::new(local.x, CEILING_HEIGHT, local.y),
                Quat::from_rotation_x(FRAC_PI_2),
            );
        }

        for (offset, yaw) in DIRECTIONS {
            let edge = local + offset.as_vec2() / 2.0;

            if floor != TILE_EMPTY {
                let neighbor = cell + offset;
                let wall = layers.walls.get(neighbor.x, neighbor.y);
                if wall != TILE_EMPTY {
                    push(
                        FaceKind::Wall,
                        wall,
                        Vec3::new(edge.x, WALL_CENTER_HEIGHT, edge.y),
                        Quat::from_rotation_y(yaw),
                    );
                }
            }

            if cliff != TILE_EMPTY {
                for storey in CLIFF_MIN_OFFSET..=CLIFF_MAX_OFFSET {
                    if storey == 0
                        || (storey < 0 && floor == TILE_EMPTY)
                        || (storey > 0 && ceiling != TILE_EMPTY && floor != TILE_EMPTY)
                    {
                        continue;
                    }
                    push(
                        FaceKind::Cliff,
                        cliff,
                        Vec3::new(edge.x, WALL_CENTER_HEIGHT + storey as f32, edge.y),
                        Quat::from_rotation_y(yaw + PI),
                    );
                }
            }
        }

        if layers.collision.get(cell.x, cell.y) != TILE_EMPTY {
            chunk.solid_cells.push(cell);
        }
    }
}

/// Vertex buffers for one merged mesh
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a face with a flat vertex color, remapping its uvs through `uv`
    pub fn push_quad(&mut self, face: &Face, uv: impl Fn(Vec2) -> [f32; 2]) {
        let base = self.positions.len() as u32;
        let normal = face.normal().to_array();
        let color = face.color.to_linear();

        for (corner, local_uv) in face.corners().into_iter().zip(QUAD_UVS) {
            self.positions.push(corner.to_array());
            self.normals.push(normal);
            self.uvs.push(uv(local_uv));
            self.colors
                .push([color.red, color.green, color.blue, color.alpha]);
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / QUAD_INDICES.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub fn build_mesh_from_data(data: MeshData) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, data.uvs);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, data.colors);
    mesh.insert_indices(Indices::U32(data.indices));
    mesh
}
