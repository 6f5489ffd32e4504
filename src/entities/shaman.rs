use crate::level::LevelRuntime;
use crate::physics::PhysicalBody;
use crate::tiles::TileVisual;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;

pub const SHAMAN_RADIUS: f32 = 0.4;
pub const SHAMAN_HEIGHT: f32 = 0.8;
pub const SHAMAN_MASS: f32 = 10000.0;

/// Barely moves unless something heavy pushes it
pub const SHAMAN_DAMPING: f32 = 60.0;

#[derive(Component, Debug, Clone)]
pub struct Shaman {
    pub name: String,
    pub radius: f32,
}

impl Shaman {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            radius: SHAMAN_RADIUS,
        }
    }
}

impl PhysicalBody for Shaman {
    fn body_name(&self) -> &str {
        &self.name
    }

    fn radius(&self) -> Option<f32> {
        Some(self.radius)
    }
}

/// Light color currently baked into a monster's vertices
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BakedTint(pub Color);

impl BakedTint {
    /// Record `color`; returns whether the mesh needs re-baking
    pub fn update(&mut self, color: Color) -> bool {
        if self.0 == color {
            return false;
        }
        self.0 = color;
        true
    }
}

fn vertex_color(color: Color) -> [f32; 4] {
    let linear = color.to_linear();
    [linear.red, linear.green, linear.blue, linear.alpha]
}

/// Cylinder mesh textured with one atlas tile and tinted with `color`
pub fn shaman_mesh(visual: Option<&TileVisual>, color: Color) -> Mesh {
    let mut mesh = Mesh::from(Cylinder::new(SHAMAN_RADIUS, SHAMAN_HEIGHT));

    if let (Some(visual), Some(VertexAttributeValues::Float32x2(uvs))) =
        (visual, mesh.attribute_mut(Mesh::ATTRIBUTE_UV_0))
    {
        for uv in uvs.iter_mut() {
            // Mesh uvs run top-down; tile regions are addressed bottom-up
            *uv = visual.map_uv(Vec2::new(uv[0], 1.0 - uv[1]));
        }
    }

    paint(&mut mesh, color);
    mesh
}

/// Overwrite every vertex color of `mesh`
pub fn paint(mesh: &mut Mesh, color: Color) {
    let colors = vec![vertex_color(color); mesh.count_vertices()];
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
}

/// Re-bakes each monster's tint from the light of the cell it stands in, only when
/// that light differs from what is already baked
pub fn tint_shamans(
    level: Res<LevelRuntime>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut shamans: Query<(&Transform, &Mesh3d, &mut BakedTint), With<Shaman>>,
) {
    for (transform, mesh, mut tint) in &mut shamans {
        let color = level.light_by_coordinate(transform.translation.x, transform.translation.z);
        if !tint.update(color) {
            continue;
        }
        if let Some(mesh) = meshes.get_mut(&mesh.0) {
            paint(mesh, color);
        }
    }
}
