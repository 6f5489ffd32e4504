use super::player::PlayerCamera;
use super::shaman::{paint, BakedTint};
use crate::level::LevelRuntime;
use crate::tiles::{TileId, TileVisual};
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use rand::Rng;
use std::time::Duration;

/// Seconds a particle lives
pub const PARTICLE_KEEP_ALIVE: f32 = 3.0;

/// Horizontal speed below which a particle stops simulating
pub const PARTICLE_REST_SPEED: f32 = 0.1;

/// Scaled by each kind's mass
pub const PARTICLE_GRAVITY: Vec3 = Vec3::new(0.0, -1.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Spark,
    Shell,
    Gib,
}

impl ParticleKind {
    /// Atlas tile drawn on the particle
    pub fn tile(self) -> TileId {
        match self {
            ParticleKind::Spark => 11,
            ParticleKind::Shell => 12,
            ParticleKind::Gib => 13,
        }
    }

    pub fn size(self) -> f32 {
        match self {
            ParticleKind::Spark => 0.05,
            ParticleKind::Shell => 0.1,
            ParticleKind::Gib => 0.21,
        }
    }

    pub fn mass(self) -> f32 {
        match self {
            ParticleKind::Spark => 50.0,
            ParticleKind::Shell => 5.0,
            ParticleKind::Gib => 10.0,
        }
    }

    /// Share of velocity lost on every bounce
    pub fn friction(self) -> f32 {
        match self {
            ParticleKind::Spark => 0.2,
            ParticleKind::Shell => 0.8,
            ParticleKind::Gib => 0.1,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Particle {
    pub kind: ParticleKind,
    pub velocity: Vec3,
    /// Runs out after `PARTICLE_KEEP_ALIVE`
    pub timer: Timer,
}

impl Particle {
    pub fn new(kind: ParticleKind, velocity: Vec3) -> Self {
        Self {
            kind,
            velocity,
            timer: Timer::from_seconds(PARTICLE_KEEP_ALIVE, TimerMode::Once),
        }
    }

    /// Random outward scatter
    pub fn scattered(kind: ParticleKind, rng: &mut impl Rng) -> Self {
        let velocity = Vec3::new(
            rng.random_range(-5.0..=5.0),
            rng.random_range(0.0..=1.0),
            rng.random_range(-5.0..=5.0),
        );
        Self::new(kind, velocity)
    }

    pub fn is_resting(&self) -> bool {
        self.velocity.x.abs() < PARTICLE_REST_SPEED && self.velocity.z.abs() < PARTICLE_REST_SPEED
    }

    /// Advance one frame. `solid` answers whether a cell (x, z) blocks movement.
    /// Returns false once the particle has expired.
    pub fn step(
        &mut self,
        position: &mut Vec3,
        delta: Duration,
        solid: impl Fn(i32, i32) -> bool,
        rng: &mut impl Rng,
    ) -> bool {
        if self.timer.is_finished() {
            return false;
        }
        self.timer.tick(delta);
        let delta = delta.as_secs_f32();

        if self.is_resting() {
            return true;
        }

        let previous = *position;
        let cell_x = previous.x.floor() as i32;
        let cell_z = previous.z.floor() as i32;
        let half = self.kind.size() / 2.0;
        let bounce = 1.0 - self.kind.friction();

        self.velocity += PARTICLE_GRAVITY * self.kind.mass() * delta;
        *position += self.velocity * delta;

        if position.y - half < 0.0 && self.velocity.y < 0.0 {
            self.velocity.y = -self.velocity.y;
            self.velocity *= bounce;
            position.y = half;
        }
        if position.y + half > 1.0 && self.velocity.y > 0.0 {
            self.velocity.y = -self.velocity.y;
            self.velocity *= bounce;
            position.y = 1.0 - half;
        }

        if position.x.floor() as i32 != cell_x {
            let east = solid(cell_x + 1, cell_z);
            let west = solid(cell_x - 1, cell_z);
            if (east && self.velocity.x > 0.0) || (west && self.velocity.x < 0.0) {
                self.velocity.x = -self.velocity.x;
                self.velocity.y += rng.random_range(-1.0..=1.0);
                self.velocity.z += rng.random_range(-1.0..=1.0);
                self.velocity *= bounce;
                position.x = previous.x;
            }
        }

        if position.z.floor() as i32 != cell_z {
            let north = solid(cell_x, cell_z - 1);
            let south = solid(cell_x, cell_z + 1);
            if (north && self.velocity.z < 0.0) || (south && self.velocity.z > 0.0) {
                self.velocity.x += rng.random_range(-1.0..=1.0);
                self.velocity.y += rng.random_range(-1.0..=1.0);
                self.velocity.z = -self.velocity.z;
                self.velocity *= bounce;
                position.z = previous.z;
            }
        }

        true
    }
}

/// Camera-facing square textured with one atlas tile
pub fn particle_mesh(kind: ParticleKind, visual: Option<&TileVisual>, color: Color) -> Mesh {
    let half = kind.size() / 2.0;
    let positions = vec![
        [-half, -half, 0.0],
        [half, -half, 0.0],
        [half, half, 0.0],
        [-half, half, 0.0],
    ];
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    let uvs: Vec<[f32; 2]> = corners
        .iter()
        .map(|corner| match visual {
            Some(visual) => visual.map_uv(*corner),
            None => [corner.x, 1.0 - corner.y],
        })
        .collect();

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 0.0, 1.0]; 4]);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(vec![0, 1, 2, 0, 2, 3]));
    paint(&mut mesh, color);
    mesh
}

/// Moves, relights and expires particles, keeping each turned towards the player camera
pub fn update_particles(
    mut commands: Commands,
    time: Res<Time>,
    level: Res<LevelRuntime>,
    mut meshes: ResMut<Assets<Mesh>>,
    cameras: Query<&GlobalTransform, With<PlayerCamera>>,
    mut particles: Query<(Entity, &mut Particle, &mut Transform, &Mesh3d, &mut BakedTint)>,
) {
    let delta = time.delta();
    let facing = cameras
        .iter()
        .next()
        .map(|camera| camera.to_scale_rotation_translation().1);
    let mut rng = rand::rng();

    for (entity, mut particle, mut transform, mesh, mut tint) in &mut particles {
        let solid = |x: i32, z: i32| level.solid_by_coordinate(x as f32, z as f32);
        if !particle.step(&mut transform.translation, delta, solid, &mut rng) {
            commands.entity(entity).despawn();
            continue;
        }

        if let Some(rotation) = facing {
            transform.rotation = rotation;
        }

        let color = level.light_by_coordinate(transform.translation.x, transform.translation.z);
        if tint.update(color) {
            if let Some(mesh) = meshes.get_mut(&mesh.0) {
                paint(mesh, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: Duration = Duration::from_millis(100);

    fn open(_: i32, _: i32) -> bool {
        false
    }

    #[test]
    fn test_expires_after_keep_alive() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut particle = Particle::new(ParticleKind::Spark, Vec3::ZERO);
        let mut position = Vec3::new(1.5, 0.5, 1.5);

        let mut frames = 0;
        while particle.step(&mut position, FRAME, open, &mut rng) {
            frames += 1;
            assert!(frames < 100, "particle never expired");
        }
        // 3 s at 0.1 s per frame; the last frame runs the timer out
        assert_eq!(frames, 30);
        assert!(particle.timer.is_finished());
    }

    #[test]
    fn test_resting_particle_does_not_move() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut particle = Particle::new(ParticleKind::Gib, Vec3::new(0.05, -3.0, 0.0));
        let mut position = Vec3::new(1.5, 0.5, 1.5);

        assert!(particle.step(&mut position, FRAME, open, &mut rng));
        assert_eq!(position, Vec3::new(1.5, 0.5, 1.5));
    }

    #[test]
    fn test_bounces_off_the_floor() {
        let mut rng = StdRng::seed_from_u64(3);
        let kind = ParticleKind::Shell;
        let mut particle = Particle::new(kind, Vec3::new(1.0, -10.0, 0.0));
        let mut position = Vec3::new(1.2, 0.1, 1.5);

        particle.step(&mut position, FRAME, open, &mut rng);
        assert!(particle.velocity.y > 0.0);
        assert_eq!(position.y, kind.size() / 2.0);
        // The bounce costs the configured share of speed
        assert!(particle.velocity.x < 1.0 * (1.0 - kind.friction()) + 1e-5);
    }

    #[test]
    fn test_bounces_off_the_ceiling() {
        let mut rng = StdRng::seed_from_u64(4);
        let kind = ParticleKind::Gib;
        let mut particle = Particle::new(kind, Vec3::new(1.0, 20.0, 0.0));
        let mut position = Vec3::new(1.2, 0.8, 1.5);

        particle.step(&mut position, FRAME, open, &mut rng);
        assert!(particle.velocity.y < 0.0);
        assert_eq!(position.y, 1.0 - kind.size() / 2.0);
    }

    #[test]
    fn test_reflects_off_solid_cells() {
        let mut rng = StdRng::seed_from_u64(5);
        let wall_east = |x: i32, _: i32| x == 2;
        let mut particle = Particle::new(ParticleKind::Spark, Vec3::new(5.0, 0.0, 0.0));
        let mut position = Vec3::new(1.9, 0.5, 1.5);

        particle.step(&mut position, FRAME, wall_east, &mut rng);
        assert!(particle.velocity.x < 0.0);
        assert_eq!(position.x, 1.9);

        // Moving into open space goes straight through
        let mut particle = Particle::new(ParticleKind::Spark, Vec3::new(5.0, 0.0, 0.0));
        let mut position = Vec3::new(1.9, 0.5, 1.5);
        particle.step(&mut position, FRAME, open, &mut rng);
        assert!(particle.velocity.x > 0.0);
        assert!(position.x > 2.0);
    }

    #[test]
    fn test_scatter_ranges() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..50 {
            let particle = Particle::scattered(ParticleKind::Spark, &mut rng);
            assert!((-5.0..=5.0).contains(&particle.velocity.x));
            assert!((0.0..=1.0).contains(&particle.velocity.y));
            assert!((-5.0..=5.0).contains(&particle.velocity.z));
            assert_eq!(particle.timer.duration(), Duration::from_secs(3));
            assert!(!particle.timer.is_finished());
        }
    }

    #[test]
    fn test_mesh_is_one_quad() {
        let mesh = particle_mesh(ParticleKind::Gib, None, Color::WHITE);
        assert_eq!(mesh.count_vertices(), 4);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(6));
    }
}
