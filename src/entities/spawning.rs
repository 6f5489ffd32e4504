use super::particles::{particle_mesh, Particle, ParticleKind};
use super::player::{OverviewCamera, Player, PlayerCamera, PlayerSettings, EYE_OFFSET, PLAYER_HEIGHT};
use super::shaman::{shaman_mesh, BakedTint, Shaman, SHAMAN_DAMPING, SHAMAN_HEIGHT, SHAMAN_MASS};
use super::trigger::{trigger_mask, Trigger};
use crate::config::GameConfig;
use crate::level::{EntityKind, LevelAssets, LevelEntity, LevelRuntime, ObjectSpawn, SpawnToken};
use crate::physics::{BodyOptions, CollisionCategory, PhysicalBody, PhysicsBody, PhysicsError, PhysicsWorld};
use crate::tiles::atlas::AtlasImageId;
use crate::tiles::{TileId, SHAMAN_TILE};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

/// Sparks thrown out where a scheduled monster appears
pub const SPAWN_BURST: usize = 8;

/// Everything needed to put a level object into the world
#[derive(SystemParam)]
pub struct SpawnContext<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub physics: ResMut<'w, PhysicsWorld>,
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub assets: Res<'w, LevelAssets>,
    pub config: Res<'w, GameConfig>,
    pub settings: Res<'w, PlayerSettings>,
}

impl SpawnContext<'_, '_> {
    /// Spawn `object` as `kind`. Objects that cannot be given a body are reported and
    /// skipped.
    pub fn spawn(&mut self, level: &LevelRuntime, kind: EntityKind, object: &ObjectSpawn) -> Option<Entity> {
        let result = match kind {
            EntityKind::Player => self.spawn_player(object),
            EntityKind::Shaman => self.spawn_shaman(level, object),
            EntityKind::Trigger => self.spawn_trigger(object),
        };

        match result {
            Ok(entity) => {
                debug!("Spawned {:?} {} as {:?}", kind, object.name, entity);
                Some(entity)
            }
            Err(e) => {
                error!("Failed to spawn {}: {}", object.name, e);
                None
            }
        }
    }

    /// Create the owning entity, then its body. The entity is removed again if the
    /// body cannot be made.
    fn with_body(
        &mut self,
        body: &impl PhysicalBody,
        object: &ObjectSpawn,
        options: BodyOptions,
    ) -> Result<(Entity, PhysicsBody), PhysicsError> {
        let (x, z) = object.center();
        let entity = self.commands.spawn(LevelEntity).id();
        match self.physics.add_entity(entity, body, Vec2::new(x, z), options) {
            Ok(handle) => Ok((entity, PhysicsBody(handle))),
            Err(e) => {
                self.commands.entity(entity).despawn();
                Err(e)
            }
        }
    }

    fn material_for(&self, image: Option<AtlasImageId>) -> Handle<StandardMaterial> {
        image
            .and_then(|image| self.assets.materials.get(image))
            .unwrap_or(&self.assets.fallback_material)
            .clone()
    }

    fn visual_material(&self, level: &LevelRuntime, tile: TileId) -> Handle<StandardMaterial> {
        let image = level.atlas.visual(tile).map(|visual| visual.image);
        self.material_for(image)
    }

    pub fn spawn_player(&mut self, object: &ObjectSpawn) -> Result<Entity, PhysicsError> {
        let player = Player::new(object.name.clone());
        let options = BodyOptions {
            category: CollisionCategory::PLAYER,
            damping: self.settings.damping,
            lock_rotation: true,
            ..default()
        };
        let (entity, body) = self.with_body(&player, object, options)?;
        let (x, z) = object.center();
        let fov = self.settings.fov.to_radians();

        self.commands
            .entity(entity)
            .insert((
                player,
                body,
                Transform::from_xyz(x, PLAYER_HEIGHT, z),
                Visibility::default(),
            ))
            .with_children(|parent| {
                parent.spawn((
                    PlayerCamera,
                    Camera3d::default(),
                    Projection::Perspective(PerspectiveProjection {
                        fov,
                        near: 0.1,
                        far: 100.0,
                        ..default()
                    }),
                    // Facing angle 0 looks down +x
                    Transform::from_xyz(0.0, EYE_OFFSET, 0.0)
                        .with_rotation(Quat::from_rotation_y(-FRAC_PI_2)),
                ));
            });

        info!("Player {} at ({:.1}, {:.1})", object.name, x, z);
        Ok(entity)
    }

    pub fn spawn_shaman(&mut self, level: &LevelRuntime, object: &ObjectSpawn) -> Result<Entity, PhysicsError> {
        let shaman = Shaman::new(object.name.clone());
        let options = BodyOptions {
            category: CollisionCategory::MONSTER,
            mass: Some(SHAMAN_MASS),
            damping: SHAMAN_DAMPING,
            lock_rotation: true,
            ..default()
        };
        let (entity, body) = self.with_body(&shaman, object, options)?;
        let (x, z) = object.center();

        let color = level.light_by_coordinate(x, z);
        let mesh = self.meshes.add(shaman_mesh(level.atlas.visual(SHAMAN_TILE), color));
        let material = self.visual_material(level, SHAMAN_TILE);

        self.commands.entity(entity).insert((
            shaman,
            body,
            BakedTint(color),
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::from_xyz(x, SHAMAN_HEIGHT / 2.0, z),
        ));
        Ok(entity)
    }

    pub fn spawn_trigger(&mut self, object: &ObjectSpawn) -> Result<Entity, PhysicsError> {
        let trigger = Trigger::from_properties(
            object.name.clone(),
            object.width,
            object.height,
            &object.properties,
        );
        let mask = trigger_mask(&object.properties);
        let (entity, body) = self.with_body(&trigger, object, BodyOptions::sensor(mask))?;
        let (x, z) = object.center();

        self.commands.entity(entity).insert((
            trigger,
            body,
            Transform::from_xyz(x, 0.5, z),
            Visibility::Hidden,
        ));
        Ok(entity)
    }

    /// Top-down camera drawn over the bottom half of the window in debug mode
    pub fn spawn_overview_camera(&mut self, level: &LevelRuntime) -> Entity {
        let width = level.map.width as f32;
        let height = level.map.height as f32;
        let center = Vec3::new(width / 2.0, 0.0, height / 2.0);
        let altitude = width.max(height) * 1.2;

        self.commands
            .spawn((
                OverviewCamera,
                LevelEntity,
                Camera3d::default(),
                Camera {
                    order: 1,
                    clear_color: ClearColorConfig::None,
                    ..default()
                },
                Transform::from_translation(center + Vec3::Y * altitude)
                    .looking_at(center, Vec3::NEG_Z),
            ))
            .id()
    }

    /// Throw `count` particles of `kind` out from `position`
    pub fn spawn_particles(&mut self, level: &LevelRuntime, kind: ParticleKind, position: Vec3, count: usize) {
        let visual = level.atlas.visual(kind.tile());
        let material = self.visual_material(level, kind.tile());
        let color = level.light_by_coordinate(position.x, position.z);
        let mut rng = rand::rng();

        for _ in 0..count {
            let mesh = self.meshes.add(particle_mesh(kind, visual, color));
            self.commands.spawn((
                Particle::scattered(kind, &mut rng),
                BakedTint(color),
                LevelEntity,
                Mesh3d(mesh),
                MeshMaterial3d(material.clone()),
                Transform::from_translation(position),
            ));
        }
    }
}

/// A trigger spawn waiting for its delay to run out
#[derive(Debug, Clone)]
pub struct PendingSpawn {
    pub timer: Timer,
    pub object: ObjectSpawn,
    pub token: SpawnToken,
}

/// Spawns scheduled by triggers, counted down in real time
#[derive(Resource, Debug, Default)]
pub struct DeferredSpawns {
    pending: Vec<PendingSpawn>,
}

impl DeferredSpawns {
    pub fn schedule(&mut self, delay: f32, object: ObjectSpawn, token: SpawnToken) {
        self.pending.push(PendingSpawn {
            timer: Timer::from_seconds(delay.max(0.0), TimerMode::Once),
            object,
            token,
        });
    }

    /// Count every pending spawn down by `delta` and hand back those that are due.
    /// Spawns whose level has gone are dropped.
    pub fn tick(&mut self, delta: Duration) -> Vec<ObjectSpawn> {
        self.pending.retain(|pending| !pending.token.is_cancelled());

        let mut due = Vec::new();
        self.pending.retain_mut(|pending| {
            if pending.timer.tick(delta).is_finished() {
                due.push(pending.object.clone());
                false
            } else {
                true
            }
        });
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Turns due trigger spawns into monsters, each with a burst of sparks. The named
/// object only supplies the position and name; its own type is ignored.
pub fn run_deferred_spawns(
    time: Res<Time<Real>>,
    mut deferred: ResMut<DeferredSpawns>,
    mut level: ResMut<LevelRuntime>,
    mut ctx: SpawnContext,
) {
    for object in deferred.tick(time.delta()) {
        let entity = match ctx.spawn_shaman(&level, &object) {
            Ok(entity) => entity,
            Err(e) => {
                error!("Failed to spawn {}: {}", object.name, e);
                continue;
            }
        };
        level.entities.push(entity);

        let (x, z) = object.center();
        ctx.spawn_particles(&level, ParticleKind::Spark, Vec3::new(x, PLAYER_HEIGHT, z), SPAWN_BURST);
        info!("{} appeared", object.name);
    }
}
