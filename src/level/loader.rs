use super::runtime::LevelRuntime;
use super::LevelEntity;
use crate::config::GameConfig;
use crate::entities::spawning::SpawnContext;
use crate::tiles::{build_mesh_from_data, Chunk};
use crate::GameState;
use bevy::asset::LoadState;
use bevy::prelude::*;

/// Loads the configured level, builds it once its textures are ready and tears it down
/// when play stops
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), begin_loading)
            .add_systems(
                Update,
                poll_loading.run_if(in_state(GameState::Loading)),
            )
            .add_systems(OnEnter(GameState::Running), create_level)
            .add_systems(OnExit(GameState::Running), teardown_level)
            .add_systems(Update, reload_level.run_if(in_state(GameState::Running)));
    }
}

/// Atlas textures and the one material built for each
#[derive(Resource, Debug, Default)]
pub struct LevelAssets {
    pub images: Vec<Handle<Image>>,
    pub materials: Vec<Handle<StandardMaterial>>,
    /// Shared by every tile that has no atlas image
    pub fallback_material: Handle<StandardMaterial>,
}

/// Parse the level and start loading its atlas images
pub fn begin_loading(
    mut commands: Commands,
    config: Res<GameConfig>,
    asset_server: Res<AssetServer>,
    mut exit: MessageWriter<AppExit>,
) {
    info!("Loading level {}", config.level.display());

    let level = match LevelRuntime::load(&config) {
        Ok(level) => level,
        Err(e) => {
            error!("Failed to load level {}: {}", config.level.display(), e);
            exit.write(AppExit::error());
            return;
        }
    };

    let images = level
        .atlas
        .images()
        .iter()
        .map(|path| asset_server.load(path.clone()))
        .collect();

    commands.insert_resource(LevelAssets {
        images,
        ..default()
    });
    commands.insert_resource(level);
}

/// Wait for every atlas image, then create one unlit material per image and start
/// the level
pub fn poll_loading(
    assets: Option<ResMut<LevelAssets>>,
    asset_server: Res<AssetServer>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
    mut reported: Local<Option<usize>>,
) {
    let Some(mut assets) = assets else {
        return;
    };

    let mut loaded = 0;
    for image in &assets.images {
        match asset_server.load_state(image.id()) {
            LoadState::Loaded => loaded += 1,
            LoadState::Failed(e) => {
                error!("Failed to load texture {:?}: {}", image.path(), e);
                exit.write(AppExit::error());
                return;
            }
            _ => {}
        }
    }

    let total = assets.images.len();
    if *reported != Some(loaded) {
        info!("Loaded {} of {}", loaded, total);
        *reported = Some(loaded);
    }
    if loaded < total {
        return;
    }

    assets.materials = assets
        .images
        .iter()
        .map(|image| {
            materials.add(StandardMaterial {
                base_color_texture: Some(image.clone()),
                // Light is baked into vertex colors
                unlit: true,
                alpha_mode: AlphaMode::Mask(0.5),
                ..default()
            })
        })
        .collect();
    assets.fallback_material = materials.add(StandardMaterial {
        unlit: true,
        ..default()
    });

    *reported = None;
    next_state.set(GameState::Running);
}

/// Spawn chunk geometry, wall colliders and the level's starting entities
pub fn create_level(mut ctx: SpawnContext, mut level: ResMut<LevelRuntime>) {
    let chunk_size = level.chunk_size;
    let mut spawned_chunks = Vec::new();

    for chunk in level.chunks() {
        let parts: Vec<(Handle<Mesh>, Handle<StandardMaterial>)> = chunk
            .mesh_data(&level.atlas)
            .into_iter()
            .filter(|(_, data)| !data.is_empty())
            .filter_map(|(image, data)| {
                let material = ctx.assets.materials.get(image)?.clone();
                Some((ctx.meshes.add(build_mesh_from_data(data)), material))
            })
            .collect();

        let entity = ctx
            .commands
            .spawn((
                Chunk::new(chunk.position),
                LevelEntity,
                Transform::from_translation(chunk.position.to_world(chunk_size)),
                Visibility::default(),
            ))
            .with_children(|parent| {
                for (mesh, material) in parts {
                    parent.spawn((Mesh3d(mesh), MeshMaterial3d(material)));
                }
            })
            .id();

        for cell in &chunk.solid_cells {
            ctx.physics.add_static_box(cell.as_vec2() + Vec2::splat(0.5));
        }

        debug!(
            "Built chunk {:?}: {} faces, {} wall boxes",
            chunk.position,
            chunk.faces.len(),
            chunk.solid_cells.len()
        );
        spawned_chunks.push((chunk.position, entity));
    }

    for (position, entity) in spawned_chunks {
        level.register_chunk(position, entity);
    }

    let spawns: Vec<_> = level
        .initial_spawns()
        .into_iter()
        .map(|(kind, object)| (kind, object.clone()))
        .collect();
    for (kind, object) in spawns {
        if let Some(entity) = ctx.spawn(&level, kind, &object) {
            level.entities.push(entity);
        }
    }

    if ctx.config.debug {
        ctx.spawn_overview_camera(&level);
    }

    info!(
        "Level running: {} chunks, {} entities",
        level.active_chunks.len(),
        level.entities.len()
    );
}

/// Despawn everything the level created and cancel its pending spawns
pub fn teardown_level(
    mut commands: Commands,
    level: Option<ResMut<LevelRuntime>>,
    spawned: Query<Entity, With<LevelEntity>>,
) {
    if let Some(mut level) = level {
        level.shutdown();
    }
    for entity in &spawned {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<LevelRuntime>();
    commands.remove_resource::<LevelAssets>();
    info!("Level torn down");
}

/// F5 rebuilds the level from disk
pub fn reload_level(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::F5) {
        info!("Reloading level");
        next_state.set(GameState::Loading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PlayerSettings;
    use crate::level::map::{Layer, MapDefinition, TileLayer};
    use crate::physics::PhysicsWorld;
    use crate::tiles::atlas::{TilesetRef, TilesetRole};
    use bevy::ecs::system::RunSystemOnce;

    fn tilesets() -> Vec<TilesetRef> {
        vec![
            TilesetRef {
                first_id: 1,
                name: "dungeon".into(),
                image: Some("sprites/dungeon/dungeon.png".into()),
                columns: 4,
                tile_count: 16,
                role: TilesetRole::Visual,
            },
            TilesetRef {
                first_id: 17,
                name: "collision".into(),
                image: None,
                columns: 0,
                tile_count: 0,
                role: TilesetRole::Collision,
            },
            TilesetRef {
                first_id: 19,
                name: "lights".into(),
                image: None,
                columns: 0,
                tile_count: 0,
                role: TilesetRole::Lights,
            },
        ]
    }

    /// 4x4 floor with one solid collision cell at (1, 1)
    fn one_pillar() -> LevelRuntime {
        let size = 4;
        let mut collision = vec![0; size * size];
        collision[size + 1] = 18;
        let map = MapDefinition {
            width: size,
            height: size,
            tile_size: 16.0,
            layers: vec![
                Layer::Tiles(TileLayer::new("floor", size, size, vec![1; size * size])),
                Layer::Tiles(TileLayer::new("collision", size, size, collision)),
                Layer::Tiles(TileLayer::new("lighting", size, size, vec![19; size * size])),
            ],
            tilesets: Vec::new(),
        };
        LevelRuntime::build(map, &tilesets(), Vec::new(), size).unwrap()
    }

    #[test]
    fn test_solid_cell_becomes_one_static_box() {
        let mut world = World::new();
        world.insert_resource(one_pillar());
        world.insert_resource(GameConfig::default());
        world.init_resource::<LevelAssets>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world.init_resource::<PhysicsWorld>();
        world.init_resource::<PlayerSettings>();

        world.run_system_once(create_level).unwrap();

        let physics = world.resource::<PhysicsWorld>();
        assert_eq!(physics.body_count(), 1);
        assert_eq!(physics.fixed_positions(), vec![Vec2::new(1.5, 1.5)]);

        let level = world.resource::<LevelRuntime>();
        assert_eq!(level.active_chunks.len(), 1);
        assert!(level.entities.is_empty());
        assert_eq!(world.query::<&Chunk>().iter(&world).count(), 1);
    }
}
