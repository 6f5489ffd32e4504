pub mod config;
pub mod entities;
pub mod level;
pub mod physics;
pub mod tiles;

use bevy::prelude::*;

/// Top-level flow: wait for the level's assets, then play
#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameState {
    #[default]
    Loading,
    Running,
}

/// Per-frame gameplay order while the level runs
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Step the simulation and copy body positions onto transforms
    Physics,
    /// Read keyboard and mouse into `PlayerInput`
    Input,
    /// Player, monsters, triggers, deferred spawns and particles
    Entities,
    /// Viewports and projections
    Camera,
}

/// Everything the game needs on top of bevy's default plugins
pub struct CrawlspacePlugin;

impl Plugin for CrawlspacePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .configure_sets(
                Update,
                (
                    GameSet::Physics,
                    GameSet::Input,
                    GameSet::Entities,
                    GameSet::Camera,
                )
                    .chain()
                    .run_if(in_state(GameState::Running)),
            )
            .add_plugins((
                physics::PhysicsPlugin,
                level::LevelPlugin,
                entities::EntitiesPlugin,
            ));
    }
}
