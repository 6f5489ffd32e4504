pub mod input;
pub mod particles;
pub mod player;
pub mod shaman;
pub mod spawning;
pub mod trigger;

pub use input::PlayerInput;
pub use particles::{Particle, ParticleKind};
pub use player::{OverviewCamera, Player, PlayerCamera, PlayerSettings};
pub use shaman::Shaman;
pub use spawning::{DeferredSpawns, SpawnContext};
pub use trigger::Trigger;

use crate::{GameSet, GameState};
use bevy::prelude::*;

/// Player control, monsters, triggers and particles
pub struct EntitiesPlugin;

impl Plugin for EntitiesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerInput>()
            .init_resource::<PlayerSettings>()
            .init_resource::<DeferredSpawns>()
            .add_systems(
                Update,
                (input::apply_cursor_lock, input::collect_player_input)
                    .chain()
                    .in_set(GameSet::Input),
            )
            .add_systems(
                Update,
                (
                    player::move_player,
                    player::track_player_chunk,
                    shaman::tint_shamans,
                    trigger::fire_triggers,
                    trigger::cool_triggers,
                    spawning::run_deferred_spawns,
                    particles::update_particles,
                )
                    .chain()
                    .in_set(GameSet::Entities),
            )
            .add_systems(Update, player::update_viewports.in_set(GameSet::Camera))
            .add_systems(OnExit(GameState::Running), clear_deferred_spawns);
    }
}

fn clear_deferred_spawns(mut deferred: ResMut<DeferredSpawns>) {
    if !deferred.is_empty() {
        info!("Dropping {} pending spawns", deferred.len());
    }
    deferred.clear();
}
