use super::{PhysicsBody, PhysicsWorld};
use crate::{GameSet, GameState};
use bevy::prelude::*;

/// Owns the physics world and keeps entity transforms in step with it
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PhysicsWorld>()
            .add_systems(
                Update,
                (step_physics, sync_transforms)
                    .chain()
                    .in_set(GameSet::Physics),
            )
            .add_systems(OnExit(GameState::Running), clear_physics);
    }
}

/// Advances the simulation by the frame time
pub fn step_physics(time: Res<Time>, mut physics: ResMut<PhysicsWorld>) {
    physics.step(time.delta_secs());
}

/// Writes simulated positions onto the x/z plane of each owner's transform.
/// Height is left alone; physics is flat.
pub fn sync_transforms(
    physics: Res<PhysicsWorld>,
    mut query: Query<&mut Transform, With<PhysicsBody>>,
) {
    for pose in physics.synced_positions() {
        if let Ok(mut transform) = query.get_mut(pose.owner) {
            transform.translation.x = pose.position.x;
            transform.translation.z = pose.position.y;
        }
    }
}

fn clear_physics(mut physics: ResMut<PhysicsWorld>) {
    debug!("Clearing {} physics bodies", physics.body_count());
    physics.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyOptions, PhysicalBody};
    use bevy::ecs::system::RunSystemOnce;

    struct Ball;

    impl PhysicalBody for Ball {
        fn body_name(&self) -> &str {
            "ball"
        }

        fn radius(&self) -> Option<f32> {
            Some(0.2)
        }
    }

    #[test]
    fn test_sync_writes_x_and_z_only() {
        let mut world = World::new();
        let owner = world
            .spawn(Transform::from_xyz(0.0, 0.4, 0.0))
            .id();

        let mut physics = PhysicsWorld::default();
        let handle = physics
            .add_entity(owner, &Ball, Vec2::new(2.5, 3.5), BodyOptions::default())
            .unwrap();
        world.entity_mut(owner).insert(PhysicsBody(handle));
        world.insert_resource(physics);

        world.run_system_once(sync_transforms).unwrap();

        let transform = world.get::<Transform>(owner).unwrap();
        assert_eq!(transform.translation, Vec3::new(2.5, 0.4, 3.5));
    }
}
