use super::input::PlayerInput;
use crate::config::GameConfig;
use crate::level::LevelRuntime;
use crate::physics::{PhysicalBody, PhysicsBody, PhysicsWorld};
use crate::tiles::ChunkPos;
use bevy::camera::Viewport;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Height of the player's body centre above the floor
pub const PLAYER_HEIGHT: f32 = 0.4;

/// Eye height above the body centre
pub const EYE_OFFSET: f32 = 0.1;

pub const PLAYER_RADIUS: f32 = 0.2;

#[derive(Component, Debug, Clone)]
pub struct Player {
    pub name: String,
    pub radius: f32,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            radius: PLAYER_RADIUS,
        }
    }
}

impl PhysicalBody for Player {
    fn body_name(&self) -> &str {
        &self.name
    }

    fn radius(&self) -> Option<f32> {
        Some(self.radius)
    }
}

/// The first-person camera, a child of the player
#[derive(Component, Debug, Default)]
pub struct PlayerCamera;

/// Top-down view of the level shown under the player view in debug mode
#[derive(Component, Debug, Default)]
pub struct OverviewCamera;

#[derive(Resource, Debug, Clone)]
pub struct PlayerSettings {
    /// Acceleration applied per second of held input
    pub speed: f32,
    /// Keyboard turn rate in radians per second
    pub turn_speed: f32,
    /// Speed cap in physics units per step
    pub max_speed: f32,
    /// Radians of turn per pixel of mouse motion
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Per-second linear damping of the body
    pub damping: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            speed: 80.0,
            turn_speed: 4.0,
            max_speed: 1.0,
            mouse_sensitivity: 0.003,
            fov: 60.0,
            damping: 9.0,
        }
    }
}

/// New body velocity: intent rotated by the facing angle, scaled by speed over
/// `delta`, added to the current velocity and capped at `max_speed`
pub fn steer(velocity: Vec2, intent: Vec2, angle: f32, delta: f32, settings: &PlayerSettings) -> Vec2 {
    let push = Vec2::from_angle(angle).rotate(intent) * settings.speed * delta;
    (velocity + push).clamp_length_max(settings.max_speed)
}

/// Physical position and size of the player's viewport, and the aspect ratio it implies.
/// Debug mode keeps the top half and leaves the bottom half to the overview.
pub fn player_viewport(window: UVec2, debug: bool) -> (UVec2, UVec2, f32) {
    let size = if debug {
        UVec2::new(window.x, (window.y / 2).max(1))
    } else {
        window
    };
    let aspect = size.x as f32 / size.y.max(1) as f32;
    (UVec2::ZERO, size, aspect)
}

/// Bottom half of the window, below the debug player view
pub fn overview_viewport(window: UVec2) -> (UVec2, UVec2) {
    let top = (window.y / 2).max(1);
    (
        UVec2::new(0, top),
        UVec2::new(window.x, window.y.saturating_sub(top).max(1)),
    )
}

/// Turns and accelerates the player's body from the frame's input and points the
/// model the same way
pub fn move_player(
    time: Res<Time>,
    settings: Res<PlayerSettings>,
    input: Res<PlayerInput>,
    mut physics: ResMut<PhysicsWorld>,
    mut players: Query<(&PhysicsBody, &mut Transform), With<Player>>,
) {
    let delta = time.delta_secs();

    for (body, mut transform) in &mut players {
        let angle = physics.angle(body.0)
            + input.turn * settings.turn_speed * delta
            + input.look_delta.x * settings.mouse_sensitivity;
        physics.set_angle(body.0, angle);

        let velocity = steer(physics.linvel(body.0), input.move_axis, angle, delta, &settings);
        physics.set_linvel(body.0, velocity);

        transform.rotation = Quat::from_rotation_y(-angle);
    }
}

/// Logs when the player crosses into another chunk
pub fn track_player_chunk(
    level: Res<LevelRuntime>,
    players: Query<&Transform, (With<Player>, Changed<Transform>)>,
    mut current: Local<Option<ChunkPos>>,
) {
    for transform in &players {
        let chunk = ChunkPos::from_world(transform.translation.xz(), level.chunk_size);
        if *current != Some(chunk) {
            *current = Some(chunk);
            debug!("Player entered chunk ({}, {})", chunk.x, chunk.y);
        }
    }
}

/// Keeps camera viewports and aspect ratios in line with the window
pub fn update_viewports(
    config: Res<GameConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut player_cameras: Query<(&mut Camera, &mut Projection), With<PlayerCamera>>,
    mut overview_cameras: Query<&mut Camera, (With<OverviewCamera>, Without<PlayerCamera>)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let window_size = window.physical_size();
    if window_size.x == 0 || window_size.y == 0 {
        return;
    }

    let (position, size, aspect) = player_viewport(window_size, config.debug);
    for (mut camera, mut projection) in &mut player_cameras {
        camera.viewport = config.debug.then(|| Viewport {
            physical_position: position,
            physical_size: size,
            ..default()
        });
        if let Projection::Perspective(perspective) = projection.as_mut() {
            if perspective.aspect_ratio != aspect {
                perspective.aspect_ratio = aspect;
            }
        }
    }

    let (position, size) = overview_viewport(window_size);
    for mut camera in &mut overview_cameras {
        camera.viewport = Some(Viewport {
            physical_position: position,
            physical_size: size,
            ..default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_steer_forward_at_zero_angle_moves_along_x() {
        let settings = PlayerSettings {
            max_speed: 100.0,
            ..default()
        };
        let velocity = steer(Vec2::ZERO, Vec2::new(1.0, 0.0), 0.0, 0.01, &settings);
        assert!(velocity.abs_diff_eq(Vec2::new(0.8, 0.0), 1e-5));
    }

    #[test]
    fn test_steer_rotates_intent_by_facing() {
        let settings = PlayerSettings {
            max_speed: 100.0,
            ..default()
        };
        // Facing +y (physics), forward intent pushes along +y
        let velocity = steer(Vec2::ZERO, Vec2::new(1.0, 0.0), FRAC_PI_2, 0.01, &settings);
        assert!(velocity.abs_diff_eq(Vec2::new(0.0, 0.8), 1e-5));

        // Strafing left at zero angle pushes along -y
        let velocity = steer(Vec2::ZERO, Vec2::new(0.0, -1.0), 0.0, 0.01, &settings);
        assert!(velocity.abs_diff_eq(Vec2::new(0.0, -0.8), 1e-5));
    }

    #[test]
    fn test_steer_clamps_speed() {
        let settings = PlayerSettings::default();
        let velocity = steer(
            Vec2::new(0.9, 0.0),
            Vec2::new(1.0, 1.0),
            0.3,
            1.0 / 60.0,
            &settings,
        );
        assert!((velocity.length() - settings.max_speed).abs() < 1e-5);

        // A full second of forward push from rest ends at the cap
        let velocity = steer(Vec2::ZERO, Vec2::new(1.0, 0.0), 0.0, 1.0, &settings);
        assert!(velocity.abs_diff_eq(Vec2::new(1.0, 0.0), 1e-5));

        // Under the cap nothing is rescaled
        let velocity = steer(Vec2::new(0.1, 0.0), Vec2::ZERO, 0.0, 1.0 / 60.0, &settings);
        assert_eq!(velocity, Vec2::new(0.1, 0.0));
    }

    #[test]
    fn test_viewport_split() {
        let (position, size, aspect) = player_viewport(UVec2::new(1280, 720), false);
        assert_eq!(position, UVec2::ZERO);
        assert_eq!(size, UVec2::new(1280, 720));
        assert!((aspect - 1280.0 / 720.0).abs() < 1e-5);

        let (position, size, aspect) = player_viewport(UVec2::new(1280, 720), true);
        assert_eq!(position, UVec2::ZERO);
        assert_eq!(size, UVec2::new(1280, 360));
        assert!((aspect - 1280.0 / 360.0).abs() < 1e-5);

        let (position, size) = overview_viewport(UVec2::new(1280, 721));
        assert_eq!(position, UVec2::new(0, 360));
        assert_eq!(size, UVec2::new(1280, 361));
    }

    #[test]
    fn test_player_body_is_a_ball() {
        let player = Player::new("hero");
        assert_eq!(
            player.shape().unwrap(),
            crate::physics::BodyShape::Ball {
                radius: PLAYER_RADIUS
            }
        );
    }
}
