use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions, PrimaryWindow};

/// Player intent for the current frame
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct PlayerInput {
    /// x: forward (+) / back (-), y: strafe right (+) / left (-)
    pub move_axis: Vec2,
    /// Keyboard turn: right (+) / left (-)
    pub turn: f32,
    /// Mouse motion since last frame, only while the cursor is grabbed
    pub look_delta: Vec2,
    pub cursor_grabbed: bool,
}

/// Movement and turn intent from held keys. When both keys of a pair are held the
/// first one wins.
pub fn read_intent(keys: &ButtonInput<KeyCode>) -> (Vec2, f32) {
    let mut axis = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        axis.x = 1.0;
    } else if keys.pressed(KeyCode::KeyS) {
        axis.x = -1.0;
    }

    if keys.pressed(KeyCode::KeyA) {
        axis.y = -1.0;
    } else if keys.pressed(KeyCode::KeyD) {
        axis.y = 1.0;
    }

    let turn = if keys.pressed(KeyCode::ArrowLeft) {
        -1.0
    } else if keys.pressed(KeyCode::ArrowRight) {
        1.0
    } else {
        0.0
    };

    (axis, turn)
}

pub fn collect_player_input(
    keys: Res<ButtonInput<KeyCode>>,
    motion: Res<AccumulatedMouseMotion>,
    mut input: ResMut<PlayerInput>,
) {
    let (move_axis, turn) = read_intent(&keys);
    input.move_axis = move_axis;
    input.turn = turn;
    input.look_delta = if input.cursor_grabbed {
        motion.delta
    } else {
        Vec2::ZERO
    };
}

/// Click grabs the cursor for mouse look, Escape lets it go
pub fn apply_cursor_lock(
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    mut input: ResMut<PlayerInput>,
    mut cursors: Query<&mut CursorOptions, With<PrimaryWindow>>,
) {
    let Ok(mut cursor) = cursors.single_mut() else {
        return;
    };

    if mouse.just_pressed(MouseButton::Left) {
        input.cursor_grabbed = true;
    } else if keys.just_pressed(KeyCode::Escape) {
        input.cursor_grabbed = false;
    }

    let (grab_mode, visible) = if input.cursor_grabbed {
        (CursorGrabMode::Locked, false)
    } else {
        (CursorGrabMode::None, true)
    };
    if cursor.grab_mode != grab_mode {
        cursor.grab_mode = grab_mode;
    }
    if cursor.visible != visible {
        cursor.visible = visible;
    }
}
