use bevy::input::keyboard::KeyCode;
use bevy::input::mouse::MouseButton;
use bevy::prelude::*;

/// Logical buttons the game reads; several physical keys map to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    /// Confirm.
    A,
    /// Cancel.
    B,
    /// Alternate action.
    X,
    /// Skip to end of line.
    Y,
    Exit,
}

impl Button {
    pub const ALL: [Button; 9] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Exit,
    ];

    pub fn keys(self) -> &'static [KeyCode] {
        match self {
            Button::Up => &[KeyCode::KeyW, KeyCode::ArrowUp],
            Button::Down => &[KeyCode::KeyS, KeyCode::ArrowDown],
            Button::Left => &[KeyCode::KeyA, KeyCode::ArrowLeft],
            Button::Right => &[KeyCode::KeyD, KeyCode::ArrowRight],
            Button::A => &[KeyCode::KeyJ, KeyCode::KeyZ],
            Button::B => &[KeyCode::KeyK, KeyCode::KeyX],
            Button::X => &[KeyCode::KeyL, KeyCode::KeyC],
            Button::Y => &[KeyCode::Semicolon, KeyCode::KeyV],
            Button::Exit => &[KeyCode::Escape],
        }
    }

    fn mouse(self) -> Option<MouseButton> {
        match self {
            Button::A => Some(MouseButton::Left),
            Button::Y => Some(MouseButton::Right),
            _ => None,
        }
    }

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Snapshot of the logical buttons for the current frame.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct Controls {
    held: u16,
    just: u16,
}

impl Controls {
    pub fn pressed(&self, button: Button) -> bool {
        self.held & button.bit() != 0
    }

    pub fn just_pressed(&self, button: Button) -> bool {
        self.just & button.bit() != 0
    }

    pub fn press(&mut self, button: Button) {
        self.held |= button.bit();
        self.just |= button.bit();
    }

    pub fn hold(&mut self, button: Button) {
        self.held |= button.bit();
    }

    pub fn release_all(&mut self) {
        self.held = 0;
        self.just = 0;
    }

    /// Movement direction from the held directional buttons, not normalized.
    pub fn direction(&self) -> Vec2 {
        let mut direction = Vec2::ZERO;
        if self.pressed(Button::Up) {
            direction.y += 1.0;
        }
        if self.pressed(Button::Down) {
            direction.y -= 1.0;
        }
        if self.pressed(Button::Right) {
            direction.x += 1.0;
        }
        if self.pressed(Button::Left) {
            direction.x -= 1.0;
        }
        direction
    }
}

pub fn read_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut controls: ResMut<Controls>,
) {
    controls.release_all();
    for button in Button::ALL {
        let mouse_button = button.mouse();
        if keys.any_just_pressed(button.keys().iter().copied())
            || mouse_button.is_some_and(|m| mouse.just_pressed(m))
        {
            controls.press(button);
        }
        if keys.any_pressed(button.keys().iter().copied())
            || mouse_button.is_some_and(|m| mouse.pressed(m))
        {
            controls.hold(button);
        }
    }
}
