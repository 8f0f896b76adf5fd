use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

/// Friendly names for the non-character keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Input snapshot fed by window events and polled once per frame.
///
/// Interior mutability lets the event loop write through a shared reference
/// while the frame logic reads the same snapshot.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    mouse_position: RwLock<Vec2>,
    scroll_delta: RwLock<f32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    pub fn set_mouse_position(&self, position: Vec2) {
        *self.mouse_position.write() = position;
    }

    /// Accumulates scroll wheel travel until the frame consumes it.
    pub fn push_scroll(&self, delta: f32) {
        *self.scroll_delta.write() += delta;
    }

    /// Returns the accumulated scroll delta and resets it to zero.
    pub fn take_scroll(&self) -> f32 {
        std::mem::take(&mut *self.scroll_delta.write())
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        *self.mouse_position.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let state = InputState::new();
        state.set_key_down(KeyCode::Character('W'));
        assert!(state.is_key_down(KeyCode::Character('W')));
        state.set_key_up(KeyCode::Character('W'));
        assert!(!state.is_key_down(KeyCode::Character('W')));
    }

    #[test]
    fn input_state_tracks_mouse_buttons() {
        let state = InputState::new();
        assert!(!state.is_mouse_button_down(MouseButton::RIGHT));
        state.set_mouse_button_down(MouseButton::RIGHT);
        assert!(state.is_mouse_button_down(MouseButton::RIGHT));
        state.set_mouse_button_up(MouseButton::RIGHT);
        assert!(!state.is_mouse_button_down(MouseButton::RIGHT));
    }

    #[test]
    fn scroll_accumulates_and_resets_on_take() {
        let state = InputState::new();
        state.push_scroll(1.0);
        state.push_scroll(-0.25);
        assert!((state.take_scroll() - 0.75).abs() < f32::EPSILON);
        assert_eq!(state.take_scroll(), 0.0);
    }
}
