use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Engine-level input event, in window pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerMoved(Vec2),
    /// Primary button pressed at the pointer position.
    Click(Vec2),
    /// A key went down. Auto-repeats are not reported.
    KeyDown(KeyCode),
}

/// Tracks pointer and key state and turns window events into [`InputEvent`]s.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    pointer: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(key) => self.key(key, event.state),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::MouseInput { state, button, .. } => self.button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.buttons_down.clear();
                None
            }
            _ => None,
        }
    }

    pub fn key(&mut self, key: KeyCode, state: ElementState) -> Option<InputEvent> {
        match state {
            ElementState::Pressed => self.keys_down.insert(key).then_some(InputEvent::KeyDown(key)),
            ElementState::Released => {
                self.keys_down.remove(&key);
                None
            }
        }
    }

    pub fn button(&mut self, button: MouseButton, state: ElementState) -> Option<InputEvent> {
        match state {
            ElementState::Pressed => {
                let fresh = self.buttons_down.insert(button);
                (fresh && button == MouseButton::Left).then_some(InputEvent::Click(self.pointer))
            }
            ElementState::Released => {
                self.buttons_down.remove(&button);
                None
            }
        }
    }

    pub fn pointer_moved(&mut self, position: Vec2) -> Option<InputEvent> {
        if position == self.pointer {
            return None;
        }
        self.pointer = position;
        Some(InputEvent::PointerMoved(position))
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Current pointer position in window pixels.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_fire_once() {
        let mut input = Input::new();
        assert_eq!(
            input.key(KeyCode::Backquote, ElementState::Pressed),
            Some(InputEvent::KeyDown(KeyCode::Backquote))
        );
        assert_eq!(input.key(KeyCode::Backquote, ElementState::Pressed), None);
        assert!(input.key_down(KeyCode::Backquote));
        input.key(KeyCode::Backquote, ElementState::Released);
        assert!(input.key(KeyCode::Backquote, ElementState::Pressed).is_some());
    }

    #[test]
    fn left_press_clicks_at_the_pointer() {
        let mut input = Input::new();
        input.pointer_moved(Vec2::new(12.0, 34.0));
        assert_eq!(
            input.button(MouseButton::Left, ElementState::Pressed),
            Some(InputEvent::Click(Vec2::new(12.0, 34.0)))
        );
        assert_eq!(input.button(MouseButton::Left, ElementState::Pressed), None);
        assert_eq!(input.button(MouseButton::Right, ElementState::Pressed), None);
        assert!(input.mouse_down(MouseButton::Right));
    }

    #[test]
    fn unchanged_pointer_is_not_an_event() {
        let mut input = Input::new();
        assert!(input.pointer_moved(Vec2::new(1.0, 1.0)).is_some());
        assert!(input.pointer_moved(Vec2::new(1.0, 1.0)).is_none());
    }
}
