//! Pointer input state.
//!
//! The [`Input`] set tracks which buttons are currently pressed, just pressed
//! this frame, or just released this frame. [`Pointer`] pairs the mouse
//! buttons with the cursor position; the gizmos read it once per step and
//! never buffer events.
//!
//! The host feeds it from its own event loop (winit or otherwise) and calls
//! [`Pointer::end_frame`] after the gizmos have run.

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::event::MouseButton;

use crate::math::Vec2;

/// Tracks the state of a set of inputs (keys or mouse buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Record a press (from the host's event handler).
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    /// Record a release (from the host's event handler).
    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse cursor position in window pixels, origin top-left, y down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

impl CursorPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Mouse buttons plus cursor, as seen by one gizmo step.
#[derive(Debug, Clone, Default)]
pub struct Pointer {
    pub buttons: Input<MouseButton>,
    pub cursor: CursorPosition,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the cursor to a window-pixel position.
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.cursor = CursorPosition::new(x, y);
    }

    /// Whether the primary (left) button went down this frame.
    pub fn primary_just_pressed(&self) -> bool {
        self.buttons.just_pressed(MouseButton::Left)
    }

    /// Whether the primary button is held.
    pub fn primary_pressed(&self) -> bool {
        self.buttons.pressed(MouseButton::Left)
    }

    /// Whether the primary button came up this frame.
    pub fn primary_just_released(&self) -> bool {
        self.buttons.just_released(MouseButton::Left)
    }

    /// Clear the "just" sets. Call once per frame after the gizmos ran.
    pub fn end_frame(&mut self) {
        self.buttons.clear_just();
    }
}
