// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::keypad::{Keypad, KEY_COUNT};

/// What happened to a key between two scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    /// The key went down this scan.
    Pressed,
    /// The key came up this scan.
    Released,
    #[default]
    None,
}

/// The tracked state of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyState {
    pub index: usize,
    pub pressed: bool,
    pub previous_pressed: bool,
}

impl KeyState {
    fn new(index: usize) -> KeyState {
        KeyState {
            index,
            pressed: false,
            previous_pressed: false,
        }
    }

    fn edge(&self) -> Edge {
        match (self.previous_pressed, self.pressed) {
            (false, true) => Edge::Pressed,
            (true, false) => Edge::Released,
            _ => Edge::None,
        }
    }
}

/// Turns raw key levels into press and release edges, one scan at a time.
pub struct EdgeTracker {
    keys: [KeyState; KEY_COUNT],
}

impl Default for EdgeTracker {
    fn default() -> Self {
        EdgeTracker::new()
    }
}

impl EdgeTracker {
    pub fn new() -> EdgeTracker {
        EdgeTracker {
            keys: std::array::from_fn(KeyState::new),
        }
    }

    /// Reads every key once and returns the edge seen on each.
    pub fn scan(&mut self, keypad: &mut dyn Keypad) -> [Edge; KEY_COUNT] {
        std::array::from_fn(|key| {
            let raw = keypad.read_key_state(key);
            self.update(key, raw)
        })
    }

    /// Feeds a single raw reading for a key. Keys off the pad never see an edge.
    pub fn update(&mut self, key: usize, raw: bool) -> Edge {
        let Some(state) = self.keys.get_mut(key) else {
            return Edge::None;
        };
        state.previous_pressed = state.pressed;
        state.pressed = raw;
        state.edge()
    }

    pub fn is_pressed(&self, key: usize) -> bool {
        self.keys.get(key).is_some_and(|state| state.pressed)
    }

    pub fn key(&self, key: usize) -> Option<&KeyState> {
        self.keys.get(key)
    }

    /// Which keys are currently held.
    pub fn held(&self) -> [bool; KEY_COUNT] {
        std::array::from_fn(|key| self.keys[key].pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypad::mock;

    #[test]
    fn test_single_key_edges() {
        let mut tracker = EdgeTracker::new();

        assert_eq!(tracker.update(2, false), Edge::None);
        assert_eq!(tracker.update(2, true), Edge::Pressed);
        assert!(tracker.is_pressed(2));
        assert_eq!(tracker.update(2, true), Edge::None);
        assert_eq!(tracker.update(2, false), Edge::Released);
        assert_eq!(tracker.update(2, false), Edge::None);
        assert!(!tracker.is_pressed(2));

        let state = tracker.key(2);
        assert_eq!(state.map(|state| state.index), Some(2));
        assert!(state.is_some_and(|state| !state.previous_pressed));
    }

    #[test]
    fn test_keys_off_the_pad() {
        let mut tracker = EdgeTracker::new();

        assert_eq!(tracker.update(KEY_COUNT, true), Edge::None);
        assert_eq!(tracker.update(usize::MAX, true), Edge::None);
        assert!(!tracker.is_pressed(KEY_COUNT));
        assert!(tracker.key(KEY_COUNT).is_none());
        assert!(tracker.held().iter().all(|held| !held));
    }

    #[test]
    fn test_scan() {
        let keypad = mock::Keypad::get("mock");
        let mut driver = keypad.clone();
        let mut tracker = EdgeTracker::new();

        keypad.press(0);
        keypad.press(15);
        let edges = tracker.scan(&mut driver);
        assert_eq!(edges[0], Edge::Pressed);
        assert_eq!(edges[15], Edge::Pressed);
        assert!(edges[1..15].iter().all(|edge| *edge == Edge::None));

        keypad.release(0);
        let edges = tracker.scan(&mut driver);
        assert_eq!(edges[0], Edge::Released);
        assert_eq!(edges[15], Edge::None);

        let mut held = [false; KEY_COUNT];
        held[15] = true;
        assert_eq!(tracker.held(), held);
    }
}
