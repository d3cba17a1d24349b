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
use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::Mutex;

use super::KEY_COUNT;
use crate::palette::Color;

/// How many committed frames are remembered.
pub const HISTORY_LIMIT: usize = 1024;

/// One committed set of LED colours.
pub type Frame = [Color; KEY_COUNT];

#[derive(Default)]
struct State {
    pressed: [bool; KEY_COUNT],
    staged: Frame,
    committed: Frame,
    frames: VecDeque<Frame>,
}

/// A mock keypad. Key states are scripted and committed LED frames are recorded.
///
/// Clones share state, so a test can keep a handle while the soundbox owns another.
#[derive(Clone)]
pub struct Keypad {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Keypad {
    /// Gets the given mock keypad.
    pub fn get(name: &str) -> Keypad {
        Keypad {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Holds the given key down.
    pub fn press(&self, key: usize) {
        self.state.lock().pressed[key] = true;
    }

    /// Lets go of the given key.
    pub fn release(&self, key: usize) {
        self.state.lock().pressed[key] = false;
    }

    /// The last committed colour of the given key.
    pub fn led(&self, key: usize) -> Color {
        self.state.lock().committed[key]
    }

    /// Committed frames since creation or the last [`Keypad::clear_frames`], up to
    /// the most recent [`HISTORY_LIMIT`].
    pub fn frames(&self) -> Vec<Frame> {
        self.state.lock().frames.iter().copied().collect()
    }

    pub fn clear_frames(&self) {
        self.state.lock().frames.clear();
    }
}

impl super::Keypad for Keypad {
    fn read_key_state(&mut self, key: usize) -> bool {
        self.state.lock().pressed[key]
    }

    fn set_led(&mut self, key: usize, color: Color) {
        self.state.lock().staged[key] = color;
    }

    fn commit_leds(&mut self) {
        let mut state = self.state.lock();
        let frame = state.staged;
        state.committed = frame;
        if state.frames.len() == HISTORY_LIMIT {
            state.frames.pop_front();
        }
        state.frames.push_back(frame);
    }
}

impl fmt::Display for Keypad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keypad::Keypad as _;

    #[test]
    fn test_mock_keypad() {
        let keypad = Keypad::get("mock");
        let mut driver = keypad.clone();

        assert!(!driver.read_key_state(2));
        keypad.press(2);
        assert!(driver.read_key_state(2));
        keypad.release(2);
        assert!(!driver.read_key_state(2));

        driver.set_led(7, Color::WHITE);
        // Staged colours are invisible until committed.
        assert_eq!(keypad.led(7), Color::OFF);
        driver.commit_leds();
        assert_eq!(keypad.led(7), Color::WHITE);
        assert_eq!(keypad.frames().len(), 1);

        keypad.clear_frames();
        assert!(keypad.frames().is_empty());
    }

    #[test]
    fn test_frame_history_is_bounded() {
        let keypad = Keypad::get("mock");
        let mut driver = keypad.clone();

        for _ in 0..HISTORY_LIMIT {
            driver.commit_leds();
        }
        driver.set_led(0, Color::WHITE);
        driver.commit_leds();

        let frames = keypad.frames();
        assert_eq!(frames.len(), HISTORY_LIMIT);
        assert_eq!(frames[HISTORY_LIMIT - 1][0], Color::WHITE);
    }
}
