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
use std::{error::Error, fmt};

use crate::config;
use crate::palette::Color;

pub mod mock;
pub mod terminal;

/// Number of keys on the pad.
pub const KEY_COUNT: usize = 16;

/// Keys per grid row/column.
pub const GRID_WIDTH: usize = 4;

/// The keypad hardware: raw key states in, LED colours out.
pub trait Keypad: fmt::Display {
    /// Returns true if the given key is physically held down right now.
    fn read_key_state(&mut self, key: usize) -> bool;

    /// Stages a colour for the given key. Nothing is shown until [`Keypad::commit_leds`].
    fn set_led(&mut self, key: usize, color: Color);

    /// Pushes all staged LED colours out to the pixels.
    fn commit_leds(&mut self);
}

/// Converts a key number into its (x, y) grid position.
pub fn key_to_xy(key: usize) -> (usize, usize) {
    (key / GRID_WIDTH, key % GRID_WIDTH)
}

/// Gets the keypad described by the given configuration.
pub fn get_keypad(config: &config::Keypad) -> Result<Box<dyn Keypad>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Box::new(mock::Keypad::get(device)));
    }
    if device == terminal::DEVICE_NAME {
        return Ok(Box::new(terminal::Keypad::start()?));
    }

    Err(format!("no keypad found with name {}", device).into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_to_xy() {
        assert_eq!(key_to_xy(0), (0, 0));
        assert_eq!(key_to_xy(3), (0, 3));
        assert_eq!(key_to_xy(5), (1, 1));
        assert_eq!(key_to_xy(15), (3, 3));
    }

    #[test]
    fn test_get_keypad() {
        let keypad = get_keypad(&config::Keypad::new("mock-pad")).unwrap();
        assert_eq!(keypad.to_string(), "mock-pad (Mock)");

        assert!(get_keypad(&config::Keypad::new("nonexistent")).is_err());
    }
}
