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
use std::fmt;

/// An RGB colour as sent to a key's LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// The "key is held" colour.
    pub const WHITE: Color = Color::new(255, 255, 255);

    /// LED switched off.
    pub const OFF: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts a hue in degrees, a saturation and a value (both 0.0 to 1.0) to RGB.
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        // Each sector of the colour wheel is 60 degrees wide with its own
        // ordering of the RGB components.
        let sector = (h / 60.0).floor() as u8 % 6;
        let (r, g, b) = match sector {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x), // sector 5
        };

        Self {
            r: ((r + m) * 255.0) as u8,
            g: ((g + m) * 255.0) as u8,
            b: ((b + m) * 255.0) as u8,
        }
    }

    /// Returns true if every channel is at full brightness.
    pub fn is_white(&self) -> bool {
        *self == Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hsv_primaries() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0), Color::new(255, 0, 0));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0), Color::new(0, 255, 0));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0), Color::new(0, 0, 255));
    }

    #[test]
    fn test_from_hsv_value_caps_brightness() {
        let capped = Color::from_hsv(0.0, 1.0, 100.0 / 255.0);
        assert!((99..=100).contains(&capped.r));
        assert_eq!((capped.g, capped.b), (0, 0));

        let off = Color::from_hsv(200.0, 1.0, 0.0);
        assert_eq!(off, Color::OFF);
    }

    #[test]
    fn test_display() {
        assert_eq!("#ff0080", Color::new(255, 0, 128).to_string());
        assert!(Color::WHITE.is_white());
        assert!(!Color::OFF.is_white());
    }
}
