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

//! Key colours for each mode.
//!
//! Every colour is a pure function of the key's grid position, the mode and an
//! animation phase. Static palettes ignore the phase.

mod color;

pub use color::Color;

use crate::keypad::{key_to_xy, Keypad, KEY_COUNT};
use crate::mode::Mode;

/// Default brightness cap for any LED channel while showing a palette.
pub const DEFAULT_MAX_VALUE: u8 = 100;

/// Default hue spread for the sample player palette.
pub const DEFAULT_SAMPLE_PLAYER_SPREAD: f64 = 7.0;

/// Default hue spread for the xylophone palette.
pub const DEFAULT_XYLOPHONE_SPREAD: f64 = 6.0;

/// Animation phase steps that shift the hue by one grid diagonal.
const PHASE_DIVISOR: f64 = 20.0;

/// How a single mode colours the keypad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteStyle {
    /// Number of grid diagonals that make up a full turn of the colour wheel.
    spread: f64,
    /// HSV value, 0.0 to 1.0.
    brightness: f64,
    /// Whether the hue drifts with the animation phase.
    animated: bool,
}

impl PaletteStyle {
    /// Creates a style. `max_value` caps every colour channel (0-255).
    pub fn new(spread: f64, max_value: u8, animated: bool) -> PaletteStyle {
        PaletteStyle {
            spread,
            brightness: f64::from(max_value) / 255.0,
            animated,
        }
    }

    /// The hue (0.0 to 1.0) of a key at the given phase.
    pub fn hue(&self, key: usize, phase: u64) -> f64 {
        let (x, y) = key_to_xy(key);
        let drift = if self.animated {
            phase as f64 / PHASE_DIVISOR
        } else {
            0.0
        };
        let hue = ((x + y) as f64 + drift) / self.spread;
        hue - hue.floor()
    }

    /// The colour of a key at the given phase.
    pub fn color(&self, key: usize, phase: u64) -> Color {
        Color::from_hsv(self.hue(key, phase) * 360.0, 1.0, self.brightness)
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }
}

/// The palettes for both modes plus the shared animation phase.
#[derive(Debug, Clone)]
pub struct Palette {
    sample_player: PaletteStyle,
    xylophone: PaletteStyle,
    phase: u64,
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new(
            PaletteStyle::new(DEFAULT_SAMPLE_PLAYER_SPREAD, DEFAULT_MAX_VALUE, false),
            PaletteStyle::new(DEFAULT_XYLOPHONE_SPREAD, DEFAULT_MAX_VALUE, false),
        )
    }
}

impl Palette {
    pub fn new(sample_player: PaletteStyle, xylophone: PaletteStyle) -> Palette {
        Palette {
            sample_player,
            xylophone,
            phase: 0,
        }
    }

    pub fn style(&self, mode: Mode) -> &PaletteStyle {
        match mode {
            Mode::SamplePlayer => &self.sample_player,
            Mode::Xylophone => &self.xylophone,
        }
    }

    /// The colour of a key in the given mode at the current phase.
    pub fn color(&self, key: usize, mode: Mode) -> Color {
        self.style(mode).color(key, self.phase)
    }

    pub fn phase(&self) -> u64 {
        self.phase
    }

    /// Moves the animation forward one step. Returns true if the colours for the
    /// mode changed and the keypad needs repainting.
    pub fn advance(&mut self, mode: Mode) -> bool {
        if !self.style(mode).is_animated() {
            return false;
        }
        self.phase = self.phase.wrapping_add(1);
        true
    }

    /// Sets every LED to its palette colour, leaving held keys white. Does not commit.
    pub fn paint(&self, keypad: &mut dyn Keypad, mode: Mode, held: &[bool; KEY_COUNT]) {
        for (key, held) in held.iter().enumerate() {
            let color = if *held {
                Color::WHITE
            } else {
                self.color(key, mode)
            };
            keypad.set_led(key, color);
        }
    }
}
