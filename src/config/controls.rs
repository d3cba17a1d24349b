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
use std::time::Duration;

use serde::Deserialize;

use super::{error::ConfigError, parse_duration};
use crate::mode::Mode;
use crate::press::{DEFAULT_LONG_PRESS, DEFAULT_SHORT_PRESS};

/// The key that switches modes on a long press.
pub const DEFAULT_SWITCH_KEY: usize = 15;

/// Idle time between two scans of the keypad.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// A YAML representation of how the keys behave.
#[derive(Deserialize, Clone, Default)]
pub struct Controls {
    /// The mode switch key.
    switch_key: Option<usize>,

    /// Presses shorter than this are short.
    short_press: Option<String>,

    /// Presses at least this long are long.
    long_press: Option<String>,

    /// The mode to start in.
    start_mode: Option<Mode>,

    /// Idle time between scans.
    tick: Option<String>,
}

impl Controls {
    pub fn switch_key(&self) -> usize {
        self.switch_key.unwrap_or(DEFAULT_SWITCH_KEY)
    }

    pub fn short_press(&self) -> Result<Duration, ConfigError> {
        parse_duration("controls.short_press", &self.short_press, DEFAULT_SHORT_PRESS)
    }

    pub fn long_press(&self) -> Result<Duration, ConfigError> {
        parse_duration("controls.long_press", &self.long_press, DEFAULT_LONG_PRESS)
    }

    pub fn start_mode(&self) -> Mode {
        self.start_mode.unwrap_or_default()
    }

    pub fn tick(&self) -> Result<Duration, ConfigError> {
        parse_duration("controls.tick", &self.tick, DEFAULT_TICK)
    }
}
