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
use crate::{
    mode::Flash,
    palette::{self, PaletteStyle},
};

const DEFAULT_FLASH_COUNT: u32 = 3;
const DEFAULT_FLASH_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_STARTUP_FLASH_COUNT: u32 = 2;
const DEFAULT_STARTUP_FLASH_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// How one mode colours the keys.
#[derive(Deserialize, Clone, Default)]
pub struct Style {
    /// Brightness cap per LED channel, 0-255.
    max_value: Option<u8>,

    /// Grid diagonals per turn of the colour wheel.
    spread: Option<f64>,

    /// Whether the colours drift over time.
    animated: Option<bool>,
}

impl Style {
    pub fn max_value(&self) -> u8 {
        self.max_value.unwrap_or(palette::DEFAULT_MAX_VALUE)
    }

    fn spread(&self, default: f64) -> f64 {
        self.spread.unwrap_or(default)
    }

    pub fn animated(&self) -> bool {
        self.animated.unwrap_or(false)
    }
}

/// A flash of every LED.
#[derive(Deserialize, Clone, Default)]
pub struct FlashConfig {
    count: Option<u32>,
    interval: Option<String>,
}

impl FlashConfig {
    fn to_flash(
        &self,
        field: &'static str,
        default_count: u32,
        default_interval: Duration,
    ) -> Result<Flash, ConfigError> {
        Ok(Flash::new(
            self.count.unwrap_or(default_count),
            parse_duration(field, &self.interval, default_interval)?,
        ))
    }
}

/// A YAML representation of the LED configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Leds {
    sample_player: Option<Style>,
    xylophone: Option<Style>,

    /// Flash shown on a mode switch.
    flash: Option<FlashConfig>,

    /// Flash shown at start-up.
    startup_flash: Option<FlashConfig>,

    /// Pause after repainting on a mode switch.
    settle: Option<String>,
}

impl Leds {
    pub fn sample_player(&self) -> PaletteStyle {
        let style = self.sample_player.clone().unwrap_or_default();
        PaletteStyle::new(
            style.spread(palette::DEFAULT_SAMPLE_PLAYER_SPREAD),
            style.max_value(),
            style.animated(),
        )
    }

    pub fn xylophone(&self) -> PaletteStyle {
        let style = self.xylophone.clone().unwrap_or_default();
        PaletteStyle::new(
            style.spread(palette::DEFAULT_XYLOPHONE_SPREAD),
            style.max_value(),
            style.animated(),
        )
    }

    pub fn flash(&self) -> Result<Flash, ConfigError> {
        self.flash.clone().unwrap_or_default().to_flash(
            "leds.flash.interval",
            DEFAULT_FLASH_COUNT,
            DEFAULT_FLASH_INTERVAL,
        )
    }

    pub fn startup_flash(&self) -> Result<Flash, ConfigError> {
        self.startup_flash.clone().unwrap_or_default().to_flash(
            "leds.startup_flash.interval",
            DEFAULT_STARTUP_FLASH_COUNT,
            DEFAULT_STARTUP_FLASH_INTERVAL,
        )
    }

    pub fn settle(&self) -> Result<Duration, ConfigError> {
        parse_duration("leds.settle", &self.settle, DEFAULT_SETTLE)
    }

    /// Returns the configured spreads, for validation.
    pub(super) fn spreads(&self) -> [f64; 2] {
        [self.sample_player().spread(), self.xylophone().spread()]
    }
}
