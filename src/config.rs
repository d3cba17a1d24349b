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
//! YAML configuration. Every setting is optional and falls back to a compiled-in
//! default, so an empty file describes the stock sound box.

use std::{path::Path, time::Duration};

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use crate::keypad::KEY_COUNT;

mod audio;
mod controls;
pub mod error;
mod keypad;
mod leds;
mod xylophone;

pub use audio::{Audio, DEFAULT_FILES};
pub use controls::Controls;
pub use error::ConfigError;
pub use keypad::Keypad;
pub use leds::Leds;
pub use xylophone::Xylophone;

/// Highest valid MIDI note.
const MAX_MIDI_NOTE: u8 = 127;

/// The whole sound box configuration.
#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct Soundpad {
    audio: Audio,
    keypad: Keypad,
    controls: Controls,
    leds: Leds,
    xylophone: Xylophone,
}

impl Soundpad {
    /// Loads and validates the configuration file at the given path.
    pub fn load(path: &Path) -> Result<Soundpad, ConfigError> {
        let soundpad: Soundpad = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        soundpad.validate()?;
        Ok(soundpad)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Soundpad, ConfigError> {
        let soundpad: Soundpad = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        soundpad.validate()?;
        Ok(soundpad)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn leds(&self) -> &Leds {
        &self.leds
    }

    pub fn xylophone(&self) -> &Xylophone {
        &self.xylophone
    }

    /// Checks values that parse fine but can't work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let switch_key = self.controls.switch_key();
        if switch_key >= KEY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "switch key {} is out of range, keys are 0 to {}",
                switch_key,
                KEY_COUNT - 1
            )));
        }

        let short_press = self.controls.short_press()?;
        let long_press = self.controls.long_press()?;
        if long_press < short_press {
            return Err(ConfigError::Invalid(format!(
                "long press ({:?}) must not be shorter than short press ({:?})",
                long_press, short_press
            )));
        }
        if self.controls.tick()?.is_zero() {
            return Err(ConfigError::Invalid("tick must be longer than zero".to_string()));
        }

        let files = self.audio.files().len();
        if files > KEY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "{} sample files given, there are only {} keys",
                files, KEY_COUNT
            )));
        }

        let notes = self.xylophone.notes();
        if notes.len() > KEY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "{} notes given, there are only {} keys",
                notes.len(),
                KEY_COUNT
            )));
        }
        if let Some(note) = notes.iter().find(|note| **note > MAX_MIDI_NOTE) {
            return Err(ConfigError::Invalid(format!(
                "note {} is not a MIDI note",
                note
            )));
        }

        if self
            .leds
            .spreads()
            .iter()
            .any(|spread| !spread.is_finite() || *spread <= 0.0)
        {
            return Err(ConfigError::Invalid(
                "palette spread must be greater than zero".to_string(),
            ));
        }

        self.leds.flash()?;
        self.leds.startup_flash()?;
        self.leds.settle()?;
        Ok(())
    }
}

/// Parses an optional duration string such as "400ms", falling back to the default.
pub(crate) fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|e| ConfigError::InvalidDuration {
                field,
                value: value.clone(),
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(default),
    }
}
