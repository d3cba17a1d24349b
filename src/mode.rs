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
use std::{
    fmt,
    time::{Duration, Instant},
};

use serde::Deserialize;
use tracing::{debug, info, span, Level};

use crate::keypad::{Keypad, KEY_COUNT};
use crate::palette::{Color, Palette};
use crate::press::{PressClassifier, PressKind, PressThresholds};
use crate::sound::SoundManager;

/// What the keys do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Each key plays a sound file.
    #[default]
    SamplePlayer,
    /// Each key plays a synthesized xylophone note.
    Xylophone,
}

impl Mode {
    /// The other mode.
    pub fn toggled(self) -> Mode {
        match self {
            Mode::SamplePlayer => Mode::Xylophone,
            Mode::Xylophone => Mode::SamplePlayer,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::SamplePlayer => write!(f, "sample player"),
            Mode::Xylophone => write!(f, "xylophone"),
        }
    }
}

/// Blinks every LED white a number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    count: u32,
    interval: Duration,
}

impl Flash {
    pub fn new(count: u32, interval: Duration) -> Flash {
        Flash { count, interval }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Shows the flash, leaving every LED off.
    pub fn show(&self, keypad: &mut dyn Keypad) {
        for _ in 0..self.count {
            for color in [Color::WHITE, Color::OFF] {
                (0..KEY_COUNT).for_each(|key| keypad.set_led(key, color));
                keypad.commit_leds();
                spin_sleep::sleep(self.interval);
            }
        }
    }
}

/// What releasing a key means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    /// Let go of the key's note.
    ReleaseNote,
    /// The switch key was held long enough to change modes.
    SwitchMode,
}

/// Owns the current mode and runs the switch between modes.
pub struct ModeController {
    mode: Mode,
    switch_key: usize,
    classifier: PressClassifier,
    flash: Flash,
    settle: Duration,
}

impl ModeController {
    pub fn new(
        mode: Mode,
        switch_key: usize,
        thresholds: PressThresholds,
        flash: Flash,
        settle: Duration,
    ) -> ModeController {
        ModeController {
            mode,
            switch_key,
            classifier: PressClassifier::new(&[switch_key], thresholds),
            flash,
            settle,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn switch_key(&self) -> usize {
        self.switch_key
    }

    /// Records a press. Only the switch key is timed.
    pub fn on_press(&mut self, key: usize, now: Instant) {
        self.classifier.on_press(key, now);
    }

    /// Decides what a release means. Only a long press of the switch key changes
    /// modes; short and in-between presses release the note like any other key.
    pub fn on_release(&mut self, key: usize, now: Instant) -> ReleaseAction {
        match self.classifier.classify_release(key, now) {
            Some(PressKind::Long) => ReleaseAction::SwitchMode,
            Some(kind) => {
                debug!(key, kind = ?kind, "Switch key press too short to change mode");
                ReleaseAction::ReleaseNote
            }
            None => ReleaseAction::ReleaseNote,
        }
    }

    /// Switches to the other mode: silences the current one, flashes the keypad,
    /// repaints it for the new mode and gets the new mode's sound ready.
    pub fn switch_mode(
        &mut self,
        sound: &mut SoundManager,
        keypad: &mut dyn Keypad,
        palette: &Palette,
        held: &[bool; KEY_COUNT],
    ) -> Mode {
        let span = span!(Level::INFO, "switch mode");
        let _enter = span.enter();

        let leaving = self.mode;
        sound.teardown(leaving);
        self.flash.show(keypad);

        self.mode = leaving.toggled();
        info!(from = %leaving, to = %self.mode, "Switched mode");

        palette.paint(keypad, self.mode, held);
        keypad.commit_leds();
        spin_sleep::sleep(self.settle);

        sound.prepare(self.mode);
        self.mode
    }
}
