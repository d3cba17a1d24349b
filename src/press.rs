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
use std::time::{Duration, Instant};

use tracing::debug;

use crate::keypad::KEY_COUNT;
use crate::util::duration_seconds;

/// Default upper bound (exclusive) of a short press.
pub const DEFAULT_SHORT_PRESS: Duration = Duration::from_millis(400);

/// Default lower bound (inclusive) of a long press.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_secs(1);

/// How long a key was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    /// Between short and long. Neither a tap nor a hold.
    Ambiguous,
    Long,
}

/// Duration thresholds for classifying a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressThresholds {
    short_max: Duration,
    long_min: Duration,
}

impl Default for PressThresholds {
    fn default() -> Self {
        PressThresholds::new(DEFAULT_SHORT_PRESS, DEFAULT_LONG_PRESS)
    }
}

impl PressThresholds {
    pub fn new(short_max: Duration, long_min: Duration) -> PressThresholds {
        PressThresholds {
            short_max,
            long_min,
        }
    }

    pub fn classify(&self, duration: Duration) -> PressKind {
        if duration >= self.long_min {
            PressKind::Long
        } else if duration < self.short_max {
            PressKind::Short
        } else {
            PressKind::Ambiguous
        }
    }
}

/// Times presses of the special keys.
pub struct PressClassifier {
    special: [bool; KEY_COUNT],
    timers: [Option<Instant>; KEY_COUNT],
    thresholds: PressThresholds,
}

impl PressClassifier {
    /// Creates a classifier that times the given keys. Keys out of range are ignored.
    pub fn new(special_keys: &[usize], thresholds: PressThresholds) -> PressClassifier {
        let mut special = [false; KEY_COUNT];
        special_keys
            .iter()
            .filter(|key| **key < KEY_COUNT)
            .for_each(|key| special[*key] = true);

        PressClassifier {
            special,
            timers: [None; KEY_COUNT],
            thresholds,
        }
    }

    pub fn is_special(&self, key: usize) -> bool {
        key < KEY_COUNT && self.special[key]
    }

    /// Starts the timer for a special key.
    pub fn on_press(&mut self, key: usize, now: Instant) {
        if self.is_special(key) {
            self.timers[key] = Some(now);
        }
    }

    /// Stops the timer for a special key and returns how long it was held. None for
    /// ordinary keys or if no press was seen.
    pub fn on_release(&mut self, key: usize, now: Instant) -> Option<Duration> {
        if !self.is_special(key) {
            return None;
        }
        let start = self.timers[key].take()?;
        let held = now.saturating_duration_since(start);
        debug!(key, held = duration_seconds(held), "Special key released");
        Some(held)
    }

    /// Like [`PressClassifier::on_release`] but returns the classification.
    pub fn classify_release(&mut self, key: usize, now: Instant) -> Option<PressKind> {
        self.on_release(key, now)
            .map(|held| self.thresholds.classify(held))
    }
}
