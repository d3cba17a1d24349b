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

use tracing::{debug, info, span, warn, Level};

use crate::audio::Device;
use crate::config::{ConfigError, Soundpad};
use crate::edges::{Edge, EdgeTracker};
use crate::keypad::Keypad;
use crate::mode::{Flash, Mode, ModeController, ReleaseAction};
use crate::palette::{Color, Palette};
use crate::press::PressThresholds;
use crate::sound::SoundManager;

/// The sound box: scans the keypad, plays sounds and keeps the LEDs in step.
pub struct Soundbox {
    keypad: Box<dyn Keypad>,
    edges: EdgeTracker,
    palette: Palette,
    sound: SoundManager,
    modes: ModeController,
    startup_flash: Flash,
    tick: Duration,
}

impl Soundbox {
    /// Creates a sound box from the configuration and its devices.
    pub fn new(
        config: &Soundpad,
        keypad: Box<dyn Keypad>,
        device: Box<dyn Device>,
    ) -> Result<Soundbox, ConfigError> {
        let controls = config.controls();
        let leds = config.leds();

        Ok(Soundbox {
            keypad,
            edges: EdgeTracker::new(),
            palette: Palette::new(leds.sample_player(), leds.xylophone()),
            sound: SoundManager::new(
                device,
                config.audio().file_paths(),
                &config.xylophone().notes(),
            ),
            modes: ModeController::new(
                controls.start_mode(),
                controls.switch_key(),
                PressThresholds::new(controls.short_press()?, controls.long_press()?),
                leds.flash()?,
                leds.settle()?,
            ),
            startup_flash: leds.startup_flash()?,
            tick: controls.tick()?,
        })
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn sound(&self) -> &SoundManager {
        &self.sound
    }

    /// Shows the start-up flash, paints the first palette and readies the
    /// starting mode.
    pub fn start(&mut self) {
        let mode = self.modes.mode();
        info!(
            keypad = self.keypad.to_string(),
            mode = %mode,
            switch_key = self.modes.switch_key(),
            "Starting sound box"
        );

        self.startup_flash.show(self.keypad.as_mut());
        self.palette
            .paint(self.keypad.as_mut(), mode, &self.edges.held());
        self.keypad.commit_leds();
        self.sound.prepare(mode);
    }

    /// Runs one scan of the keypad.
    pub fn tick(&mut self, now: Instant) {
        let mode = self.modes.mode();
        if self.palette.advance(mode) {
            self.palette
                .paint(self.keypad.as_mut(), mode, &self.edges.held());
        }

        let edges = self.edges.scan(self.keypad.as_mut());
        for (key, edge) in edges.into_iter().enumerate() {
            match edge {
                Edge::Pressed => self.on_press(key, now),
                Edge::Released => self.on_release(key, now),
                Edge::None => {}
            }
        }

        self.sound.poll();
        self.keypad.commit_leds();
    }

    fn on_press(&mut self, key: usize, now: Instant) {
        let mode = self.modes.mode();
        info!(key, mode = %mode, "Key pressed");

        self.keypad.set_led(key, Color::WHITE);
        match self.sound.trigger(mode, key) {
            Ok(triggered) => debug!(key, triggered = %triggered, "Triggered"),
            Err(e) => warn!(key, err = e.to_string(), "Unable to play key"),
        }
        self.modes.on_press(key, now);
    }

    fn on_release(&mut self, key: usize, now: Instant) {
        let mode = self.modes.mode();
        info!(key, mode = %mode, "Key released");

        self.keypad.set_led(key, self.palette.color(key, mode));
        match self.modes.on_release(key, now) {
            ReleaseAction::SwitchMode => {
                let held = self.edges.held();
                self.modes.switch_mode(
                    &mut self.sound,
                    self.keypad.as_mut(),
                    &self.palette,
                    &held,
                );
            }
            ReleaseAction::ReleaseNote if mode == Mode::Xylophone => {
                if let Err(e) = self.sound.release(key) {
                    warn!(key, err = e.to_string(), "Unable to release note");
                }
            }
            ReleaseAction::ReleaseNote => {}
        }
    }

    /// Starts the sound box and scans the keypad forever.
    pub fn run(&mut self) {
        let span = span!(Level::INFO, "soundbox");
        let _enter = span.enter();

        self.start();
        loop {
            self.tick(Instant::now());
            spin_sleep::sleep(self.tick);
        }
    }
}
