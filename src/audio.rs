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
use std::{error::Error, fmt, path::Path};

use crate::config;
use crate::xylophone::VoiceSpec;

pub mod cpal;
pub mod decoder;
pub mod error;
pub mod mock;
pub mod synth;

pub use error::AudioError;

/// Identifies one note on a synthesizer: every voice that was pressed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub u64);

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice {}", self.0)
    }
}

/// A polyphonic synthesizer attached to an audio device.
///
/// Dropping the synthesizer detaches it from the device.
pub trait Synthesizer: Send {
    /// Starts all of the given voices together as one note.
    fn press(&mut self, voices: &[VoiceSpec]) -> Result<VoiceHandle, AudioError>;

    /// Moves every voice of the note into its release stage.
    fn release(&mut self, handle: VoiceHandle) -> Result<(), AudioError>;

    /// Releases every sounding note.
    fn release_all(&mut self) -> Result<(), AudioError>;
}

/// An audio output with a single sink. Only one producer, the sample decoder or a
/// synthesizer, is attached to the sink at a time.
pub trait Device: fmt::Display + Send {
    /// Stops whatever is attached, decodes the given file and starts playing it.
    fn load_and_play(&mut self, path: &Path) -> Result<(), AudioError>;

    /// Silences the sink and detaches the current producer.
    fn stop(&mut self);

    /// Returns true while a sample is still playing.
    fn is_playing(&self) -> bool;

    /// Creates a synthesizer and attaches it to the sink.
    fn create_synthesizer(&mut self) -> Result<Box<dyn Synthesizer>, AudioError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name.
pub fn get_device(config: &config::Audio) -> Result<Box<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Box::new(mock::Device::get(device)));
    };

    Ok(Box::new(cpal::Device::get(config)?))
}
