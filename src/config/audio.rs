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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::keypad::KEY_COUNT;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_FOLDER: &str = "audio_files";

/// Sample files for each key, in key order.
pub const DEFAULT_FILES: [&str; KEY_COUNT] = [
    "ape.mp3",
    "auto.mp3",
    "baaa.mp3",
    "ambulance.mp3",
    "dodooo.mp3",
    "enea.mp3",
    "huhuh.mp3",
    "fire_lego.mp3",
    "muh.mp3",
    "nonna.mp3",
    "nonno.mp3",
    "fire_bruder.mp3",
    "mao.mp3",
    "tata.mp3",
    "torta.mp3",
    "biip.mp3",
];

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Audio {
    /// The audio device. "default" picks the host's default output.
    device: Option<String>,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// The folder holding the sample files.
    folder: Option<String>,

    /// Sample file names, indexed by key. Empty names leave the key silent.
    files: Option<Vec<String>>,
}

impl Audio {
    /// New will create a new Audio configuration for the given device.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the output sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn folder(&self) -> &Path {
        Path::new(self.folder.as_deref().unwrap_or(DEFAULT_FOLDER))
    }

    /// Returns the sample file names in key order.
    pub fn files(&self) -> Vec<String> {
        match &self.files {
            Some(files) => files.clone(),
            None => DEFAULT_FILES.iter().map(|file| file.to_string()).collect(),
        }
    }

    /// Returns the full path of every mapped file, indexed by key.
    pub fn file_paths(&self) -> [Option<PathBuf>; KEY_COUNT] {
        let files = self.files();
        std::array::from_fn(|key| {
            files
                .get(key)
                .filter(|file| !file.trim().is_empty())
                .map(|file| self.folder().join(file))
        })
    }
}
