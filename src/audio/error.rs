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
use std::path::PathBuf;

/// Errors raised by audio devices and synthesizers.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio file {0} not found")]
    FileNotFound(PathBuf),

    #[error("unable to decode {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("synthesizer error: {0}")]
    Synthesizer(String),

    #[error("output stream error: {0}")]
    Stream(String),
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        match e {
            symphonia::core::errors::Error::IoError(e) => AudioError::Io(e),
            e => AudioError::Decode(e.to_string()),
        }
    }
}
