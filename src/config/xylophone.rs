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
use serde::Deserialize;

use crate::xylophone::DEFAULT_MIDI_NOTES;

/// A YAML representation of the xylophone configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Xylophone {
    /// MIDI notes, indexed by key.
    notes: Option<Vec<u8>>,
}

impl Xylophone {
    /// Returns the MIDI notes in key order.
    pub fn notes(&self) -> Vec<u8> {
        match &self.notes {
            Some(notes) => notes.clone(),
            None => DEFAULT_MIDI_NOTES.to_vec(),
        }
    }
}
