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

//! Event core for a 16-key backlit keypad that doubles as a sample player and a
//! synthesized xylophone.
//!
//! The [`soundbox::Soundbox`] owns every piece of runtime state and is ticked by a
//! single cooperative scan loop. Hardware is reached only through the
//! [`keypad::Keypad`], [`audio::Device`] and [`audio::Synthesizer`] traits.

pub mod audio;
pub mod config;
pub mod edges;
pub mod keypad;
pub mod mode;
pub mod palette;
pub mod press;
pub mod sound;
pub mod soundbox;
pub mod util;
pub mod xylophone;
