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
//! The xylophone timbre: note table, envelopes and the shared sine wavetables.

use std::{f64::consts::PI, sync::Arc, time::Duration};

use crate::keypad::KEY_COUNT;

/// MIDI notes for each key, C3 upwards in semitones.
pub const DEFAULT_MIDI_NOTES: [u8; KEY_COUNT] = [
    48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63,
];

/// Frequency ratio of the overtone to the fundamental.
pub const OVERTONE_RATIO: f64 = 2.756;

/// Amplitude of the overtone relative to the fundamental.
pub const OVERTONE_SCALE: f64 = 0.5;

/// Samples in one cycle of a wavetable.
pub const WAVETABLE_LENGTH: usize = 512;

/// Converts a MIDI note to its frequency in Hz, A4 (69) being 440Hz.
pub fn midi_to_frequency(note: u8) -> f64 {
    440.0 * 2f64.powf((f64::from(note) - 69.0) / 12.0)
}

/// A linear ADSR envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: Duration,
    pub decay: Duration,
    /// Level held after the decay, 0.0 to 1.0.
    pub sustain_level: f32,
    pub release: Duration,
}

/// Envelope of the struck bar.
pub const FUNDAMENTAL_ENVELOPE: Envelope = Envelope {
    attack: Duration::from_millis(10),
    decay: Duration::from_millis(200),
    sustain_level: 0.1,
    release: Duration::from_millis(200),
};

/// The overtone dies out almost immediately.
pub const OVERTONE_ENVELOPE: Envelope = Envelope {
    attack: Duration::from_millis(10),
    decay: Duration::from_millis(50),
    sustain_level: 0.0,
    release: Duration::from_millis(100),
};

/// One cycle of a waveform as signed 16 bit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform(Arc<[i16]>);

impl Waveform {
    /// A sine cycle of the given length, scaled by `scale` (0.0 to 1.0).
    pub fn sine(length: usize, scale: f64) -> Waveform {
        let amplitude = f64::from(i16::MAX) * scale.clamp(0.0, 1.0);
        Waveform(
            (0..length)
                .map(|i| (amplitude * (2.0 * PI * i as f64 / length as f64).sin()) as i16)
                .collect(),
        )
    }

    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up the sample at a phase in cycles, 0.0 to 1.0, as a float.
    pub fn sample_at(&self, phase: f64) -> f32 {
        if self.0.is_empty() {
            return 0.0;
        }
        let index = ((phase - phase.floor()) * self.0.len() as f64) as usize % self.0.len();
        f32::from(self.0[index]) / f32::from(i16::MAX)
    }
}

/// One oscillator for a note.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSpec {
    pub frequency: f64,
    pub waveform: Waveform,
    pub envelope: Envelope,
}

/// The tables every note shares. Built once at start-up.
#[derive(Debug, Clone)]
pub struct Timbre {
    fundamental: Waveform,
    overtone: Waveform,
}

impl Default for Timbre {
    fn default() -> Self {
        Timbre::new()
    }
}

impl Timbre {
    pub fn new() -> Timbre {
        Timbre {
            fundamental: Waveform::sine(WAVETABLE_LENGTH, 1.0),
            overtone: Waveform::sine(WAVETABLE_LENGTH, OVERTONE_SCALE),
        }
    }

    /// The two voices struck together for a note: the fundamental and its overtone.
    pub fn voices(&self, frequency: f64) -> [VoiceSpec; 2] {
        [
            VoiceSpec {
                frequency,
                waveform: self.fundamental.clone(),
                envelope: FUNDAMENTAL_ENVELOPE,
            },
            VoiceSpec {
                frequency: frequency * OVERTONE_RATIO,
                waveform: self.overtone.clone(),
                envelope: OVERTONE_ENVELOPE,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_to_frequency() {
        assert!((midi_to_frequency(69) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(57) - 220.0).abs() < 1e-9);
        assert!((midi_to_frequency(53) - 174.614).abs() < 0.01);
        assert!((midi_to_frequency(48) - 130.813).abs() < 0.01);
    }

    #[test]
    fn test_voices_for_key_five() {
        let timbre = Timbre::new();
        let [fundamental, overtone] = timbre.voices(midi_to_frequency(DEFAULT_MIDI_NOTES[5]));

        assert!((fundamental.frequency - 174.614).abs() < 0.01);
        assert!((overtone.frequency - 481.24).abs() < 0.1);
        assert_eq!(fundamental.envelope, FUNDAMENTAL_ENVELOPE);
        assert_eq!(overtone.envelope, OVERTONE_ENVELOPE);
    }

    #[test]
    fn test_waveforms_are_shared() {
        let timbre = Timbre::new();
        let [a, _] = timbre.voices(100.0);
        let [b, _] = timbre.voices(200.0);
        assert!(Arc::ptr_eq(&a.waveform.0, &b.waveform.0));
    }

    #[test]
    fn test_sine_tables() {
        let full = Waveform::sine(WAVETABLE_LENGTH, 1.0);
        let half = Waveform::sine(WAVETABLE_LENGTH, OVERTONE_SCALE);

        assert_eq!(full.len(), WAVETABLE_LENGTH);
        assert_eq!(full.samples()[0], 0);
        assert_eq!(full.samples()[WAVETABLE_LENGTH / 4], i16::MAX);
        assert_eq!(half.samples()[WAVETABLE_LENGTH / 4], i16::MAX / 2);
        assert!((full.sample_at(0.25) - 1.0).abs() < 1e-4);
        assert!((full.sample_at(1.25) - 1.0).abs() < 1e-4);
        assert_eq!(Waveform::sine(0, 1.0).sample_at(0.5), 0.0);
    }
}
