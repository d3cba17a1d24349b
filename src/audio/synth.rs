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
//! Renders synthesizer notes into mono samples.

use std::time::Duration;

use super::VoiceHandle;
use crate::xylophone::{Envelope, VoiceSpec};

/// Headroom so a handful of overlapping notes doesn't clip.
const MASTER_GAIN: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Done,
}

/// Tracks an ADSR envelope one sample at a time.
#[derive(Debug, Clone)]
struct EnvelopeState {
    attack: u64,
    decay: u64,
    sustain_level: f32,
    release: u64,
    stage: Stage,
    elapsed: u64,
    level: f32,
    release_from: f32,
}

fn to_samples(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as u64
}

impl EnvelopeState {
    fn new(envelope: &Envelope, sample_rate: u32) -> EnvelopeState {
        EnvelopeState {
            attack: to_samples(envelope.attack, sample_rate),
            decay: to_samples(envelope.decay, sample_rate),
            sustain_level: envelope.sustain_level.clamp(0.0, 1.0),
            release: to_samples(envelope.release, sample_rate),
            stage: Stage::Attack,
            elapsed: 0,
            level: 0.0,
            release_from: 0.0,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.elapsed = 0;
    }

    fn release(&mut self) {
        if self.stage != Stage::Done && self.stage != Stage::Release {
            self.release_from = self.level;
            self.enter(Stage::Release);
        }
    }

    fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Returns the level for the current sample and moves forward by one.
    fn next_level(&mut self) -> f32 {
        loop {
            match self.stage {
                Stage::Attack if self.elapsed >= self.attack => self.enter(Stage::Decay),
                Stage::Decay if self.elapsed >= self.decay => self.enter(Stage::Sustain),
                Stage::Release if self.elapsed >= self.release => self.enter(Stage::Done),
                _ => break,
            }
        }

        let progress = |length: u64, elapsed: u64| elapsed as f32 / length.max(1) as f32;
        self.level = match self.stage {
            Stage::Attack => progress(self.attack, self.elapsed),
            Stage::Decay => {
                1.0 - (1.0 - self.sustain_level) * progress(self.decay, self.elapsed)
            }
            Stage::Sustain => self.sustain_level,
            Stage::Release => self.release_from * (1.0 - progress(self.release, self.elapsed)),
            Stage::Done => 0.0,
        };
        self.elapsed += 1;
        self.level
    }
}

/// A single wavetable oscillator with its envelope.
struct Oscillator {
    spec: VoiceSpec,
    phase: f64,
    increment: f64,
    envelope: EnvelopeState,
}

impl Oscillator {
    fn new(spec: &VoiceSpec, sample_rate: u32) -> Oscillator {
        Oscillator {
            phase: 0.0,
            increment: spec.frequency / f64::from(sample_rate),
            envelope: EnvelopeState::new(&spec.envelope, sample_rate),
            spec: spec.clone(),
        }
    }

    fn next_sample(&mut self) -> f32 {
        let sample = self.spec.waveform.sample_at(self.phase) * self.envelope.next_level();
        self.phase = (self.phase + self.increment).fract();
        sample
    }
}

/// Every oscillator of one note.
struct Note {
    handle: VoiceHandle,
    oscillators: Vec<Oscillator>,
}

impl Note {
    fn is_done(&self) -> bool {
        self.oscillators.iter().all(|osc| osc.envelope.is_done())
    }
}

/// Mixes all sounding notes. Finished notes are dropped as they fall silent.
pub struct SynthEngine {
    sample_rate: u32,
    notes: Vec<Note>,
    next_handle: u64,
}

impl SynthEngine {
    pub fn new(sample_rate: u32) -> SynthEngine {
        SynthEngine {
            sample_rate,
            notes: Vec::new(),
            next_handle: 1,
        }
    }

    /// Starts a note made of the given voices.
    pub fn press(&mut self, voices: &[VoiceSpec]) -> VoiceHandle {
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        self.notes.push(Note {
            handle,
            oscillators: voices
                .iter()
                .map(|voice| Oscillator::new(voice, self.sample_rate))
                .collect(),
        });
        handle
    }

    /// Releases a note. Returns false if the note has already faded out.
    pub fn release(&mut self, handle: VoiceHandle) -> bool {
        match self.notes.iter_mut().find(|note| note.handle == handle) {
            Some(note) => {
                note.oscillators
                    .iter_mut()
                    .for_each(|osc| osc.envelope.release());
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        self.notes
            .iter_mut()
            .flat_map(|note| note.oscillators.iter_mut())
            .for_each(|osc| osc.envelope.release());
    }

    /// Number of notes still making sound.
    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    /// Fills the buffer with the next mono samples.
    pub fn render(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            let mixed: f32 = self
                .notes
                .iter_mut()
                .flat_map(|note| note.oscillators.iter_mut())
                .map(|osc| osc.next_sample())
                .sum();
            *sample = (mixed * MASTER_GAIN).clamp(-1.0, 1.0);
        }
        self.notes.retain(|note| !note.is_done());
    }
}
