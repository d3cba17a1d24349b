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
use std::{fmt, path::PathBuf};

use tracing::{error, info, warn};

use crate::audio::{AudioError, Device, Synthesizer, VoiceHandle};
use crate::keypad::KEY_COUNT;
use crate::mode::Mode;
use crate::util::filename_display;
use crate::xylophone::{midi_to_frequency, Timbre};

/// Errors from triggering or releasing a key's sound.
#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("no sample mapped to key {0}")]
    NoSample(usize),

    #[error("no note mapped to key {0}")]
    NoNote(usize),

    #[error("key {0} does not exist")]
    InvalidKey(usize),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// What a trigger started.
#[derive(Debug, Clone, PartialEq)]
pub enum Triggered {
    Sample(PathBuf),
    Note { note: u8, handle: VoiceHandle },
}

impl fmt::Display for Triggered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Triggered::Sample(path) => write!(f, "sample {}", filename_display(path)),
            Triggered::Note { note, handle } => write!(f, "note {} ({})", note, handle),
        }
    }
}

/// Owns the audio device and whichever producer is attached to it: the sample
/// decoder in sample player mode, the synthesizer in xylophone mode.
pub struct SoundManager {
    device: Box<dyn Device>,
    samples: [Option<PathBuf>; KEY_COUNT],
    notes: [Option<u8>; KEY_COUNT],
    timbre: Timbre,
    synth: Option<Box<dyn Synthesizer>>,
    voices: [Option<VoiceHandle>; KEY_COUNT],
    was_playing: bool,
}

impl SoundManager {
    /// Creates a sound manager. Keys past the end of `notes` have no note.
    pub fn new(
        device: Box<dyn Device>,
        samples: [Option<PathBuf>; KEY_COUNT],
        notes: &[u8],
    ) -> SoundManager {
        SoundManager {
            device,
            samples,
            notes: std::array::from_fn(|key| notes.get(key).copied()),
            timbre: Timbre::new(),
            synth: None,
            voices: [None; KEY_COUNT],
            was_playing: false,
        }
    }

    /// Starts the sound for a key in the given mode. In sample player mode any
    /// playing sample is stopped first. In xylophone mode any note the key is
    /// already sounding is released first.
    pub fn trigger(&mut self, mode: Mode, key: usize) -> Result<Triggered, SoundError> {
        if key >= KEY_COUNT {
            return Err(SoundError::InvalidKey(key));
        }

        match mode {
            Mode::SamplePlayer => self.play_sample(key),
            Mode::Xylophone => self.play_note(key),
        }
    }

    fn play_sample(&mut self, key: usize) -> Result<Triggered, SoundError> {
        // Whatever was playing stops even if this key has nothing to play.
        self.device.stop();
        self.was_playing = false;

        let path = self.samples[key].clone().ok_or(SoundError::NoSample(key))?;
        self.device.load_and_play(&path)?;
        self.was_playing = true;

        info!(key, file = filename_display(&path), "Playing sample");
        Ok(Triggered::Sample(path))
    }

    fn play_note(&mut self, key: usize) -> Result<Triggered, SoundError> {
        let note = self.notes[key].ok_or(SoundError::NoNote(key))?;
        let frequency = midi_to_frequency(note);
        let voices = self.timbre.voices(frequency);
        let previous = self.voices[key].take();

        let synth = self.synthesizer()?;
        if let Some(previous) = previous {
            if let Err(e) = synth.release(previous) {
                warn!(key, err = e.to_string(), "Unable to release previous note");
            }
        }
        let handle = synth.press(&voices)?;
        self.voices[key] = Some(handle);

        info!(key, note, frequency, "Playing note");
        Ok(Triggered::Note { note, handle })
    }

    /// Returns the synthesizer, creating it if there isn't one.
    fn synthesizer(&mut self) -> Result<&mut Box<dyn Synthesizer>, AudioError> {
        if self.synth.is_none() {
            info!(device = self.device.to_string(), "Creating synthesizer");
            self.synth = Some(self.device.create_synthesizer()?);
        }
        self.synth
            .as_mut()
            .ok_or_else(|| AudioError::Synthesizer("synthesizer unavailable".to_string()))
    }

    /// Releases the note held by a key. Returns false if the key had no note.
    pub fn release(&mut self, key: usize) -> Result<bool, SoundError> {
        if key >= KEY_COUNT {
            return Err(SoundError::InvalidKey(key));
        }

        let Some(handle) = self.voices[key].take() else {
            return Ok(false);
        };
        let Some(synth) = self.synth.as_mut() else {
            return Ok(false);
        };
        synth.release(handle)?;
        Ok(true)
    }

    /// Silences everything from the mode being left and drops the synthesizer.
    /// Always completes, even if releasing notes fails.
    pub fn teardown(&mut self, leaving: Mode) {
        info!(mode = %leaving, "Tearing down sound");
        self.device.stop();
        self.was_playing = false;

        if let Some(mut synth) = self.synth.take() {
            if let Err(e) = synth.release_all() {
                warn!(err = e.to_string(), "Unable to release all notes");
            }
        }
        self.voices = [None; KEY_COUNT];
    }

    /// Gets the sound resources for a mode ready ahead of the first key.
    pub fn prepare(&mut self, mode: Mode) {
        if mode == Mode::Xylophone {
            if let Err(e) = self.synthesizer() {
                error!(err = e.to_string(), "Unable to create synthesizer");
            }
        }
    }

    /// Checks on playback once per tick. Returns true if a sample just finished.
    pub fn poll(&mut self) -> bool {
        let playing = self.device.is_playing();
        let finished = self.was_playing && !playing;
        if finished {
            info!("Sample finished");
        }
        self.was_playing = playing;
        finished
    }

    /// The note handle held by a key, if any.
    pub fn active_voice(&self, key: usize) -> Option<VoiceHandle> {
        self.voices.get(key).copied().flatten()
    }

    pub fn has_synthesizer(&self) -> bool {
        self.synth.is_some()
    }

    pub fn note(&self, key: usize) -> Option<u8> {
        self.notes.get(key).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs, path::Path};

    use super::*;
    use crate::audio::mock::{self, Event};

    fn samples(dir: &Path, files: &[&str]) -> Result<[Option<PathBuf>; KEY_COUNT], Box<dyn Error>> {
        let mut samples: [Option<PathBuf>; KEY_COUNT] = Default::default();
        for (key, file) in files.iter().enumerate() {
            let path = dir.join(file);
            fs::write(&path, b"")?;
            samples[key] = Some(path);
        }
        Ok(samples)
    }

    fn manager(
        device: &mock::Device,
        samples: [Option<PathBuf>; KEY_COUNT],
    ) -> SoundManager {
        SoundManager::new(
            Box::new(device.clone()),
            samples,
            &crate::xylophone::DEFAULT_MIDI_NOTES,
        )
    }

    #[test]
    fn test_second_sample_preempts_first() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let samples = samples(dir.path(), &["a.mp3", "b.mp3"])?;
        let (a, b) = (samples[0].clone().unwrap(), samples[1].clone().unwrap());
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, samples);

        assert_eq!(sound.trigger(Mode::SamplePlayer, 0)?, Triggered::Sample(a.clone()));
        sound.trigger(Mode::SamplePlayer, 1)?;

        assert_eq!(device.playing(), Some(b.clone()));
        assert_eq!(
            device.events(),
            vec![Event::Stop, Event::Play(a), Event::Stop, Event::Play(b)]
        );
        Ok(())
    }

    #[test]
    fn test_sample_failures_leave_sink_stopped() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut samples = samples(dir.path(), &["a.mp3"])?;
        samples[1] = Some(dir.path().join("missing.mp3"));
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, samples);

        sound.trigger(Mode::SamplePlayer, 0)?;
        assert!(matches!(
            sound.trigger(Mode::SamplePlayer, 1),
            Err(SoundError::Audio(AudioError::FileNotFound(_)))
        ));
        assert_eq!(device.playing(), None);

        sound.trigger(Mode::SamplePlayer, 0)?;
        assert!(matches!(
            sound.trigger(Mode::SamplePlayer, 2),
            Err(SoundError::NoSample(2))
        ));
        assert_eq!(device.playing(), None);
        assert!(matches!(
            sound.trigger(Mode::SamplePlayer, 16),
            Err(SoundError::InvalidKey(16))
        ));
        Ok(())
    }

    #[test]
    fn test_poll_reports_finished_sample() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, samples(dir.path(), &["a.mp3"])?);

        assert!(!sound.poll());
        sound.trigger(Mode::SamplePlayer, 0)?;
        assert!(!sound.poll());
        device.finish_playback();
        assert!(sound.poll());
        assert!(!sound.poll());
        Ok(())
    }

    #[test]
    fn test_note_for_key_five() -> Result<(), Box<dyn Error>> {
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, Default::default());

        let Triggered::Note { note, handle } = sound.trigger(Mode::Xylophone, 5)? else {
            panic!("expected a note");
        };
        assert_eq!(note, 53);
        assert_eq!(sound.active_voice(5), Some(handle));

        let events = device.events();
        assert_eq!(events[0], Event::SynthCreated);
        let Event::Press(pressed, frequencies) = &events[1] else {
            panic!("expected a press, got {:?}", events[1]);
        };
        assert_eq!(*pressed, handle);
        assert_eq!(frequencies.len(), 2);
        assert!((frequencies[0] - 174.614).abs() < 0.01);
        assert!((frequencies[1] - 174.614 * 2.756).abs() < 0.05);

        assert!(sound.release(5)?);
        assert_eq!(sound.active_voice(5), None);
        assert_eq!(device.events()[2], Event::Release(handle));
        assert!(device.active_voices().is_empty());
        Ok(())
    }

    #[test]
    fn test_one_voice_per_key() -> Result<(), Box<dyn Error>> {
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, Default::default());

        sound.trigger(Mode::Xylophone, 2)?;
        sound.trigger(Mode::Xylophone, 2)?;
        sound.trigger(Mode::Xylophone, 2)?;
        sound.trigger(Mode::Xylophone, 7)?;

        assert_eq!(device.active_voices().len(), 2);
        assert_eq!(
            device.active_voices(),
            vec![sound.active_voice(2).unwrap(), sound.active_voice(7).unwrap()]
        );
        Ok(())
    }

    #[test]
    fn test_release_without_note_is_noop() -> Result<(), Box<dyn Error>> {
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, Default::default());

        assert!(!sound.release(4)?);
        sound.trigger(Mode::Xylophone, 4)?;
        assert!(sound.release(4)?);
        assert!(!sound.release(4)?);
        assert!(matches!(sound.release(20), Err(SoundError::InvalidKey(20))));
        Ok(())
    }

    #[test]
    fn test_missing_note() {
        let device = mock::Device::get("mock");
        let mut sound = SoundManager::new(Box::new(device.clone()), Default::default(), &[60]);

        assert!(sound.trigger(Mode::Xylophone, 0).is_ok());
        assert!(matches!(
            sound.trigger(Mode::Xylophone, 1),
            Err(SoundError::NoNote(1))
        ));
        assert_eq!(sound.note(1), None);
    }

    #[test]
    fn test_teardown_always_drops_synthesizer() -> Result<(), Box<dyn Error>> {
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, Default::default());

        sound.trigger(Mode::Xylophone, 0)?;
        sound.trigger(Mode::Xylophone, 1)?;
        device.set_fail_release(true);

        sound.teardown(Mode::Xylophone);
        assert!(!sound.has_synthesizer());
        assert!(!device.synth_alive());
        assert_eq!(sound.active_voice(0), None);
        assert_eq!(sound.active_voice(1), None);
        assert!(device.events().contains(&Event::SynthDropped));

        // The next note builds a fresh synthesizer.
        device.set_fail_release(false);
        device.clear_events();
        sound.trigger(Mode::Xylophone, 0)?;
        assert_eq!(device.events()[0], Event::SynthCreated);
        Ok(())
    }

    #[test]
    fn test_prepare() {
        let device = mock::Device::get("mock");
        let mut sound = manager(&device, Default::default());

        sound.prepare(Mode::SamplePlayer);
        assert!(!sound.has_synthesizer());

        device.set_fail_synth(true);
        sound.prepare(Mode::Xylophone);
        assert!(!sound.has_synthesizer());

        device.set_fail_synth(false);
        sound.prepare(Mode::Xylophone);
        assert!(sound.has_synthesizer());
        assert!(device.synth_alive());
    }
}
