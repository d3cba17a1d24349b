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
use std::{
    collections::VecDeque,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use super::{AudioError, Synthesizer, VoiceHandle};
use crate::xylophone::VoiceSpec;

/// How many events are remembered.
pub const HISTORY_LIMIT: usize = 1024;

/// Something the mock device was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Play(PathBuf),
    Stop,
    SynthCreated,
    SynthDropped,
    /// A note was pressed with the given voice frequencies.
    Press(VoiceHandle, Vec<f64>),
    Release(VoiceHandle),
    ReleaseAll,
}

/// What is attached to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attached {
    Nothing,
    Decoder,
    Synthesizer(u64),
}

struct State {
    events: VecDeque<Event>,
    attached: Attached,
    playing: Option<PathBuf>,
    synth_generation: u64,
    next_handle: u64,
    voices: Vec<VoiceHandle>,
    fail_synth: bool,
    fail_release: bool,
}

impl State {
    fn record(&mut self, event: Event) {
        if self.events.len() == HISTORY_LIMIT {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// A mock device. Doesn't actually play anything, but remembers everything it was
/// asked to do.
#[derive(Clone)]
pub struct Device {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State {
                events: VecDeque::new(),
                attached: Attached::Nothing,
                playing: None,
                synth_generation: 0,
                next_handle: 1,
                voices: Vec::new(),
                fail_synth: false,
                fail_release: false,
            })),
        }
    }

    /// The most recent events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.iter().cloned().collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// The file currently playing, if any.
    pub fn playing(&self) -> Option<PathBuf> {
        self.state.lock().playing.clone()
    }

    /// Ends the current sample as if it had played to the end.
    pub fn finish_playback(&self) {
        self.state.lock().playing = None;
    }

    /// Makes synthesizer creation fail.
    pub fn set_fail_synth(&self, fail: bool) {
        self.state.lock().fail_synth = fail;
    }

    /// Makes releasing notes fail.
    pub fn set_fail_release(&self, fail: bool) {
        self.state.lock().fail_release = fail;
    }

    /// Returns true if a synthesizer is attached to the sink.
    pub fn synth_alive(&self) -> bool {
        matches!(self.state.lock().attached, Attached::Synthesizer(_))
    }

    /// Notes pressed and not yet released.
    pub fn active_voices(&self) -> Vec<VoiceHandle> {
        self.state.lock().voices.clone()
    }
}

impl super::Device for Device {
    fn load_and_play(&mut self, path: &Path) -> Result<(), AudioError> {
        let span = span!(Level::INFO, "play sample (mock)");
        let _enter = span.enter();

        if !path.exists() {
            return Err(AudioError::FileNotFound(path.to_path_buf()));
        }

        info!(device = self.name, file = %path.display(), "Playing sample.");
        let mut state = self.state.lock();
        state.attached = Attached::Decoder;
        state.voices.clear();
        state.playing = Some(path.to_path_buf());
        state.record(Event::Play(path.to_path_buf()));
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.attached = Attached::Nothing;
        state.voices.clear();
        state.playing = None;
        state.record(Event::Stop);
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing.is_some()
    }

    fn create_synthesizer(&mut self) -> Result<Box<dyn Synthesizer>, AudioError> {
        let mut state = self.state.lock();
        if state.fail_synth {
            return Err(AudioError::Synthesizer(
                "mock synthesizer unavailable".to_string(),
            ));
        }

        state.synth_generation += 1;
        let generation = state.synth_generation;
        state.attached = Attached::Synthesizer(generation);
        state.playing = None;
        state.voices.clear();
        state.record(Event::SynthCreated);

        Ok(Box::new(Synth {
            state: self.state.clone(),
            generation,
        }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

/// A synthesizer attached to a mock device.
struct Synth {
    state: Arc<Mutex<State>>,
    generation: u64,
}

impl Synth {
    fn is_attached(state: &State, generation: u64) -> bool {
        state.attached == Attached::Synthesizer(generation)
    }
}

impl Synthesizer for Synth {
    fn press(&mut self, voices: &[VoiceSpec]) -> Result<VoiceHandle, AudioError> {
        let mut state = self.state.lock();
        if !Self::is_attached(&state, self.generation) {
            return Err(AudioError::Synthesizer(
                "synthesizer is no longer attached".to_string(),
            ));
        }

        let handle = VoiceHandle(state.next_handle);
        state.next_handle += 1;
        state.voices.push(handle);
        state.record(Event::Press(
            handle,
            voices.iter().map(|voice| voice.frequency).collect(),
        ));
        Ok(handle)
    }

    fn release(&mut self, handle: VoiceHandle) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.record(Event::Release(handle));
        if state.fail_release {
            return Err(AudioError::Synthesizer("mock release failed".to_string()));
        }
        state.voices.retain(|voice| *voice != handle);
        Ok(())
    }

    fn release_all(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.record(Event::ReleaseAll);
        if state.fail_release {
            return Err(AudioError::Synthesizer("mock release failed".to_string()));
        }
        state.voices.clear();
        Ok(())
    }
}

impl Drop for Synth {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if Self::is_attached(&state, self.generation) {
            state.attached = Attached::Nothing;
            state.voices.clear();
        }
        state.record(Event::SynthDropped);
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::audio::Device as _;
    use crate::xylophone::Timbre;

    #[test]
    fn test_play_and_stop() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ape.mp3");
        std::fs::write(&path, b"")?;

        let device = Device::get("mock");
        let mut driver = device.clone();

        assert!(matches!(
            driver.load_and_play(&dir.path().join("missing.mp3")),
            Err(AudioError::FileNotFound(_))
        ));
        assert!(!driver.is_playing());

        driver.load_and_play(&path)?;
        assert!(driver.is_playing());
        assert_eq!(device.playing(), Some(path.clone()));

        device.finish_playback();
        assert!(!driver.is_playing());

        driver.load_and_play(&path)?;
        driver.stop();
        assert!(!driver.is_playing());
        assert_eq!(
            device.events(),
            vec![Event::Play(path.clone()), Event::Play(path), Event::Stop]
        );
        Ok(())
    }

    #[test]
    fn test_synth_lifecycle() -> Result<(), Box<dyn Error>> {
        let device = Device::get("mock");
        let mut driver = device.clone();
        let timbre = Timbre::new();

        let mut synth = driver.create_synthesizer()?;
        assert!(device.synth_alive());

        let handle = synth.press(&timbre.voices(220.0))?;
        assert_eq!(device.active_voices(), vec![handle]);
        synth.release(handle)?;
        assert!(device.active_voices().is_empty());

        // Stopping the sink detaches the synthesizer.
        driver.stop();
        assert!(!device.synth_alive());
        assert!(synth.press(&timbre.voices(220.0)).is_err());
        assert!(synth.release(handle).is_ok());

        drop(synth);
        let mut synth = driver.create_synthesizer()?;
        synth.press(&timbre.voices(220.0))?;
        drop(synth);
        assert!(!device.synth_alive());
        assert!(device.active_voices().is_empty());
        Ok(())
    }

    #[test]
    fn test_event_history_is_bounded() {
        let device = Device::get("mock");
        let mut driver = device.clone();

        for _ in 0..HISTORY_LIMIT + 10 {
            driver.stop();
        }
        assert_eq!(device.events().len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_failures() {
        let device = Device::get("mock");
        let mut driver = device.clone();

        device.set_fail_synth(true);
        assert!(driver.create_synthesizer().is_err());

        device.set_fail_synth(false);
        let mut synth = driver.create_synthesizer().unwrap();
        device.set_fail_release(true);
        assert!(synth.release_all().is_err());
        assert!(synth.release(VoiceHandle(1)).is_err());
    }
}
