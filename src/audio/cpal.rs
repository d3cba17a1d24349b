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
    error::Error,
    fmt,
    path::Path,
    sync::Arc,
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use super::{
    decoder::{Decoder, Feed},
    synth::SynthEngine,
    AudioError, Synthesizer, VoiceHandle,
};
use crate::{config, util::filename_display, xylophone::VoiceSpec};

/// The device name that picks the host's default output.
pub const DEFAULT_DEVICE_NAME: &str = "default";

/// How long to wait for the output stream to come up.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// What the sink is currently fed from.
enum Producer {
    Idle,
    Sample { feed: Feed },
    Synth { engine: SynthEngine, generation: u64 },
}

/// Output state shared between the device and the stream callback.
struct Output {
    producer: Producer,
    /// Mono scratch space for the callback.
    scratch: Vec<f32>,
    /// Increases every time a synthesizer is attached.
    generation: u64,
}

impl Output {
    fn new() -> Output {
        Output {
            producer: Producer::Idle,
            scratch: Vec::new(),
            generation: 0,
        }
    }

    /// Swaps in a new producer. A replaced sample feed hands its chunks back to the
    /// decoder.
    fn attach(&mut self, producer: Producer) {
        self.producer = producer;
    }

    fn is_playing(&self) -> bool {
        matches!(&self.producer, Producer::Sample { feed } if !feed.is_finished())
    }

    fn synth(&mut self, generation: u64) -> Option<&mut SynthEngine> {
        match &mut self.producer {
            Producer::Synth {
                engine,
                generation: attached,
            } if *attached == generation => Some(engine),
            _ => None,
        }
    }

    /// Fills an interleaved output buffer, copying the mono signal to every channel.
    fn render(&mut self, data: &mut [f32], channels: usize) {
        let frames = data.len() / channels.max(1);
        self.scratch.clear();
        self.scratch.resize(frames, 0.0);

        match &mut self.producer {
            Producer::Idle => {}
            Producer::Sample { feed } => {
                feed.fill(&mut self.scratch);
            }
            Producer::Synth { engine, .. } => engine.render(&mut self.scratch),
        }

        for (frame, sample) in data.chunks_mut(channels.max(1)).zip(self.scratch.iter()) {
            frame.fill(*sample);
        }
    }
}

/// A description of an output device, for listing.
pub struct DeviceInfo {
    name: String,
    max_channels: u16,
    host_id: cpal::HostId,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A cpal output device with one mono sink shared by the sample decoder and the
/// synthesizer.
pub struct Device {
    name: String,
    host_id: cpal::HostId,
    channels: u16,
    sample_rate: u32,
    decoder: Decoder,
    output: Arc<Mutex<Output>>,
    /// Dropping this stops the output thread.
    _shutdown_tx: crossbeam_channel::Sender<()>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}) ({})",
            self.name,
            self.channels,
            self.sample_rate,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists the output devices of every cpal host.
    pub fn list() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(DeviceInfo {
                        name: device.name()?,
                        max_channels,
                        host_id,
                    });
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Finds the named output device, or the default one, and starts its stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let (host_id, device) = Device::find(name)?;
        let sample_rate = config.sample_rate();
        let supported = device.default_output_config()?;
        let channels = supported.channels();

        let output = Arc::new(Mutex::new(Output::new()));
        let shutdown_tx = Device::start_output_thread(
            device,
            supported.sample_format(),
            channels,
            sample_rate,
            output.clone(),
        )?;

        let device = Device {
            name: name.to_string(),
            host_id,
            channels,
            sample_rate,
            decoder: Decoder::new(sample_rate)?,
            output,
            _shutdown_tx: shutdown_tx,
        };
        info!(device = device.to_string(), "Audio output started");
        Ok(device)
    }

    fn find(name: &str) -> Result<(cpal::HostId, cpal::Device), Box<dyn Error>> {
        let _shh_stderr = shh::stderr()?;

        if name == DEFAULT_DEVICE_NAME {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            return Ok((host.id(), device));
        }

        for host_id in cpal::available_hosts() {
            let Ok(mut devices) = cpal::host_from_id(host_id)?.output_devices() else {
                continue;
            };
            if let Some(device) =
                devices.find(|device| device.name().is_ok_and(|n| n.trim() == name))
            {
                return Ok((host_id, device));
            }
        }

        Err(format!("no device found with name {}", name).into())
    }

    /// Starts the thread that owns the cpal stream. The stream lives until the
    /// returned sender is dropped.
    fn start_output_thread(
        device: cpal::Device,
        sample_format: cpal::SampleFormat,
        channels: u16,
        sample_rate: u32,
        output: Arc<Mutex<Output>>,
    ) -> Result<crossbeam_channel::Sender<()>, Box<dyn Error>> {
        let (startup_tx, startup_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let config = cpal::StreamConfig {
                    channels,
                    sample_rate,
                    buffer_size: cpal::BufferSize::Default,
                };
                let channels = usize::from(channels);

                let stream_result = match sample_format {
                    cpal::SampleFormat::F32 => {
                        let output = output.clone();
                        device.build_output_stream(
                            &config,
                            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                                output.lock().render(data, channels);
                            },
                            |err| error!("CPAL output stream error: {}", err),
                            None,
                        )
                    }
                    cpal::SampleFormat::I16 => {
                        let output = output.clone();
                        let mut temp = Vec::new();
                        device.build_output_stream(
                            &config,
                            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                                temp.clear();
                                temp.resize(data.len(), 0.0f32);
                                output.lock().render(&mut temp, channels);
                                for (dst, src) in data.iter_mut().zip(temp.iter()) {
                                    *dst = cpal::Sample::from_sample(*src);
                                }
                            },
                            |err| error!("CPAL output stream error: {}", err),
                            None,
                        )
                    }
                    other => {
                        let _ = startup_tx.send(Err(AudioError::Stream(format!(
                            "unsupported sample format {:?}",
                            other
                        ))));
                        return;
                    }
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = startup_tx.send(Err(AudioError::Stream(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = startup_tx.send(Err(AudioError::Stream(e.to_string())));
                    return;
                }
                let _ = startup_tx.send(Ok(()));

                // Keep the stream alive until the device goes away.
                let _ = shutdown_rx.recv();
            })?;

        match startup_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(shutdown_tx),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(AudioError::Stream("output stream did not start".to_string()).into()),
        }
    }
}

impl super::Device for Device {
    fn load_and_play(&mut self, path: &Path) -> Result<(), AudioError> {
        let span = span!(Level::INFO, "play sample (cpal)");
        let _enter = span.enter();

        // Opening only reads the first packet; the rest streams in behind playback.
        let feed = match self.decoder.start(path) {
            Ok(feed) => feed,
            Err(e) => {
                self.output.lock().attach(Producer::Idle);
                return Err(e);
            }
        };

        info!(
            device = self.name,
            file = filename_display(path),
            "Playing sample."
        );
        self.output.lock().attach(Producer::Sample { feed });
        Ok(())
    }

    fn stop(&mut self) {
        self.output.lock().attach(Producer::Idle);
    }

    fn is_playing(&self) -> bool {
        self.output.lock().is_playing()
    }

    fn create_synthesizer(&mut self) -> Result<Box<dyn Synthesizer>, AudioError> {
        let mut output = self.output.lock();
        output.generation += 1;
        let generation = output.generation;
        output.attach(Producer::Synth {
            engine: SynthEngine::new(self.sample_rate),
            generation,
        });

        Ok(Box::new(Synth {
            output: self.output.clone(),
            generation,
        }))
    }
}

/// A handle to the synthesizer attached to a cpal device.
struct Synth {
    output: Arc<Mutex<Output>>,
    generation: u64,
}

impl Synthesizer for Synth {
    fn press(&mut self, voices: &[VoiceSpec]) -> Result<VoiceHandle, AudioError> {
        let mut output = self.output.lock();
        let engine = output.synth(self.generation).ok_or_else(|| {
            AudioError::Synthesizer("synthesizer is no longer attached".to_string())
        })?;
        Ok(engine.press(voices))
    }

    fn release(&mut self, handle: VoiceHandle) -> Result<(), AudioError> {
        if let Some(engine) = self.output.lock().synth(self.generation) {
            engine.release(handle);
        }
        Ok(())
    }

    fn release_all(&mut self) -> Result<(), AudioError> {
        if let Some(engine) = self.output.lock().synth(self.generation) {
            engine.release_all();
        }
        Ok(())
    }
}

impl Drop for Synth {
    fn drop(&mut self) {
        let mut output = self.output.lock();
        if output.synth(self.generation).is_some() {
            output.attach(Producer::Idle);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::xylophone::Timbre;

    fn feed(chunks: Vec<Vec<f32>>) -> (Feed, crossbeam_channel::Receiver<Vec<f32>>) {
        let (chunks_tx, chunks_rx) = crossbeam_channel::unbounded();
        let (recycle_tx, recycle_rx) = crossbeam_channel::unbounded();
        for chunk in chunks {
            let _ = chunks_tx.send(chunk);
        }
        (Feed::new(chunks_rx, recycle_tx), recycle_rx)
    }

    #[test]
    fn test_render_sample_to_all_channels() {
        let mut output = Output::new();
        let (feed, _recycled) = feed(vec![vec![0.1, 0.2], vec![0.3]]);
        output.attach(Producer::Sample { feed });
        assert!(output.is_playing());

        let mut data = vec![1.0; 4];
        output.render(&mut data, 2);
        assert_eq!(data, vec![0.1, 0.1, 0.2, 0.2]);

        output.render(&mut data, 2);
        assert_eq!(data, vec![0.3, 0.3, 0.0, 0.0]);
        assert!(!output.is_playing());
    }

    #[test]
    fn test_replaced_sample_returns_chunks() {
        let mut output = Output::new();
        let (feed, recycled) = feed(vec![Vec::with_capacity(64), Vec::with_capacity(64)]);
        output.attach(Producer::Sample { feed });
        output.attach(Producer::Idle);

        assert_eq!(recycled.len(), 2);
        assert!(!output.is_playing());
    }

    #[test]
    fn test_synth_detaches() {
        let output = Arc::new(Mutex::new(Output::new()));
        output.lock().generation = 1;
        output.lock().attach(Producer::Synth {
            engine: SynthEngine::new(1000),
            generation: 1,
        });

        let mut stale = Synth {
            output: output.clone(),
            generation: 0,
        };
        assert!(stale.press(&Timbre::new().voices(100.0)).is_err());
        assert!(stale.release(VoiceHandle(1)).is_ok());
        drop(stale);
        assert!(matches!(output.lock().producer, Producer::Synth { .. }));

        let mut current = Synth {
            output: output.clone(),
            generation: 1,
        };
        assert!(current.press(&Timbre::new().voices(100.0)).is_ok());
        let mut data = vec![0.0; 8];
        output.lock().render(&mut data, 1);
        drop(current);
        assert!(matches!(output.lock().producer, Producer::Idle));
    }
}
