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
//! Streams sample files as mono at the output rate. Files are opened on the
//! caller's thread and decoded packet by packet on a dedicated thread that stays a
//! bounded number of chunks ahead of the output.

use std::{
    fs::File,
    io, mem,
    path::Path,
    thread,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, error};

use super::AudioError;
use crate::util::filename_display;

/// Decoded chunks buffered ahead of the output.
const FEED_CHUNKS: usize = 8;

/// Chunks allocated up front. One more than the feed holds is being filled and
/// another is being read.
const POOL_CHUNKS: usize = FEED_CHUNKS + 2;

/// Initial capacity of a chunk, in samples.
const CHUNK_CAPACITY: usize = 4096;

/// A sample decoder reused for every play. Owns the decode thread, which exits
/// when the decoder is dropped.
pub struct Decoder {
    sample_rate: u32,
    jobs_tx: Sender<Job>,
    recycle_tx: Sender<Vec<f32>>,
}

struct Job {
    stream: SampleStream,
    chunks_tx: Sender<Vec<f32>>,
}

impl Decoder {
    /// Creates a decoder that produces samples at the given rate and allocates
    /// its chunk pool.
    pub fn new(sample_rate: u32) -> Result<Decoder, AudioError> {
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<Job>();
        let (recycle_tx, recycle_rx) = crossbeam_channel::bounded::<Vec<f32>>(POOL_CHUNKS);
        for _ in 0..POOL_CHUNKS {
            let _ = recycle_tx.try_send(Vec::with_capacity(CHUNK_CAPACITY));
        }

        thread::Builder::new()
            .name("sample-decode".to_string())
            .spawn(move || decode_jobs(jobs_rx, recycle_rx))?;

        Ok(Decoder {
            sample_rate,
            jobs_tx,
            recycle_tx,
        })
    }

    /// Rebinds the decoder to the file at the path. Only the first packet is decoded
    /// here; the rest arrives through the returned feed. Any previous feed is
    /// abandoned once it's dropped.
    pub fn start(&self, path: &Path) -> Result<Feed, AudioError> {
        let stream = SampleStream::open(path, self.sample_rate)?;
        let (chunks_tx, chunks_rx) = crossbeam_channel::bounded(FEED_CHUNKS);
        self.jobs_tx
            .send(Job { stream, chunks_tx })
            .map_err(|_| AudioError::Decode("decode thread has stopped".to_string()))?;
        Ok(Feed::new(chunks_rx, self.recycle_tx.clone()))
    }
}

fn decode_jobs(jobs_rx: Receiver<Job>, recycle_rx: Receiver<Vec<f32>>) {
    for Job {
        mut stream,
        chunks_tx,
    } in jobs_rx.iter()
    {
        // A newer job supersedes this one.
        while jobs_rx.is_empty() {
            let mut chunk = recycle_rx
                .try_recv()
                .unwrap_or_else(|_| Vec::with_capacity(CHUNK_CAPACITY));
            chunk.clear();

            match stream.read_packet(&mut chunk) {
                Ok(more) => {
                    // Fails once the feed has been dropped.
                    if !chunk.is_empty() && chunks_tx.send(chunk).is_err() {
                        break;
                    }
                    if !more {
                        break;
                    }
                }
                Err(e) => {
                    error!(
                        file = stream.name.as_str(),
                        err = e.to_string(),
                        "Unable to decode sample"
                    );
                    break;
                }
            }
        }
    }
}

/// The output end of a playing sample. Never blocks.
pub struct Feed {
    chunks_rx: Receiver<Vec<f32>>,
    recycle_tx: Sender<Vec<f32>>,
    current: Vec<f32>,
    position: usize,
    finished: bool,
}

impl Feed {
    pub(crate) fn new(chunks_rx: Receiver<Vec<f32>>, recycle_tx: Sender<Vec<f32>>) -> Feed {
        Feed {
            chunks_rx,
            recycle_tx,
            current: Vec::new(),
            position: 0,
            finished: false,
        }
    }

    /// Copies whatever has been decoded into `output` and returns how many samples
    /// were written. Fewer than asked for means an underrun or the end of the file.
    pub fn fill(&mut self, output: &mut [f32]) -> usize {
        let mut written = 0;
        while written < output.len() {
            if self.position >= self.current.len() {
                match self.chunks_rx.try_recv() {
                    Ok(chunk) => {
                        let spent = mem::replace(&mut self.current, chunk);
                        self.position = 0;
                        self.recycle(spent);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.finished = true;
                        break;
                    }
                }
                continue;
            }

            let count = (self.current.len() - self.position).min(output.len() - written);
            output[written..written + count]
                .copy_from_slice(&self.current[self.position..self.position + count]);
            self.position += count;
            written += count;
        }
        written
    }

    /// True once every decoded sample has been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn recycle(&self, chunk: Vec<f32>) {
        if chunk.capacity() > 0 {
            let _ = self.recycle_tx.try_send(chunk);
        }
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        let current = mem::take(&mut self.current);
        self.recycle(current);
        for chunk in self.chunks_rx.try_iter().take(FEED_CHUNKS) {
            self.recycle(chunk);
        }
    }
}

/// An open sample file.
struct SampleStream {
    name: String,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    buffer: Option<SampleBuffer<f32>>,
    mono: Vec<f32>,
    resampler: Resampler,
    /// The first packet, decoded while opening.
    primed: Vec<f32>,
}

impl SampleStream {
    /// Probes the file, opens its first audio track and decodes one packet so a
    /// file with nothing playable fails here.
    fn open(path: &Path, sample_rate: u32) -> Result<SampleStream, AudioError> {
        let name = filename_display(path).to_string();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AudioError::FileNotFound(path.to_path_buf()),
            _ => AudioError::Io(e),
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Decode(format!("{}: {}", name, e)))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::Decode(format!("{}: no audio track found", name)))?;
        let track_id = track.id;
        let source_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AudioError::Decode(format!("{}: sample rate not specified", name)))?;

        let decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(format!("{}: {}", name, e)))?;

        debug!(file = name.as_str(), source_rate, sample_rate, "Opened sample");
        let mut stream = SampleStream {
            name,
            format,
            decoder,
            track_id,
            buffer: None,
            mono: Vec::new(),
            resampler: Resampler::new(source_rate, sample_rate),
            primed: Vec::with_capacity(CHUNK_CAPACITY),
        };

        let mut primed = mem::take(&mut stream.primed);
        stream.read_packet(&mut primed)?;
        if primed.is_empty() {
            return Err(AudioError::Decode(format!(
                "{}: no audio decoded",
                stream.name
            )));
        }
        stream.primed = primed;
        Ok(stream)
    }

    /// Decodes the next packet, appending its samples to `output`. Returns false
    /// once the file is exhausted.
    fn read_packet(&mut self, output: &mut Vec<f32>) -> Result<bool, AudioError> {
        if !self.primed.is_empty() {
            output.append(&mut self.primed);
            return Ok(true);
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.resampler.finish(output);
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // A corrupt frame is skipped rather than failing the whole file.
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(err = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needed = decoded.capacity() * channels;
            if self
                .buffer
                .as_ref()
                .map_or(true, |buffer| buffer.capacity() < needed)
            {
                self.buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buffer) = self.buffer.as_mut() else {
                continue;
            };
            buffer.copy_interleaved_ref(decoded);

            downmix(buffer.samples(), channels, &mut self.mono);
            self.resampler.process(&self.mono, output);
            return Ok(true);
        }
    }
}

/// Averages interleaved frames down to a single channel.
fn downmix(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    output.clear();
    if channels == 0 {
        return;
    }
    output.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Linear sample rate conversion of a mono signal that arrives in blocks.
struct Resampler {
    ratio: f64,
    /// Source samples seen before the current block.
    consumed: u64,
    /// Output samples emitted so far.
    produced: u64,
    /// The final sample of the previous block.
    last: f32,
}

impl Resampler {
    fn new(source_rate: u32, target_rate: u32) -> Resampler {
        Resampler {
            ratio: target_rate as f64 / source_rate as f64,
            consumed: 0,
            produced: 0,
            last: 0.0,
        }
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let Some(&last) = input.last() else {
            return;
        };
        let end = self.consumed + input.len() as u64;

        if self.ratio == 1.0 {
            output.extend_from_slice(input);
            self.produced = end;
        } else {
            // Interpolates while both neighbours are known.
            loop {
                let position = self.produced as f64 / self.ratio;
                let index = position.floor() as u64;
                if index + 1 >= end {
                    break;
                }
                let s0 = if index < self.consumed {
                    self.last
                } else {
                    input[(index - self.consumed) as usize]
                };
                let s1 = input[(index + 1 - self.consumed) as usize];
                output.push(s0 + (s1 - s0) * position.fract() as f32);
                self.produced += 1;
            }
        }

        self.last = last;
        self.consumed = end;
    }

    /// Emits the tail once the source has ended, holding the final sample.
    fn finish(&mut self, output: &mut Vec<f32>) {
        let target = (self.consumed as f64 * self.ratio).ceil() as u64;
        while self.produced < target {
            output.push(self.last);
            self.produced += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        path::PathBuf,
        time::{Duration, Instant},
    };

    use super::*;

    fn write_wav(
        dir: &Path,
        name: &str,
        channels: u16,
        sample_rate: u32,
        frames: &[Vec<i16>],
    ) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for frame in frames {
            for sample in frame {
                writer.write_sample(*sample)?;
            }
        }
        writer.finalize()?;
        Ok(path)
    }

    /// Reads a feed to the end.
    fn drain(feed: &mut Feed) -> Result<Vec<f32>, Box<dyn Error>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut samples = Vec::new();
        let mut block = [0.0; 256];
        while !feed.is_finished() {
            if Instant::now() > deadline {
                return Err("feed never finished".into());
            }
            let written = feed.fill(&mut block);
            samples.extend_from_slice(&block[..written]);
            if written == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(samples)
    }

    #[test]
    fn test_decode_mono() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let frames: Vec<Vec<i16>> = (0..800).map(|i| vec![(i % 100) as i16 * 100]).collect();
        let path = write_wav(dir.path(), "ramp.wav", 1, 8000, &frames)?;

        let decoder = Decoder::new(8000)?;
        let output = drain(&mut decoder.start(&path)?)?;

        assert_eq!(output.len(), 800);
        assert_eq!(output[0], 0.0);
        assert!((output[1] - 100.0 / 32768.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_decode_stereo_downmix_and_resample() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let frames: Vec<Vec<i16>> = (0..400).map(|_| vec![16384, 0]).collect();
        let path = write_wav(dir.path(), "stereo.wav", 2, 8000, &frames)?;

        let decoder = Decoder::new(16000)?;
        let output = drain(&mut decoder.start(&path)?)?;
        assert_eq!(output.len(), 800);
        assert!(output.iter().all(|sample| (sample - 0.25).abs() < 1e-4));

        // The same decoder is reused for the next file.
        let frames: Vec<Vec<i16>> = (0..100).map(|_| vec![0]).collect();
        let path = write_wav(dir.path(), "silence.wav", 1, 16000, &frames)?;
        assert_eq!(drain(&mut decoder.start(&path)?)?.len(), 100);
        Ok(())
    }

    #[test]
    fn test_start_stays_ahead_by_a_bounded_amount() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let total = 44100 * 20;
        let frames: Vec<Vec<i16>> = (0..total).map(|i| vec![(i % 1000) as i16]).collect();
        let path = write_wav(dir.path(), "long.wav", 1, 44100, &frames)?;

        let decoder = Decoder::new(44100)?;
        let mut feed = decoder.start(&path)?;

        // Plenty of time to decode the whole file if nothing held the thread back.
        thread::sleep(Duration::from_millis(200));
        let queued = feed.chunks_rx.len();
        assert!(queued > 0);
        assert!(queued <= FEED_CHUNKS);
        let buffered: usize = feed
            .chunks_rx
            .try_iter()
            .take(queued)
            .map(|chunk| chunk.len())
            .sum();
        assert!(buffered < total / 10);

        // Nothing was lost by holding back.
        assert_eq!(buffered + drain(&mut feed)?.len(), total);
        Ok(())
    }

    #[test]
    fn test_dropped_feed_is_abandoned() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let frames: Vec<Vec<i16>> = (0..44100 * 10).map(|_| vec![1000]).collect();
        let long = write_wav(dir.path(), "long.wav", 1, 44100, &frames)?;
        let frames: Vec<Vec<i16>> = (0..300).map(|_| vec![0]).collect();
        let short = write_wav(dir.path(), "short.wav", 1, 44100, &frames)?;

        let decoder = Decoder::new(44100)?;
        let feed = decoder.start(&long)?;
        thread::sleep(Duration::from_millis(20));
        drop(feed);

        let output = drain(&mut decoder.start(&short)?)?;
        assert_eq!(output, vec![0.0; 300]);
        Ok(())
    }

    #[test]
    fn test_chunk_pool_is_allocated_up_front() -> Result<(), Box<dyn Error>> {
        let decoder = Decoder::new(44100)?;
        assert_eq!(decoder.recycle_tx.len(), POOL_CHUNKS);
        Ok(())
    }

    #[test]
    fn test_feed_recycles_chunks() -> Result<(), Box<dyn Error>> {
        let (chunks_tx, chunks_rx) = crossbeam_channel::bounded(FEED_CHUNKS);
        let (recycle_tx, recycle_rx) = crossbeam_channel::bounded(POOL_CHUNKS);
        let mut feed = Feed::new(chunks_rx, recycle_tx);

        let mut output = [0.0; 4];
        assert_eq!(feed.fill(&mut output), 0);
        assert!(!feed.is_finished());

        chunks_tx.send(vec![0.1, 0.2])?;
        chunks_tx.send(vec![0.3, 0.4, 0.5])?;
        assert_eq!(feed.fill(&mut output), 4);
        assert_eq!(output, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(recycle_rx.len(), 1);

        drop(chunks_tx);
        assert_eq!(feed.fill(&mut output), 1);
        assert_eq!(output[0], 0.5);
        assert!(feed.is_finished());

        drop(feed);
        assert_eq!(recycle_rx.len(), 2);
        Ok(())
    }

    #[test]
    fn test_decode_errors() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let decoder = Decoder::new(44100)?;

        assert!(matches!(
            decoder.start(&dir.path().join("missing.mp3")),
            Err(AudioError::FileNotFound(_))
        ));

        let garbage = dir.path().join("garbage.mp3");
        std::fs::write(&garbage, b"this is not audio")?;
        assert!(matches!(
            decoder.start(&garbage),
            Err(AudioError::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn test_resampler_across_blocks() {
        let mut resampler = Resampler::new(1, 2);
        let mut output = Vec::new();
        resampler.process(&[0.0], &mut output);
        assert!(output.is_empty());
        resampler.process(&[1.0], &mut output);
        resampler.finish(&mut output);
        assert_eq!(output, vec![0.0, 0.5, 1.0, 1.0]);

        let mut resampler = Resampler::new(8000, 8000);
        let mut output = Vec::new();
        resampler.process(&[0.5, 0.5], &mut output);
        resampler.finish(&mut output);
        assert_eq!(output, vec![0.5, 0.5]);
    }
}
