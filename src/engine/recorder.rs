//! WAV export
//!
//! Writes engine output to 32-bit float mono WAV files, either offline (the
//! `record` command) or from a live tap on the playback callback.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::synth::Block;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples written
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    /// Write one engine block
    pub fn write_block(&mut self, block: &Block) -> Result<()> {
        for &sample in block.iter() {
            self.writer
                .write_sample(sample as f32)
                .context("failed to write sample")?;
        }
        self.samples_written += block.len() as u64;
        Ok(())
    }

    /// Write a buffer of samples
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;
        }
        self.samples_written += buffer.len() as u64;
        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("failed to finalize WAV file")
    }
}

/// First free recording path inside `dir`: `carrier_000.wav`,
/// `carrier_001.wav`, ... The directory is created if missing.
pub fn next_recording_path(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create recording directory: {:?}", dir))?;

    let mut counter = 0u32;
    loop {
        let path = dir.join(format!("carrier_{:03}.wav", counter));
        if !path.exists() {
            return Ok(path);
        }
        counter += 1;
    }
}

/// Live recording tap fed by the playback callback.
///
/// The callback pushes every mono sample while the tap is armed; the control
/// path drains the accumulated frames into a WAV file afterwards.
pub struct Tap {
    armed: AtomicBool,
    frames: Mutex<Vec<f32>>,
}

impl Tap {
    /// Create a disarmed tap.
    pub fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            frames: Mutex::new(Vec::new()),
        }
    }

    /// Start capturing samples.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Stop capturing samples.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Whether the tap is currently capturing.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Append samples when armed. Called from the audio callback.
    pub fn push(&self, samples: &[f32]) {
        if !self.is_armed() {
            return;
        }
        if let Ok(mut frames) = self.frames.try_lock() {
            frames.extend_from_slice(samples);
        }
    }

    /// Number of captured samples.
    pub fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the captured samples, leaving the tap empty.
    pub fn drain(&self) -> Vec<f32> {
        self.frames
            .lock()
            .map(|mut f| std::mem::take(&mut *f))
            .unwrap_or_default()
    }
}

impl Default for Tap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn recorder_counts_samples_and_duration() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 44100).unwrap();

        assert_eq!(recorder.sample_rate(), 44100);
        assert_eq!(recorder.samples_written(), 0);

        for _ in 0..44100 {
            recorder.write_buffer(&[0.0]).unwrap();
        }
        assert!((recorder.duration_secs() - 1.0).abs() < 0.001);
    }

    #[test]
    fn recorder_writes_blocks() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 44100).unwrap();

        let block = crate::synth::silent_block();
        recorder.write_block(&block).unwrap();
        assert_eq!(recorder.samples_written(), block.len() as u64);
    }

    #[test]
    fn recorder_produces_valid_wav() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        {
            let mut recorder = Recorder::new(&path, 44100).unwrap();
            for i in 0..1000 {
                let sample = (i as f32 / 1000.0 * std::f32::consts::PI * 2.0).sin();
                recorder.write_buffer(&[sample]).unwrap();
            }
            recorder.finalize().unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 1000);
    }

    #[test]
    fn recording_paths_avoid_collisions() {
        let dir = tempdir().unwrap();

        let first = next_recording_path(dir.path()).unwrap();
        assert_eq!(first.file_name().unwrap(), "carrier_000.wav");

        std::fs::write(&first, b"taken").unwrap();
        let second = next_recording_path(dir.path()).unwrap();
        assert_eq!(second.file_name().unwrap(), "carrier_001.wav");
    }

    #[test]
    fn tap_captures_only_while_armed() {
        let tap = Tap::new();
        tap.push(&[0.1, 0.2]);
        assert!(tap.is_empty());

        tap.arm();
        tap.push(&[0.1, 0.2]);
        tap.push(&[0.3]);
        assert_eq!(tap.len(), 3);

        tap.disarm();
        tap.push(&[0.4]);
        assert_eq!(tap.drain(), vec![0.1, 0.2, 0.3]);
        assert!(tap.is_empty());
    }
}
