//! Operator oscillators
//!
//! Phase-accumulating generators producing one block at a time. Each
//! oscillator has two output modes: sample mode yields the raw waveform in
//! -1..1 (amplitude scaling is the envelope's job), and modulation mode
//! yields the accumulated phase angle, which the FM stage offsets before
//! taking the cosine.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::block::Block;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    /// White noise (uniform random)
    Noise,
}

/// A phase-accumulating oscillator
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    sample_rate: f64,
    /// Accumulated phase angle in radians, wrapped at 2*PI
    phase: f64,
    /// Simple RNG state (xorshift)
    rng_state: u64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            frequency,
            sample_rate,
            phase: 0.0,
            // Initialize RNG with a non-zero seed based on frequency
            rng_state: ((frequency * 1000.0) as u64).max(1),
        }
    }

    /// Set the frequency. Takes effect at the start of the next block pull.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get the current waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Fill `out` with raw waveform samples in -1..1.
    pub fn sample_block(&mut self, out: &mut Block) {
        let step = self.phase_step();
        match self.waveform {
            Waveform::Sine => {
                for sample in out.iter_mut() {
                    *sample = self.phase.sin();
                    self.advance(step);
                }
            }
            Waveform::Square => {
                for sample in out.iter_mut() {
                    *sample = if self.phase < PI { 1.0 } else { -1.0 };
                    self.advance(step);
                }
            }
            Waveform::Noise => {
                for sample in out.iter_mut() {
                    *sample = self.random();
                    self.advance(step);
                }
            }
        }
    }

    /// Fill `out` with the accumulated phase angle per sample.
    ///
    /// Used only as the FM source term; the angle is meaningful modulo 2*PI.
    pub fn modulation_block(&mut self, out: &mut Block) {
        let step = self.phase_step();
        for sample in out.iter_mut() {
            *sample = self.phase;
            self.advance(step);
        }
    }

    /// Per-sample phase increment, captured once per block.
    fn phase_step(&self) -> f64 {
        2.0 * PI * self.frequency / self.sample_rate
    }

    fn advance(&mut self, step: f64) {
        self.phase += step;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }
    }

    /// Xorshift RNG for noise generation
    fn random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        // Convert to -1.0..1.0 range
        (x as f64 / u64::MAX as f64) * 2.0 - 1.0
    }
}
