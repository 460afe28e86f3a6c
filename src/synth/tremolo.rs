//! Tremolo (amplitude modulation)
//!
//! Multiplies a stream by `1 + depth * modulator`, where the modulator is a
//! plain low-frequency oscillator pulled in sample mode. Parameter changes
//! apply at the next block and keep the modulator's phase.

use serde::{Deserialize, Serialize};

use super::block::{silent_block, Block};
use super::oscillator::{Oscillator, Waveform};

/// User-facing tremolo settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TremoloConfig {
    /// Modulator waveform
    #[serde(default = "default_waveform")]
    pub waveform: Waveform,
    /// Modulator frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Modulation depth (0.0-1.0)
    #[serde(default = "default_depth")]
    pub depth: f64,
}

fn default_waveform() -> Waveform {
    Waveform::Sine
}

fn default_frequency() -> f64 {
    5.0
}

fn default_depth() -> f64 {
    0.5
}

impl Default for TremoloConfig {
    fn default() -> Self {
        Self {
            waveform: default_waveform(),
            frequency: default_frequency(),
            depth: default_depth(),
        }
    }
}

/// Amplitude-modulation stage.
pub struct AmpModulation {
    modulator: Oscillator,
    depth: f64,
}

impl AmpModulation {
    /// Create the stage from its settings.
    pub fn new(config: TremoloConfig, sample_rate: f64) -> Self {
        Self {
            modulator: Oscillator::new(config.waveform, config.frequency, sample_rate),
            depth: config.depth.clamp(0.0, 1.0),
        }
    }

    /// Update settings in place; the modulator phase is not reset.
    pub fn reconfigure(&mut self, config: TremoloConfig) {
        self.modulator.set_waveform(config.waveform);
        self.modulator.set_frequency(config.frequency);
        self.depth = config.depth.clamp(0.0, 1.0);
    }

    /// Apply the modulation envelope to one block in place.
    pub fn process_block(&mut self, block: &mut Block) {
        let mut wave = silent_block();
        self.modulator.sample_block(&mut wave);
        for (sample, m) in block.iter_mut().zip(wave.iter()) {
            *sample *= 1.0 + self.depth * m;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::block::BLOCK_SIZE;

    const SAMPLE_RATE: f64 = 44100.0;

    #[test]
    fn zero_depth_is_transparent() {
        let mut am = AmpModulation::new(
            TremoloConfig {
                depth: 0.0,
                ..TremoloConfig::default()
            },
            SAMPLE_RATE,
        );
        let mut block = [0.5; BLOCK_SIZE];
        am.process_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn gain_stays_within_depth_bounds() {
        let depth = 0.5;
        let mut am = AmpModulation::new(
            TremoloConfig {
                frequency: 100.0,
                depth,
                ..TremoloConfig::default()
            },
            SAMPLE_RATE,
        );
        let mut block = [1.0; BLOCK_SIZE];
        am.process_block(&mut block);
        for &sample in block.iter() {
            assert!(sample >= 1.0 - depth - 1e-9 && sample <= 1.0 + depth + 1e-9);
        }
        // The modulation actually moves the gain.
        let min = block.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = block.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(max - min > depth, "expected audible tremolo movement");
    }

    #[test]
    fn reconfigure_keeps_running() {
        let mut am = AmpModulation::new(TremoloConfig::default(), SAMPLE_RATE);
        let mut block = [1.0; BLOCK_SIZE];
        am.process_block(&mut block);

        am.reconfigure(TremoloConfig {
            frequency: 9.0,
            depth: 1.0,
            waveform: Waveform::Square,
        });
        let mut block = [1.0; BLOCK_SIZE];
        am.process_block(&mut block);
        // Square modulator at full depth swings the gain between 0 and 2.
        assert!(block.iter().any(|&s| s > 1.5 || s < 0.5));
    }
}
