//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::synth::{
    routing, Algorithm, FilterConfig, OscillatorTemplate, TremoloConfig, PRESET_OSCILLATORS,
};

/// Main configuration for the synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master settings (volume, polyphony)
    #[serde(default)]
    pub master: MasterConfig,

    /// Operator templates, in declaration order
    #[serde(default = "default_oscillators")]
    pub oscillators: Vec<OscillatorTemplate>,

    /// Routing preset; omit to use the explicit per-oscillator targets
    #[serde(default)]
    pub algorithm: Option<Algorithm>,

    /// Tremolo (amplitude modulation) applied to every voice
    #[serde(default)]
    pub tremolo: Option<TremoloConfig>,

    /// Output pass filter applied to every voice
    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_oscillators() -> Vec<OscillatorTemplate> {
    vec![OscillatorTemplate::default(); PRESET_OSCILLATORS]
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            master: MasterConfig::default(),
            oscillators: default_oscillators(),
            algorithm: Some(Algorithm::default()),
            tremolo: None,
            filter: FilterConfig::default(),
        }
    }
}

impl SynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }

        if self.master.volume < 0.0 || self.master.volume > 1.0 {
            bail!("Master volume must be between 0.0 and 1.0");
        }
        if self.master.max_voices < 1 || self.master.max_voices > 64 {
            bail!("max_voices must be between 1 and 64");
        }

        if self.algorithm.is_some() && self.oscillators.len() != PRESET_OSCILLATORS {
            bail!(
                "algorithm presets need exactly {} oscillators, found {}",
                PRESET_OSCILLATORS,
                self.oscillators.len()
            );
        }

        for (index, oscillator) in self.oscillators.iter().enumerate() {
            if oscillator.amplitude < 0.0 || oscillator.amplitude > 1.0 {
                bail!("Oscillator {} amplitude must be between 0.0 and 1.0", index);
            }
            if oscillator.adsr.sustain < 0.0 || oscillator.adsr.sustain > 1.0 {
                bail!("Oscillator {} sustain must be between 0.0 and 1.0", index);
            }
            if oscillator.frequency_ratio <= 0.0 {
                bail!("Oscillator {} frequency ratio must be positive", index);
            }
        }

        if let Some(tremolo) = &self.tremolo {
            if tremolo.depth < 0.0 || tremolo.depth > 1.0 {
                bail!("Tremolo depth must be between 0.0 and 1.0");
            }
        }

        // Fail fast on a broken modulation graph instead of at the first
        // note-on. Preset layouts are always acyclic; explicit targets from
        // the file are not.
        let mut oscillators = self.oscillators.clone();
        if let Some(algorithm) = self.algorithm {
            algorithm.apply(&mut oscillators)?;
        }
        if let Err(err) = routing::validate(&oscillators) {
            bail!("Invalid modulation routing: {}", err);
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 {
    44100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            device: None,
        }
    }
}

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.7)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Polyphony limit (default: 8)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
}

fn default_volume() -> f64 {
    0.7
}

fn default_max_voices() -> usize {
    8
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            max_voices: default_max_voices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Waveform;

    #[test]
    fn default_config_is_valid() {
        assert!(SynthConfig::default().validate().is_ok());
    }

    #[test]
    fn audio_defaults_fill_in() {
        let config: AudioConfig = serde_yaml::from_str("device: null").unwrap();
        assert_eq!(config.sample_rate, 44100);
    }

    #[test]
    fn oscillator_section_parses() {
        let yaml = r#"
oscillators:
  - waveform: sine
    frequency_ratio: 1.0
    amplitude: 0.8
  - waveform: square
    frequency_ratio: 2.0
    amplitude: 0.3
    targets: [0]
  - waveform: sine
  - waveform: noise
    disabled: true
"#;
        let config: SynthConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.oscillators.len(), 4);
        assert_eq!(config.oscillators[1].waveform, Waveform::Square);
        assert_eq!(config.oscillators[1].targets, vec![0]);
        assert!(config.oscillators[3].disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cyclic_targets_fail_validation() {
        let mut config = SynthConfig::default();
        config.algorithm = None;
        config.oscillators[0].targets = vec![1];
        config.oscillators[1].targets = vec![0];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cycle"), "unexpected error: {}", err);
    }

    #[test]
    fn preset_needs_four_oscillators() {
        let mut config = SynthConfig::default();
        config.oscillators.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let mut config = SynthConfig::default();
        config.master.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = SynthConfig::default();
        config.oscillators[0].amplitude = 2.0;
        assert!(config.validate().is_err());

        let mut config = SynthConfig::default();
        config.audio.sample_rate = 1000;
        assert!(config.validate().is_err());
    }
}
