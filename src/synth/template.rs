//! Oscillator templates
//!
//! A template is the user-configured description of one operator. The engine
//! owns one template per operator slot; every note-on deep-clones the whole
//! set so each voice gets private phase and envelope state. Templates are
//! identified by their index in the owning vec; the modulation-target lists
//! hold indices, never references.

use serde::{Deserialize, Serialize};

use super::envelope::AdsrParams;
use super::oscillator::Waveform;

/// Configuration for one operator slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorTemplate {
    /// Waveform kind
    pub waveform: Waveform,

    /// Frequency in Hz. Overwritten per note unless `fixed_frequency` is set.
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Peak amplitude (0.0-1.0)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Multiplier applied to the note frequency when not in fixed mode
    #[serde(default = "default_ratio")]
    pub frequency_ratio: f64,

    /// Ignore note frequency and always run at `frequency`
    #[serde(default)]
    pub fixed_frequency: bool,

    /// A disabled operator emits silence but keeps advancing its state
    #[serde(default)]
    pub disabled: bool,

    /// Envelope descriptor
    #[serde(default)]
    pub adsr: AdsrParams,

    /// Indices of the templates this operator frequency-modulates.
    /// Ordered, duplicates allowed; empty means this operator is a carrier.
    #[serde(default)]
    pub targets: Vec<usize>,
}

fn default_frequency() -> f64 {
    440.0
}

fn default_amplitude() -> f64 {
    0.5
}

fn default_ratio() -> f64 {
    1.0
}

impl Default for OscillatorTemplate {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: default_frequency(),
            amplitude: default_amplitude(),
            frequency_ratio: default_ratio(),
            fixed_frequency: false,
            disabled: false,
            adsr: AdsrParams::default(),
            targets: Vec::new(),
        }
    }
}

impl OscillatorTemplate {
    /// Set this template's frequency from a note event.
    ///
    /// Fixed-frequency templates keep their configured frequency; everything
    /// else runs at the note frequency scaled by its ratio.
    pub fn apply_note_frequency(&mut self, note_frequency: f64) {
        if !self.fixed_frequency {
            self.frequency = note_frequency * self.frequency_ratio;
        }
    }

    /// Effective peak amplitude: zero while disabled.
    pub fn effective_amplitude(&self) -> f64 {
        if self.disabled {
            0.0
        } else {
            self.amplitude
        }
    }
}
