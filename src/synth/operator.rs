//! Operators
//!
//! An operator pairs one oscillator with its ADSR envelope. It is the leaf
//! of every voice's routing graph: carriers are pulled in sample mode, FM
//! sources in modulation mode (phase angle plus the per-sample envelope
//! level the FM stage scales its cosine by).

use super::block::{Block, SignalNode};
use super::envelope::{Envelope, EnvelopeStage};
use super::oscillator::Oscillator;
use super::template::OscillatorTemplate;

/// One oscillator plus its envelope, instantiated from a template.
pub struct Operator {
    oscillator: Oscillator,
    envelope: Envelope,
}

impl Operator {
    /// Build an operator from a template. The envelope starts its attack
    /// immediately; operators only exist inside sounding voices.
    pub fn from_template(template: &OscillatorTemplate, sample_rate: f64) -> Self {
        Self {
            oscillator: Oscillator::new(template.waveform, template.frequency, sample_rate),
            envelope: Envelope::new(template.adsr, template.effective_amplitude(), sample_rate),
        }
    }

    /// Sample mode: envelope level times the raw waveform.
    pub fn sample_block(&mut self, out: &mut Block) {
        let mut levels = [0.0; super::block::BLOCK_SIZE];
        self.envelope.level_block(&mut levels);
        self.oscillator.sample_block(out);
        for (sample, level) in out.iter_mut().zip(levels.iter()) {
            *sample *= level;
        }
    }

    /// Modulation mode: phase angles and envelope levels, advanced together.
    pub fn modulation_block(&mut self, phase_out: &mut Block, level_out: &mut Block) {
        self.oscillator.modulation_block(phase_out);
        self.envelope.level_block(level_out);
    }

    /// Current envelope stage.
    pub fn envelope_stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    /// Move the envelope into release.
    pub fn note_off(&mut self) {
        self.envelope.note_off();
    }
}

impl SignalNode for Operator {
    fn next_block(&mut self, out: &mut Block) {
        self.sample_block(out);
    }

    fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    fn release(&mut self) {
        self.note_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::block::silent_block;
    use crate::synth::oscillator::Waveform;

    const SAMPLE_RATE: f64 = 44100.0;

    fn sine_template(amplitude: f64) -> OscillatorTemplate {
        OscillatorTemplate {
            waveform: Waveform::Sine,
            frequency: 440.0,
            amplitude,
            ..OscillatorTemplate::default()
        }
    }

    #[test]
    fn sample_mode_peaks_at_configured_amplitude() {
        // Default envelope: instant attack, sustain at peak.
        let mut op = Operator::from_template(&sine_template(0.25), SAMPLE_RATE);
        let mut block = silent_block();
        let mut peak = 0.0f64;
        for _ in 0..4 {
            op.sample_block(&mut block);
            peak = block.iter().fold(peak, |a, &s| a.max(s.abs()));
        }
        assert!((peak - 0.25).abs() < 0.001, "peak {} != amplitude", peak);
    }

    #[test]
    fn disabled_operator_keeps_phase() {
        // A disabled operator must stay silent while advancing its phase
        // exactly like an enabled one.
        let mut enabled = Operator::from_template(&sine_template(1.0), SAMPLE_RATE);
        let mut template = sine_template(1.0);
        template.disabled = true;
        let mut disabled = Operator::from_template(&template, SAMPLE_RATE);

        let mut block = silent_block();
        for _ in 0..3 {
            enabled.sample_block(&mut block);
            disabled.sample_block(&mut block);
            assert!(block.iter().all(|&s| s == 0.0), "disabled must be silent");
        }

        // Phase continuity: both oscillators report the same angle.
        let mut phase_a = silent_block();
        let mut phase_b = silent_block();
        let mut levels = silent_block();
        enabled.modulation_block(&mut phase_a, &mut levels);
        disabled.modulation_block(&mut phase_b, &mut levels);
        assert_eq!(phase_a[0], phase_b[0]);
    }

    #[test]
    fn release_drives_operator_to_idle() {
        let mut op = Operator::from_template(&sine_template(1.0), SAMPLE_RATE);
        assert_eq!(op.stage(), EnvelopeStage::Sustain);

        op.release();
        let mut block = silent_block();
        for _ in 0..8 {
            op.next_block(&mut block);
        }
        assert_eq!(op.stage(), EnvelopeStage::Idle);
        assert!(block.iter().all(|&s| s == 0.0));
    }
}
