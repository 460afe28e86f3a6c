//! Dynamic voice mixer
//!
//! Sums the streams of every active voice, normalized by the current
//! membership count. After each block, voices whose envelopes have all gone
//! idle are dropped without any explicit remove call; an empty mixer emits
//! silence rather than terminating.

use crate::synth::{silent_block, Block, EnvelopeStage, SignalNode, Voice};

/// Mixer over the currently active voices.
pub struct VoiceMixer {
    voices: Vec<Voice>,
}

impl VoiceMixer {
    /// Create an empty mixer.
    pub fn new() -> Self {
        Self { voices: Vec::new() }
    }

    /// Number of active voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Splice a new voice into the membership.
    ///
    /// Takes effect at the next block boundary: the voice contributes
    /// nothing to a block already being produced.
    pub fn add(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    /// Remove and return the oldest voice (lowest serial), if any.
    pub fn evict_oldest(&mut self) -> Option<Voice> {
        let oldest = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.serial())
            .map(|(i, _)| i)?;
        Some(self.voices.remove(oldest))
    }

    /// Iterate the active voices mutably (configuration updates).
    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    /// Release every non-releasing voice at the given note frequency.
    ///
    /// Returns how many voices were released. Voices already in release or
    /// idle no longer answer to their frequency.
    pub fn release_at(&mut self, frequency: f64) -> usize {
        let mut released = 0;
        for voice in &mut self.voices {
            if voice.matches_frequency(frequency) && !voice.is_released() {
                voice.release();
                released += 1;
            }
        }
        released
    }

    /// Frequencies of voices that still answer to note-off.
    pub fn sounding_frequencies(&self) -> Vec<f64> {
        self.voices
            .iter()
            .filter(|v| !v.is_released())
            .map(Voice::frequency)
            .collect()
    }
}

impl Default for VoiceMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalNode for VoiceMixer {
    fn next_block(&mut self, out: &mut Block) {
        out.fill(0.0);
        if self.voices.is_empty() {
            return;
        }

        let gain = 1.0 / self.voices.len() as f64;
        let mut scratch = silent_block();
        for voice in &mut self.voices {
            voice.next_block(&mut scratch);
            for (acc, sample) in out.iter_mut().zip(scratch.iter()) {
                *acc += gain * sample;
            }
        }

        // Prune voices that finished their release during this block.
        self.voices.retain(|v| v.stage() != EnvelopeStage::Idle);
    }

    fn stage(&self) -> EnvelopeStage {
        self.voices
            .iter()
            .map(Voice::stage)
            .min()
            .unwrap_or(EnvelopeStage::Idle)
    }

    fn release(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{AdsrParams, FilterConfig, OscillatorTemplate, Waveform};

    const SAMPLE_RATE: f64 = 44100.0;

    fn test_voice(frequency: f64, serial: u64) -> Voice {
        let templates = vec![OscillatorTemplate {
            waveform: Waveform::Sine,
            amplitude: 1.0,
            adsr: AdsrParams {
                release: 0.01,
                ..AdsrParams::default()
            },
            ..OscillatorTemplate::default()
        }];
        Voice::new(
            &templates,
            frequency,
            serial,
            SAMPLE_RATE,
            None,
            FilterConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn empty_mixer_emits_silence() {
        let mut mixer = VoiceMixer::new();
        let mut block = [1.0; crate::synth::BLOCK_SIZE];
        mixer.next_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn idle_voices_are_pruned_automatically() {
        let mut mixer = VoiceMixer::new();
        mixer.add(test_voice(220.0, 0));
        mixer.add(test_voice(440.0, 1));
        assert_eq!(mixer.voice_count(), 2);

        assert_eq!(mixer.release_at(220.0), 1);

        // 10 ms release at 44.1 kHz ends within one block; the pruning
        // happens during the pull, with no explicit remove call.
        let mut block = silent_block();
        for _ in 0..4 {
            mixer.next_block(&mut block);
        }
        assert_eq!(mixer.voice_count(), 1);
        assert_eq!(mixer.sounding_frequencies(), vec![440.0]);
    }

    #[test]
    fn released_voice_stops_answering_note_off() {
        let mut mixer = VoiceMixer::new();
        mixer.add(test_voice(220.0, 0));

        assert_eq!(mixer.release_at(220.0), 1);
        assert_eq!(mixer.release_at(220.0), 0);
    }

    #[test]
    fn evicts_lowest_serial_first() {
        let mut mixer = VoiceMixer::new();
        mixer.add(test_voice(220.0, 5));
        mixer.add(test_voice(330.0, 2));
        mixer.add(test_voice(440.0, 9));

        let evicted = mixer.evict_oldest().unwrap();
        assert_eq!(evicted.serial(), 2);
        assert_eq!(mixer.voice_count(), 2);
    }

    #[test]
    fn membership_normalizes_gain() {
        let mut mixer = VoiceMixer::new();
        mixer.add(test_voice(441.0, 0));
        mixer.add(test_voice(441.0, 1));

        // Two identical voices at gain 1/2 sum to one voice's output.
        let mut pair_mix = silent_block();
        mixer.next_block(&mut pair_mix);

        let mut single = VoiceMixer::new();
        single.add(test_voice(441.0, 0));
        let mut alone = silent_block();
        single.next_block(&mut alone);

        for (a, b) in pair_mix.iter().zip(alone.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
