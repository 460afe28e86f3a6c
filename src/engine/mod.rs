//! Audio engine
//!
//! The engine is the voice manager: it owns the shared oscillator templates,
//! the routing preset, the per-voice output stages' settings, and the dynamic
//! mixer holding every active voice. Note events and configuration changes
//! arrive on the control path; the audio callback pulls blocks.

mod midi;
mod mixer;
mod player;
mod recorder;

pub use midi::{default_port_name, list_midi_ports, midi_note_to_frequency, MidiListener};
pub use mixer::VoiceMixer;
pub use player::{default_device_name, list_output_devices, Player};
pub use recorder::{next_recording_path, Recorder, Tap};

use anyhow::Result;

use crate::config::SynthConfig;
use crate::synth::{
    silent_block, Algorithm, Block, FilterConfig, FilterKind, OscillatorTemplate, SignalNode,
    TremoloConfig, Voice, BLOCK_SIZE,
};

/// The polyphonic synthesizer engine.
pub struct Engine {
    sample_rate: f64,
    max_voices: usize,
    master_volume: f64,

    templates: Vec<OscillatorTemplate>,
    algorithm: Option<Algorithm>,
    tremolo: Option<TremoloConfig>,
    filter: FilterConfig,

    mixer: VoiceMixer,
    next_serial: u64,

    /// Carry-over block for callers that read in non-block-sized runs
    pending: Block,
    pending_pos: usize,
}

impl Engine {
    /// Create an engine from a validated configuration.
    pub fn new(config: SynthConfig) -> Result<Self> {
        let mut templates = config.oscillators;
        if let Some(algorithm) = config.algorithm {
            algorithm.apply(&mut templates)?;
        }

        Ok(Self {
            sample_rate: config.audio.sample_rate as f64,
            max_voices: config.master.max_voices,
            master_volume: config.master.volume,
            templates,
            algorithm: config.algorithm,
            tremolo: config.tremolo,
            filter: config.filter,
            mixer: VoiceMixer::new(),
            next_serial: 0,
            pending: silent_block(),
            pending_pos: BLOCK_SIZE,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of currently active voices
    pub fn voice_count(&self) -> usize {
        self.mixer.voice_count()
    }

    /// Current routing preset, if one is applied
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Current output filter settings
    pub fn filter(&self) -> FilterConfig {
        self.filter
    }

    /// Current tremolo settings
    pub fn tremolo(&self) -> Option<TremoloConfig> {
        self.tremolo
    }

    /// Frequencies of voices that still answer to note-off
    pub fn sounding_frequencies(&self) -> Vec<f64> {
        self.mixer.sounding_frequencies()
    }

    /// Start a new voice at the given frequency.
    ///
    /// When the polyphony limit is reached, the oldest active voice is
    /// force-released and dropped from the mixer before the new voice is
    /// spliced in.
    pub fn note_on(&mut self, frequency: f64) -> Result<()> {
        while self.mixer.voice_count() >= self.max_voices {
            if let Some(mut evicted) = self.mixer.evict_oldest() {
                evicted.release();
            } else {
                break;
            }
        }

        let voice = Voice::new(
            &self.templates,
            frequency,
            self.next_serial,
            self.sample_rate,
            self.tremolo,
            self.filter,
        )?;
        self.next_serial += 1;
        self.mixer.add(voice);
        Ok(())
    }

    /// Release every sounding voice at the given frequency.
    ///
    /// The voices keep playing through their release phase; the mixer drops
    /// them once their envelopes reach idle. Returns how many were released.
    pub fn note_off(&mut self, frequency: f64) -> usize {
        self.mixer.release_at(frequency)
    }

    /// Switch the routing preset and rebuild every active voice's plan.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Result<()> {
        algorithm.apply(&mut self.templates)?;
        self.algorithm = Some(algorithm);
        for voice in self.mixer.voices_mut() {
            voice.sync_routing(&self.templates)?;
        }
        Ok(())
    }

    /// Insert a new oscillator template at `index`.
    ///
    /// Existing modulation targets pointing at shifted slots are renumbered.
    /// The preset no longer applies afterwards, so the routing becomes
    /// whatever the explicit target lists describe.
    pub fn add_oscillator(&mut self, template: OscillatorTemplate, index: usize) -> Result<()> {
        let index = index.min(self.templates.len());

        let mut templates = self.templates.clone();
        for existing in &mut templates {
            for target in &mut existing.targets {
                if *target >= index {
                    *target += 1;
                }
            }
        }
        templates.insert(index, template);
        crate::synth::routing::validate(&templates)?;

        self.templates = templates;
        self.algorithm = None;
        for voice in self.mixer.voices_mut() {
            voice.sync_routing(&self.templates)?;
        }
        Ok(())
    }

    /// Set or clear the tremolo applied to every voice.
    pub fn set_am_modulator(&mut self, config: Option<TremoloConfig>) {
        self.tremolo = config;
        for voice in self.mixer.voices_mut() {
            voice.set_tremolo(config);
        }
    }

    /// Update the output pass filter on every voice.
    pub fn set_pass_filter(&mut self, kind: FilterKind, cutoff: f64) {
        self.filter = FilterConfig { kind, cutoff };
        for voice in self.mixer.voices_mut() {
            voice.set_filter(self.filter);
        }
    }

    /// Set the master volume (0.0-1.0).
    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Produce the next block of output samples.
    ///
    /// This is the pull operation the audio sink drives; it always completes
    /// and never fails; an engine with no voices produces silence.
    pub fn next_block(&mut self, out: &mut Block) {
        self.mixer.next_block(out);
        if self.master_volume != 1.0 {
            for sample in out.iter_mut() {
                *sample *= self.master_volume;
            }
        }
    }

    /// Fill an arbitrary-length buffer, carrying partial blocks across calls.
    ///
    /// The internal block size never changes; this adapter only slices the
    /// stream for callers (the audio callback) whose buffer sizes don't line
    /// up with it.
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            if self.pending_pos >= BLOCK_SIZE {
                let mut block = silent_block();
                self.next_block(&mut block);
                self.pending = block;
                self.pending_pos = 0;
            }
            *sample = self.pending[self.pending_pos] as f32;
            self.pending_pos += 1;
        }
    }
}
