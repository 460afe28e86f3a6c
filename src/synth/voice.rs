//! Voices
//!
//! A voice is one sounding note: a private clone of every oscillator
//! template, the operators built from those clones, the FM routing plan over
//! them, and the per-voice output stages (tremolo, pass filter, anti-click
//! fade). Voices are created on note-on, released on note-off, and linger in
//! the mixer until every envelope reports idle.

use super::block::{Block, SignalNode};
use super::envelope::EnvelopeStage;
use super::fade::FadeIn;
use super::filter::{FilterConfig, PassFilter};
use super::operator::Operator;
use super::routing::{self, Chain, RoutingError};
use super::template::OscillatorTemplate;
use super::tremolo::{AmpModulation, TremoloConfig};

/// Frequency match tolerance for note-off lookups, in Hz.
const FREQUENCY_EPSILON: f64 = 1e-6;

/// One polyphonic voice.
pub struct Voice {
    frequency: f64,
    serial: u64,
    sample_rate: f64,
    /// This voice's private template clones, note frequency already applied
    templates: Vec<OscillatorTemplate>,
    /// Operator per template, indexed identically
    operators: Vec<Operator>,
    chain: Chain,
    tremolo: Option<AmpModulation>,
    filter: PassFilter,
    fade: FadeIn,
    released: bool,
}

impl Voice {
    /// Build a voice from the shared templates.
    ///
    /// Every template is deep-cloned so the voice owns independent phase and
    /// envelope state; clones not in fixed-frequency mode are tuned to the
    /// note frequency scaled by their ratio.
    pub fn new(
        shared: &[OscillatorTemplate],
        frequency: f64,
        serial: u64,
        sample_rate: f64,
        tremolo: Option<TremoloConfig>,
        filter: FilterConfig,
    ) -> Result<Self, RoutingError> {
        let mut templates = shared.to_vec();
        for template in &mut templates {
            template.apply_note_frequency(frequency);
        }

        let chain = routing::build(&templates)?;
        let operators = templates
            .iter()
            .map(|t| Operator::from_template(t, sample_rate))
            .collect();

        Ok(Self {
            frequency,
            serial,
            sample_rate,
            templates,
            operators,
            chain,
            tremolo: tremolo.map(|config| AmpModulation::new(config, sample_rate)),
            filter: PassFilter::new(filter.kind, filter.cutoff, sample_rate),
            fade: FadeIn::new(sample_rate),
            released: false,
        })
    }

    /// The note frequency captured at note-on.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Creation order, used for oldest-voice eviction.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether this voice sounds at the given note frequency.
    pub fn matches_frequency(&self, frequency: f64) -> bool {
        (self.frequency - frequency).abs() < FREQUENCY_EPSILON
    }

    /// Whether note-off has already been applied.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Re-derive the routing plan after the shared templates changed.
    ///
    /// When only the modulation targets changed (preset switch), the voice's
    /// operators keep their accumulated phase and envelope state.
    /// When the template count changed (oscillator add/remove), the voice
    /// rebuilds its clones and operators from scratch and re-applies its
    /// release if it had one.
    pub fn sync_routing(&mut self, shared: &[OscillatorTemplate]) -> Result<(), RoutingError> {
        if shared.len() == self.templates.len() {
            let mut templates = self.templates.clone();
            for (mine, theirs) in templates.iter_mut().zip(shared) {
                mine.targets = theirs.targets.clone();
            }
            self.chain = routing::build(&templates)?;
            self.templates = templates;
        } else {
            let mut templates = shared.to_vec();
            for template in &mut templates {
                template.apply_note_frequency(self.frequency);
            }
            self.chain = routing::build(&templates)?;
            self.operators = templates
                .iter()
                .map(|t| Operator::from_template(t, self.sample_rate))
                .collect();
            self.templates = templates;
            if self.released {
                for operator in &mut self.operators {
                    operator.note_off();
                }
            }
        }
        Ok(())
    }

    /// Replace or remove the tremolo stage.
    ///
    /// An existing modulator is updated in place so its phase keeps running.
    pub fn set_tremolo(&mut self, config: Option<TremoloConfig>) {
        match (config, self.tremolo.as_mut()) {
            (Some(config), Some(am)) => am.reconfigure(config),
            (Some(config), None) => {
                self.tremolo = Some(AmpModulation::new(config, self.sample_rate));
            }
            (None, _) => self.tremolo = None,
        }
    }

    /// Update the output filter; the filter memory is kept.
    pub fn set_filter(&mut self, config: FilterConfig) {
        self.filter.set_kind(config.kind);
        self.filter.set_cutoff(config.cutoff);
    }
}

impl SignalNode for Voice {
    fn next_block(&mut self, out: &mut Block) {
        self.chain.render(&mut self.operators, out);
        if let Some(tremolo) = self.tremolo.as_mut() {
            tremolo.process_block(out);
        }
        self.filter.process_block(out);
        self.fade.process_block(out);
    }

    fn stage(&self) -> EnvelopeStage {
        self.operators
            .iter()
            .map(Operator::envelope_stage)
            .min()
            .unwrap_or(EnvelopeStage::Idle)
    }

    fn release(&mut self) {
        for operator in &mut self.operators {
            operator.note_off();
        }
        self.released = true;
    }
}
