//! ADSR envelope generator
//!
//! Attack-Decay-Sustain-Release envelope producing a per-sample amplitude
//! level, one block at a time. Each timed stage is an exponential
//! charge/discharge computed incrementally:
//!
//! ```text
//! level[n+1] = base + level[n] * mult
//! ```
//!
//! where `mult` and `base` are derived from the stage duration and the
//! asymptote the curve shoots past its landing level. Stage transitions are
//! checked once per block, not per sample, so a transition can land up to one
//! block late.

use serde::{Deserialize, Serialize};

use super::block::Block;

/// Envelope stage
///
/// Ordered by progress through the note's lifetime, so combining stages with
/// `min` yields the least-progressed stage (a composite is `Idle` only when
/// every part is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Idle,
}

/// ADSR descriptor
///
/// `sustain` is a fraction of the peak level. The target offsets shape the
/// curvature: they are the distance between each stage's landing level and
/// the asymptote its exponential actually converges to. Small offsets give
/// sharp knees, large ones give nearly linear ramps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrParams {
    /// Attack time in seconds
    #[serde(default)]
    pub attack: f64,
    /// Decay time in seconds
    #[serde(default)]
    pub decay: f64,
    /// Sustain level as a fraction of peak (0.0-1.0)
    #[serde(default = "default_sustain")]
    pub sustain: f64,
    /// Release time in seconds
    #[serde(default = "default_release")]
    pub release: f64,
    /// Asymptote offset above the peak for the attack curve
    #[serde(default = "default_attack_target")]
    pub attack_target: f64,
    /// Asymptote offset below the landing level for decay and release
    #[serde(default = "default_decay_release_target")]
    pub decay_release_target: f64,
}

fn default_sustain() -> f64 {
    1.0
}

fn default_release() -> f64 {
    0.05
}

fn default_attack_target() -> f64 {
    1.0
}

fn default_decay_release_target() -> f64 {
    1e-6
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: default_sustain(),
            release: default_release(),
            attack_target: default_attack_target(),
            decay_release_target: default_decay_release_target(),
        }
    }
}

/// Per-stage recurrence coefficients
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    mult: f64,
    base: f64,
}

/// ADSR envelope generator
pub struct Envelope {
    params: AdsrParams,
    /// Peak level the attack rises to; 0.0 for a disabled operator
    max_level: f64,
    sample_rate: f64,

    stage: EnvelopeStage,
    level: f64,
    coeffs: Coefficients,
}

impl Envelope {
    /// Create a triggered envelope starting its attack from level 0.
    pub fn new(params: AdsrParams, max_level: f64, sample_rate: f64) -> Self {
        let mut env = Self {
            params,
            max_level,
            sample_rate,
            stage: EnvelopeStage::Attack,
            level: 0.0,
            coeffs: Coefficients { mult: 1.0, base: 0.0 },
        };
        env.enter_attack();
        env
    }

    /// Get current stage
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Get current level without advancing
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Sustain level in absolute terms
    fn sustain_level(&self) -> f64 {
        self.params.sustain * self.max_level
    }

    /// Exponential rate for a stage: `ln(target / reference) / (duration * sr)`
    fn rate(&self, target: f64, duration: f64, reference: f64) -> f64 {
        (target / reference).ln() / (duration * self.sample_rate)
    }

    fn enter_attack(&mut self) {
        let t = self.params.attack_target;
        if self.params.attack <= 0.0 {
            self.level = self.max_level;
            self.enter_decay();
            return;
        }
        self.stage = EnvelopeStage::Attack;
        let mult = self.rate(t, self.params.attack, self.max_level + t).exp();
        self.coeffs = Coefficients {
            mult,
            base: (self.max_level + t) * (1.0 - mult),
        };
    }

    fn enter_decay(&mut self) {
        let t = self.params.decay_release_target;
        let sustain = self.sustain_level();
        let drop = self.max_level - sustain;
        if self.params.decay <= 0.0 || drop <= 0.0 {
            self.level = sustain;
            self.stage = EnvelopeStage::Sustain;
            return;
        }
        self.stage = EnvelopeStage::Decay;
        let mult = self.rate(t, self.params.decay, drop + t).exp();
        self.coeffs = Coefficients {
            mult,
            base: (sustain - t) * (1.0 - mult),
        };
    }

    fn enter_release(&mut self) {
        let t = self.params.decay_release_target;
        if self.params.release <= 0.0 || self.level <= 0.0 {
            self.level = 0.0;
            self.stage = EnvelopeStage::Idle;
            return;
        }
        self.stage = EnvelopeStage::Release;
        let mult = self.rate(t, self.params.release, self.level + t).exp();
        self.coeffs = Coefficients {
            mult,
            base: -t * (1.0 - mult),
        };
    }

    /// Begin the release phase from the current level.
    pub fn note_off(&mut self) {
        if self.stage != EnvelopeStage::Release && self.stage != EnvelopeStage::Idle {
            self.enter_release();
        }
    }

    /// Fill `out` with the next block of amplitude levels.
    pub fn level_block(&mut self, out: &mut Block) {
        match self.stage {
            EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Release => {
                for sample in out.iter_mut() {
                    self.level = self.coeffs.base + self.level * self.coeffs.mult;
                    *sample = self.level;
                }
                self.check_transition();
            }
            EnvelopeStage::Sustain => {
                out.fill(self.sustain_level());
            }
            EnvelopeStage::Idle => {
                out.fill(0.0);
            }
        }
    }

    /// End-of-block threshold check for the timed stages.
    fn check_transition(&mut self) {
        match self.stage {
            EnvelopeStage::Attack => {
                if self.level >= self.max_level {
                    self.level = self.max_level;
                    self.enter_decay();
                }
            }
            EnvelopeStage::Decay => {
                if self.level <= self.sustain_level() {
                    self.level = self.sustain_level();
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Release => {
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::block::{silent_block, BLOCK_SIZE};

    const SAMPLE_RATE: f64 = 44100.0;

    fn drain(env: &mut Envelope, blocks: usize) -> Vec<f64> {
        let mut out = Vec::new();
        let mut block = silent_block();
        for _ in 0..blocks {
            env.level_block(&mut block);
            out.extend_from_slice(&block);
        }
        out
    }

    #[test]
    fn instant_attack_sits_at_peak() {
        let params = AdsrParams::default();
        let mut env = Envelope::new(params, 0.8, SAMPLE_RATE);

        // attack = decay = 0, sustain = 1.0: straight to sustain at peak
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        let samples = drain(&mut env, 2);
        assert!(samples.iter().all(|&s| (s - 0.8).abs() < 1e-12));
    }

    #[test]
    fn attack_rises_monotonically_to_peak() {
        let params = AdsrParams {
            attack: 0.05,
            ..AdsrParams::default()
        };
        let mut env = Envelope::new(params, 1.0, SAMPLE_RATE);
        assert_eq!(env.stage(), EnvelopeStage::Attack);

        let samples = drain(&mut env, 8);
        for pair in samples.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "attack must not fall");
        }
        // 8 blocks = 93 ms, well past the 50 ms attack (+1 block slack)
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay_settles_at_sustain_level() {
        let params = AdsrParams {
            decay: 0.02,
            sustain: 0.5,
            ..AdsrParams::default()
        };
        let mut env = Envelope::new(params, 1.0, SAMPLE_RATE);
        assert_eq!(env.stage(), EnvelopeStage::Decay);

        drain(&mut env, 4);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn release_decays_to_idle_within_duration() {
        let release = 0.05;
        let params = AdsrParams {
            release,
            ..AdsrParams::default()
        };
        let mut env = Envelope::new(params, 1.0, SAMPLE_RATE);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);

        env.note_off();
        assert_eq!(env.stage(), EnvelopeStage::Release);

        // Release duration rounded up to whole blocks, plus one block slack.
        let release_blocks = (release * SAMPLE_RATE / BLOCK_SIZE as f64).ceil() as usize + 1;
        let samples = drain(&mut env, release_blocks);
        for pair in samples.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "release must not rise");
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.level(), 0.0);

        // Idle emits silence forever.
        let tail = drain(&mut env, 2);
        assert!(tail.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_release_is_instantaneous() {
        let params = AdsrParams {
            release: 0.0,
            ..AdsrParams::default()
        };
        let mut env = Envelope::new(params, 1.0, SAMPLE_RATE);
        env.note_off();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn note_off_during_attack_releases_from_current_level() {
        let params = AdsrParams {
            attack: 1.0,
            release: 0.01,
            ..AdsrParams::default()
        };
        let mut env = Envelope::new(params, 1.0, SAMPLE_RATE);
        drain(&mut env, 2);
        let level_at_release = env.level();
        assert!(level_at_release > 0.0 && level_at_release < 1.0);

        env.note_off();
        let mut block = silent_block();
        env.level_block(&mut block);
        assert!(block[0] <= level_at_release);
        drain(&mut env, 2);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn zero_peak_envelope_still_runs_to_idle() {
        // A disabled operator has a zero level ceiling but the state machine
        // must still finish so the voice can be pruned.
        let mut env = Envelope::new(AdsrParams::default(), 0.0, SAMPLE_RATE);
        let samples = drain(&mut env, 1);
        assert!(samples.iter().all(|&s| s == 0.0));

        env.note_off();
        drain(&mut env, 8);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn stage_ordering_combines_with_min() {
        assert!(EnvelopeStage::Attack < EnvelopeStage::Idle);
        assert_eq!(
            EnvelopeStage::Sustain.min(EnvelopeStage::Idle),
            EnvelopeStage::Sustain
        );
    }
}
