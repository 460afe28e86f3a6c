//! Algorithm presets
//!
//! Named modulation layouts over exactly four operators A, B, C, D
//! (indices 0-3). Applying a preset assigns every target list outright, so
//! reapplying one is idempotent.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::template::OscillatorTemplate;

/// Number of operators the presets are defined over.
pub const PRESET_OSCILLATORS: usize = 4;

/// A named FM routing layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// A -> B -> C -> D: one carrier, three stacked modulators
    Stack,
    /// Four independent carriers, summed
    #[default]
    Parallel,
    /// Two independent two-stage chains: A -> B and C -> D
    Square,
    /// A, B and C all modulate the single carrier D
    ThreeToOne,
}

impl Algorithm {
    /// All presets, in display order.
    pub fn all() -> [Algorithm; 4] {
        [
            Algorithm::Stack,
            Algorithm::Parallel,
            Algorithm::Square,
            Algorithm::ThreeToOne,
        ]
    }

    /// Display name, matching the config file spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Stack => "stack",
            Algorithm::Parallel => "parallel",
            Algorithm::Square => "square",
            Algorithm::ThreeToOne => "three_to_one",
        }
    }

    /// Assign this preset's modulation targets.
    ///
    /// Fails unless there are exactly four templates: the layouts are only
    /// defined for the classic four-operator arrangement.
    pub fn apply(&self, templates: &mut [OscillatorTemplate]) -> Result<()> {
        if templates.len() != PRESET_OSCILLATORS {
            bail!(
                "algorithm presets need exactly {} oscillators, found {}",
                PRESET_OSCILLATORS,
                templates.len()
            );
        }

        match self {
            Algorithm::Stack => {
                templates[0].targets = vec![1];
                templates[1].targets = vec![2];
                templates[2].targets = vec![3];
                templates[3].targets = Vec::new();
            }
            Algorithm::Parallel => {
                for template in templates.iter_mut() {
                    template.targets = Vec::new();
                }
            }
            Algorithm::Square => {
                templates[0].targets = vec![1];
                templates[1].targets = Vec::new();
                templates[2].targets = vec![3];
                templates[3].targets = Vec::new();
            }
            Algorithm::ThreeToOne => {
                templates[0].targets = vec![3];
                templates[1].targets = vec![3];
                templates[2].targets = vec![3];
                templates[3].targets = Vec::new();
            }
        }
        Ok(())
    }
}
