//! FM routing
//!
//! Turns the flat "who modulates whom" adjacency carried by the oscillator
//! templates into an ordered modulation plan. Carriers are templates that
//! modulate nobody; walking from each carrier up through its parents (the
//! templates that list it as a target) yields a nested chain of FM stages,
//! and independent carrier chains are summed into the voice output.
//!
//! The plan refers to operators by template index so it can be rebuilt at any
//! time without touching the phase or envelope state accumulated in a live
//! voice's operators.

use thiserror::Error;

use super::block::{silent_block, Block};
use super::operator::Operator;
use super::template::OscillatorTemplate;

/// Errors from an invalid modulation-target configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// The modulation-target relation must be a DAG.
    #[error("modulation targets form a cycle through oscillator {0}")]
    CycleDetected(usize),

    #[error("modulation target {target} is out of range ({count} oscillators)")]
    TargetOutOfRange { target: usize, count: usize },
}

/// One node of the modulation plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Chain {
    /// An unmodulated operator pulled in sample mode.
    Carrier(usize),

    /// `source` pulled in modulation mode, offset by the modulator's samples:
    /// `out[i] = level[i] * cos(phase[i] + modulator[i])`
    Fm { source: usize, modulator: Box<Chain> },

    /// Normalized sum: `out[i] = gain * sum(inputs[i])`
    Mix { inputs: Vec<Chain>, gain: f64 },
}

/// Check that every target index is in range and the adjacency is acyclic.
pub fn validate(templates: &[OscillatorTemplate]) -> Result<(), RoutingError> {
    let count = templates.len();
    for template in templates {
        for &target in &template.targets {
            if target >= count {
                return Err(RoutingError::TargetOutOfRange { target, count });
            }
        }
    }

    // DFS coloring over the target adjacency. 0 = unvisited, 1 = on the
    // current path, 2 = finished.
    let mut color = vec![0u8; count];
    for start in 0..count {
        if color[start] == 0 {
            dfs(templates, start, &mut color)?;
        }
    }
    Ok(())
}

fn dfs(templates: &[OscillatorTemplate], node: usize, color: &mut [u8]) -> Result<(), RoutingError> {
    color[node] = 1;
    for &target in &templates[node].targets {
        match color[target] {
            1 => return Err(RoutingError::CycleDetected(target)),
            0 => dfs(templates, target, color)?,
            _ => {}
        }
    }
    color[node] = 2;
    Ok(())
}

/// Build the modulation plan for a template set.
pub fn build(templates: &[OscillatorTemplate]) -> Result<Chain, RoutingError> {
    validate(templates)?;

    let carriers: Vec<usize> = (0..templates.len())
        .filter(|&i| templates[i].targets.is_empty())
        .collect();

    let mut chains: Vec<Chain> = carriers
        .into_iter()
        .map(|carrier| build_node(templates, carrier))
        .collect();

    Ok(match chains.len() {
        1 => chains.pop().unwrap(),
        n => Chain::Mix {
            gain: if n == 0 { 1.0 } else { 1.0 / n as f64 },
            inputs: chains,
        },
    })
}

/// Wrap `node` in an FM stage if anything modulates it, recursing through
/// the parents first so the pipeline is fully nested bottom-up.
fn build_node(templates: &[OscillatorTemplate], node: usize) -> Chain {
    // Parent order follows template declaration order; a duplicate target
    // entry contributes one parent stream per occurrence.
    let mut parents: Vec<usize> = Vec::new();
    for (index, template) in templates.iter().enumerate() {
        for &target in &template.targets {
            if target == node {
                parents.push(index);
            }
        }
    }

    if parents.is_empty() {
        return Chain::Carrier(node);
    }

    let mut streams: Vec<Chain> = parents
        .into_iter()
        .map(|parent| build_node(templates, parent))
        .collect();

    let modulator = if streams.len() > 1 {
        Chain::Mix {
            gain: 1.0 / streams.len() as f64,
            inputs: streams,
        }
    } else {
        streams.pop().unwrap()
    };

    Chain::Fm {
        source: node,
        modulator: Box::new(modulator),
    }
}

impl Chain {
    /// Render the next block of this plan against the voice's operators.
    pub fn render(&self, operators: &mut [Operator], out: &mut Block) {
        match self {
            Chain::Carrier(index) => operators[*index].sample_block(out),

            Chain::Fm { source, modulator } => {
                let mut modulation = silent_block();
                modulator.render(operators, &mut modulation);

                let mut phase = silent_block();
                let mut level = silent_block();
                operators[*source].modulation_block(&mut phase, &mut level);

                for i in 0..out.len() {
                    out[i] = level[i] * (phase[i] + modulation[i]).cos();
                }
            }

            Chain::Mix { inputs, gain } => {
                out.fill(0.0);
                let mut scratch = silent_block();
                for input in inputs {
                    input.render(operators, &mut scratch);
                    for (acc, sample) in out.iter_mut().zip(scratch.iter()) {
                        *acc += gain * sample;
                    }
                }
            }
        }
    }
}
