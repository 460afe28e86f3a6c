//! Synthesis engine
//!
//! Block-based generators, modulation stages, the FM routing builder, and
//! the per-note voice assembled from them.

mod algorithm;
mod block;
mod envelope;
mod fade;
mod filter;
mod operator;
mod oscillator;
pub mod routing;
mod template;
mod tremolo;
mod voice;

pub use algorithm::{Algorithm, PRESET_OSCILLATORS};
pub use block::{silent_block, Block, SignalNode, BLOCK_SIZE};
pub use envelope::{AdsrParams, Envelope, EnvelopeStage};
pub use fade::FadeIn;
pub use filter::{FilterConfig, FilterKind, PassFilter};
pub use operator::Operator;
pub use oscillator::{Oscillator, Waveform};
pub use routing::{Chain, RoutingError};
pub use template::OscillatorTemplate;
pub use tremolo::{AmpModulation, TremoloConfig};
pub use voice::Voice;
