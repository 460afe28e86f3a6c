//! Carrier - polyphonic FM synthesizer
//!
//! Four routable operators per voice, ADSR envelopes, tremolo and pass
//! filter stages, real-time playback, MIDI input, and WAV export.

pub mod config;
pub mod engine;
pub mod synth;
pub mod viz;

pub use config::SynthConfig;
pub use engine::Engine;
