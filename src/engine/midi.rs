//! MIDI note input
//!
//! Connects to a MIDI input port, parses note-on/off messages, and drives
//! the engine with note frequencies. The engine only ever sees frequencies;
//! note numbers are converted at this boundary.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInput, MidiInputConnection};

use super::Engine;

/// Convert a MIDI note number to its equal-tempered frequency in Hz.
/// A4 = 440 Hz = MIDI note 69.
pub fn midi_note_to_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// A decoded note event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    /// Note-on with its frequency in Hz
    On(f64),
    /// Note-off with its frequency in Hz
    Off(f64),
}

/// Decode a raw MIDI message into a note event, if it is one.
///
/// A note-on with velocity zero is a note-off, per the MIDI convention.
pub fn parse_message(message: &[u8]) -> Option<NoteEvent> {
    if message.len() < 3 {
        return None;
    }
    let status = message[0] & 0xF0;
    let note = message[1] & 0x7F;
    let velocity = message[2] & 0x7F;

    match status {
        0x90 if velocity > 0 => Some(NoteEvent::On(midi_note_to_frequency(note))),
        0x90 => Some(NoteEvent::Off(midi_note_to_frequency(note))),
        0x80 => Some(NoteEvent::Off(midi_note_to_frequency(note))),
        _ => None,
    }
}

/// Active MIDI input connection feeding the engine.
pub struct MidiListener {
    port_name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiListener {
    /// Connect to a MIDI input port and start listening.
    ///
    /// `port_name` selects the first port whose name contains the given
    /// substring; `None` picks the first available port.
    pub fn connect(port_name: Option<&str>, engine: Arc<Mutex<Engine>>) -> Result<Self> {
        let mut midi_in = MidiInput::new("Carrier MIDI Input")?;
        midi_in.ignore(Ignore::All);
        let ports = midi_in.ports();

        if ports.is_empty() {
            return Err(anyhow!("No MIDI input ports available"));
        }

        let port = if let Some(name) = port_name {
            ports
                .iter()
                .find(|p| {
                    midi_in
                        .port_name(p)
                        .map(|n| n.contains(name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| anyhow!("MIDI port '{}' not found", name))?
                .clone()
        } else {
            ports[0].clone()
        };

        let port_name_actual = midi_in.port_name(&port)?;

        let connection = midi_in
            .connect(
                &port,
                "carrier-input",
                move |_timestamp, message, _| {
                    let Some(event) = parse_message(message) else {
                        return;
                    };
                    // Control path: the lock is held only for the note event.
                    if let Ok(mut engine) = engine.lock() {
                        match event {
                            NoteEvent::On(frequency) => {
                                if let Err(err) = engine.note_on(frequency) {
                                    eprintln!("note on failed: {}", err);
                                }
                            }
                            NoteEvent::Off(frequency) => {
                                engine.note_off(frequency);
                            }
                        }
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("failed to connect MIDI input: {}", e))?;

        Ok(Self {
            port_name: port_name_actual,
            _connection: connection,
        })
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// List available MIDI input ports.
pub fn list_midi_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("Carrier MIDI List")?;
    let ports = midi_in.ports();

    let names: Vec<String> = ports
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();

    Ok(names)
}

/// Get the default MIDI input port name.
pub fn default_port_name() -> Option<String> {
    let midi_in = MidiInput::new("Carrier MIDI Default").ok()?;
    let ports = midi_in.ports();
    ports.first().and_then(|p| midi_in.port_name(p).ok())
}
