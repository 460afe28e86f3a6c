//! Terminal monitor
//!
//! A small TUI shown during `play`: an oscilloscope over the live output,
//! a status line (preset, voices, filter, tremolo, recording), and a
//! computer-keyboard octave so the synth is playable without MIDI hardware.

mod scope;

pub use scope::Scope;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use crate::engine::{midi_note_to_frequency, Engine, Tap};
use crate::synth::Algorithm;

/// Buffer of recent output samples for the scope display.
pub struct SampleBuffer {
    samples: Vec<f32>,
    capacity: usize,
    write_pos: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            capacity,
            write_pos: 0,
        }
    }

    /// Push a new sample into the ring.
    pub fn push(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// The most recent `count` samples, oldest first.
    pub fn recent(&self, count: usize) -> Vec<f32> {
        let count = count.min(self.capacity);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let idx = (self.write_pos + self.capacity - count + i) % self.capacity;
            out.push(self.samples[idx]);
        }
        out
    }
}

/// Map the home row (plus sharps above it) to one octave from middle C.
fn key_to_note(c: char) -> Option<u8> {
    let note = match c {
        'a' => 60, // C4
        'w' => 61,
        's' => 62,
        'e' => 63,
        'd' => 64,
        'f' => 65,
        't' => 66,
        'g' => 67,
        'y' => 68,
        'h' => 69, // A4
        'u' => 70,
        'j' => 71,
        'k' => 72, // C5
        _ => return None,
    };
    Some(note)
}

/// Run the monitor until the user quits.
///
/// Key bindings: note keys toggle notes, Tab cycles the algorithm preset,
/// space releases everything, `q`/Esc quits.
pub fn run_ui(
    engine: Arc<Mutex<Engine>>,
    sample_buffer: Arc<Mutex<SampleBuffer>>,
    tap: Option<Arc<Tap>>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut held: HashSet<u8> = HashSet::new();
    let result = ui_loop(&mut terminal, &engine, &sample_buffer, tap.as_deref(), &mut held);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    engine: &Arc<Mutex<Engine>>,
    sample_buffer: &Arc<Mutex<SampleBuffer>>,
    tap: Option<&Tap>,
    held: &mut HashSet<u8>,
) -> Result<()> {
    loop {
        let status = {
            let engine = engine.lock().unwrap();
            StatusLine {
                algorithm: engine.algorithm(),
                voices: engine.voice_count(),
                filter: engine.filter(),
                tremolo: engine.tremolo().is_some(),
                recording: tap.map(Tap::is_armed).unwrap_or(false),
            }
        };

        terminal.draw(|f| {
            let buffer = sample_buffer.lock().unwrap();
            draw_ui(f, &buffer, &status);
        })?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => break,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => break,
            (KeyCode::Tab, _) => {
                let mut engine = engine.lock().unwrap();
                let next = next_algorithm(engine.algorithm());
                // Presets only apply to four-operator setups; ignore the
                // keypress otherwise.
                let _ = engine.set_algorithm(next);
            }
            (KeyCode::Char(' '), _) => {
                let mut engine = engine.lock().unwrap();
                for note in held.drain() {
                    engine.note_off(midi_note_to_frequency(note));
                }
            }
            (KeyCode::Char(c), _) => {
                if let Some(note) = key_to_note(c) {
                    let frequency = midi_note_to_frequency(note);
                    let mut engine = engine.lock().unwrap();
                    if held.remove(&note) {
                        engine.note_off(frequency);
                    } else if engine.note_on(frequency).is_ok() {
                        held.insert(note);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Snapshot of the engine state for the status bar.
struct StatusLine {
    algorithm: Option<Algorithm>,
    voices: usize,
    filter: crate::synth::FilterConfig,
    tremolo: bool,
    recording: bool,
}

fn next_algorithm(current: Option<Algorithm>) -> Algorithm {
    let all = Algorithm::all();
    match current {
        None => all[0],
        Some(algorithm) => {
            let index = all.iter().position(|a| *a == algorithm).unwrap_or(0);
            all[(index + 1) % all.len()]
        }
    }
}

fn draw_ui(f: &mut Frame, buffer: &SampleBuffer, status: &StatusLine) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Scope
            Constraint::Length(3), // Status
        ])
        .split(f.area());

    draw_scope(f, chunks[0], buffer);
    draw_status(f, chunks[1], status);
}

fn draw_scope(f: &mut Frame, area: Rect, buffer: &SampleBuffer) {
    let samples = buffer.recent(area.width as usize * 8);
    let scope = Scope::new(&samples)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Output "));
    f.render_widget(scope, area);
}

fn draw_status(f: &mut Frame, area: Rect, status: &StatusLine) {
    let algorithm = status
        .algorithm
        .map(|a| a.name())
        .unwrap_or("custom");
    let filter = format!(
        "{} {:.0} Hz",
        match status.filter.kind {
            crate::synth::FilterKind::LowPass => "lowpass",
            crate::synth::FilterKind::HighPass => "highpass",
        },
        status.filter.cutoff
    );

    let mut spans = vec![
        Span::raw("  algo: "),
        Span::styled(algorithm, Style::default().fg(Color::Green)),
        Span::raw(format!("  |  voices: {}", status.voices)),
        Span::raw(format!("  |  filter: {}", filter)),
        Span::raw(format!(
            "  |  tremolo: {}",
            if status.tremolo { "on" } else { "off" }
        )),
    ];
    if status.recording {
        spans.push(Span::styled("  |  REC", Style::default().fg(Color::Red)));
    }
    spans.push(Span::raw(
        "  |  a-k: notes  Tab: algo  space: all off  q: quit",
    ));

    let paragraph =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_buffer_returns_recent_in_order() {
        let mut buffer = SampleBuffer::new(8);
        for i in 0..10 {
            buffer.push(i as f32);
        }

        assert_eq!(buffer.recent(3), vec![7.0, 8.0, 9.0]);
        assert_eq!(
            buffer.recent(8),
            vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn recent_caps_at_capacity() {
        let mut buffer = SampleBuffer::new(4);
        buffer.push(1.0);
        assert_eq!(buffer.recent(100).len(), 4);
    }

    #[test]
    fn white_and_black_keys_map_to_one_octave() {
        assert_eq!(key_to_note('a'), Some(60));
        assert_eq!(key_to_note('h'), Some(69));
        assert_eq!(key_to_note('k'), Some(72));
        assert_eq!(key_to_note('w'), Some(61));
        assert_eq!(key_to_note('q'), None);
        assert_eq!(key_to_note(' '), None);
    }

    #[test]
    fn algorithm_cycle_visits_every_preset() {
        let mut current = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            let next = next_algorithm(current);
            seen.push(next);
            current = Some(next);
        }
        assert_eq!(seen, Algorithm::all().to_vec());
    }
}
