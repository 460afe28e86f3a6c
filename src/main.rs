//! Carrier - polyphonic FM synthesizer

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};

use carrier::config;
use carrier::engine::{
    default_port_name, list_midi_ports, midi_note_to_frequency, next_recording_path, Engine,
    MidiListener, Player, Recorder, Tap,
};
use carrier::synth::{silent_block, BLOCK_SIZE};
use carrier::viz::{self, SampleBuffer};

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            midi,
            port,
            record,
            no_ui,
        } => play(config_path, midi || port.is_some(), port, record, no_ui)?,

        Commands::Record {
            config: config_path,
            output,
            duration,
            notes,
        } => record(config_path, output, duration, &notes)?,

        Commands::Devices => devices(),

        Commands::Ports => {
            println!("Available MIDI input ports:\n");
            match list_midi_ports() {
                Ok(ports) if ports.is_empty() => println!("  (none)"),
                Ok(ports) => {
                    for name in ports {
                        println!("  - {}", name);
                    }
                }
                Err(e) => println!("  Error listing ports: {}", e),
            }
            if let Some(default) = default_port_name() {
                println!("\nDefault port: {}", default);
            }
        }

        Commands::Check {
            config: config_path,
        } => check(&config_path),

        Commands::Init => {
            let example_config = include_str!("../carrier.example.yaml");

            let path = "carrier.yaml";
            if std::path::Path::new(path).exists() {
                println!("carrier.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created carrier.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

fn play(
    config_path: PathBuf,
    midi: bool,
    port: Option<String>,
    record: bool,
    no_ui: bool,
) -> Result<()> {
    println!("Loading configuration from {:?}...", config_path);
    let cfg = config::load_config(&config_path)?;

    let engine = Arc::new(Mutex::new(Engine::new(cfg)?));
    let sample_buffer = Arc::new(Mutex::new(SampleBuffer::new(8192)));
    let tap = record.then(|| {
        let tap = Arc::new(Tap::new());
        tap.arm();
        tap
    });

    let mut player = Player::new();
    player.start_with_monitor(engine.clone(), Some(sample_buffer.clone()), tap.clone())?;

    let midi_listener = if midi {
        match MidiListener::connect(port.as_deref(), engine.clone()) {
            Ok(listener) => {
                println!("MIDI input connected to: {}", listener.port_name());
                Some(listener)
            }
            Err(e) => {
                println!("MIDI unavailable ({}); keyboard input only.", e);
                None
            }
        }
    } else {
        None
    };

    if no_ui {
        println!("Playing. Press Ctrl-C to stop.");
        let running = Arc::new(AtomicBool::new(true));
        let handler_flag = running.clone();
        ctrlc::set_handler(move || {
            handler_flag.store(false, Ordering::SeqCst);
        })?;
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    } else {
        viz::run_ui(engine.clone(), sample_buffer, tap.clone())?;
    }

    player.stop();
    drop(midi_listener);

    if let Some(tap) = tap {
        tap.disarm();
        let frames = tap.drain();
        if frames.is_empty() {
            println!("Nothing recorded.");
        } else {
            let sample_rate = engine.lock().unwrap().sample_rate() as u32;
            let path = next_recording_path(&PathBuf::from("recordings"))?;
            let mut recorder = Recorder::new(&path, sample_rate)?;
            recorder.write_buffer(&frames)?;
            recorder.finalize()?;
            println!(
                "Recorded {:.1}s to {:?}",
                frames.len() as f64 / sample_rate as f64,
                path
            );
        }
    }

    Ok(())
}

fn record(
    config_path: PathBuf,
    output: Option<PathBuf>,
    duration: u64,
    notes: &[u8],
) -> Result<()> {
    println!("Loading configuration from {:?}...", config_path);
    let cfg = config::load_config(&config_path)?;

    let mut engine = Engine::new(cfg)?;
    let sample_rate = engine.sample_rate() as u32;

    let path = match output {
        Some(path) => path,
        None => next_recording_path(&PathBuf::from("recordings"))?,
    };
    println!("Rendering {}s to {:?}...", duration, path);

    let frequencies: Vec<f64> = notes.iter().map(|&n| midi_note_to_frequency(n)).collect();
    for &frequency in &frequencies {
        engine.note_on(frequency)?;
    }

    let total_samples = sample_rate as u64 * duration;
    // Release the chord at 80% so the tails land inside the file.
    let release_at = total_samples * 4 / 5;

    let mut recorder = Recorder::new(&path, sample_rate)?;
    let mut block = silent_block();
    let mut written = 0u64;
    let mut released = false;

    while written < total_samples {
        if !released && written >= release_at {
            for &frequency in &frequencies {
                engine.note_off(frequency);
            }
            released = true;
        }

        engine.next_block(&mut block);
        let remaining = ((total_samples - written) as usize).min(BLOCK_SIZE);
        if remaining == BLOCK_SIZE {
            recorder.write_block(&block)?;
        } else {
            let tail: Vec<f32> = block[..remaining].iter().map(|&s| s as f32).collect();
            recorder.write_buffer(&tail)?;
        }
        written += remaining as u64;

        if written % (sample_rate as u64) < BLOCK_SIZE as u64 {
            print!("\r  Progress: {}s / {}s", written / sample_rate as u64, duration);
            std::io::stdout().flush()?;
        }
    }

    recorder.finalize()?;
    println!("\nRecorded to {:?}", path);
    Ok(())
}

fn devices() {
    println!("Available audio devices:\n");

    let host = cpal::default_host();

    if let Some(device) = host.default_output_device() {
        println!("Default output: {}", device.name().unwrap_or_default());
        if let Ok(config) = device.default_output_config() {
            println!(
                "  Sample rate: {} Hz, Channels: {}",
                config.sample_rate().0,
                config.channels()
            );
        }
        println!();
    }

    println!("Output devices:");
    match host.output_devices() {
        Ok(devices) => {
            for device in devices {
                let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                print!("  - {}", name);

                if let Ok(config) = device.default_output_config() {
                    print!(
                        " ({} Hz, {} ch)",
                        config.sample_rate().0,
                        config.channels()
                    );
                }
                println!();
            }
        }
        Err(e) => {
            println!("  Error listing devices: {}", e);
        }
    }
}

fn check(config_path: &PathBuf) {
    println!("Checking configuration at {:?}...", config_path);

    match config::load_config(config_path) {
        Ok(cfg) => {
            println!("Configuration is valid!");
            println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
            println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
            println!("  Max voices: {}", cfg.master.max_voices);
            println!(
                "  Algorithm: {}",
                cfg.algorithm.map(|a| a.name()).unwrap_or("custom")
            );
            println!("  Oscillators: {}", cfg.oscillators.len());
            for (i, osc) in cfg.oscillators.iter().enumerate() {
                println!(
                    "    {}: {:?} ratio {:.2} amp {:.2}{}{}",
                    i,
                    osc.waveform,
                    osc.frequency_ratio,
                    osc.amplitude,
                    if osc.fixed_frequency { " [fixed]" } else { "" },
                    if osc.disabled { " [disabled]" } else { "" },
                );
            }
            println!(
                "  Tremolo: {}",
                if cfg.tremolo.is_some() { "on" } else { "off" }
            );
        }
        Err(e) => {
            println!("Configuration is invalid: {}", e);
            std::process::exit(1);
        }
    }
}
