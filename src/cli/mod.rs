//! CLI interface for Carrier

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Polyphonic FM synthesizer with routable operators
#[derive(Parser)]
#[command(name = "carrier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play live: audio output, terminal monitor, MIDI and keyboard input
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "carrier.yaml")]
        config: PathBuf,

        /// Connect MIDI input (optionally a port name substring)
        #[arg(short, long)]
        midi: bool,

        /// MIDI input port name substring (implies --midi)
        #[arg(short, long)]
        port: Option<String>,

        /// Capture the session to recordings/carrier_NNN.wav on exit
        #[arg(short, long)]
        record: bool,

        /// Run without the terminal monitor (Ctrl-C to stop)
        #[arg(long)]
        no_ui: bool,
    },

    /// Render a chord offline to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "carrier.yaml")]
        config: PathBuf,

        /// Output file path (default: recordings/carrier_NNN.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// MIDI notes to play, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "60,64,67")]
        notes: Vec<u8>,
    },

    /// List available audio output devices
    Devices,

    /// List available MIDI input ports
    Ports,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "carrier.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
