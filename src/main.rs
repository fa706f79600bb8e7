//! wavetrace - inspect, visualize, and play audio files from the terminal.
//!
//! The binary is a thin shell over the library:
//!
//! 1. **info / waveform**: decode a file, report its format and duration, and
//!    draw its amplitude envelope with a time ruler. Both can emit JSON.
//!
//! 2. **play** (optional `player` feature): a keyboard-driven player with a
//!    progress bar, pause/resume, and seeking.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;
use std::path::PathBuf;

use wavetrace::config::{CONFIG_KEYS, Config};
use wavetrace::utils::logging::init_logging;

mod cli;

#[derive(Parser)]
#[command(name = "wavetrace")]
#[command(about = "Inspect, visualize, and play WAV, AIFF, AU, and MP3 files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show format and duration of an audio file
    Info {
        /// Audio file to inspect
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draw the amplitude envelope and time ruler of an audio file
    Waveform {
        /// Audio file to draw
        file: PathBuf,
        /// Width in columns (default 80)
        #[arg(short, long)]
        width: Option<usize>,
        /// Print envelope points and ticks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play an audio file
    Play {
        /// Audio file to play
        file: PathBuf,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new(CONFIG_KEYS))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, Commands::Play { .. });
    if let Err(e) = Config::load().and_then(|config| init_logging(&config, interactive)) {
        eprintln!("Warning: logging disabled: {e}");
    }

    match cli.command {
        Commands::Info { file, json } => {
            cli::info::handle_info(&file, json)?;
        }
        Commands::Waveform { file, width, json } => {
            cli::waveform::handle_waveform(&file, width, json)?;
        }
        Commands::Play { file } => {
            cli::play::handle_play(&file)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
    }

    Ok(())
}
