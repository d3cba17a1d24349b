// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use soundpad::config::{ConfigError, Soundpad};
use soundpad::keypad::KEY_COUNT;
use soundpad::soundbox::Soundbox;
use soundpad::util::{duration_seconds, filename_display};
use soundpad::xylophone::midi_to_frequency;
use soundpad::{audio, keypad};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=soundpad sound box

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/soundpad
ExecStart=/usr/local/bin/soundpad start --config "$SOUNDPAD_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=soundpad.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample player and xylophone for 16-key RGB keypads."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Start will run the sound box until it is killed.
    Start {
        /// The path to the config file. Compiled-in defaults are used without one.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
    /// Verify will check the config file and print what each key does.
    Verify {
        /// The path to the config file.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn load_config(path: Option<PathBuf>) -> Result<Soundpad, ConfigError> {
    match path {
        Some(path) => Soundpad::load(&path),
        None => Soundpad::from_yaml(""),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices.iter() {
                println!("- {}", device);
            }
        }
        Commands::Start { config } => {
            let config = load_config(config)?;
            let keypad = keypad::get_keypad(config.keypad())?;
            let device = audio::get_device(config.audio())?;

            let mut soundbox = Soundbox::new(&config, keypad, device)?;
            soundbox.run();
        }
        Commands::Verify { config } => {
            let config = load_config(config)?;
            let paths = config.audio().file_paths();
            let notes = config.xylophone().notes();

            println!(
                "Switch key: {} (short < {}, long >= {})",
                config.controls().switch_key(),
                duration_seconds(config.controls().short_press()?),
                duration_seconds(config.controls().long_press()?)
            );
            println!("Keys:");
            for (key, path) in paths.iter().enumerate().take(KEY_COUNT) {
                let sample = match path {
                    Some(path) if path.exists() => filename_display(path).to_string(),
                    Some(path) => format!("{} (missing)", path.display()),
                    None => "(none)".to_string(),
                };
                let note = match notes.get(key) {
                    Some(note) => format!("MIDI {} ({:.2}Hz)", note, midi_to_frequency(*note)),
                    None => "(none)".to_string(),
                };
                println!("- {:>2}: sample {}, note {}", key, sample, note);
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
