//! airpanel - air quality panel daemon
//!
//! Runs the appliance: four debounced buttons drive the settings menu on a
//! small text display, sensors are polled at the periods stored in the
//! shared sensor settings, and edits to those settings are picked up while
//! running. SIGINT/SIGTERM shut everything down in order.
//!
//! # Console keys
//!
//! With `--console`, the panel is painted to the terminal and keys are read
//! from stdin (one or more per line, then Enter):
//!
//! | Key | Action            |
//! |-----|-------------------|
//! | u   | Up                |
//! | d   | Down              |
//! | o   | Ok                |
//! | c   | Cancel            |
//! | C   | Long Cancel       |
//! | q   | Quit              |

#![deny(unsafe_code)]

mod console;
mod device;
mod menus;
mod signal;
mod simulated;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use crate::device::{Device, DeviceError, Settings};

/// Command line
#[derive(Parser, Debug)]
#[command(name = "airpanel", version, about = "Air quality panel daemon")]
struct Cli {
    /// Sensor settings file, shared with the collection services
    #[arg(long)]
    config: PathBuf,

    /// Panel settings file
    #[arg(long, default_value = "./display_config.toml")]
    display_config: PathBuf,

    /// Display rows (menu viewport height)
    #[arg(long, default_value_t = 4)]
    rows: usize,

    /// Display columns
    #[arg(long, default_value_t = 20)]
    cols: usize,

    /// Seconds between checks for edited settings files
    #[arg(long, default_value_t = 10)]
    watch_period: u64,

    /// Paint the panel to the terminal and read keys from stdin
    #[arg(long)]
    console: bool,

    /// Let the Reboot/Power off entries run systemctl
    #[arg(long)]
    allow_power: bool,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DeviceError> {
    info!("airpanel starting...");
    signal::install()?;

    let settings = Settings {
        config: cli.config,
        display_config: cli.display_config,
        rows: cli.rows,
        cols: cli.cols,
        watch_period: cli.watch_period,
        console: cli.console,
        allow_power: cli.allow_power,
    };
    let device = Device::new(&settings)?;
    if settings.console {
        console::spawn_input(device.gpio())?;
    }
    device.run(signal::stop_flag())?;
    info!("airpanel stopped");
    Ok(())
}
