//! # Selene Simulator Binary
//!
//! Simulates an interlocked selector/motor device (or one of the other
//! device kinds) and serves its fields on a stdin/stdout console.
//!
//! # Usage
//!
//! ```bash
//! # Selene device from the shipped configuration
//! selene_sim --config config/selene.toml
//!
//! # Override the device kind, no console
//! selene_sim --config config/pmac.toml --kind pmac --no-console
//!
//! # Verbose JSON logging
//! selene_sim --config config/selene.toml -v --json
//! ```

use clap::Parser;
use selene_common::config::SimConfig;
use selene_common::consts::DEFAULT_CONFIG_PATH;
use selene_sim::console::{self, Console};
use selene_sim::core::SimCore;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Selene Simulator - motion and interlock simulation for virtual devices
#[derive(Parser, Debug)]
#[command(name = "selene_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Motion and interlock simulator for virtual process-control devices")]
#[command(long_about = None)]
struct Args {
    /// Path to the simulator configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the device kind from the configuration (selene, pmac, gaspump).
    #[arg(short, long)]
    kind: Option<String>,

    /// Do not serve the stdin console
    #[arg(long)]
    no_console: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Simulator startup failed: {}", e);
        eprintln!("selene_sim: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = SimCore::load_config(&args.config)?;
    if let Some(kind) = &args.kind {
        config.device.kind = kind.clone();
    }

    setup_tracing(&args, &config);

    info!("Selene Simulator v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut core = SimCore::new(config)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let device = core.init()?;

    if args.no_console {
        info!("Console disabled");
    } else {
        let console = Console::new(device, core.running_flag());
        if let Err(e) = console::spawn_stdin(console) {
            warn!("Failed to start console: {}. Continuing without it.", e);
        }
    }

    if let Err(e) = core.run() {
        error!("Simulation loop error: {}", e);
    }

    core.shutdown();

    info!("Selene Simulator shutdown complete");
    Ok(())
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, config: &SimConfig) {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.shared.log_level.as_str()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
