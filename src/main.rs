//! Pan/tilt servo tuner: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Console (stdin/stdout)                                  │
//! │        │ AppCommand                                      │
//! │        ▼                                                 │
//! │  MotionController ── motion-loop thread (update_hz) ──┐  │
//! │        │                                              │  │
//! │  ───────────── PwmBackend / PwmChannel ports ──────── │  │
//! │        ▼                                              ▼  │
//! │  SysfsBackend (/sys/class/pwm)   or   SimBackend         │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use pantilt::adapters::console::Console;
use pantilt::app::ports::PwmBackend;
use pantilt::app::service::MotionController;
use pantilt::config::TunerConfig;
use pantilt::drivers::sim_pwm::SimBackend;
use pantilt::drivers::sysfs_pwm::SysfsBackend;

/// Interactive tuner for a pan/tilt servo pair on hardware PWM.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drive in-memory PWM channels instead of /sys/class/pwm
    #[arg(long)]
    simulate: bool,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<LevelFilter>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_level);

    let config = load_config(args.config.as_deref())?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    config.validate().context("invalid configuration")?;

    info!("pantilt v{}", env!("CARGO_PKG_VERSION"));

    let mut backend: Box<dyn PwmBackend> = if args.simulate {
        info!("using simulated PWM outputs");
        Box::new(SimBackend::new())
    } else {
        Box::new(SysfsBackend::new(&config.sysfs_root))
    };
    let controller =
        MotionController::new(&config, backend.as_mut()).context("starting motion controller")?;

    let status = controller.status();
    if !status.pan.connected && !status.tilt.connected {
        warn!(
            "no PWM output acquired under {}; commands only update bookkeeping \
             (enable the PWM overlay, or run with --simulate)",
            config.sysfs_root.display()
        );
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    Console::new(&controller, config.sweep, stdin.lock(), stdout.lock())
        .run()
        .context("console I/O")?;
    Ok(())
}

fn init_logger(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

fn load_config(path: Option<&Path>) -> Result<TunerConfig> {
    let Some(path) = path else {
        return Ok(TunerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = TunerConfig::from_json(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("loaded config from {}", path.display());
    Ok(config)
}
