//! sil-atmos — periodic atmospheric telemetry agent
//!
//! Streams one CSV record per poll interval to stdout:
//!
//! ```text
//! <unixTimestamp>,<temperatureC>,<relativeHumidityPct>,<pressureHPa>,<altitudeM>,<vocIndex>
//! ```
//!
//! Logs and the optional debug echo go to stderr, so stdout stays a clean
//! record stream.
//!
//! ## Environment Variables
//! - `SIL_ATMOS_POLL_FREQUENCY`: Poll interval in seconds (default: 1)
//! - `SIL_ATMOS_SEA_LEVEL_HPA`: Sea-level reference pressure (default: 1017.60)
//! - `RUST_LOG`: Log filter (default: sil_atmos=info,sil_atmosphere=info)

use anyhow::Context;
use clap::{ArgAction, Parser};
use colored::*;
use sil_atmosphere::types::DEFAULT_SEA_LEVEL_PRESSURE_HPA;
use sil_atmosphere::{
    AgentConfig, AtmosphereError, AtmosphereResult, LoopSummary, RecordEmitter, RecordFormat,
    SamplingLoop, SensorPort, SimulatedSensor, SystemClock,
};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sil-atmos")]
#[command(author = "Silvano Neto <dev@silvanoneto.com>")]
#[command(version = "2026.1.16")]
#[command(about = "Periodic BME280/SGP40 telemetry agent", long_about = None)]
struct Args {
    /// Poll interval in seconds
    #[arg(long, default_value_t = 1, env = "SIL_ATMOS_POLL_FREQUENCY")]
    poll_frequency: u64,

    /// Echo each reading in human-readable form on stderr
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    debug_print: bool,

    /// Sea-level reference pressure in hPa (used for altitude)
    #[arg(long, default_value_t = DEFAULT_SEA_LEVEL_PRESSURE_HPA, env = "SIL_ATMOS_SEA_LEVEL_HPA")]
    sea_level_pressure: f32,

    /// Record format: csv or json
    #[arg(long, default_value = "csv")]
    format: RecordFormat,

    /// Stop after emitting this many records
    #[arg(long, value_name = "N")]
    count: Option<u64>,

    /// Use the built-in simulated sensor instead of hardware
    #[arg(long, default_value_t = false)]
    simulate: bool,

    /// I2C bus number (/dev/i2c-N)
    #[arg(long, default_value_t = 1)]
    i2c_bus: u8,
}

impl Args {
    fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            poll_interval_secs: self.poll_frequency,
            sea_level_pressure_hpa: self.sea_level_pressure,
            debug_echo: self.debug_print,
            format: self.format,
            max_records: self.count,
            ..Default::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug_print);

    ExitCode::from(exit_status(run(args).await))
}

/// Process exit status; failures are reported on stderr
fn exit_status(result: anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            1
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "sil_atmos=debug,sil_atmosphere=debug"
    } else {
        "sil_atmos=info,sil_atmosphere=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.agent_config();
    config.validate()?;

    if args.simulate {
        tracing::info!("using simulated sensor");
        return run_agent(&config, SimulatedSensor::new()).await;
    }

    let sensor = open_hardware(args.i2c_bus)?;
    run_agent(&config, sensor).await
}

#[cfg(feature = "rpi")]
fn open_hardware(bus: u8) -> anyhow::Result<Box<dyn SensorPort>> {
    let sensor = sil_atmosphere::RpiAtmosphericSensor::open(bus)
        .with_context(|| format!("initializing sensors on /dev/i2c-{bus}"))?;
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "rpi"))]
fn open_hardware(_bus: u8) -> anyhow::Result<Box<dyn SensorPort>> {
    anyhow::bail!("hardware support not compiled in (rebuild with --features rpi, or pass --simulate)")
}

async fn run_agent<S: SensorPort>(config: &AgentConfig, sensor: S) -> anyhow::Result<()> {
    tracing::info!(
        poll_interval_secs = config.poll_interval_secs,
        sea_level_hpa = config.sea_level_pressure_hpa,
        format = ?config.format,
        "sil-atmos starting"
    );

    let emitter = RecordEmitter::stdio(config.format, config.debug_echo);
    let mut sampler = SamplingLoop::new(config, sensor, SystemClock, emitter)?;

    loop_outcome(sampler.run(shutdown_signal()).await)
}

fn loop_outcome(result: AtmosphereResult<LoopSummary>) -> anyhow::Result<()> {
    match result {
        Ok(summary) => {
            tracing::info!(
                records = summary.records_emitted,
                retries = summary.retries,
                missed_ticks = summary.missed_ticks,
                "sil-atmos stopped"
            );
            Ok(())
        }
        Err(err @ AtmosphereError::SensorRead(_)) => {
            Err(err).context("unrecoverable sensor error, stopping")
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
