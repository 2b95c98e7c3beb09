//! Command-line host for Rinnai water heaters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rinnai_heater::{
    setup_entry, Entity, EntitySnapshot, HeaterConfig, HeaterEntry, SnapshotSink,
};
use tracing::{info, warn};

/// Rinnai water heater client - poll and control a heater on the LAN.
#[derive(Parser, Debug)]
#[command(name = "rinnai")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Heater host or IP address.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Display name.
    #[arg(long, global = true)]
    name: Option<String>,

    /// Poll interval in seconds.
    #[arg(long, global = true)]
    scan_interval: Option<f64>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    request_timeout: Option<f64>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the heater and print entity snapshots until Ctrl-C.
    Watch,
    /// Run one refresh cycle and print the raw device state.
    Status,
    /// Run one refresh cycle and print every entity snapshot.
    Entities,
    /// Raise the target temperature one step.
    Inc,
    /// Lower the target temperature one step.
    Dec,
    /// Toggle power.
    Toggle,
    /// Step the target temperature to the nearest supported value.
    SetTemperature {
        /// Target in °C.
        celsius: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    match args.command {
        Command::Watch => watch(config).await,
        Command::Status => status(config).await,
        Command::Entities => entities(config).await,
        Command::Inc => {
            let entry = setup_entry(config).await?;
            entry.heater().inc().await?;
            print_state(&entry)
        }
        Command::Dec => {
            let entry = setup_entry(config).await?;
            entry.heater().dec().await?;
            print_state(&entry)
        }
        Command::Toggle => {
            let entry = setup_entry(config).await?;
            entry.heater().lig().await?;
            print_state(&entry)
        }
        Command::SetTemperature { celsius } => set_temperature(config, celsius).await,
    }
}

fn init_logging(verbose: bool) {
    // JSON logs for containers and log shippers
    let json_logging = std::env::var("RINNAI_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose {
        "rinnai=debug,rinnai_heater=debug"
    } else {
        "rinnai=info,rinnai_heater=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Defaults, then config file, then `RINNAI_*` environment, then flags.
fn load_config(args: &Args) -> Result<HeaterConfig> {
    let config = match &args.config {
        Some(path) => HeaterConfig::load(path)?,
        None => HeaterConfig::default(),
    };
    let mut config = config.with_env_overrides()?;

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(seconds) = args.scan_interval {
        config.scan_interval = seconds;
    }
    if let Some(seconds) = args.request_timeout {
        config.request_timeout = seconds;
    }

    config
        .validate()
        .context("set --host, RINNAI_HOST or `host` in the config file")?;
    Ok(config)
}

async fn watch(config: HeaterConfig) -> Result<()> {
    let mut entry = setup_entry(config).await?;
    info!(
        serial = %entry.unique_id(),
        entities = entry.entities().len(),
        "Watching {}",
        entry.title()
    );

    let sink: SnapshotSink = Arc::new(|snapshot: &EntitySnapshot| {
        println!("{}", serde_json::to_string(snapshot)?);
        Ok(())
    });
    entry.attach(sink)?;

    // first cycle now rather than one period from now
    let report = entry.heater().refresh().await;
    if !report.is_complete() {
        warn!(failed = ?report.failed, "Initial refresh incomplete");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    entry.unload();
    Ok(())
}

async fn status(config: HeaterConfig) -> Result<()> {
    let entry = setup_entry(config).await?;
    let report = entry.heater().refresh().await;
    for (endpoint, error) in &report.failed {
        warn!(endpoint = %endpoint, "{}", error);
    }
    print_state(&entry)
}

async fn entities(config: HeaterConfig) -> Result<()> {
    let entry = setup_entry(config).await?;
    entry.heater().refresh().await;
    let snapshots: Vec<EntitySnapshot> = entry.entities().iter().map(Entity::snapshot).collect();
    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}

async fn set_temperature(config: HeaterConfig, celsius: f64) -> Result<()> {
    let entry = setup_entry(config).await?;
    // the target code only comes with the display response
    entry.heater().tela().await?;

    let water_heater = entry
        .entities()
        .iter()
        .find_map(|e| match e {
            Entity::WaterHeater(w) => Some(w),
            _ => None,
        })
        .context("No water heater entity")?;

    let steps = water_heater.set_temperature(celsius).await?;
    info!(steps, "Target temperature set to {} °C", celsius);
    print_state(&entry)
}

fn print_state(entry: &HeaterEntry) -> Result<()> {
    let state = entry.heater().state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_temperature() {
        let args = Args::try_parse_from([
            "rinnai",
            "set-temperature",
            "42",
            "--host",
            "10.0.0.5",
            "--scan-interval",
            "30",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::SetTemperature { celsius } if celsius == 42.0));
        assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.scan_interval, Some(30.0));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heater.toml");
        std::fs::write(&path, "host = \"10.0.0.1\"\nname = \"Loft\"\n").unwrap();

        let args = Args::try_parse_from([
            "rinnai".to_string(),
            "status".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--host".to_string(),
            "10.0.0.2".to_string(),
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.name, "Loft");
    }
}
