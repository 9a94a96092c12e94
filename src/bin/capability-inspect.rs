//! Inspect registered device definitions.
//!
//! Usage:
//!   cargo run --bin capability-inspect -- list
//!   cargo run --bin capability-inspect -- show esp32c6 --access read_write
//!   cargo run --bin capability-inspect -- write esp32c6 orp_calibration -- -12.6
//!   cargo run --bin capability-inspect -- report esp32c6 orp --previous 100 --current 100.5 --elapsed 5
//!
//! Definitions are the built-in ones plus the file given by `--definitions`
//! (or `DEFINITIONS_PATH`). Results are printed as JSON.

use capability_bridge::capability::Access;
use capability_bridge::definitions::build_registry;
use capability_bridge::error::{BridgeError, ConfigError, Result, WriteError};
use capability_bridge::registry::{DeviceRegistry, RegisteredDevice};
use capability_bridge::reporting::should_report;
use clap::{Parser, Subcommand};
use log::error;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "capability-inspect", about = "Inspect device capability definitions")]
struct Cli {
    /// Additional JSON definitions file
    #[arg(long, env = "DEFINITIONS_PATH")]
    definitions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered device models
    List,
    /// Print the definition of a device model
    Show {
        model: String,
        /// Only show capabilities with this access (e.g. read_only, STATE_SET)
        #[arg(long)]
        access: Option<Access>,
    },
    /// Evaluate an external write without applying it
    Write {
        model: String,
        capability: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Decide whether a value change would be reported
    Report {
        model: String,
        capability: String,
        #[arg(long, allow_negative_numbers = true)]
        previous: f64,
        #[arg(long, allow_negative_numbers = true)]
        current: f64,
        /// Seconds since the previous report
        #[arg(long)]
        elapsed: f64,
    },
}

fn main() {
    capability_bridge::config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = build_registry(cli.definitions.as_deref())?;

    let output = match cli.command {
        Command::List => {
            let models: Vec<_> = registry
                .models()
                .filter_map(|model| registry.device(model))
                .map(|device| {
                    json!({
                        "model": device.model(),
                        "zigbee_models": device.zigbee_models(),
                        "vendor": device.vendor(),
                        "description": device.description(),
                        "capabilities": device.capabilities().len(),
                    })
                })
                .collect();
            json!(models)
        }
        Command::Show { model, access } => {
            let device = lookup(&registry, &model)?;
            let mut definition = device.to_definition();
            if let Some(access) = access {
                definition
                    .capabilities
                    .retain(|descriptor| descriptor.access() == access);
            }
            serde_json::to_value(definition)?
        }
        Command::Write {
            model,
            capability,
            value,
        } => {
            let device = lookup(&registry, &model)?;
            let accepted = registry.evaluate_write(device.model(), &capability, value)?;
            json!({
                "model": device.model(),
                "capability": capability,
                "proposed": value,
                "accepted": accepted,
            })
        }
        Command::Report {
            model,
            capability,
            previous,
            current,
            elapsed,
        } => {
            let device = lookup(&registry, &model)?;
            let descriptor =
                device
                    .capability(&capability)
                    .ok_or_else(|| WriteError::UnknownCapability {
                        model: device.model().to_string(),
                        name: capability.clone(),
                    })?;
            let elapsed = Duration::try_from_secs_f64(elapsed)
                .map_err(|e| BridgeError::InvalidArgument(format!("elapsed: {}", e)))?;
            json!({
                "model": device.model(),
                "capability": capability,
                "reporting": descriptor.reporting(),
                "report": should_report(descriptor, previous, current, elapsed),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Resolve a model by name or by the identifier the device reports.
fn lookup<'a>(
    registry: &'a DeviceRegistry,
    model: &str,
) -> Result<&'a RegisteredDevice> {
    registry
        .device(model)
        .or_else(|| registry.find_by_zigbee_model(model))
        .ok_or_else(|| ConfigError::UnknownModel(model.to_string()).into())
}
