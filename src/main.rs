use capability_bridge::config::{self, Config};
use capability_bridge::definitions::{ORP_CALIBRATION_CAPABILITY, ORP_CAPABILITY, build_registry};
use capability_bridge::input::{ProbeSimulator, run_orp_simulation};
use capability_bridge::reporting::Exposure;
use capability_bridge::sensors::OrpSensor;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();
    info!("Starting Capability Bridge");

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Device Model: {}", config.device.model);
    match &config.device.definitions_path {
        Some(path) => info!("  Definitions: {}", path.display()),
        None => info!("  Definitions: built-in only"),
    }
    info!("  Update Interval: {}s", config.sensor.update_interval_secs);
    info!(
        "  Range: {}-{} mV, Calibration offset: {} mV",
        config.sensor.min_value_mv, config.sensor.max_value_mv, config.sensor.calibration_mv
    );

    // All registration happens here; afterwards the registry is only read
    let registry = match build_registry(config.device.definitions_path.as_deref()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to register device definitions: {}", e);
            std::process::exit(1);
        }
    };

    let Some(device) = registry
        .device(&config.device.model)
        .or_else(|| registry.find_by_zigbee_model(&config.device.model))
    else {
        error!("Unknown device model: {}", config.device.model);
        std::process::exit(1);
    };

    info!(
        "Device: {} ({} {})",
        device.model(),
        device.vendor().unwrap_or("unknown vendor"),
        device.description().unwrap_or("")
    );
    for descriptor in device.capabilities() {
        info!(
            "  - {} [{}/{}] {} {}",
            descriptor.name(),
            descriptor.cluster(),
            descriptor.attribute(),
            descriptor.access(),
            descriptor.unit().unwrap_or("")
        );
    }

    let Some(orp) = device.capability(ORP_CAPABILITY).cloned() else {
        error!(
            "Device model {} exposes no '{}' capability",
            device.model(),
            ORP_CAPABILITY
        );
        std::process::exit(1);
    };

    let sensor = Arc::new(OrpSensor::new(
        config.sensor.min_value_mv,
        config.sensor.max_value_mv,
    ));

    // Initial calibration goes through the same path as external writes
    if config.sensor.calibration_mv != 0 {
        match device.capability(ORP_CALIBRATION_CAPABILITY) {
            Some(descriptor) => {
                if let Err(e) =
                    sensor.write_calibration(descriptor, config.sensor.calibration_mv as f64)
                {
                    warn!("Ignoring configured calibration: {}", e);
                }
            }
            None => warn!(
                "Device model {} has no '{}' capability, calibration ignored",
                device.model(),
                ORP_CALIBRATION_CAPABILITY
            ),
        }
    }

    let exposure = Arc::new(Exposure::new(orp));
    let unit = exposure.descriptor().unit().unwrap_or("").to_string();
    let simulation = run_orp_simulation(
        sensor.clone(),
        exposure.clone(),
        ProbeSimulator::new(&config.simulation, config.sensor.samples_per_reading),
        Duration::from_secs(config.sensor.update_interval_secs),
        move |value| info!("[Report] {} = {} {}", ORP_CAPABILITY, value, unit),
    );

    #[cfg(unix)]
    let report_task = spawn_report_on_signal(sensor.clone(), exposure.clone());

    info!("Capability Bridge is running");
    info!("  - Send SIGUSR1 to force an ORP report");
    info!("  - Press Ctrl+C to exit");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    simulation.abort();
    #[cfg(unix)]
    report_task.abort();

    info!("Capability Bridge stopped");
}

/// Force a report of the current reading on every SIGUSR1.
#[cfg(unix)]
fn spawn_report_on_signal(
    sensor: Arc<OrpSensor>,
    exposure: Arc<Exposure>,
) -> tokio::task::JoinHandle<()> {
    use tokio::signal::unix::{SignalKind, signal as unix_signal};

    tokio::spawn(async move {
        let mut stream = match unix_signal(SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to listen for SIGUSR1: {}", e);
                return;
            }
        };
        while stream.recv().await.is_some() {
            let value = sensor.get_millivolts() as f64;
            exposure.force_report(value);
            info!(
                "[Report] {} = {} (on demand)",
                exposure.descriptor().name(),
                value
            );
        }
    })
}
