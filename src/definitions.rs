//! Device definitions.
//!
//! Built-in definitions for the ESP32-C6 ORP sensor and loading of
//! additional definitions from a JSON file.

use crate::capability::{Access, CapabilityDescriptor};
use crate::error::{BridgeError, Result};
use crate::registry::{DeviceDefinition, DeviceRegistry};
use crate::reporting::ReportingPolicy;
use log::info;
use std::fs;
use std::path::Path;

pub const ORP_MODEL: &str = "esp32c6";
pub const ORP_VENDOR: &str = "ESPRESSIF";
pub const ORP_DESCRIPTION: &str = "ESP32-C6 ORP Sensor";

/// Capability name of the ORP measurement.
pub const ORP_CAPABILITY: &str = "orp";
/// Capability name of the ORP calibration offset.
pub const ORP_CALIBRATION_CAPABILITY: &str = "orp_calibration";

/// Analog Input cluster carrying both the measurement and the calibration.
pub const ANALOG_INPUT_CLUSTER: &str = "genAnalogInput";
/// Manufacturer-specific attribute holding the calibration offset.
pub const ORP_CALIBRATION_ATTRIBUTE: u16 = 0xF000;

/// Calibration offset limits in millivolts.
pub const ORP_CALIBRATION_MIN_MV: f64 = -500.0;
pub const ORP_CALIBRATION_MAX_MV: f64 = 500.0;

fn orp_measurement() -> CapabilityDescriptor {
    CapabilityDescriptor::new(ORP_CAPABILITY, ANALOG_INPUT_CLUSTER, "presentValue")
        .with_description("ORP measurement")
        .with_unit("mV")
        .with_precision(1)
        .with_access(Access::ReadOnly)
}

fn orp_device() -> DeviceDefinition {
    DeviceDefinition::new(ORP_MODEL)
        .with_zigbee_model(ORP_MODEL)
        .with_vendor(ORP_VENDOR)
        .with_description(ORP_DESCRIPTION)
}

/// ORP sensor exposing only the measurement, polled on demand.
pub fn orp_sensor_basic() -> DeviceDefinition {
    orp_device().with_capability(orp_measurement())
}

/// ORP sensor with periodic reporting and a writable calibration offset.
///
/// Reports at most once per second, at least every 10 seconds, and in
/// between whenever the reading moved by 1 mV.
pub fn orp_sensor() -> DeviceDefinition {
    orp_device()
        .with_capability(orp_measurement().with_reporting(ReportingPolicy::new(1, 10, 1.0)))
        .with_capability(
            CapabilityDescriptor::new(
                ORP_CALIBRATION_CAPABILITY,
                ANALOG_INPUT_CLUSTER,
                ORP_CALIBRATION_ATTRIBUTE,
            )
            .with_description("ORP calibration offset")
            .with_unit("mV")
            .with_precision(0)
            .with_access(Access::ReadWrite)
            .with_range(ORP_CALIBRATION_MIN_MV, ORP_CALIBRATION_MAX_MV),
        )
}

/// Parse a JSON array of device definitions.
pub fn parse_definitions(json: &str) -> Result<Vec<DeviceDefinition>> {
    Ok(serde_json::from_str(json)?)
}

/// Load device definitions from a JSON file.
pub fn load_definitions(path: &Path) -> Result<Vec<DeviceDefinition>> {
    let content = fs::read_to_string(path).map_err(|source| BridgeError::DefinitionsLoad {
        path: path.display().to_string(),
        source,
    })?;
    let definitions = parse_definitions(&content)?;
    info!(
        "[Definitions] Loaded {} definition(s) from {}",
        definitions.len(),
        path.display()
    );
    Ok(definitions)
}

/// Build a registry from the built-in ORP definition plus an optional
/// definitions file. File definitions are registered after the built-in
/// one, so a file cannot silently replace it.
pub fn build_registry(definitions_path: Option<&Path>) -> Result<DeviceRegistry> {
    let mut registry = DeviceRegistry::new();
    registry.register_definition(orp_sensor())?;

    if let Some(path) = definitions_path {
        for definition in load_definitions(path)? {
            registry.register_definition(definition)?;
        }
    }

    Ok(registry)
}
