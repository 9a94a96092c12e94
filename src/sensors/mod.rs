//! Sensor state shared between input sources and reporting.
//!
//! Sensors are updated from an input source (hardware samples, simulation)
//! and read by whoever publishes their values upstream.

pub mod orp_sensor;

pub use orp_sensor::OrpSensor;

/// Trait for sensors with change detection.
///
/// The version number is incremented each time the sensor value changes,
/// so readers can tell whether anything happened since they last looked.
pub trait Sensor: Send + Sync {
    /// Get the current version number.
    fn version(&self) -> u32;
}
