//! Oxidation-reduction potential (ORP) probe.
//!
//! The probe is read through a 12-bit ADC. A reading averages a batch of
//! raw samples, applies the calibration offset and clamps the result to the
//! configured measurement range. Values are in millivolts.

use super::Sensor;
use crate::capability::CapabilityDescriptor;
use crate::definitions::{ORP_CALIBRATION_MAX_MV, ORP_CALIBRATION_MIN_MV};
use crate::error::WriteError;
use log::{info, warn};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// ADC reference voltage in millivolts.
pub const ADC_REFERENCE_MV: i32 = 3300;
/// Largest raw value of the 12-bit ADC.
pub const ADC_MAX_RAW: i32 = 4095;

/// Convert a raw ADC sample to millivolts (uncalibrated linear scale).
pub fn raw_to_millivolts(raw: u16) -> i32 {
    let raw = (raw as i32).min(ADC_MAX_RAW);
    raw * ADC_REFERENCE_MV / ADC_MAX_RAW
}

/// ORP sensor that can be updated from external sources.
pub struct OrpSensor {
    /// Last reading in millivolts, calibrated and clamped
    value_mv: AtomicI32,
    /// Calibration offset in millivolts
    calibration_mv: AtomicI32,
    /// Version counter for change detection
    version: AtomicU32,
    min_value_mv: i32,
    max_value_mv: i32,
}

impl OrpSensor {
    /// Create a sensor measuring within `[min_value_mv, max_value_mv]`.
    ///
    /// The initial reading is the lower bound. Inverted bounds are swapped.
    pub fn new(min_value_mv: i32, max_value_mv: i32) -> Self {
        let (min_value_mv, max_value_mv) = if min_value_mv <= max_value_mv {
            (min_value_mv, max_value_mv)
        } else {
            warn!(
                "[ORP] Inverted measurement range {}-{} mV, using {}-{} mV",
                min_value_mv, max_value_mv, max_value_mv, min_value_mv
            );
            (max_value_mv, min_value_mv)
        };
        Self {
            value_mv: AtomicI32::new(min_value_mv),
            calibration_mv: AtomicI32::new(0),
            version: AtomicU32::new(0),
            min_value_mv,
            max_value_mv,
        }
    }

    /// Get the current reading in millivolts.
    pub fn get_millivolts(&self) -> i32 {
        self.value_mv.load(Ordering::SeqCst)
    }

    pub fn calibration_mv(&self) -> i32 {
        self.calibration_mv.load(Ordering::SeqCst)
    }

    /// Store a reading, clamped to the measurement range. Increments the
    /// version if the stored value changed. Returns the stored value.
    pub fn set_millivolts(&self, millivolts: i32) -> i32 {
        let clamped = millivolts.clamp(self.min_value_mv, self.max_value_mv);
        let old = self.value_mv.swap(clamped, Ordering::SeqCst);
        if old != clamped {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        clamped
    }

    /// Average a batch of raw ADC samples into a new reading.
    ///
    /// Returns `None` (and leaves the reading untouched) for an empty batch.
    pub fn update_from_samples(&self, samples: &[u16]) -> Option<i32> {
        if samples.is_empty() {
            return None;
        }
        let sum: i64 = samples.iter().map(|&raw| raw_to_millivolts(raw) as i64).sum();
        let average = (sum / samples.len() as i64) as i32;
        Some(self.set_millivolts(average + self.calibration_mv()))
    }

    /// Set the calibration offset. Takes effect with the next reading.
    pub fn set_calibration(&self, offset_mv: i32) -> Result<(), WriteError> {
        let (min, max) = (ORP_CALIBRATION_MIN_MV as i32, ORP_CALIBRATION_MAX_MV as i32);
        if !(min..=max).contains(&offset_mv) {
            return Err(WriteError::OutOfRange {
                name: "orp_calibration".to_string(),
                value: offset_mv as f64,
                min: min as f64,
                max: max as f64,
            });
        }
        self.calibration_mv.store(offset_mv, Ordering::SeqCst);
        info!("[ORP] Calibration set to: {} mV", offset_mv);
        Ok(())
    }

    /// Apply an external calibration write through its descriptor.
    ///
    /// The descriptor decides access, range and rounding; the accepted
    /// value becomes the new offset.
    pub fn write_calibration(
        &self,
        descriptor: &CapabilityDescriptor,
        proposed: f64,
    ) -> Result<i32, WriteError> {
        let accepted = descriptor.evaluate_write(proposed)?;
        let offset = accepted.round() as i32;
        self.set_calibration(offset)?;
        Ok(offset)
    }
}

impl Sensor for OrpSensor {
    fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{ORP_CALIBRATION_CAPABILITY, ORP_CAPABILITY, orp_sensor};

    fn descriptor(name: &str) -> CapabilityDescriptor {
        orp_sensor()
            .capabilities
            .into_iter()
            .find(|descriptor| descriptor.name() == name)
            .unwrap()
    }

    #[test]
    fn test_raw_conversion() {
        assert_eq!(raw_to_millivolts(0), 0);
        assert_eq!(raw_to_millivolts(4095), 3300);
        assert_eq!(raw_to_millivolts(u16::MAX), 3300);
        assert_eq!(raw_to_millivolts(2048), 1650);
    }

    #[test]
    fn test_initial_state() {
        let sensor = OrpSensor::new(100, 4000);
        assert_eq!(sensor.get_millivolts(), 100);
        assert_eq!(sensor.calibration_mv(), 0);
        assert_eq!(sensor.version(), 0);
    }

    #[test]
    fn test_inverted_range_swapped() {
        let sensor = OrpSensor::new(4000, 100);
        assert_eq!(sensor.get_millivolts(), 100);
        assert_eq!(sensor.set_millivolts(5000), 4000);
        assert_eq!(sensor.set_millivolts(-20), 100);
    }

    #[test]
    fn test_samples_averaged_and_clamped() {
        let sensor = OrpSensor::new(100, 1000);

        // 620 raw reads as 499 mV
        assert_eq!(sensor.update_from_samples(&[620, 620]), Some(499));
        assert_eq!(sensor.version(), 1);

        assert_eq!(sensor.update_from_samples(&[4095; 10]), Some(1000));
        assert_eq!(sensor.update_from_samples(&[0; 10]), Some(100));
        assert_eq!(sensor.update_from_samples(&[]), None);
        assert_eq!(sensor.get_millivolts(), 100);
    }

    #[test]
    fn test_same_value_keeps_version() {
        let sensor = OrpSensor::new(100, 4000);
        sensor.set_millivolts(500);
        assert_eq!(sensor.version(), 1);
        sensor.set_millivolts(500);
        assert_eq!(sensor.version(), 1);
        sensor.set_millivolts(501);
        assert_eq!(sensor.version(), 2);
    }

    #[test]
    fn test_calibration_offset_applied() {
        let sensor = OrpSensor::new(100, 4000);
        sensor.set_calibration(-50).unwrap();
        assert_eq!(sensor.update_from_samples(&[620]), Some(449));
        assert!(sensor.set_calibration(501).is_err());
        assert_eq!(sensor.calibration_mv(), -50);
    }

    #[test]
    fn test_calibration_write_through_descriptor() {
        let sensor = OrpSensor::new(100, 4000);
        let calibration = descriptor(ORP_CALIBRATION_CAPABILITY);
        assert_eq!(sensor.write_calibration(&calibration, 25.4), Ok(25));
        assert_eq!(sensor.calibration_mv(), 25);

        assert!(matches!(
            sensor.write_calibration(&calibration, -700.0),
            Err(WriteError::OutOfRange { .. })
        ));
        assert_eq!(sensor.calibration_mv(), 25);

        let measurement = descriptor(ORP_CAPABILITY);
        assert_eq!(
            sensor.write_calibration(&measurement, 10.0),
            Err(WriteError::AccessDenied(ORP_CAPABILITY.to_string()))
        );
    }
}
