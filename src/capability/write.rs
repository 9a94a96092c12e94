//! Evaluation of external writes against a capability descriptor.

use super::descriptor::CapabilityDescriptor;
use crate::error::WriteError;
use log::warn;

/// Validate a proposed value and round it to the descriptor's precision.
///
/// Rejects writes to read-only capabilities, non-finite values and values
/// outside the declared range. Accepted values are rounded half-to-even so
/// that repeated writes of an already rounded value never drift.
pub fn evaluate_write(descriptor: &CapabilityDescriptor, proposed: f64) -> Result<f64, WriteError> {
    let name = descriptor.name();

    if !descriptor.access().is_writable() {
        warn!("[Write] Rejected write to read-only capability '{}'", name);
        return Err(WriteError::AccessDenied(name.to_string()));
    }

    if !proposed.is_finite() {
        warn!("[Write] Rejected non-finite value for '{}'", name);
        return Err(WriteError::NotFinite(name.to_string()));
    }

    if let Some(range) = descriptor.value_range()
        && !range.contains(proposed)
    {
        warn!(
            "[Write] Value {} out of range [{}, {}] for '{}'",
            proposed, range.min, range.max, name
        );
        return Err(WriteError::OutOfRange {
            name: name.to_string(),
            value: proposed,
            min: range.min,
            max: range.max,
        });
    }

    let accepted = round_half_even(proposed, descriptor.precision());
    // Rounding can carry a value just inside a bound past it
    if let Some(range) = descriptor.value_range()
        && !range.contains(accepted)
    {
        warn!(
            "[Write] Value {} rounds to {} outside [{}, {}] for '{}'",
            proposed, accepted, range.min, range.max, name
        );
        return Err(WriteError::OutOfRange {
            name: name.to_string(),
            value: proposed,
            min: range.min,
            max: range.max,
        });
    }

    Ok(accepted)
}

/// Round `value` to `precision` decimal digits, ties to even.
pub fn round_half_even(value: f64, precision: u8) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let scaled = value * scale;
    // Beyond 2^52 every scaled value is already integral
    if !scaled.is_finite() || scaled.abs() >= 2f64.powi(52) {
        return value;
    }
    let rounded = scaled.round_ties_even() / scale;
    // Avoid handing out negative zero for small negative inputs
    if rounded == 0.0 { 0.0 } else { rounded }
}

impl CapabilityDescriptor {
    /// See [`evaluate_write`].
    pub fn evaluate_write(&self, proposed: f64) -> Result<f64, WriteError> {
        evaluate_write(self, proposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Access;

    fn calibration() -> CapabilityDescriptor {
        CapabilityDescriptor::new("orp_calibration", "genAnalogInput", 0xF000u16)
            .with_unit("mV")
            .with_access(Access::ReadWrite)
            .with_range(-500.0, 500.0)
    }

    #[test]
    fn test_read_only_always_denied() {
        let descriptor = CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue")
            .with_range(-1000.0, 1000.0);
        for value in [0.0, -1.0, 12.5, 1e9, f64::NAN] {
            assert_eq!(
                evaluate_write(&descriptor, value),
                Err(WriteError::AccessDenied("orp".to_string()))
            );
        }
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let descriptor = calibration();
        assert_eq!(evaluate_write(&descriptor, -500.0), Ok(-500.0));
        assert_eq!(evaluate_write(&descriptor, 500.0), Ok(500.0));
        assert_eq!(evaluate_write(&descriptor, 0.0), Ok(0.0));
        assert!(matches!(
            evaluate_write(&descriptor, 500.1),
            Err(WriteError::OutOfRange { .. })
        ));
        assert!(matches!(
            evaluate_write(&descriptor, -501.0),
            Err(WriteError::OutOfRange { value, .. }) if value == -501.0
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let descriptor = calibration();
        assert_eq!(
            evaluate_write(&descriptor, f64::INFINITY),
            Err(WriteError::NotFinite("orp_calibration".to_string()))
        );
        assert!(evaluate_write(&descriptor, f64::NAN).is_err());
    }

    #[test]
    fn test_write_only_accepted_without_range() {
        let descriptor =
            CapabilityDescriptor::new("setpoint", "genAnalogOutput", "presentValue")
                .with_access(Access::WriteOnly)
                .with_precision(2);
        assert_eq!(evaluate_write(&descriptor, 1234.5678), Ok(1234.57));
    }

    #[test]
    fn test_rounds_to_precision() {
        let descriptor = calibration().with_precision(1);
        assert_eq!(descriptor.evaluate_write(12.345), Ok(12.3));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5, 0), 0.0);
        assert_eq!(round_half_even(1.5, 0), 2.0);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(-2.5, 0), -2.0);
        assert_eq!(round_half_even(0.25, 1), 0.2);
        assert_eq!(round_half_even(0.75, 1), 0.8);
        assert_eq!(round_half_even(12.345, 1), 12.3);
        assert_eq!(round_half_even(-0.4, 0), 0.0);
        assert!(round_half_even(-0.4, 0).is_sign_positive());
    }

    #[test]
    fn test_rounding_past_range_bound_rejected() {
        let descriptor = CapabilityDescriptor::new("gain", "genAnalogOutput", "presentValue")
            .with_access(Access::ReadWrite)
            .with_precision(1)
            .with_range(0.04, 0.06);
        assert_eq!(
            descriptor.evaluate_write(0.06),
            Err(WriteError::OutOfRange {
                name: "gain".to_string(),
                value: 0.06,
                min: 0.04,
                max: 0.06,
            })
        );

        // Rounding onto the bound itself is fine
        let calibration = calibration().with_precision(0);
        assert_eq!(calibration.evaluate_write(499.6), Ok(500.0));
        assert_eq!(calibration.evaluate_write(-499.5), Ok(-500.0));
    }

    #[test]
    fn test_large_values_left_unchanged() {
        for value in [987654.321012345, 9_007_199_254.740_993, -4.5e6 + 0.123] {
            for precision in 10..=15 {
                assert_eq!(round_half_even(value, precision).to_bits(), value.to_bits());
            }
        }
    }

    #[test]
    fn test_repeated_rounding_is_stable() {
        let descriptor = calibration().with_precision(1);
        let once = descriptor.evaluate_write(123.45).unwrap();
        let twice = descriptor.evaluate_write(once).unwrap();
        assert_eq!(once, twice);
    }
}
