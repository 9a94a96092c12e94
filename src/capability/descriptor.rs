//! Capability descriptor record.
//!
//! A descriptor declares one attribute a device exposes: how it is addressed,
//! how it is presented, whether it accepts writes and when changes of it are
//! reported. Descriptors are built once from static definitions and never
//! mutated afterwards; the registry only hands out shared references.

use crate::error::ConfigError;
use crate::reporting::ReportingPolicy;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Highest supported presentation precision (decimal digits).
///
/// Beyond this an `f64` no longer carries meaningful fractional digits.
pub const MAX_PRECISION: u8 = 15;

/// Opaque protocol identifier for clusters and attributes.
///
/// Definitions address attributes either symbolically (`presentValue`) or by
/// numeric code (`0xF000`). Both are stored as text; numeric codes are
/// normalised to upper-case hex so `61440` and `"0xF000"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identifier for a numeric attribute or cluster code.
    pub fn code(code: u64) -> Self {
        Self(format!("0x{:04X}", code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Identifier::code(code),
            Raw::Name(name) => Identifier::new(name),
        })
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<u16> for Identifier {
    fn from(code: u16) -> Self {
        Identifier::code(code as u64)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read/write access of a capability.
///
/// Besides the snake_case names, the zigbee2mqtt access flags are accepted
/// when parsing definitions: `STATE`, `GET` and `STATE_GET` are read-only,
/// `SET` is write-only, `STATE_SET` and `ALL` are read-write.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Access {
    #[default]
    #[serde(alias = "STATE", alias = "GET", alias = "STATE_GET")]
    #[strum(to_string = "read_only", serialize = "STATE", serialize = "GET", serialize = "STATE_GET")]
    ReadOnly,
    #[serde(alias = "STATE_SET", alias = "ALL")]
    #[strum(to_string = "read_write", serialize = "STATE_SET", serialize = "ALL")]
    ReadWrite,
    #[serde(alias = "SET")]
    #[strum(to_string = "write_only", serialize = "SET")]
    WriteOnly,
}

impl Access {
    /// Whether external value pushes are accepted.
    pub fn is_writable(self) -> bool {
        matches!(self, Access::ReadWrite | Access::WriteOnly)
    }
}

/// Inclusive `[min, max]` bound for accepted writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One measurable or settable attribute exposed by a device.
///
/// # Example
/// ```ignore
/// let orp = CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue")
///     .with_unit("mV")
///     .with_precision(1)
///     .with_reporting(ReportingPolicy::new(1, 10, 1.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    name: String,
    cluster: Identifier,
    attribute: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default)]
    precision: u8,
    #[serde(default)]
    access: Access,
    #[serde(default, alias = "range", skip_serializing_if = "Option::is_none")]
    value_range: Option<ValueRange>,
    #[serde(default)]
    reporting: Option<ReportingPolicy>,
}

impl CapabilityDescriptor {
    /// Create a read-only descriptor with precision 0, no unit, no range
    /// and no reporting.
    pub fn new(
        name: impl Into<String>,
        cluster: impl Into<Identifier>,
        attribute: impl Into<Identifier>,
    ) -> Self {
        Self {
            name: name.into(),
            cluster: cluster.into(),
            attribute: attribute.into(),
            description: None,
            unit: None,
            precision: 0,
            access: Access::ReadOnly,
            value_range: None,
            reporting: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.value_range = Some(ValueRange::new(min, max));
        self
    }

    pub fn with_reporting(mut self, policy: ReportingPolicy) -> Self {
        self.reporting = Some(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cluster(&self) -> &Identifier {
        &self.cluster
    }

    pub fn attribute(&self) -> &Identifier {
        &self.attribute
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.value_range
    }

    pub fn reporting(&self) -> Option<&ReportingPolicy> {
        self.reporting.as_ref()
    }

    /// Check the invariants that hold for a single descriptor.
    ///
    /// Name uniqueness spans a whole descriptor set and is checked by the
    /// registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        if self.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision {
                name: self.name.clone(),
                precision: self.precision,
                max: MAX_PRECISION,
            });
        }

        if let Some(range) = self.value_range {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(self.invalid_range("value range bounds must be finite"));
            }
            if range.min > range.max {
                return Err(self.invalid_range(format!(
                    "value range min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }

        if let Some(policy) = &self.reporting {
            policy
                .validate()
                .map_err(|reason| self.invalid_range(reason))?;
        }

        Ok(())
    }

    fn invalid_range(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidRange {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let descriptor = CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue");
        assert_eq!(descriptor.name(), "orp");
        assert_eq!(descriptor.access(), Access::ReadOnly);
        assert_eq!(descriptor.precision(), 0);
        assert!(descriptor.unit().is_none());
        assert!(descriptor.value_range().is_none());
        assert!(descriptor.reporting().is_none());
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_numeric_identifier_normalised() {
        assert_eq!(Identifier::from(0xF000u16).as_str(), "0xF000");
        assert_eq!(Identifier::code(0x000C).as_str(), "0x000C");

        let parsed: Identifier = serde_json::from_str("61440").unwrap();
        assert_eq!(parsed, Identifier::new("0xF000"));
        let parsed: Identifier = serde_json::from_str("\"presentValue\"").unwrap();
        assert_eq!(parsed.as_str(), "presentValue");
    }

    #[test]
    fn test_access_parsing() {
        assert_eq!(Access::from_str("read_write").unwrap(), Access::ReadWrite);
        assert_eq!(Access::from_str("STATE_GET").unwrap(), Access::ReadOnly);
        assert_eq!(Access::from_str("ALL").unwrap(), Access::ReadWrite);
        assert_eq!(Access::from_str("SET").unwrap(), Access::WriteOnly);
        assert!(Access::from_str("sometimes").is_err());
        assert_eq!(Access::WriteOnly.to_string(), "write_only");

        let access: Access = serde_json::from_str("\"STATE_GET\"").unwrap();
        assert_eq!(access, Access::ReadOnly);
        assert_eq!(serde_json::to_string(&Access::ReadWrite).unwrap(), "\"read_write\"");
    }

    #[test]
    fn test_access_flags() {
        assert!(!Access::ReadOnly.is_writable());
        assert!(Access::ReadWrite.is_writable());
        assert!(Access::WriteOnly.is_writable());
    }

    #[test]
    fn test_empty_name_rejected() {
        let descriptor = CapabilityDescriptor::new("  ", "genAnalogInput", "presentValue");
        assert_eq!(descriptor.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_inverted_value_range_rejected() {
        let descriptor = CapabilityDescriptor::new("cal", "genAnalogInput", 0xF000u16)
            .with_access(Access::ReadWrite)
            .with_range(500.0, -500.0);
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigError::InvalidRange { ref name, .. }) if name == "cal"
        ));
    }

    #[test]
    fn test_nan_value_range_rejected() {
        let descriptor =
            CapabilityDescriptor::new("cal", "genAnalogInput", "x").with_range(f64::NAN, 1.0);
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_invalid_reporting_rejected() {
        let descriptor = CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue")
            .with_reporting(ReportingPolicy::new(10, 1, 1.0));
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));

        let descriptor = CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue")
            .with_reporting(ReportingPolicy::new(1, 10, -0.5));
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_precision_limit() {
        let descriptor =
            CapabilityDescriptor::new("orp", "genAnalogInput", "presentValue").with_precision(16);
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigError::InvalidPrecision { precision: 16, .. })
        ));
    }

    #[test]
    fn test_deserialize_zigbee2mqtt_style() {
        let json = r#"{
            "name": "orp",
            "cluster": "genAnalogInput",
            "attribute": "presentValue",
            "description": "ORP measurement",
            "unit": "mV",
            "precision": 1,
            "access": "STATE_GET",
            "reporting": {"min": 1, "max": 10, "change": 1}
        }"#;
        let descriptor: CapabilityDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.access(), Access::ReadOnly);
        assert_eq!(descriptor.description(), Some("ORP measurement"));
        assert_eq!(descriptor.reporting(), Some(&ReportingPolicy::new(1, 10, 1.0)));
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_deserialize_null_reporting() {
        let json = r#"{"name": "orp", "cluster": "genAnalogInput", "attribute": "presentValue", "reporting": null}"#;
        let descriptor: CapabilityDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.reporting().is_none());
    }
}
