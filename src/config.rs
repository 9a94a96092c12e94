use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            if !key.is_empty() {
                pairs.push((key, value));
            }
        }
    }

    pairs
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub sensor: SensorConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device model driven by the bridge process
    pub model: String,
    /// Optional JSON file with additional device definitions
    pub definitions_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Seconds between probe readings
    pub update_interval_secs: u64,
    pub min_value_mv: i32,
    pub max_value_mv: i32,
    /// Raw ADC samples averaged into one reading
    pub samples_per_reading: usize,
    /// Initial calibration offset
    pub calibration_mv: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Probe potential the simulated samples wander around
    pub baseline_mv: i32,
    /// Maximum per-sample deviation from the current potential
    pub jitter_mv: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: "esp32c6".to_string(),
            definitions_path: default_definitions_path(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 15,
            min_value_mv: 100,
            max_value_mv: 4000,
            samples_per_reading: 10,
            calibration_mv: 0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            baseline_mv: 650,
            jitter_mv: 5,
        }
    }
}

/// `<config dir>/capability-bridge/definitions.json`, if that file exists.
fn default_definitions_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?
        .join("capability-bridge")
        .join("definitions.json");
    path.exists().then_some(path)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` on top of the defaults. Unparsable
    /// values are ignored.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // Device configuration
        if let Some(model) = lookup("DEVICE_MODEL") {
            config.device.model = model;
        }
        if let Some(path) = lookup("DEFINITIONS_PATH") {
            config.device.definitions_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        // Sensor configuration
        if let Some(interval) = lookup("ORP_UPDATE_INTERVAL")
            && let Ok(i) = interval.parse::<u64>()
            && i > 0
        {
            config.sensor.update_interval_secs = i;
        }
        if let Some(min) = lookup("ORP_MIN_MV")
            && let Ok(m) = min.parse()
        {
            config.sensor.min_value_mv = m;
        }
        if let Some(max) = lookup("ORP_MAX_MV")
            && let Ok(m) = max.parse()
        {
            config.sensor.max_value_mv = m;
        }
        if let Some(samples) = lookup("ORP_SAMPLES")
            && let Ok(s) = samples.parse::<usize>()
            && s > 0
        {
            config.sensor.samples_per_reading = s;
        }
        if let Some(offset) = lookup("ORP_CALIBRATION_MV")
            && let Ok(o) = offset.parse()
        {
            config.sensor.calibration_mv = o;
        }

        // Simulation configuration
        if let Some(baseline) = lookup("SIMULATION_BASELINE_MV")
            && let Ok(b) = baseline.parse()
        {
            config.simulation.baseline_mv = b;
        }
        if let Some(jitter) = lookup("SIMULATION_JITTER_MV")
            && let Ok(j) = jitter.parse::<i32>()
        {
            config.simulation.jitter_mv = j.saturating_abs();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "\
# comment
DEVICE_MODEL=esp32c6

ORP_MIN_MV = 200
DEFINITIONS_PATH=\"/etc/capability bridge/defs.json\"
SINGLE='quoted value'
NOEQUALS
=orphan
";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("DEVICE_MODEL", "esp32c6"),
                ("ORP_MIN_MV", "200"),
                ("DEFINITIONS_PATH", "/etc/capability bridge/defs.json"),
                ("SINGLE", "quoted value"),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device.model, "esp32c6");
        assert_eq!(config.sensor.update_interval_secs, 15);
        assert_eq!(config.sensor.min_value_mv, 100);
        assert_eq!(config.sensor.max_value_mv, 4000);
        assert_eq!(config.sensor.samples_per_reading, 10);
        assert_eq!(config.sensor.calibration_mv, 0);
    }

    #[test]
    fn test_overrides_applied() {
        let config = from_vars(&[
            ("DEVICE_MODEL", "ORP_SENSOR"),
            ("DEFINITIONS_PATH", "/etc/capability-bridge/defs.json"),
            ("ORP_UPDATE_INTERVAL", "30"),
            ("ORP_MIN_MV", "-200"),
            ("ORP_MAX_MV", "1200"),
            ("ORP_SAMPLES", "4"),
            ("ORP_CALIBRATION_MV", "-15"),
            ("SIMULATION_BASELINE_MV", "420"),
            ("SIMULATION_JITTER_MV", "8"),
        ]);
        assert_eq!(config.device.model, "ORP_SENSOR");
        assert_eq!(
            config.device.definitions_path,
            Some(PathBuf::from("/etc/capability-bridge/defs.json"))
        );
        assert_eq!(config.sensor.update_interval_secs, 30);
        assert_eq!(config.sensor.min_value_mv, -200);
        assert_eq!(config.sensor.max_value_mv, 1200);
        assert_eq!(config.sensor.samples_per_reading, 4);
        assert_eq!(config.sensor.calibration_mv, -15);
        assert_eq!(config.simulation.baseline_mv, 420);
        assert_eq!(config.simulation.jitter_mv, 8);
    }

    #[test]
    fn test_empty_definitions_path_disables_file() {
        let config = from_vars(&[("DEFINITIONS_PATH", "")]);
        assert_eq!(config.device.definitions_path, None);
    }

    #[test]
    fn test_zero_and_invalid_values_ignored() {
        let config = from_vars(&[
            ("ORP_UPDATE_INTERVAL", "0"),
            ("ORP_SAMPLES", "0"),
            ("ORP_MIN_MV", "low"),
            ("SIMULATION_BASELINE_MV", "1.5"),
        ]);
        assert_eq!(config.sensor.update_interval_secs, 15);
        assert_eq!(config.sensor.samples_per_reading, 10);
        assert_eq!(config.sensor.min_value_mv, 100);
        assert_eq!(config.simulation.baseline_mv, 650);
    }

    #[test]
    fn test_negative_jitter_made_positive() {
        assert_eq!(
            from_vars(&[("SIMULATION_JITTER_MV", "-3")]).simulation.jitter_mv,
            3
        );
        assert_eq!(
            from_vars(&[("SIMULATION_JITTER_MV", "-2147483648")])
                .simulation
                .jitter_mv,
            i32::MAX
        );
    }
}
