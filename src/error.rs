use thiserror::Error as ThisError;

/// Rejections raised while validating or registering descriptor sets.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Capability name must not be empty")]
    EmptyName,

    #[error("Duplicate capability name '{name}' for device model {model}")]
    DuplicateName { model: String, name: String },

    #[error("Invalid range for capability '{name}': {reason}")]
    InvalidRange { name: String, reason: String },

    #[error("Precision {precision} for capability '{name}' exceeds the maximum of {max}")]
    InvalidPrecision { name: String, precision: u8, max: u8 },

    #[error("Device model already registered: {0}")]
    ModelAlreadyRegistered(String),

    #[error("Unknown device model: {0}")]
    UnknownModel(String),
}

/// Rejections raised when an external write is evaluated against a descriptor.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("Capability '{0}' is read-only")]
    AccessDenied(String),

    #[error("Value {value} out of range [{min}, {max}] for capability '{name}'")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Value for capability '{0}' is not a finite number")]
    NotFinite(String),

    #[error("Unknown capability '{name}' on device model {model}")]
    UnknownCapability { model: String, name: String },
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Failed to load definitions from {path}: {source}")]
    DefinitionsLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
