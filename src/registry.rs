//! Device registry.
//!
//! Holds the validated capability sets of every registered device model.
//! Registration is expected to complete before the registry is shared
//! (`Arc<DeviceRegistry>`); after that it is only read, so no locking is
//! involved.

use crate::capability::CapabilityDescriptor;
use crate::error::{ConfigError, WriteError};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Static definition of a device model and the capabilities it exposes.
///
/// # Example
/// ```ignore
/// let definition = DeviceDefinition::new("esp32c6")
///     .with_zigbee_model("esp32c6")
///     .with_vendor("ESPRESSIF")
///     .with_capability(orp_descriptor);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub model: String,
    /// Model identifiers reported by the device itself (Basic cluster)
    #[serde(default, alias = "zigbeeModel")]
    pub zigbee_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "extend")]
    pub capabilities: Vec<CapabilityDescriptor>,
}

impl DeviceDefinition {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            zigbee_models: Vec::new(),
            vendor: None,
            description: None,
            capabilities: Vec::new(),
        }
    }

    pub fn with_zigbee_model(mut self, zigbee_model: impl Into<String>) -> Self {
        self.zigbee_models.push(zigbee_model.into());
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_capability(mut self, descriptor: CapabilityDescriptor) -> Self {
        self.capabilities.push(descriptor);
        self
    }

    pub fn with_capabilities(
        mut self,
        descriptors: impl IntoIterator<Item = CapabilityDescriptor>,
    ) -> Self {
        self.capabilities.extend(descriptors);
        self
    }
}

/// Validate a descriptor set for one device model.
pub fn validate_descriptors(
    model: &str,
    descriptors: &[CapabilityDescriptor],
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for descriptor in descriptors {
        descriptor.validate()?;
        if !seen.insert(descriptor.name()) {
            return Err(ConfigError::DuplicateName {
                model: model.to_string(),
                name: descriptor.name().to_string(),
            });
        }
    }
    Ok(())
}

/// A device model that passed validation. Its descriptors are immutable.
#[derive(Debug)]
pub struct RegisteredDevice {
    model: String,
    zigbee_models: Vec<String>,
    vendor: Option<String>,
    description: Option<String>,
    capabilities: Vec<Arc<CapabilityDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl RegisteredDevice {
    fn from_definition(definition: DeviceDefinition) -> Self {
        let capabilities: Vec<Arc<CapabilityDescriptor>> =
            definition.capabilities.into_iter().map(Arc::new).collect();
        let by_name = capabilities
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (descriptor.name().to_string(), index))
            .collect();

        Self {
            model: definition.model,
            zigbee_models: definition.zigbee_models,
            vendor: definition.vendor,
            description: definition.description,
            capabilities,
            by_name,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn zigbee_models(&self) -> &[String] {
        &self.zigbee_models
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Capabilities in declaration order.
    pub fn capabilities(&self) -> &[Arc<CapabilityDescriptor>] {
        &self.capabilities
    }

    pub fn capability(&self, name: &str) -> Option<&Arc<CapabilityDescriptor>> {
        self.by_name.get(name).map(|&index| &self.capabilities[index])
    }

    /// Rebuild the static definition, e.g. for printing.
    pub fn to_definition(&self) -> DeviceDefinition {
        DeviceDefinition {
            model: self.model.clone(),
            zigbee_models: self.zigbee_models.clone(),
            vendor: self.vendor.clone(),
            description: self.description.clone(),
            capabilities: self
                .capabilities
                .iter()
                .map(|descriptor| descriptor.as_ref().clone())
                .collect(),
        }
    }
}

/// Publish-once store of device definitions keyed by model.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, RegisteredDevice>,
    zigbee_aliases: HashMap<String, String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bare descriptor set for `model`.
    pub fn register(
        &mut self,
        model: impl Into<String>,
        descriptors: Vec<CapabilityDescriptor>,
    ) -> Result<(), ConfigError> {
        self.register_definition(DeviceDefinition::new(model).with_capabilities(descriptors))
    }

    /// Validate and register a full device definition.
    ///
    /// A model can only be registered once; unregister it first to replace
    /// its descriptors.
    pub fn register_definition(&mut self, definition: DeviceDefinition) -> Result<(), ConfigError> {
        let model = definition.model.clone();
        if self.devices.contains_key(&model) {
            return Err(ConfigError::ModelAlreadyRegistered(model));
        }
        for alias in &definition.zigbee_models {
            if let Some(owner) = self.zigbee_aliases.get(alias)
                && owner != &model
            {
                return Err(ConfigError::ModelAlreadyRegistered(alias.clone()));
            }
        }

        validate_descriptors(&model, &definition.capabilities)?;

        for alias in &definition.zigbee_models {
            self.zigbee_aliases.insert(alias.clone(), model.clone());
        }

        let device = RegisteredDevice::from_definition(definition);
        info!(
            "[Registry] Registered {} with {} capabilit{}",
            model,
            device.capabilities.len(),
            if device.capabilities.len() == 1 { "y" } else { "ies" }
        );
        self.devices.insert(model, device);
        Ok(())
    }

    /// Remove a model and drop its descriptors.
    pub fn unregister(&mut self, model: &str) -> Option<RegisteredDevice> {
        let device = self.devices.remove(model)?;
        self.zigbee_aliases.retain(|_, owner| owner != model);
        info!("[Registry] Unregistered {}", model);
        Some(device)
    }

    pub fn device(&self, model: &str) -> Option<&RegisteredDevice> {
        self.devices.get(model)
    }

    /// Resolve a device by the model identifier it reports over Zigbee.
    pub fn find_by_zigbee_model(&self, zigbee_model: &str) -> Option<&RegisteredDevice> {
        self.zigbee_aliases
            .get(zigbee_model)
            .and_then(|model| self.devices.get(model))
    }

    pub fn descriptors(&self, model: &str) -> Result<&[Arc<CapabilityDescriptor>], ConfigError> {
        self.devices
            .get(model)
            .map(RegisteredDevice::capabilities)
            .ok_or_else(|| ConfigError::UnknownModel(model.to_string()))
    }

    pub fn descriptor(&self, model: &str, name: &str) -> Option<&Arc<CapabilityDescriptor>> {
        self.devices.get(model)?.capability(name)
    }

    /// Evaluate an external write addressed by model and capability name.
    pub fn evaluate_write(&self, model: &str, name: &str, proposed: f64) -> Result<f64, WriteError> {
        let descriptor =
            self.descriptor(model, name)
                .ok_or_else(|| WriteError::UnknownCapability {
                    model: model.to_string(),
                    name: name.to_string(),
                })?;
        descriptor.evaluate_write(proposed)
    }

    /// Registered models in sorted order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
