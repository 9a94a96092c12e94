//! Capability Bridge library.
//!
//! Declarative device capability descriptors: a registry of validated
//! descriptor sets per device model, evaluation of external writes and
//! periodic reporting decisions, plus the ORP sensor model that feeds them.

pub mod capability;
pub mod config;
pub mod definitions;
pub mod error;
pub mod input;
pub mod registry;
pub mod reporting;
pub mod sensors;
