//! Capability declarations.
//!
//! This module provides the descriptor record for a single device capability
//! and the evaluation of external writes against it.

pub mod descriptor;
pub mod write;

pub use descriptor::{Access, CapabilityDescriptor, Identifier, MAX_PRECISION, ValueRange};
pub use write::{evaluate_write, round_half_even};
