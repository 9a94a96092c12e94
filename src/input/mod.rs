//! Input sources feeding sensor state.
//!
//! Current input sources:
//! - `simulation`: synthetic ORP probe samples for development and testing

pub mod simulation;

pub use simulation::{ProbeSimulator, run_orp_simulation};
