//! Sensor simulation for testing.

mod orp;

pub use orp::{ProbeSimulator, millivolts_to_raw, run_orp_simulation};
