//! Simulated ORP probe.
//!
//! Produces batches of raw ADC samples from a slow random walk around a
//! baseline potential, the way a probe in a stable solution behaves.

use crate::capability::round_half_even;
use crate::config::SimulationConfig;
use crate::reporting::Exposure;
use crate::sensors::{OrpSensor, Sensor};
use crate::sensors::orp_sensor::{ADC_MAX_RAW, ADC_REFERENCE_MV};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// Convert millivolts to the raw 12-bit ADC value that reads back as them.
pub fn millivolts_to_raw(millivolts: i32) -> u16 {
    let clamped = millivolts.clamp(0, ADC_REFERENCE_MV);
    // Round up so raw_to_millivolts(millivolts_to_raw(x)) == x
    ((clamped * ADC_MAX_RAW + ADC_REFERENCE_MV - 1) / ADC_REFERENCE_MV) as u16
}

/// Random-walk generator of raw probe samples.
pub struct ProbeSimulator {
    potential_mv: i32,
    baseline_mv: i32,
    jitter_mv: i32,
    samples_per_reading: usize,
}

impl ProbeSimulator {
    pub fn new(config: &SimulationConfig, samples_per_reading: usize) -> Self {
        Self {
            potential_mv: config.baseline_mv,
            baseline_mv: config.baseline_mv,
            jitter_mv: config.jitter_mv.saturating_abs(),
            samples_per_reading: samples_per_reading.max(1),
        }
    }

    pub fn potential_mv(&self) -> i32 {
        self.potential_mv
    }

    /// Advance the walk one step and return a batch of raw samples.
    pub fn next_samples<R: Rng>(&mut self, rng: &mut R) -> Vec<u16> {
        // Drift by up to one jitter step, pulled back toward the baseline
        let drift = if self.jitter_mv > 0 {
            rng.gen_range(-self.jitter_mv..=self.jitter_mv)
        } else {
            0
        };
        let pull = (self.baseline_mv as i64 - self.potential_mv as i64) / 10;
        let next = self.potential_mv as i64 + drift as i64 + pull;
        self.potential_mv = next.clamp(i32::MIN as i64, i32::MAX as i64) as i32;

        (0..self.samples_per_reading)
            .map(|_| {
                let noise = if self.jitter_mv > 0 {
                    rng.gen_range(-self.jitter_mv..=self.jitter_mv)
                } else {
                    0
                };
                millivolts_to_raw(self.potential_mv.saturating_add(noise))
            })
            .collect()
    }
}

/// Spawn a task that periodically feeds simulated samples into the sensor
/// and reports through `exposure` when its reporting policy asks for it.
///
/// `on_report` receives every value due for publication, already rounded
/// to the capability's precision.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_orp_simulation<F>(
    sensor: Arc<OrpSensor>,
    exposure: Arc<Exposure>,
    mut simulator: ProbeSimulator,
    period: Duration,
    on_report: F,
) -> JoinHandle<()>
where
    F: Fn(f64) + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut interval = interval(period);
        let mut last_version = sensor.version();
        loop {
            interval.tick().await;
            let samples = simulator.next_samples(&mut rng);
            let Some(millivolts) = sensor.update_from_samples(&samples) else {
                warn!("[Sim] Failed to read ORP sensor");
                continue;
            };

            let value = round_half_even(millivolts as f64, exposure.descriptor().precision());
            let reported = exposure.observe(value);
            if reported {
                on_report(value);
            }
            let version = sensor.version();
            if version != last_version {
                last_version = version;
                info!(
                    "[Sim] ORP sensor value updated: {} mV{}",
                    millivolts,
                    if reported { " [REPORTED]" } else { "" }
                );
            } else if reported {
                info!("[Sim] ORP sensor value unchanged: {} mV [REPORTED]", millivolts);
            } else {
                debug!("[Sim] ORP sensor value unchanged: {} mV", millivolts);
            }
        }
    })
}
