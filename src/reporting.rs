//! Periodic reporting decisions.
//!
//! A reporting policy decides whether an observed value is pushed upstream
//! or suppressed. Reports are rate-limited by `min_interval`, forced once
//! `max_interval` has elapsed, and otherwise only sent when the value moved
//! by at least `min_change`.

use crate::capability::CapabilityDescriptor;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reporting thresholds of a capability.
///
/// Intervals are whole seconds as in Zigbee attribute reporting
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportingPolicy {
    #[serde(alias = "min")]
    pub min_interval: u16,
    #[serde(alias = "max")]
    pub max_interval: u16,
    #[serde(alias = "change")]
    pub min_change: f64,
}

impl ReportingPolicy {
    pub fn new(min_interval: u16, max_interval: u16, min_change: f64) -> Self {
        Self {
            min_interval,
            max_interval,
            min_change,
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval as u64)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval as u64)
    }

    /// Returns the reason the policy is inconsistent, if it is.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_interval > self.max_interval {
            return Err(format!(
                "reporting min interval {}s exceeds max interval {}s",
                self.min_interval, self.max_interval
            ));
        }
        if !self.min_change.is_finite() || self.min_change < 0.0 {
            return Err(format!(
                "reporting min change {} must be a non-negative number",
                self.min_change
            ));
        }
        Ok(())
    }

    /// Decide whether `current` should be reported, given the last reported
    /// value and the time since that report.
    pub fn should_report(&self, previous: f64, current: f64, elapsed: Duration) -> bool {
        if elapsed < self.min_interval() {
            return false;
        }
        if elapsed >= self.max_interval() {
            return true;
        }
        (current - previous).abs() >= self.min_change
    }
}

/// Report decision for a descriptor. Never reports without a policy.
pub fn should_report(
    descriptor: &CapabilityDescriptor,
    previous: f64,
    current: f64,
    elapsed: Duration,
) -> bool {
    descriptor
        .reporting()
        .is_some_and(|policy| policy.should_report(previous, current, elapsed))
}

/// Remembers the last reported value of one capability.
///
/// The first observation under a policy is always reported so upstream
/// receives an initial value; afterwards [`ReportingPolicy::should_report`]
/// is applied against the last *reported* value, not the last observed one,
/// so slow drifts still cross `min_change` eventually.
#[derive(Debug, Clone)]
pub struct ReportTracker {
    policy: Option<ReportingPolicy>,
    last_report: Option<(f64, Instant)>,
}

impl ReportTracker {
    pub fn new(policy: Option<ReportingPolicy>) -> Self {
        Self {
            policy,
            last_report: None,
        }
    }

    pub fn for_descriptor(descriptor: &CapabilityDescriptor) -> Self {
        Self::new(descriptor.reporting().copied())
    }

    /// Feed an observed value. Returns true when it should be reported.
    pub fn observe(&mut self, value: f64, now: Instant) -> bool {
        let Some(policy) = self.policy else {
            return false;
        };

        let report = match self.last_report {
            None => true,
            Some((previous, at)) => {
                policy.should_report(previous, value, now.saturating_duration_since(at))
            }
        };

        if report {
            self.last_report = Some((value, now));
        }
        report
    }

    /// Record an unconditional report (on-demand "report attributes").
    pub fn force(&mut self, value: f64, now: Instant) {
        self.last_report = Some((value, now));
    }

    pub fn last_reported(&self) -> Option<f64> {
        self.last_report.map(|(value, _)| value)
    }
}

/// A registered capability together with its reporting state.
///
/// Shared between the periodic sensor task and on-demand report requests.
pub struct Exposure {
    descriptor: Arc<CapabilityDescriptor>,
    tracker: Mutex<ReportTracker>,
}

impl Exposure {
    pub fn new(descriptor: Arc<CapabilityDescriptor>) -> Self {
        let tracker = ReportTracker::for_descriptor(&descriptor);
        Self {
            descriptor,
            tracker: Mutex::new(tracker),
        }
    }

    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    /// Feed an observed value and return whether it should be reported now.
    pub fn observe(&self, value: f64) -> bool {
        self.observe_at(value, Instant::now())
    }

    pub fn observe_at(&self, value: f64, now: Instant) -> bool {
        let report = self.tracker.lock().observe(value, now);
        if !report {
            debug!(
                "[Report] {} = {} suppressed by reporting policy",
                self.descriptor.name(),
                value
            );
        }
        report
    }

    /// Record an on-demand report of `value`.
    pub fn force_report(&self, value: f64) {
        self.tracker.lock().force(value, Instant::now());
    }

    pub fn last_reported(&self) -> Option<f64> {
        self.tracker.lock().last_reported()
    }
}
