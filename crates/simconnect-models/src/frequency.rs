//! Descriptors for how often, and for how long, the host sends data.

use serde::{Deserialize, Serialize};

use crate::ids::Period;

/// Delivery period plus the number of periods to skip between sends.
///
/// ```
/// use simconnect_models::{DataFrequency, Period};
///
/// let freq = DataFrequency::every(5).visual_frames();
/// assert_eq!(freq.period, Period::VisualFrame);
/// assert_eq!(freq.interval, 5);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataFrequency {
    /// Delivery period.
    pub period: Period,
    /// Periods between deliveries (0 means every period).
    pub interval: u32,
}

impl DataFrequency {
    /// Deliver a single time.
    pub fn once() -> Self {
        Self {
            period: Period::Once,
            interval: 0,
        }
    }

    /// Stop delivering.
    pub fn never() -> Self {
        Self {
            period: Period::Never,
            interval: 0,
        }
    }

    /// Deliver every `interval` seconds; chain a unit method to change it.
    pub fn every(interval: u32) -> Self {
        Self {
            period: Period::Second,
            interval,
        }
    }

    /// Count the interval in seconds.
    #[must_use]
    pub fn seconds(mut self) -> Self {
        self.period = Period::Second;
        self
    }

    /// Count the interval in visual frames.
    #[must_use]
    pub fn visual_frames(mut self) -> Self {
        self.period = Period::VisualFrame;
        self
    }

    /// Count the interval in simulation frames.
    #[must_use]
    pub fn sim_frames(mut self) -> Self {
        self.period = Period::SimFrame;
        self
    }

    /// True if the request keeps delivering after the first send.
    pub fn is_periodic(&self) -> bool {
        !matches!(self.period, Period::Once | Period::Never)
    }
}

/// Number of periods to skip before the first send, and the maximum number
/// of sends. Zero means "no limit" for both.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodLimits {
    /// Periods to skip before the first delivery.
    pub origin: u32,
    /// Maximum number of deliveries.
    pub limit: u32,
}

impl PeriodLimits {
    /// Limits with both values set.
    pub fn new(origin: u32, limit: u32) -> Self {
        Self { origin, limit }
    }

    /// No limits.
    pub fn none() -> Self {
        Self::default()
    }

    /// Skip the first `origin` periods.
    pub fn start_after(origin: u32) -> Self {
        Self { origin, limit: 0 }
    }

    /// Stop after `limit` deliveries.
    pub fn stop_after(limit: u32) -> Self {
        Self { origin: 0, limit }
    }

    /// Also skip the first `origin` periods.
    #[must_use]
    pub fn and_start_after(mut self, origin: u32) -> Self {
        self.origin = origin;
        self
    }

    /// Also stop after `limit` deliveries.
    #[must_use]
    pub fn and_stop_after(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frequency_is_once() {
        let freq = DataFrequency::default();
        assert_eq!(freq.period, Period::Once);
        assert_eq!(freq.interval, 0);
        assert!(!freq.is_periodic());
    }

    #[test]
    fn every_defaults_to_seconds() {
        let freq = DataFrequency::every(1000);
        assert_eq!(freq.period, Period::Second);
        assert_eq!(freq.interval, 1000);
        assert!(freq.is_periodic());
    }

    #[test]
    fn unit_methods_change_period() {
        assert_eq!(DataFrequency::every(5).sim_frames().period, Period::SimFrame);
        assert_eq!(
            DataFrequency::every(5).visual_frames().seconds().period,
            Period::Second
        );
        assert_eq!(DataFrequency::never().period, Period::Never);
    }

    #[test]
    fn period_limits_combinators() {
        assert_eq!(PeriodLimits::none(), PeriodLimits::new(0, 0));
        assert_eq!(PeriodLimits::start_after(5), PeriodLimits::new(5, 0));
        assert_eq!(PeriodLimits::stop_after(15), PeriodLimits::new(0, 15));
        assert_eq!(
            PeriodLimits::stop_after(15).and_start_after(5),
            PeriodLimits::new(5, 15)
        );
        assert_eq!(
            PeriodLimits::start_after(5).and_stop_after(25),
            PeriodLimits::new(5, 25)
        );
    }
}
