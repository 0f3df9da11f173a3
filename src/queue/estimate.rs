use std::time::Duration;

use crate::config;

/// Estimates waiting time from the recent service times of a queue.
#[derive(Clone, Copy, Debug)]
pub struct Estimator {
    /// Average assumed while a service has no completed tickets yet.
    pub default_service_time: Duration,

    /// Lower bound for the average service time.
    pub min_service_time: Duration,

    /// Number of most recent completed tickets the average is taken over.
    pub history: usize,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            default_service_time: Duration::from_secs(300),
            min_service_time: Duration::from_secs(60),
            history: 20,
        }
    }
}

impl From<&config::Estimate> for Estimator {
    fn from(config: &config::Estimate) -> Self {
        Self {
            default_service_time: config.default_service_time,
            min_service_time: config.min_service_time,
            history: config.history.max(1),
        }
    }
}

impl Estimator {
    /// Averages the given service times, most recent first. Only the first
    /// `history` samples are taken into account.
    pub fn average_service_time<I>(&self, samples: I) -> Duration
    where
        I: IntoIterator<Item = Duration>,
    {
        let (count, total) = samples
            .into_iter()
            .take(self.history)
            .fold((0u32, Duration::ZERO), |(n, sum), d| (n + 1, sum + d));
        if count == 0 {
            return self.default_service_time;
        }
        (total / count).max(self.min_service_time)
    }

    /// Seconds a ticket at the given 1-based queue position is expected to
    /// wait.
    pub fn wait_seconds(&self, position: usize, average: Duration) -> u64 {
        (position as u64).saturating_mul(average.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn defaults_without_history() {
        let estimator = Estimator::default();
        let average = estimator.average_service_time([]);
        assert_eq!(average, secs(300));
        assert_eq!(estimator.wait_seconds(2, average), 600);
    }

    #[test]
    fn multiplies_position_by_average() {
        let estimator = Estimator::default();
        let average =
            estimator.average_service_time([secs(100), secs(140), secs(120)]);
        assert_eq!(average, secs(120));
        assert_eq!(estimator.wait_seconds(3, average), 360);
    }

    #[test]
    fn floors_short_averages() {
        let estimator = Estimator::default();
        let average = estimator.average_service_time([secs(5), secs(15)]);
        assert_eq!(average, secs(60));
        assert_eq!(estimator.wait_seconds(1, average), 60);
    }

    #[test]
    fn only_recent_samples_count() {
        let estimator = Estimator {
            history: 2,
            ..Estimator::default()
        };
        let average =
            estimator.average_service_time([secs(90), secs(150), secs(3600)]);
        assert_eq!(average, secs(120));
    }
}
