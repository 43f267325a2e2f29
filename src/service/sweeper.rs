//! Periodic past-due sweep.
//!
//! Runs [`ItemService::sweep_past_due`] on a fixed delay: the wait starts
//! once a sweep has finished, so two sweeps never overlap.

use std::env;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ItemService;
use crate::infrastructure::ConfigurationError;

/// Default delay between the end of one sweep and the start of the next.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sweeper settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Fixed delay between sweeps.
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SweeperConfig {
    /// Reads `SWEEP_INTERVAL_SECS` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSweepInterval` unless the value is
    /// a positive integer.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Reads `SWEEP_INTERVAL_SECS` through an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// See [`SweeperConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self, ConfigurationError> {
        match lookup("SWEEP_INTERVAL_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|seconds| *seconds > 0)
                .map(|seconds| Self {
                    interval: Duration::from_secs(seconds),
                })
                .ok_or(ConfigurationError::InvalidSweepInterval(value)),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigurationError::InvalidSweepInterval(
                "<non-UTF-8 value>".to_string(),
            )),
        }
    }
}

/// Background task moving overdue items to `past due`.
#[derive(Debug, Clone)]
pub struct Sweeper {
    service: ItemService,
    interval: Duration,
}

impl Sweeper {
    /// Creates a sweeper over `service`.
    #[must_use]
    pub const fn new(service: ItemService, config: SweeperConfig) -> Self {
        Self {
            service,
            interval: config.interval,
        }
    }

    /// Runs one sweep, logging its outcome. Returns the number of items moved.
    pub async fn run_once(&self) -> usize {
        match self.service.sweep_past_due().await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(count, "Sweep moved items to past due");
                }
                count
            }
            Err(error) => {
                tracing::error!(error = %error, "Sweep failed");
                0
            }
        }
    }

    /// Sweeps immediately, then every `interval` until `shutdown` is cancelled.
    ///
    /// Cancellation is observed only between sweeps.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper started");
        while !shutdown.is_cancelled() {
            self.run_once().await;
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!("Sweeper stopped");
    }

    /// Spawns [`Sweeper::run`] on the current runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lookup(value: Option<&str>) -> impl Fn(&str) -> Result<String, env::VarError> + use<> {
        let value = value.map(str::to_string);
        move |_| value.clone().ok_or(env::VarError::NotPresent)
    }

    #[rstest]
    fn test_config_default_interval() {
        let config = SweeperConfig::from_lookup(lookup(None)).unwrap();
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[rstest]
    #[case("15", Duration::from_secs(15))]
    #[case(" 1 ", Duration::from_secs(1))]
    fn test_config_parses_seconds(#[case] raw: &str, #[case] expected: Duration) {
        let config = SweeperConfig::from_lookup(lookup(Some(raw))).unwrap();
        assert_eq!(config.interval, expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-5")]
    #[case("soon")]
    fn test_config_rejects_invalid(#[case] raw: &str) {
        assert_eq!(
            SweeperConfig::from_lookup(lookup(Some(raw))),
            Err(ConfigurationError::InvalidSweepInterval(raw.to_string()))
        );
    }
}
