use std::time::Duration;

use backon::ExponentialBuilder;

use crate::matcher::MatchMode;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: usize = 4;

/// Tuning knobs for one trace run.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Maximum number of in-flight branch lookups.
    pub concurrency: usize,
    /// Deadline for a single remote call, per attempt.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    pub match_mode: MatchMode,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
            match_mode: MatchMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Handy in tests.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_retries,
        }
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }
}
