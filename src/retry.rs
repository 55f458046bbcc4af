use std::time::Duration;

use crate::{ClientOptions, FetchError, RequestDescriptor};

/// How the backoff unit grows between attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backoff {
    /// `unit * 2^(attempt - 1)` after failed attempt `attempt`.
    #[default]
    Exponential,
    /// `unit * attempt` after failed attempt `attempt`.
    Linear,
}

impl Backoff {
    /// Delay to wait after the 1-based `attempt` failed.
    pub fn delay(self, unit_ms: u64, attempt: usize) -> Duration {
        let attempt = attempt.max(1);
        let delay_ms = match self {
            Self::Exponential => {
                let exp = (attempt - 1).min(16) as u32;
                unit_ms.saturating_mul(1u64 << exp)
            }
            Self::Linear => unit_ms.saturating_mul(attempt as u64),
        };
        Duration::from_millis(delay_ms)
    }
}

/// Attempt counter and last observed error for one logical call.
#[derive(Debug)]
pub(crate) struct RetryState {
    pub(crate) attempt: usize,
    pub(crate) last_error: Option<FetchError>,
}

impl RetryState {
    pub(crate) fn new() -> Self {
        Self {
            attempt: 1,
            last_error: None,
        }
    }

    /// Records a failure; returns the delay before the next attempt, or
    /// `None` when the loop must stop.
    pub(crate) fn record_failure(
        &mut self,
        err: FetchError,
        opts: &ClientOptions,
        request: &RequestDescriptor,
    ) -> Option<Duration> {
        let retry = should_retry(&err, opts, request) && self.attempt < opts.max_attempts;
        self.last_error = Some(err);
        if !retry {
            return None;
        }
        let delay = opts.backoff.delay(opts.retry_backoff_ms, self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    pub(crate) fn into_error(self) -> FetchError {
        self.last_error.unwrap_or(FetchError::Cancelled)
    }
}

/// Applies the client's terminal rules on top of [`FetchError::is_retryable`].
pub(crate) fn should_retry(err: &FetchError, opts: &ClientOptions, request: &RequestDescriptor) -> bool {
    if !err.is_retryable() {
        return false;
    }
    match err {
        FetchError::HttpStatus { status, .. } => {
            !(request.abort_on_terminal_status && opts.terminal_statuses.contains(status))
        }
        FetchError::Application { message } => {
            let message = message.to_ascii_lowercase();
            !opts
                .terminal_error_patterns
                .iter()
                .any(|pattern| message.contains(&pattern.to_ascii_lowercase()))
        }
        _ => true,
    }
}
