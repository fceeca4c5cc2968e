//! Retry configuration, backoff strategies and attempt classification.

use crate::{HttpClientError, Response, Result};
use http::{HeaderValue, StatusCode};
use std::time::Duration;

/// Retry configuration.
///
/// A request is attempted at most `max_retries + 1` times.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Whether to retry on connection and other transport errors.
    pub retry_on_connection_error: bool,
    /// Whether to retry on timeout errors.
    pub retry_on_timeout: bool,
    /// Whether a `Retry-After` header overrides the computed backoff.
    pub honor_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffStrategy::Exponential {
                initial: Duration::from_millis(100),
                max: Duration::from_secs(30),
                multiplier: 2.0,
            },
            retry_on_connection_error: true,
            retry_on_timeout: true,
            honor_retry_after: true,
        }
    }
}

impl RetryConfig {
    /// Create a retry config with exponential backoff doubling from `base`.
    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Exponential {
                initial: base,
                max: Duration::from_secs(30),
                multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    /// Create a retry config with no delay.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::None,
            ..Default::default()
        }
    }

    /// A single attempt, never retried.
    pub fn disabled() -> Self {
        Self::immediate(0)
    }

    /// Disable retry on connection errors.
    pub fn no_retry_on_connection(mut self) -> Self {
        self.retry_on_connection_error = false;
        self
    }

    /// Disable retry on timeout errors.
    pub fn no_retry_on_timeout(mut self) -> Self {
        self.retry_on_timeout = false;
        self
    }

    /// Ignore `Retry-After` headers and always use the backoff strategy.
    pub fn ignore_retry_after(mut self) -> Self {
        self.honor_retry_after = false;
        self
    }

    /// Total number of attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Check if a status code should trigger a retry: any 5xx, or 429.
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Check if a transport error should trigger a retry.
    pub fn should_retry_error(&self, error: &HttpClientError) -> bool {
        if !error.is_retryable() {
            return false;
        }
        if error.is_timeout() {
            self.retry_on_timeout
        } else {
            self.retry_on_connection_error
        }
    }

    /// Classify the result of one attempt.
    pub fn classify(&self, result: Result<Response>) -> AttemptOutcome {
        match result {
            Ok(response) if self.should_retry_status(response.status()) => {
                AttemptOutcome::Retryable(RetryableFailure::Status(response))
            }
            Ok(response) => AttemptOutcome::Success(response),
            Err(error) if self.should_retry_error(&error) => {
                AttemptOutcome::Retryable(RetryableFailure::Transport(error))
            }
            Err(error) => AttemptOutcome::Fatal(error),
        }
    }

    /// Delay before the attempt following `attempt` (0-indexed) failed with
    /// `failure`. A usable `Retry-After` header wins over the backoff.
    pub fn delay_after(&self, attempt: u32, failure: &RetryableFailure) -> Duration {
        if self.honor_retry_after
            && let RetryableFailure::Status(response) = failure
            && let Some(delay) = response
                .headers()
                .get(http::header::RETRY_AFTER)
                .and_then(parse_retry_after)
        {
            return delay;
        }
        self.delay_for_attempt(attempt)
    }
}

/// Outcome of a single request attempt, as seen by the retry driver.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// A response that is final regardless of remaining attempts.
    Success(Response),
    /// A failure that may be retried while attempts remain.
    Retryable(RetryableFailure),
    /// A failure that must not be retried.
    Fatal(HttpClientError),
}

/// A failure eligible for retry.
#[derive(Debug)]
pub enum RetryableFailure {
    /// 5xx or 429 response.
    Status(Response),
    /// Transport-level error (connect, timeout, I/O).
    Transport(HttpClientError),
}

impl RetryableFailure {
    /// Result handed to the caller once retries are exhausted: the last
    /// response is returned as-is, the last transport error is raised.
    pub fn into_result(self) -> Result<Response> {
        match self {
            Self::Status(response) => Ok(response),
            Self::Transport(error) => Err(error),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Status(response) => format!("status {}", response.status()),
            Self::Transport(error) => error.to_string(),
        }
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
///
/// HTTP-date values, negative numbers and values too large for a
/// `Duration` yield `None`.
pub fn parse_retry_after(value: &HeaderValue) -> Option<Duration> {
    let seconds: f64 = value.to_str().ok()?.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Backoff strategy for retries.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Exponential backoff: `initial * multiplier^attempt`.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn response(status: u16, retry_after: Option<&'static str>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(value) = retry_after {
            headers.insert(http::header::RETRY_AFTER, HeaderValue::from_static(value));
        }
        Response::from_parts(
            StatusCode::from_u16(status).unwrap(),
            headers,
            bytes::Bytes::new(),
            url::Url::parse("http://test.local/").unwrap(),
        )
    }

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        };

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(strategy.delay_for_attempt(20), Duration::from_secs(10));
        assert_eq!(strategy.delay_for_attempt(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_immediate_backoff() {
        let config = RetryConfig::immediate(2);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(5), Duration::ZERO);
    }

    #[test]
    fn test_parse_retry_after() {
        let parse = |s: &'static str| parse_retry_after(&HeaderValue::from_static(s));

        assert_eq!(parse("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(parse("0"), Some(Duration::ZERO));
        assert_eq!(parse("-1"), None);
        assert_eq!(parse("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse("1e300"), None);
        assert_eq!(parse("inf"), None);
        assert_eq!(parse("NaN"), None);
    }

    #[test]
    fn test_classify_statuses() {
        let config = RetryConfig::default();

        assert!(matches!(
            config.classify(Ok(response(200, None))),
            AttemptOutcome::Success(_)
        ));
        assert!(matches!(
            config.classify(Ok(response(404, None))),
            AttemptOutcome::Success(_)
        ));
        assert!(matches!(
            config.classify(Ok(response(503, None))),
            AttemptOutcome::Retryable(RetryableFailure::Status(_))
        ));
        assert!(matches!(
            config.classify(Ok(response(429, None))),
            AttemptOutcome::Retryable(RetryableFailure::Status(_))
        ));
    }

    #[test]
    fn test_classify_errors() {
        let config = RetryConfig::default();

        assert!(matches!(
            config.classify(Err(HttpClientError::Connection("refused".into()))),
            AttemptOutcome::Retryable(RetryableFailure::Transport(_))
        ));
        assert!(matches!(
            config.classify(Err(HttpClientError::InvalidUrl("bad".into()))),
            AttemptOutcome::Fatal(_)
        ));

        let no_connect = RetryConfig::default().no_retry_on_connection();
        assert!(matches!(
            no_connect.classify(Err(HttpClientError::Connection("refused".into()))),
            AttemptOutcome::Fatal(_)
        ));

        let no_timeout = RetryConfig::default().no_retry_on_timeout();
        assert!(matches!(
            no_timeout.classify(Err(HttpClientError::Timeout(Duration::from_secs(1)))),
            AttemptOutcome::Fatal(_)
        ));
    }

    #[test]
    fn test_delay_after_prefers_retry_after() {
        let config = RetryConfig::exponential(3, Duration::from_millis(100));

        let throttled = RetryableFailure::Status(response(429, Some("2")));
        assert_eq!(config.delay_after(0, &throttled), Duration::from_secs(2));

        let plain = RetryableFailure::Status(response(503, None));
        assert_eq!(config.delay_after(2, &plain), Duration::from_millis(400));

        let dated = RetryableFailure::Status(response(503, Some("Wed, 21 Oct 2015 07:28:00 GMT")));
        assert_eq!(config.delay_after(1, &dated), Duration::from_millis(200));

        let oversized = RetryableFailure::Status(response(503, Some("1e300")));
        assert_eq!(config.delay_after(1, &oversized), Duration::from_millis(200));

        let ignoring = config.ignore_retry_after();
        assert_eq!(ignoring.delay_after(0, &throttled), Duration::from_millis(100));
    }

    #[test]
    fn test_exhausted_failure_results() {
        let status = RetryableFailure::Status(response(503, None));
        assert_eq!(status.into_result().unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);

        let transport = RetryableFailure::Transport(HttpClientError::Connection("refused".into()));
        assert!(matches!(transport.into_result(), Err(HttpClientError::Connection(_))));
    }
}
