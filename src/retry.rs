//! Retry policies for requests sent through the transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::transport::Response;

/// Callback invoked for every matched response, as it arrives.
pub type ResponseCallback = Arc<dyn Fn(&Response) + Send + Sync>;

/// How often a request is sent and how long each attempt waits.
///
/// A request is complete once `expected_responses` distinct responses have
/// arrived. With no bound (`None`, used for discovery) the transport keeps
/// listening until every attempt has timed out and then returns whatever
/// it collected.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lifx_lan_rs::RetryPolicy;
///
/// let policy = RetryPolicy::unicast(3, Duration::from_millis(500))
///     .with_backoff(vec![Duration::from_millis(200), Duration::from_millis(800)]);
/// assert_eq!(policy.timeout(0), Duration::from_millis(200));
/// assert_eq!(policy.timeout(2), Duration::from_millis(800));
/// assert_eq!(policy.max_wait(), Duration::from_millis(2400));
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    attempts: u32,
    timeouts: Vec<Duration>,
    expected_responses: Option<usize>,
    on_response: Option<ResponseCallback>,
}

impl RetryPolicy {
    /// A request answered by exactly one response.
    pub fn unicast(attempts: u32, timeout: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            timeouts: vec![timeout],
            expected_responses: Some(1),
            on_response: None,
        }
    }

    /// A broadcast collecting every response until the attempts run out.
    pub fn broadcast(attempts: u32, timeout: Duration) -> Self {
        RetryPolicy {
            expected_responses: None,
            ..Self::unicast(attempts, timeout)
        }
    }

    /// Expect `count` responses; `None` waits for every attempt to time out.
    pub fn expecting(mut self, count: Option<usize>) -> Self {
        self.expected_responses = count;
        self
    }

    /// Use a different timeout per attempt; the last entry repeats.
    pub fn with_backoff(mut self, timeouts: Vec<Duration>) -> Self {
        if !timeouts.is_empty() {
            self.timeouts = timeouts;
        }
        self
    }

    pub fn with_on_response(mut self, callback: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Arc::new(callback));
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn expected_responses(&self) -> Option<usize> {
        self.expected_responses
    }

    /// Timeout of the zero-based `attempt`.
    pub fn timeout(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.timeouts.len().saturating_sub(1));
        self.timeouts.get(index).copied().unwrap_or_default()
    }

    /// Upper bound on the time a request with this policy can take.
    pub fn max_wait(&self) -> Duration {
        let longest = (0..self.attempts)
            .map(|a| self.timeout(a))
            .max()
            .unwrap_or_default();
        longest * self.attempts
    }

    pub(crate) fn notify(&self, response: &Response) {
        if let Some(callback) = &self.on_response {
            callback(response);
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("timeouts", &self.timeouts)
            .field("expected_responses", &self.expected_responses)
            .field("on_response", &self.on_response.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_at_least_one() {
        let policy = RetryPolicy::unicast(0, Duration::from_millis(10));
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.expected_responses(), Some(1));
    }

    #[test]
    fn test_timeout_index_is_clamped() {
        let policy = RetryPolicy::broadcast(5, Duration::from_millis(100));
        assert_eq!(policy.expected_responses(), None);
        assert_eq!(policy.timeout(0), Duration::from_millis(100));
        assert_eq!(policy.timeout(99), Duration::from_millis(100));
        assert_eq!(policy.max_wait(), Duration::from_millis(500));

        let empty_backoff = policy.with_backoff(vec![]);
        assert_eq!(empty_backoff.timeout(1), Duration::from_millis(100));
    }
}
