//! Bounded polling, the only wait primitive in the agent.
//!
//! The portal exposes no change events the agent can subscribe to, so every
//! wait is a fixed-interval probe loop with an explicit deadline. Nothing in
//! this crate blocks indefinitely; an expired deadline is a typed
//! [`AgentError::Timeout`], which is fatal everywhere except the auto-login
//! token wait.

use std::future::Future;
use std::time::Duration;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    #[must_use]
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Same probe interval, different deadline. Used for the waits whose
    /// deadline is configured separately (auto-login token, interactive
    /// login).
    #[must_use]
    pub fn with_timeout(self, timeout_ms: u64) -> Self {
        Self {
            interval: self.interval,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Polls `probe` at the configured interval until it yields a value or the
/// deadline expires.
///
/// The probe runs once immediately, so a condition that already holds never
/// sleeps.
///
/// # Errors
///
/// Returns [`AgentError::Timeout`] naming `what` when the deadline expires.
pub async fn until<T, F, Fut>(
    what: &str,
    settings: PollSettings,
    mut probe: F,
) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = tokio::time::Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if started.elapsed() >= settings.timeout {
            return Err(AgentError::Timeout {
                what: what.to_owned(),
                waited_ms: u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        tokio::time::sleep(settings.interval).await;
    }
}
