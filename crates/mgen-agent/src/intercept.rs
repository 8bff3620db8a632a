//! Passive network interception.
//!
//! The profile record and the runtime config are only emitted as side
//! effects of certain page navigations; there is no endpoint the agent can
//! call proactively before the page has completed its in-session handshake.
//! The host's network layer therefore offers every completed response to
//! this bus, which keeps the first match per payload kind.
//!
//! This replaces the ambient global buffers of earlier incarnations with an
//! explicit, injectable observer: producer (network event handler) and
//! consumer (poll loop) share a cloneable handle, the slots are write-once,
//! and consumers never remove — the one piece of concurrency in the agent.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::AgentError;
use crate::poll::{self, PollSettings};
use crate::selectors::{PROFILE_ENDPOINT_MARKER, RUNTIME_CONFIG_ENDPOINT_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    UserProfile,
    RuntimeConfig,
}

impl PayloadKind {
    fn endpoint_marker(self) -> &'static str {
        match self {
            PayloadKind::UserProfile => PROFILE_ENDPOINT_MARKER,
            PayloadKind::RuntimeConfig => RUNTIME_CONFIG_ENDPOINT_MARKER,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            PayloadKind::UserProfile => "user profile payload",
            PayloadKind::RuntimeConfig => "runtime config payload",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterceptedPayload {
    pub kind: PayloadKind,
    pub body: serde_json::Value,
    pub received_at: Instant,
}

#[derive(Debug, Default)]
struct Slots {
    user_profile: Option<InterceptedPayload>,
    runtime_config: Option<InterceptedPayload>,
}

impl Slots {
    fn slot_mut(&mut self, kind: PayloadKind) -> &mut Option<InterceptedPayload> {
        match kind {
            PayloadKind::UserProfile => &mut self.user_profile,
            PayloadKind::RuntimeConfig => &mut self.runtime_config,
        }
    }

    fn slot(&self, kind: PayloadKind) -> &Option<InterceptedPayload> {
        match kind {
            PayloadKind::UserProfile => &self.user_profile,
            PayloadKind::RuntimeConfig => &self.runtime_config,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterceptionBus {
    slots: Arc<Mutex<Slots>>,
}

impl InterceptionBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers one completed response to the bus. Returns `true` when the
    /// body was captured as the canonical payload for its kind.
    ///
    /// Responses whose URL matches no known endpoint are ignored, as is
    /// every match after the first per kind. A matching body that is not
    /// valid JSON is dropped with a warning — the traffic was not requested
    /// by the agent, so a malformed payload is not fatal.
    pub fn offer(&self, url: &str, body: &str) -> bool {
        let Some(kind) = Self::match_kind(url) else {
            return false;
        };

        let parsed = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(url, %error, "intercepted payload is not valid JSON; dropping");
                return false;
            }
        };

        let mut slots = self.slots.lock().expect("interception slots poisoned");
        let slot = slots.slot_mut(kind);
        if slot.is_some() {
            return false;
        }
        tracing::debug!(url, kind = kind.describe(), "captured intercepted payload");
        *slot = Some(InterceptedPayload {
            kind,
            body: parsed,
            received_at: Instant::now(),
        });
        true
    }

    /// Non-blocking read of the canonical payload for `kind`.
    #[must_use]
    pub fn get(&self, kind: PayloadKind) -> Option<serde_json::Value> {
        self.slots
            .lock()
            .expect("interception slots poisoned")
            .slot(kind)
            .as_ref()
            .map(|payload| payload.body.clone())
    }

    /// Polls until the payload for `kind` has been captured.
    ///
    /// The caller must already have triggered the navigation that causes
    /// the matching request; this wait cannot conjure traffic.
    ///
    /// # Errors
    ///
    /// [`AgentError::Timeout`] when no matching response arrives in time.
    pub async fn wait_for(
        &self,
        kind: PayloadKind,
        settings: PollSettings,
    ) -> Result<serde_json::Value, AgentError> {
        poll::until(kind.describe(), settings, || async move { self.get(kind) }).await
    }

    fn match_kind(url: &str) -> Option<PayloadKind> {
        if url.contains(PayloadKind::UserProfile.endpoint_marker()) {
            Some(PayloadKind::UserProfile)
        } else if url.contains(PayloadKind::RuntimeConfig.endpoint_marker()) {
            Some(PayloadKind::RuntimeConfig)
        } else {
            None
        }
    }
}
