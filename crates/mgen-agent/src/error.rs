use thiserror::Error;

/// Why the portal refused authentication. Both variants are fatal to the
/// run and surfaced to the host unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    BadCredentials,
    AccountBlocked,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::BadCredentials => write!(f, "bad credentials"),
            AuthFailure::AccountBlocked => write!(f, "account blocked (too many attempts)"),
        }
    }
}

/// Failures reported by the browser-automation host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
}

/// Persistence collaborator failure. Opaque to the agent; whatever was
/// saved before it is not rolled back.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Credential vault failure. Vault writes are fire-and-forget; reads that
/// fail degrade to "no stored credentials".
#[derive(Debug, Error)]
#[error("{0}")]
pub struct VaultError(pub String);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("authentication failed: {0}")]
    Authentication(AuthFailure),

    #[error("bounded wait for {what} exceeded {waited_ms}ms")]
    Timeout { what: String, waited_ms: u64 },

    #[error("vendor portal is unavailable")]
    VendorUnavailable,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("unexpected markup in {context}")]
    Markup { context: String },

    #[error("invalid payload for {context}: {reason}")]
    InvalidPayload { context: String, reason: String },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("persistence failure: {0}")]
    Persist(#[from] StoreError),
}

impl AgentError {
    /// True when the error is a bounded-wait timeout. The authenticator
    /// uses this to tell the recoverable auto-login timeout apart from
    /// failures that must abort the run.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout { .. })
    }
}
