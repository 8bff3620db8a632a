pub mod agent;
pub mod documents;
pub mod error;
pub mod extract;
pub mod host;
pub mod intercept;
pub mod persist;
pub mod poll;
pub mod profile;
pub mod session;
pub mod traverse;
pub mod vault;

mod detail;
mod selectors;

#[cfg(test)]
mod testutil;

pub use agent::{AgentContext, MgenAgent};
pub use documents::{BillMaterializer, DocumentClient};
pub use error::{AgentError, AuthFailure, HostError, StoreError, VaultError};
pub use host::PortalHost;
pub use intercept::{InterceptionBus, PayloadKind};
pub use persist::{RecordStore, SaveOptions};
pub use poll::PollSettings;
pub use session::{AuthSettings, AuthStatus, SessionAuthenticator};
pub use traverse::{Traversal, TraversalCursor, TraversalSettings, TraversalState};
pub use vault::{Credentials, CredentialVault};
