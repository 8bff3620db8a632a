//! Credential vault collaborator interface.

use crate::error::VaultError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Display for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / [redacted]", self.email)
    }
}

pub trait CredentialVault {
    /// Stored credentials for this account, if any. A vault read failure
    /// degrades to "none stored" at the call site.
    fn get_credentials(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Credentials>, VaultError>>;

    /// Persists credentials captured from the login form. Callers treat
    /// this as fire-and-forget: a failure is logged and never blocks the
    /// primary flow.
    fn save_credentials(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<(), VaultError>>;
}
