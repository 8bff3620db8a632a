//! Session establishment against the portal's login surface.
//!
//! The happy path is a silent auto-login with vault credentials. The portal
//! gates submission behind an invisible bot-check token that its own
//! scripts populate asynchronously, so auto-login waits for the token
//! before submitting. When silent login cannot complete — no stored
//! credentials, token never populates, portal rejects the password — the
//! native form is handed to a human and the authenticator waits for the
//! authenticated markers instead. A blocked account is fatal either way:
//! retyping a password does not unblock it.

use mgen_core::AppConfig;

use crate::error::{AgentError, AuthFailure};
use crate::host::PortalHost;
use crate::poll::{self, PollSettings};
use crate::selectors::{
    AUTHENTICATED_MARKER, BLOCKED_ACCOUNT_MESSAGE, BOT_CHECK_TOKEN_FIELD, LOGIN_ERROR_BOX,
    LOGIN_FORM, LOGIN_PASS_FIELD, LOGIN_PATH, LOGIN_USER_FIELD, LOGOUT_LINK,
    STAY_LOGGED_IN_BUTTON, VENDOR_DOWN_PATH,
};
use crate::vault::{CredentialVault, Credentials};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub base_url: String,
    pub poll: PollSettings,
    pub auto_login_token_timeout_ms: u64,
    pub interactive_login_timeout_ms: u64,
}

impl AuthSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.portal_base_url.clone(),
            poll: PollSettings::new(config.poll_interval_ms, config.wait_timeout_ms),
            auto_login_token_timeout_ms: config.auto_login_token_timeout_ms,
            interactive_login_timeout_ms: config.interactive_login_timeout_ms,
        }
    }
}

enum LoginSurface {
    Form,
    AlreadyAuthenticated,
}

enum LoginOutcome {
    Authenticated,
    Rejected(String),
}

pub struct SessionAuthenticator<'a, H, V> {
    host: &'a mut H,
    vault: &'a V,
    settings: AuthSettings,
    status: AuthStatus,
}

impl<'a, H, V> SessionAuthenticator<'a, H, V>
where
    H: PortalHost,
    V: CredentialVault,
{
    pub fn new(host: &'a mut H, vault: &'a V, settings: AuthSettings) -> Self {
        Self {
            host,
            vault,
            settings,
            status: AuthStatus::Unauthenticated,
        }
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.status
    }

    /// Guarantees the session is authenticated on `Ok`.
    ///
    /// Without a prior linked account, a logout probe runs first: a stale
    /// session from an earlier run would otherwise pollute the identity
    /// data captured later.
    ///
    /// # Errors
    ///
    /// [`AgentError::VendorUnavailable`] when the portal redirects to its
    /// outage surface, [`AgentError::Authentication`] when it rejects the
    /// account, [`AgentError::Timeout`] when neither surface appears or an
    /// interactive login never completes.
    pub async fn ensure_authenticated(
        &mut self,
        has_prior_account: bool,
    ) -> Result<bool, AgentError> {
        let result = self.authenticate(has_prior_account).await;
        self.status = match &result {
            Ok(()) => AuthStatus::Authenticated,
            Err(AgentError::Authentication(AuthFailure::AccountBlocked)) => AuthStatus::Blocked,
            Err(_) => AuthStatus::Unauthenticated,
        };
        result.map(|()| true)
    }

    async fn authenticate(&mut self, has_prior_account: bool) -> Result<(), AgentError> {
        if !has_prior_account {
            self.logout_probe().await?;
        }

        self.goto_login().await?;
        match self.detect_surface().await? {
            LoginSurface::AlreadyAuthenticated => {
                tracing::info!("session already authenticated");
                if self.host.exists(STAY_LOGGED_IN_BUTTON).await {
                    self.host.click(STAY_LOGGED_IN_BUTTON).await?;
                }
                Ok(())
            }
            LoginSurface::Form => {
                // Concurrent automation must not race the human or the
                // autofill while the form is live.
                self.host.set_user_interaction(false);
                let result = self.login_with_form().await;
                self.host.set_user_interaction(true);
                result
            }
        }
    }

    async fn goto_login(&mut self) -> Result<(), AgentError> {
        let url = format!("{}{LOGIN_PATH}", self.settings.base_url);
        self.host.goto(&url).await?;
        if self.host.current_url().await.contains(VENDOR_DOWN_PATH) {
            return Err(AgentError::VendorUnavailable);
        }
        Ok(())
    }

    async fn logout_probe(&mut self) -> Result<(), AgentError> {
        self.goto_login().await?;
        if self.host.exists(AUTHENTICATED_MARKER).await {
            tracing::info!("stale session found before account link; logging out");
            self.host.click(LOGOUT_LINK).await?;
            let host = &*self.host;
            poll::until("login form after logout", self.settings.poll, || async move {
                host.exists(LOGIN_FORM).await.then_some(())
            })
            .await?;
        }
        Ok(())
    }

    /// Races the two login-surface detectors; whichever marker appears
    /// first decides the branch.
    async fn detect_surface(&mut self) -> Result<LoginSurface, AgentError> {
        let host = &*self.host;
        poll::until(
            "login form or authenticated marker",
            self.settings.poll,
            || async move {
                if host.exists(LOGIN_FORM).await {
                    Some(LoginSurface::Form)
                } else if host.exists(AUTHENTICATED_MARKER).await {
                    Some(LoginSurface::AlreadyAuthenticated)
                } else {
                    None
                }
            },
        )
        .await
    }

    async fn login_with_form(&mut self) -> Result<(), AgentError> {
        let credentials = match self.vault.get_credentials().await {
            Ok(credentials) => credentials,
            Err(error) => {
                tracing::warn!(%error, "vault read failed; treating as no stored credentials");
                None
            }
        };

        if let Some(credentials) = credentials {
            match self.auto_login(&credentials).await {
                Ok(()) => return Ok(()),
                Err(AgentError::Authentication(AuthFailure::AccountBlocked)) => {
                    return Err(AgentError::Authentication(AuthFailure::AccountBlocked));
                }
                Err(error) if error.is_timeout() => {
                    tracing::warn!(%error, "silent auto-login timed out; handing over to the user");
                }
                Err(AgentError::Authentication(AuthFailure::BadCredentials)) => {
                    tracing::warn!("stored credentials rejected; handing over to the user");
                }
                Err(error) => return Err(error),
            }
        } else {
            tracing::info!("no stored credentials; handing over to the user");
        }

        self.interactive_login().await
    }

    async fn auto_login(&mut self, credentials: &Credentials) -> Result<(), AgentError> {
        tracing::info!(account = credentials.email.as_str(), "attempting silent auto-login");
        self.host
            .fill(LOGIN_USER_FIELD, &credentials.email)
            .await?;
        self.host
            .fill(LOGIN_PASS_FIELD, &credentials.password)
            .await?;

        // The portal's scripts populate the token after their own checks;
        // submitting before it carries a value is rejected outright.
        let token_wait = self
            .settings
            .poll
            .with_timeout(self.settings.auto_login_token_timeout_ms);
        let host = &*self.host;
        poll::until("bot-check token", token_wait, || async move {
            host.attr(BOT_CHECK_TOKEN_FIELD, "value")
                .await
                .filter(|value| !value.is_empty())
                .map(|_| ())
        })
        .await?;

        self.forward_credentials().await;
        self.host.submit(LOGIN_FORM).await?;

        match self.await_login_outcome(self.settings.poll).await? {
            LoginOutcome::Authenticated => Ok(()),
            LoginOutcome::Rejected(message) => Err(Self::rejection_error(&message)),
        }
    }

    /// Hands the native form to a human and waits for the authenticated
    /// markers. A blocked-account message aborts immediately; any other
    /// rejection leaves the human free to retry until the deadline.
    async fn interactive_login(&mut self) -> Result<(), AgentError> {
        tracing::info!("waiting for interactive login");
        let wait = self
            .settings
            .poll
            .with_timeout(self.settings.interactive_login_timeout_ms);
        let host = &*self.host;
        let result = poll::until("interactive login", wait, || async move {
            if host.exists(AUTHENTICATED_MARKER).await {
                return Some(Ok(()));
            }
            if let Some(message) = host.text(LOGIN_ERROR_BOX).await {
                if message.contains(BLOCKED_ACCOUNT_MESSAGE) {
                    return Some(Err(AgentError::Authentication(
                        AuthFailure::AccountBlocked,
                    )));
                }
            }
            None
        })
        .await;

        match result {
            Ok(Ok(())) => {
                self.forward_credentials().await;
                Ok(())
            }
            Ok(Err(error)) => Err(error),
            Err(timeout) => {
                // A visible rejection at the deadline means the human's
                // attempts kept failing, not that the portal went quiet.
                if self.host.text(LOGIN_ERROR_BOX).await.is_some() {
                    Err(AgentError::Authentication(AuthFailure::BadCredentials))
                } else {
                    Err(timeout)
                }
            }
        }
    }

    async fn await_login_outcome(&self, wait: PollSettings) -> Result<LoginOutcome, AgentError> {
        let host = &*self.host;
        poll::until("login outcome", wait, || async move {
            if host.exists(AUTHENTICATED_MARKER).await {
                Some(LoginOutcome::Authenticated)
            } else {
                host.text(LOGIN_ERROR_BOX).await.map(LoginOutcome::Rejected)
            }
        })
        .await
    }

    fn rejection_error(message: &str) -> AgentError {
        tracing::error!(rejection = message, "portal rejected login");
        if message.contains(BLOCKED_ACCOUNT_MESSAGE) {
            AgentError::Authentication(AuthFailure::AccountBlocked)
        } else {
            AgentError::Authentication(AuthFailure::BadCredentials)
        }
    }

    /// Forwards whatever the form currently holds to the vault. Capture is
    /// best-effort by contract: a failure is logged and never blocks login.
    async fn forward_credentials(&self) {
        let email = self
            .host
            .attr(LOGIN_USER_FIELD, "value")
            .await
            .unwrap_or_default();
        let password = self
            .host
            .attr(LOGIN_PASS_FIELD, "value")
            .await
            .unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return;
        }
        let credentials = Credentials { email, password };
        if let Err(error) = self.vault.save_credentials(&credentials).await {
            tracing::warn!(%error, "failed to forward captured credentials to the vault");
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
