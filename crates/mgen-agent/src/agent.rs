//! The operations the host runtime drives.
//!
//! The host framework calls `ensure_authenticated`, then
//! `get_user_data_from_website`, then `fetch` — the agent does not own a
//! process of its own. The facade is generic over the host, vault, and
//! store collaborators, so every flow here runs against fakes in tests.

use mgen_core::identity::Identity;
use mgen_core::records::ReimbursementRecord;
use mgen_core::AppConfig;

use crate::documents::DocumentClient;
use crate::error::AgentError;
use crate::host::PortalHost;
use crate::intercept::{InterceptionBus, PayloadKind};
use crate::persist::{RecordStore, SaveOptions};
use crate::poll::{self, PollSettings};
use crate::profile::identity_from_profile;
use crate::selectors::{API_TOKEN_STORAGE_KEY, PERSONAL_SPACE_PATH};
use crate::session::{AuthSettings, SessionAuthenticator};
use crate::traverse::{Traversal, TraversalSettings};
use crate::vault::CredentialVault;

/// Account-linkage context the host runtime passes when it invokes the
/// agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentContext {
    /// True when this account was linked by a previous run. A first link
    /// triggers the logout probe so a stale session cannot leak another
    /// member's identity.
    pub has_prior_account: bool,
}

pub struct MgenAgent<H, V, S> {
    host: H,
    vault: V,
    store: S,
    bus: InterceptionBus,
    documents: DocumentClient,
    config: AppConfig,
    context: AgentContext,
}

impl<H, V, S> MgenAgent<H, V, S>
where
    H: PortalHost,
    V: CredentialVault,
    S: RecordStore,
{
    /// # Errors
    ///
    /// Fails when the document client cannot be constructed from the
    /// configuration.
    pub fn new(
        host: H,
        vault: V,
        store: S,
        bus: InterceptionBus,
        config: AppConfig,
        context: AgentContext,
    ) -> Result<Self, AgentError> {
        let documents = DocumentClient::new(
            config.request_timeout_secs,
            &config.user_agent,
            &config.member_api_base_url,
        )?;
        Ok(Self {
            host,
            vault,
            store,
            bus,
            documents,
            config,
            context,
        })
    }

    /// One full run in the order the host drives the operations.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal failure; whatever was persisted before
    /// it stands.
    pub async fn run(&mut self) -> Result<(), AgentError> {
        let has_prior_account = self.context.has_prior_account;
        self.ensure_authenticated(has_prior_account).await?;
        self.get_user_data_from_website().await?;
        self.fetch().await?;
        Ok(())
    }

    /// See [`SessionAuthenticator::ensure_authenticated`].
    ///
    /// # Errors
    ///
    /// Authentication and vendor-down failures, surfaced unmodified.
    pub async fn ensure_authenticated(
        &mut self,
        has_prior_account: bool,
    ) -> Result<bool, AgentError> {
        let settings = AuthSettings::from_config(&self.config);
        SessionAuthenticator::new(&mut self.host, &self.vault, settings)
            .ensure_authenticated(has_prior_account)
            .await
    }

    /// Builds the member identity from the intercepted profile payload and
    /// persists it.
    ///
    /// Navigating the personal space is what makes the portal emit the
    /// profile request; the bus then waits for the interception to land.
    ///
    /// # Errors
    ///
    /// [`AgentError::Timeout`] when the payload never arrives, payload
    /// mapping errors otherwise.
    pub async fn get_user_data_from_website(&mut self) -> Result<Identity, AgentError> {
        let url = format!("{}{PERSONAL_SPACE_PATH}", self.config.portal_base_url);
        self.host.goto(&url).await?;

        let settings = self.poll_settings();
        let payload = self.bus.wait_for(PayloadKind::UserProfile, settings).await?;
        let identity = identity_from_profile(&payload)?;
        self.store.save_identity(&identity).await?;
        Ok(identity)
    }

    /// Traverses the reimbursement history, materializing and persisting
    /// bills window by window, then fetches the attestation documents
    /// best-effort.
    ///
    /// # Errors
    ///
    /// Propagates traversal failures; attestation failures only log.
    pub async fn fetch(&mut self) -> Result<Vec<ReimbursementRecord>, AgentError> {
        let settings = TraversalSettings::from_config(&self.config);
        let today = chrono::Utc::now().date_naive();
        let records = Traversal::new(
            &mut self.host,
            &self.store,
            &self.documents,
            settings,
            &self.config.portal_base_url,
            today,
        )
        .run()
        .await?;
        tracing::info!(count = records.len(), "reimbursement traversal complete");

        // The attestations are a secondary flow; their failure must not
        // discard an otherwise successful run.
        if let Err(error) = self.fetch_attestations().await {
            tracing::warn!(%error, "attestation fetch failed; keeping run result");
        }

        Ok(records)
    }

    async fn fetch_attestations(&mut self) -> Result<(), AgentError> {
        let settings = self.poll_settings();

        let host = &self.host;
        let token = poll::until("member API bearer token", settings, || async move {
            host.storage_get(API_TOKEN_STORAGE_KEY).await
        })
        .await?;

        let runtime_config = self
            .bus
            .wait_for(PayloadKind::RuntimeConfig, settings)
            .await?;
        let api_key = runtime_config
            .get("apiKey")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AgentError::InvalidPayload {
                context: "runtime config payload".to_owned(),
                reason: "missing apiKey".to_owned(),
            })?;

        let documents = self.documents.fetch_attestations(&token, api_key).await?;
        self.store
            .save_files(&documents, &SaveOptions::keyed_by("filename"))
            .await?;
        Ok(())
    }

    fn poll_settings(&self) -> PollSettings {
        PollSettings::new(self.config.poll_interval_ms, self.config.wait_timeout_ms)
    }
}
