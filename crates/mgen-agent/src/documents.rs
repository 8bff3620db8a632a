//! Document materialization.
//!
//! Two fetch modes: per-bill statement PDFs via an authenticated form POST
//! against the portal, and the two cross-cutting attestation documents via
//! the member REST API. The API flow authenticates with a bearer token the
//! portal leaves in session storage and an API key recovered from the
//! intercepted runtime config; each attestation response embeds its PDF as
//! base64 directly, so no follow-up fetch is needed.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use mgen_core::records::{DocumentFile, DocumentRequest, ReimbursementRecord, VENDOR};

use crate::error::AgentError;

/// The two attestation endpoints, fetched sequentially. Both documents are
/// replaced on every run, keyed by these fixed filenames.
const ATTESTATION_REQUESTS: [(&str, &str); 2] = [
    ("attestations/droits", "Attestation_mutuelle.pdf"),
    ("attestations/tiers-payant", "Carte_tiers_payant.pdf"),
];

/// Populates a record's document body before it is persisted.
pub trait BillMaterializer {
    fn materialize(
        &self,
        record: &mut ReimbursementRecord,
    ) -> impl std::future::Future<Output = Result<(), AgentError>>;
}

#[derive(Debug, Deserialize)]
struct AttestationResponse {
    /// Base64-encoded PDF body.
    document: String,
}

/// HTTP client for document retrieval.
///
/// Keeps its own cookie store: the statement POSTs only succeed inside the
/// authenticated portal session. The member API base URL is injectable so
/// tests can point it at a mock server.
pub struct DocumentClient {
    client: reqwest::Client,
    api_base: reqwest::Url,
}

impl DocumentClient {
    /// # Errors
    ///
    /// [`AgentError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed, [`AgentError::InvalidUrl`] if `api_base_url` does not
    /// parse.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        api_base_url: &str,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so
        // that join() appends to the path rather than replacing its last
        // segment.
        let normalised = format!("{}/", api_base_url.trim_end_matches('/'));
        let api_base = reqwest::Url::parse(&normalised).map_err(|e| AgentError::InvalidUrl {
            url: api_base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, api_base })
    }

    /// Fetches one bill's statement PDF through the authenticated form
    /// POST described by the record's fetch descriptor.
    ///
    /// # Errors
    ///
    /// [`AgentError::Http`] on network failure,
    /// [`AgentError::UnexpectedStatus`] on any non-2xx response.
    pub async fn fetch_bill_pdf(&self, request: &DocumentRequest) -> Result<Vec<u8>, AgentError> {
        let response = self
            .client
            .post(&request.url)
            .form(&request.form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::UnexpectedStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetches both attestation documents from the member API.
    ///
    /// The requests run sequentially; a failure on the first aborts before
    /// the second is attempted.
    ///
    /// # Errors
    ///
    /// [`AgentError::Http`] / [`AgentError::UnexpectedStatus`] on
    /// transport failure, [`AgentError::Deserialize`] when a response is
    /// not the expected JSON shape, [`AgentError::InvalidPayload`] when
    /// the embedded document is not valid base64.
    pub async fn fetch_attestations(
        &self,
        bearer_token: &str,
        api_key: &str,
    ) -> Result<Vec<DocumentFile>, AgentError> {
        let mut documents = Vec::with_capacity(ATTESTATION_REQUESTS.len());
        for (path, filename) in ATTESTATION_REQUESTS {
            let url = self.api_base.join(path).map_err(|e| AgentError::InvalidUrl {
                url: format!("{}{path}", self.api_base),
                reason: e.to_string(),
            })?;

            tracing::debug!(%url, filename, "fetching attestation document");
            let response = self
                .client
                .post(url.clone())
                .bearer_auth(bearer_token)
                .header("X-Api-Key", api_key)
                .json(&serde_json::json!({ "format": "pdf" }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AgentError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            let parsed = serde_json::from_str::<AttestationResponse>(&body).map_err(|e| {
                AgentError::Deserialize {
                    context: format!("attestation response from {path}"),
                    source: e,
                }
            })?;

            // The embedded body goes to the store as-is; reject it here if
            // it is not actually base64.
            BASE64
                .decode(parsed.document.as_bytes())
                .map_err(|e| AgentError::InvalidPayload {
                    context: filename.to_owned(),
                    reason: e.to_string(),
                })?;

            documents.push(DocumentFile {
                filename: filename.to_owned(),
                vendor: VENDOR.to_owned(),
                file_content: parsed.document,
            });
        }
        Ok(documents)
    }
}

impl BillMaterializer for DocumentClient {
    async fn materialize(&self, record: &mut ReimbursementRecord) -> Result<(), AgentError> {
        let bytes = self.fetch_bill_pdf(&record.document_request).await?;
        record.file_content = Some(BASE64.encode(&bytes));
        Ok(())
    }
}
