//! Persistence collaborator interface.
//!
//! All operations are idempotent, keyed by the attributes named in
//! [`SaveOptions`]: re-running the agent over already-stored documents must
//! not duplicate them.

use mgen_core::identity::Identity;
use mgen_core::records::{DocumentFile, ReimbursementRecord};

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Record attributes forming the de-duplication key (`"vendorRef"` for
    /// bills, `"filename"` for attestations).
    pub file_id_attributes: Vec<String>,
}

impl SaveOptions {
    #[must_use]
    pub fn keyed_by(attribute: &str) -> Self {
        Self {
            file_id_attributes: vec![attribute.to_owned()],
        }
    }
}

pub trait RecordStore {
    fn save_bills(
        &self,
        records: &[ReimbursementRecord],
        options: &SaveOptions,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    fn save_files(
        &self,
        documents: &[DocumentFile],
        options: &SaveOptions,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    fn save_identity(
        &self,
        identity: &Identity,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;
}
