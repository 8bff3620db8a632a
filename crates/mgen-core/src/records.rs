//! Canonical output records handed to the persistence collaborator.
//!
//! The wire shape uses the downstream store's exact JSON keys, including the
//! historical `reimbursmentDate` spelling — consumers already index on it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Parameters required to retrieve one bill's PDF from the portal: the
/// statement endpoint plus the form fields for the authenticated POST,
/// in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
}

/// File-level metadata attached to each persisted record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub content_author: String,
    pub issue_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttributes {
    pub metadata: FileMetadata,
}

/// One reimbursement line, reconciled across the summary row and the
/// details sub-view. Terminal state is "ready to persist".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementRecord {
    /// Stable per-document identifier; the persistence layer de-duplicates
    /// on it across runs.
    pub vendor_ref: String,
    pub vendor: String,
    /// Same value as `reimbursement_date`; the store treats `date` as the
    /// record's primary date.
    pub date: NaiveDate,
    pub treatment_date: NaiveDate,
    #[serde(rename = "reimbursmentDate")]
    pub reimbursement_date: NaiveDate,
    pub beneficiary: String,
    pub amount: Decimal,
    pub currency: String,
    pub filename: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_third_party_payer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_refund: Option<Decimal>,
    /// Rounded sum of the amounts of every record sharing one statement
    /// document. See [`assign_group_amounts`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_amount: Option<Decimal>,
    pub file_attributes: FileAttributes,
    /// How to fetch the PDF. Not part of the wire record.
    #[serde(skip)]
    pub document_request: DocumentRequest,
    /// Base64-encoded PDF body, populated lazily by the materializer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
}

impl ReimbursementRecord {
    /// Builds a record in its pre-reconciliation state: no third-party
    /// fields, no group amount, no document body.
    #[must_use]
    pub fn new(
        vendor_ref: String,
        treatment_date: NaiveDate,
        reimbursement_date: NaiveDate,
        beneficiary: String,
        amount: Decimal,
        currency: String,
        document_request: DocumentRequest,
    ) -> Self {
        let filename = bill_filename(treatment_date, &amount, &currency);
        Self {
            vendor_ref,
            vendor: VENDOR.to_owned(),
            date: reimbursement_date,
            treatment_date,
            reimbursement_date,
            beneficiary,
            amount,
            currency,
            filename,
            is_third_party_payer: false,
            third_party_refund: None,
            group_amount: None,
            file_attributes: FileAttributes {
                metadata: FileMetadata {
                    content_author: "mgen".to_owned(),
                    issue_date: reimbursement_date,
                },
            },
            document_request,
            file_content: None,
        }
    }
}

/// A standalone fetched document (attestations), keyed by filename.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub filename: String,
    pub vendor: String,
    /// Base64-encoded PDF body.
    pub file_content: String,
}

pub const VENDOR: &str = "MGEN";

/// Derives the deterministic bill filename:
/// `{treatment date:%Y-%m-%d}_MGEN_{amount}{currency}.pdf`.
#[must_use]
pub fn bill_filename(treatment_date: NaiveDate, amount: &Decimal, currency: &str) -> String {
    format!(
        "{}_{VENDOR}_{amount}{currency}.pdf",
        treatment_date.format("%Y-%m-%d")
    )
}

/// Several reimbursement lines can share one statement PDF. Stamps each
/// record with the rounded (2 decimal places) sum of the amounts of all
/// records fetched through the same statement URL.
pub fn assign_group_amounts(records: &mut [ReimbursementRecord]) {
    use std::collections::HashMap;

    let mut sums: HashMap<&str, Decimal> = HashMap::new();
    for record in records.iter() {
        *sums
            .entry(record.document_request.url.as_str())
            .or_insert(Decimal::ZERO) += record.amount;
    }
    let sums: HashMap<String, Decimal> = sums
        .into_iter()
        .map(|(url, sum)| (url.to_owned(), sum.round_dp(2)))
        .collect();
    for record in records.iter_mut() {
        record.group_amount = sums.get(&record.document_request.url).copied();
    }
}
