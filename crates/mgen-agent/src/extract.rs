//! Row extraction: positional cell decomposition and the derivation of the
//! document fetch descriptor.
//!
//! A result row is fixed-width: treatment date, beneficiary, PDF-link cell,
//! reimbursement date, amount, then a status/action cell the agent ignores.
//! A row whose PDF cell carries no statement link has no retrievable
//! document; extraction yields `Ok(None)` and the caller skips it. That is
//! a valid outcome, not an error — genuinely malformed cells (unparseable
//! dates or amounts) are errors and abort the run.

use chrono::NaiveDate;
use percent_encoding::percent_decode_str;
use regex::Regex;
use rust_decimal::Decimal;

use mgen_core::records::{DocumentRequest, ReimbursementRecord};

use crate::error::AgentError;
use crate::host::PortalHost;
use crate::selectors::{
    row_cell_selector, row_pdf_link_selector, CELL_AMOUNT, CELL_BENEFICIARY,
    CELL_REIMBURSEMENT_DATE, CELL_TREATMENT_DATE,
};

/// The three parameters the portal embeds in each statement link's query
/// string; they complete the hidden detail-form fields.
const LINK_PARAMS: [&str; 3] = ["urlReleve", "dattrait", "dateReleve"];

const PORTAL_DATE_FORMAT: &str = "%d/%m/%Y";

/// Extracts one visible result row into a pre-reconciliation record.
///
/// `hidden_form` is the serialized detail-request form read once per page;
/// the row's own link parameters are overlaid on top of it to build the
/// document fetch descriptor.
///
/// # Errors
///
/// [`AgentError::Markup`] when a positional cell is missing or carries an
/// unparseable date or amount.
pub async fn extract_row<H: PortalHost>(
    host: &H,
    base_url: &str,
    hidden_form: &[(String, String)],
    index: usize,
) -> Result<Option<ReimbursementRecord>, AgentError> {
    let Some(raw_href) = host.attr(&row_pdf_link_selector(index), "href").await else {
        tracing::debug!(index, "row has no statement link; skipping");
        return Ok(None);
    };
    let Some(href) = normalize_document_href(&raw_href) else {
        tracing::debug!(index, raw_href, "statement link is not decodable; skipping");
        return Ok(None);
    };
    if !is_statement_link(&href) {
        tracing::debug!(index, href, "link in PDF cell is not a statement link; skipping");
        return Ok(None);
    }

    let mut params = Vec::with_capacity(LINK_PARAMS.len());
    for name in LINK_PARAMS {
        match extract_query_param(&href, name) {
            Some(value) => params.push((name.to_owned(), value)),
            None => {
                tracing::debug!(index, href, name, "statement link lacks parameter; skipping");
                return Ok(None);
            }
        }
    }

    let treatment_raw = cell_text(host, index, CELL_TREATMENT_DATE).await?;
    let beneficiary = cell_text(host, index, CELL_BENEFICIARY).await?;
    let reimbursement_raw = cell_text(host, index, CELL_REIMBURSEMENT_DATE).await?;
    let amount_raw = cell_text(host, index, CELL_AMOUNT).await?;

    let treatment_date = parse_portal_date(&treatment_raw).ok_or_else(|| AgentError::Markup {
        context: format!("row {index} treatment date \"{treatment_raw}\""),
    })?;
    let reimbursement_date =
        parse_portal_date(&reimbursement_raw).ok_or_else(|| AgentError::Markup {
            context: format!("row {index} reimbursement date \"{reimbursement_raw}\""),
        })?;
    let (amount, currency) = parse_amount(&amount_raw)
        .filter(|(_, currency)| !currency.is_empty())
        .ok_or_else(|| AgentError::Markup {
            context: format!("row {index} amount \"{amount_raw}\""),
        })?;

    let url = if href.starts_with("http://") || href.starts_with("https://") {
        href
    } else {
        format!("{base_url}{href}")
    };

    // The statement and treatment dates from the link name the document
    // stably across runs; the amount disambiguates lines within one
    // statement.
    let vendor_ref = format!("MGEN_{}_{}_{amount}", params[2].1, params[1].1);

    let document_request = DocumentRequest {
        url,
        form: overlay_form(hidden_form, &params),
    };

    Ok(Some(ReimbursementRecord::new(
        vendor_ref,
        treatment_date,
        reimbursement_date,
        beneficiary,
        amount,
        currency,
        document_request,
    )))
}

async fn cell_text<H: PortalHost>(
    host: &H,
    index: usize,
    cell: usize,
) -> Result<String, AgentError> {
    host.text(&row_cell_selector(index, cell))
        .await
        .map(|text| text.trim().to_owned())
        .ok_or_else(|| AgentError::Markup {
            context: format!("row {index} is missing cell {cell}"),
        })
}

/// Parses the portal's day/month/year date cells.
pub(crate) fn parse_portal_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), PORTAL_DATE_FORMAT).ok()
}

/// Parses a portal money string such as `"12,50 €"` or `"1 234,56 €"` into
/// a decimal amount and its currency symbol.
///
/// Digits and separators form the number (comma is the decimal separator,
/// converted to `.`); whitespace — including the non-breaking thousands
/// separator — is dropped; whatever remains is the currency.
pub(crate) fn parse_amount(raw: &str) -> Option<(Decimal, String)> {
    let mut number = String::new();
    let mut currency = String::new();
    for ch in raw.trim().chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
        } else if ch == ',' || ch == '.' {
            number.push('.');
        } else if ch == '-' && number.is_empty() {
            number.push('-');
        } else if !ch.is_whitespace() {
            currency.push(ch);
        }
    }
    if number.is_empty() {
        return None;
    }
    let value: Decimal = number.parse().ok()?;
    Some((value, currency))
}

/// Recognises the statement-download link the portal renders inside the
/// PDF cell. Other links occasionally land in that cell (help pages,
/// mandate forms); they carry no retrievable statement.
pub(crate) fn is_statement_link(href: &str) -> bool {
    let re = Regex::new(r"(?i)releve[^?]*\.pdf\?").expect("valid regex");
    re.is_match(href)
}

/// Normalizes a statement href as served in the markup: HTML entities
/// collapsed, percent-encoding decoded.
pub(crate) fn normalize_document_href(raw: &str) -> Option<String> {
    let unescaped = raw.replace("&amp;", "&");
    percent_decode_str(&unescaped)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Extracts the value of a named query parameter from a URL string.
pub(crate) fn extract_query_param(url: &str, param: &str) -> Option<String> {
    let query_start = url.find('?')? + 1;
    let query = &url[query_start..];

    let needle = format!("{param}=");
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix(needle.as_str()) {
            let value = value.split('#').next().unwrap_or(value);
            if !value.is_empty() {
                return Some(value.to_owned());
            }
        }
    }
    None
}

/// Hidden detail-form fields overlaid with the link-derived parameters:
/// same-name fields are replaced, new ones appended, order preserved.
pub(crate) fn overlay_form(
    hidden: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = hidden.to_vec();
    for (name, value) in overrides {
        if let Some(existing) = merged.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.clone();
        } else {
            merged.push((name.clone(), value.clone()));
        }
    }
    merged
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
