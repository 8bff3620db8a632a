//! Detail reconciliation.
//!
//! The third-party-payer fact is not present in the summary row; it only
//! appears in the details sub-view reached by an in-page click. The click
//! swaps the shared details container to the selected row's breakdown —
//! a DOM mutation, so the only wait is for the container itself.

use mgen_core::records::ReimbursementRecord;

use crate::error::AgentError;
use crate::extract::parse_amount;
use crate::host::PortalHost;
use crate::poll::{self, PollSettings};
use crate::selectors::{row_detail_toggle_selector, DETAIL_CONTAINER, DETAIL_THIRD_PARTY_PRICE};

/// Opens the row's details sub-view and merges the third-party-payer fields
/// into the record.
///
/// Absence of the third-party price element means "no third-party payer" —
/// the common case, and not an error.
///
/// # Errors
///
/// [`AgentError::Timeout`] when the details container never appears;
/// [`AgentError::Markup`] when the price element is present but does not
/// parse as an amount.
pub(crate) async fn reconcile_third_party<H: PortalHost>(
    host: &mut H,
    settings: PollSettings,
    index: usize,
    record: &mut ReimbursementRecord,
) -> Result<(), AgentError> {
    host.click(&row_detail_toggle_selector(index)).await?;
    let probe_host = &*host;
    poll::until("reimbursement details container", settings, || async move {
        probe_host.exists(DETAIL_CONTAINER).await.then_some(())
    })
    .await?;

    let Some(price_text) = host.text(DETAIL_THIRD_PARTY_PRICE).await else {
        return Ok(());
    };

    let (refund, _) = parse_amount(&price_text).ok_or_else(|| AgentError::Markup {
        context: format!("row {index} third-party price \"{price_text}\""),
    })?;

    record.is_third_party_payer = true;
    record.third_party_refund = Some(refund.round_dp(2));
    tracing::debug!(
        index,
        refund = %refund,
        "row is paid through a third party"
    );
    Ok(())
}
