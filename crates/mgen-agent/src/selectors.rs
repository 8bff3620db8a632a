//! Every portal path, endpoint marker, and CSS selector in one place.
//!
//! The portal's markup changes over time and these strings are expected to
//! be resynchronized against it; keeping them out of the traversal and
//! extraction logic keeps that churn contained.

// Portal paths.
pub(crate) const LOGIN_PATH: &str = "/login-adherent/";
pub(crate) const VENDOR_DOWN_PATH: &str = "/services-indisponibles/";
pub(crate) const PERSONAL_SPACE_PATH: &str = "/mon-espace-perso/";
pub(crate) const REIMBURSEMENTS_PATH: &str = "/mon-espace-perso/mes-remboursements/";

// Endpoint markers for the interception bus. Fixed substrings, not
// regexes: the endpoints are stable paths even when the markup is not.
pub(crate) const PROFILE_ENDPOINT_MARKER: &str = "/api/adherent/infos-perso";
pub(crate) const RUNTIME_CONFIG_ENDPOINT_MARKER: &str = "/api/configuration/runtime";

// Session storage key holding the member API bearer token once the portal
// has completed its in-page handshake.
pub(crate) const API_TOKEN_STORAGE_KEY: &str = "mgen.adherent.token";

// Login surface.
pub(crate) const LOGIN_FORM: &str = ".tx-felogin-pi1 form";
pub(crate) const LOGIN_ERROR_BOX: &str = ".tx-felogin-pi1 .alert-danger";
pub(crate) const LOGIN_USER_FIELD: &str = ".tx-felogin-pi1 input[name=user]";
pub(crate) const LOGIN_PASS_FIELD: &str = ".tx-felogin-pi1 input[name=pass]";
/// Hidden field populated asynchronously by the portal's bot check; the
/// form must not be submitted before it carries a value.
pub(crate) const BOT_CHECK_TOKEN_FIELD: &str = ".tx-felogin-pi1 input[name=captchaToken]";
pub(crate) const AUTHENTICATED_MARKER: &str = ".header-deconnexion";
pub(crate) const LOGOUT_LINK: &str = ".header-deconnexion a";
pub(crate) const STAY_LOGGED_IN_BUTTON: &str = "#btnResterConnecte";

// Blocked-account message inside the login error box.
pub(crate) const BLOCKED_ACCOUNT_MESSAGE: &str = "le compte a été bloqué";

// Reimbursement grid.
pub(crate) const RESULT_GRID: &str = "#tableDernierRemboursement";
pub(crate) const RESULT_ROWS: &str = "#tableDernierRemboursement tbody tr";
pub(crate) const SEARCH_FORM: &str = "#formRechercheRemboursement";
pub(crate) const SEARCH_START_FIELD: &str = "#formRechercheRemboursement input[name=dateDebut]";
pub(crate) const SEARCH_END_FIELD: &str = "#formRechercheRemboursement input[name=dateFin]";
pub(crate) const PAGINATION: &str = ".pagination";
pub(crate) const NEXT_PAGE: &str = ".pagination .suivant";
pub(crate) const NEXT_PAGE_DISABLED: &str = ".pagination .suivant.disabled";
pub(crate) const NO_RESULTS_MARKER: &str = ".zero-remboursement";

// Details sub-view.
pub(crate) const DETAILS_FORM: &str = "#formDetailsRemboursement";
pub(crate) const DETAIL_CONTAINER: &str = "#ajax-details-remboursements";
pub(crate) const DETAIL_THIRD_PARTY_PRICE: &str = "#ajax-details-remboursements .prix-tiers-payant";

// Row layout: fixed-width positional cells. The trailing status/action
// cell is ignored.
pub(crate) const CELL_TREATMENT_DATE: usize = 0;
pub(crate) const CELL_BENEFICIARY: usize = 1;
pub(crate) const CELL_PDF_LINK: usize = 2;
pub(crate) const CELL_REIMBURSEMENT_DATE: usize = 3;
pub(crate) const CELL_AMOUNT: usize = 4;

/// 1-based `nth-child` selector for one visible result row.
pub(crate) fn row_selector(index: usize) -> String {
    format!("{RESULT_ROWS}:nth-child({})", index + 1)
}

pub(crate) fn row_cell_selector(index: usize, cell: usize) -> String {
    format!("{} > td:nth-child({})", row_selector(index), cell + 1)
}

/// The statement-download link inside a row's PDF cell. Rows without it
/// have no retrievable document.
pub(crate) fn row_pdf_link_selector(index: usize) -> String {
    format!(
        "{} .pdf_download",
        row_cell_selector(index, CELL_PDF_LINK)
    )
}

/// The control that swaps the details sub-view to this row's breakdown.
pub(crate) fn row_detail_toggle_selector(index: usize) -> String {
    format!("{} .voir-detail", row_selector(index))
}
