//! Scripted test doubles for the collaborator traits.
//!
//! `FakeHost` models the page as a flat selector map plus mutation scripts
//! attached to clicks, submits, and navigations. The handle is cloneable so
//! a test can keep one and mutate the "page" while the engine polls —
//! the same producer/consumer split the real host has.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use mgen_core::identity::Identity;
use mgen_core::records::{DocumentFile, ReimbursementRecord};

use crate::documents::BillMaterializer;
use crate::error::{AgentError, HostError, StoreError, VaultError};
use crate::host::PortalHost;
use crate::persist::{RecordStore, SaveOptions};
use crate::selectors::{
    row_cell_selector, row_detail_toggle_selector, row_pdf_link_selector, row_selector,
    DETAILS_FORM, DETAIL_CONTAINER, DETAIL_THIRD_PARTY_PRICE, NEXT_PAGE, NEXT_PAGE_DISABLED,
    NO_RESULTS_MARKER, PAGINATION, RESULT_GRID, RESULT_ROWS, SEARCH_END_FIELD, SEARCH_FORM,
    SEARCH_START_FIELD,
};
use crate::vault::{CredentialVault, Credentials};

pub(crate) type DomMutation = Box<dyn FnMut(&mut Dom) + Send>;

/// Flat page model: selector → node texts, selector → attributes,
/// selector → serialized form fields.
#[derive(Default)]
pub(crate) struct Dom {
    pub nodes: HashMap<String, Vec<String>>,
    pub attrs: HashMap<String, HashMap<String, String>>,
    pub forms: HashMap<String, Vec<(String, String)>>,
}

impl Dom {
    pub fn insert_node(&mut self, selector: &str, text: &str) {
        self.nodes
            .insert(selector.to_owned(), vec![text.to_owned()]);
    }

    pub fn set_node_count(&mut self, selector: &str, count: usize) {
        self.nodes
            .insert(selector.to_owned(), vec![String::new(); count]);
    }

    pub fn set_attr(&mut self, selector: &str, name: &str, value: &str) {
        self.attrs
            .entry(selector.to_owned())
            .or_default()
            .insert(name.to_owned(), value.to_owned());
    }

    pub fn remove_node(&mut self, selector: &str) {
        self.nodes.remove(selector);
        self.attrs.remove(selector);
    }
}

#[derive(Default)]
struct FakeState {
    dom: Dom,
    location: String,
    storage: HashMap<String, String>,
    redirects: HashMap<String, String>,
    routes: HashMap<String, DomMutation>,
    on_click: HashMap<String, VecDeque<DomMutation>>,
    on_submit: HashMap<String, VecDeque<DomMutation>>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    submits: Vec<String>,
    interaction_log: Vec<bool>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake host state poisoned")
    }

    /// Registers a mutation applied on every navigation to `url` (after
    /// the previous page's DOM is discarded).
    pub fn route(&self, url: &str, mutation: impl FnMut(&mut Dom) + Send + 'static) {
        self.lock().routes.insert(url.to_owned(), Box::new(mutation));
    }

    /// Makes navigation to `url` land on `target` instead, the way the
    /// portal redirects to its outage surface.
    pub fn redirect(&self, url: &str, target: &str) {
        self.lock()
            .redirects
            .insert(url.to_owned(), target.to_owned());
    }

    /// Queues a mutation for the next click on `selector`; repeated clicks
    /// consume the queue in order.
    pub fn on_click(&self, selector: &str, mutation: impl FnMut(&mut Dom) + Send + 'static) {
        self.lock()
            .on_click
            .entry(selector.to_owned())
            .or_default()
            .push_back(Box::new(mutation));
    }

    /// Queues a mutation for the next submit of `selector`.
    pub fn on_submit(&self, selector: &str, mutation: impl FnMut(&mut Dom) + Send + 'static) {
        self.lock()
            .on_submit
            .entry(selector.to_owned())
            .or_default()
            .push_back(Box::new(mutation));
    }

    pub fn mutate_dom(&self, f: impl FnOnce(&mut Dom)) {
        f(&mut self.lock().dom);
    }

    pub fn set_storage(&self, key: &str, value: &str) {
        self.lock().storage.insert(key.to_owned(), value.to_owned());
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    pub fn submits(&self) -> Vec<String> {
        self.lock().submits.clone()
    }

    pub fn interaction_log(&self) -> Vec<bool> {
        self.lock().interaction_log.clone()
    }
}

impl PortalHost for FakeHost {
    async fn goto(&mut self, url: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let target = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_owned());
        state.location = target.clone();
        state.dom = Dom::default();
        if let Some(mut mutation) = state.routes.remove(&target) {
            mutation(&mut state.dom);
            state.routes.insert(target, mutation);
        }
        Ok(())
    }

    async fn current_url(&self) -> String {
        self.lock().location.clone()
    }

    async fn exists(&self, selector: &str) -> bool {
        self.lock()
            .dom
            .nodes
            .get(selector)
            .is_some_and(|nodes| !nodes.is_empty())
    }

    async fn count(&self, selector: &str) -> usize {
        self.lock()
            .dom
            .nodes
            .get(selector)
            .map_or(0, Vec::len)
    }

    async fn text(&self, selector: &str) -> Option<String> {
        self.lock()
            .dom
            .nodes
            .get(selector)
            .and_then(|nodes| nodes.first())
            .cloned()
    }

    async fn attr(&self, selector: &str, name: &str) -> Option<String> {
        self.lock()
            .dom
            .attrs
            .get(selector)
            .and_then(|attrs| attrs.get(name))
            .cloned()
    }

    async fn click(&mut self, selector: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        if !state
            .dom
            .nodes
            .get(selector)
            .is_some_and(|nodes| !nodes.is_empty())
        {
            return Err(HostError::ElementNotFound {
                selector: selector.to_owned(),
            });
        }
        state.clicks.push(selector.to_owned());
        let mutation = state
            .on_click
            .get_mut(selector)
            .and_then(VecDeque::pop_front);
        if let Some(mut mutation) = mutation {
            mutation(&mut state.dom);
        }
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        if !state.dom.nodes.contains_key(selector) {
            return Err(HostError::ElementNotFound {
                selector: selector.to_owned(),
            });
        }
        state.fills.push((selector.to_owned(), value.to_owned()));
        state.dom.set_attr(selector, "value", value);
        Ok(())
    }

    async fn submit(&mut self, selector: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        if !state.dom.nodes.contains_key(selector) {
            return Err(HostError::ElementNotFound {
                selector: selector.to_owned(),
            });
        }
        state.submits.push(selector.to_owned());
        let mutation = state
            .on_submit
            .get_mut(selector)
            .and_then(VecDeque::pop_front);
        if let Some(mut mutation) = mutation {
            mutation(&mut state.dom);
        }
        Ok(())
    }

    async fn remove(&mut self, selector: &str) {
        self.lock().dom.remove_node(selector);
    }

    async fn form_values(&self, selector: &str) -> Vec<(String, String)> {
        self.lock()
            .dom
            .forms
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }

    async fn storage_get(&self, key: &str) -> Option<String> {
        self.lock().storage.get(key).cloned()
    }

    fn set_user_interaction(&mut self, enabled: bool) {
        self.lock().interaction_log.push(enabled);
    }
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct FakeRow {
    pub treatment: String,
    pub beneficiary: String,
    pub reimbursement: String,
    pub amount: String,
    pub href: Option<String>,
    pub third_party_price: Option<String>,
}

impl FakeRow {
    /// A plain row with a valid statement link and no third-party payer.
    pub fn standard(n: u32) -> Self {
        Self {
            treatment: "12/03/2024".to_owned(),
            beneficiary: "JEAN MARTIN".to_owned(),
            reimbursement: "20/03/2024".to_owned(),
            amount: format!("{n},50 €"),
            href: Some(format!(
                "/mon-espace-perso/mes-remboursements/releve.pdf?urlReleve=%2Freleves%2F{n}.pdf&amp;dattrait=20240312&amp;dateReleve=2024-03-20"
            )),
            third_party_price: None,
        }
    }

    pub fn without_link(mut self) -> Self {
        self.href = None;
        self
    }

    pub fn with_third_party(mut self, price: &str) -> Self {
        self.third_party_price = Some(price.to_owned());
        self
    }
}

/// Next-page control state for a built grid page.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextControl {
    Enabled,
    Disabled,
    Absent,
}

/// Installs a full reimbursements page: search panel, hidden details form,
/// grid, pagination, and one row block per entry.
pub(crate) fn install_grid_page(dom: &mut Dom, rows: &[FakeRow], next: NextControl) {
    install_search_panel(dom);
    dom.insert_node(RESULT_GRID, "");
    dom.insert_node(PAGINATION, "");
    dom.set_node_count(RESULT_ROWS, rows.len());
    for (index, row) in rows.iter().enumerate() {
        dom.insert_node(&row_selector(index), "");
        dom.insert_node(&row_cell_selector(index, 0), &row.treatment);
        dom.insert_node(&row_cell_selector(index, 1), &row.beneficiary);
        dom.insert_node(&row_cell_selector(index, 2), "PDF");
        dom.insert_node(&row_cell_selector(index, 3), &row.reimbursement);
        dom.insert_node(&row_cell_selector(index, 4), &row.amount);
        dom.insert_node(&row_detail_toggle_selector(index), "détail");
        if let Some(href) = &row.href {
            dom.insert_node(&row_pdf_link_selector(index), "");
            dom.set_attr(&row_pdf_link_selector(index), "href", href);
        }
    }
    match next {
        NextControl::Enabled => dom.insert_node(NEXT_PAGE, "Suivant"),
        NextControl::Disabled => {
            dom.insert_node(NEXT_PAGE, "Suivant");
            dom.insert_node(NEXT_PAGE_DISABLED, "Suivant");
        }
        NextControl::Absent => {}
    }
}

pub(crate) fn install_search_panel(dom: &mut Dom) {
    dom.insert_node(SEARCH_FORM, "");
    dom.insert_node(SEARCH_START_FIELD, "");
    dom.insert_node(SEARCH_END_FIELD, "");
    dom.insert_node(DETAILS_FORM, "");
    dom.forms.insert(
        DETAILS_FORM.to_owned(),
        vec![
            ("tx_remboursement[token]".to_owned(), "abc123".to_owned()),
            ("tx_remboursement[action]".to_owned(), "details".to_owned()),
        ],
    );
}

/// Installs an empty window: search panel plus the no-results marker.
pub(crate) fn install_empty_window(dom: &mut Dom) {
    *dom = Dom::default();
    install_search_panel(dom);
    dom.insert_node(NO_RESULTS_MARKER, "Aucun remboursement");
}

/// Scripts each row's detail toggle: the shared container swaps to the
/// clicked row's breakdown, with or without the third-party price element.
pub(crate) fn script_detail_toggles(host: &FakeHost, rows: &[FakeRow]) {
    for (index, row) in rows.iter().enumerate() {
        let price = row.third_party_price.clone();
        host.on_click(&row_detail_toggle_selector(index), move |dom| {
            dom.remove_node(DETAIL_THIRD_PARTY_PRICE);
            dom.insert_node(DETAIL_CONTAINER, "");
            if let Some(price) = &price {
                dom.insert_node(DETAIL_THIRD_PARTY_PRICE, price);
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct MemoryVault {
    stored: Arc<Mutex<Option<Credentials>>>,
    saved: Arc<Mutex<Vec<Credentials>>>,
    fail_save: Arc<Mutex<bool>>,
}

impl MemoryVault {
    pub fn with_credentials(email: &str, password: &str) -> Self {
        let vault = Self::default();
        *vault.stored.lock().unwrap() = Some(Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        });
        vault
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fail_saves(self) -> Self {
        *self.fail_save.lock().unwrap() = true;
        self
    }

    pub fn saved(&self) -> Vec<Credentials> {
        self.saved.lock().unwrap().clone()
    }
}

impl CredentialVault for MemoryVault {
    async fn get_credentials(&self) -> Result<Option<Credentials>, VaultError> {
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), VaultError> {
        if *self.fail_save.lock().unwrap() {
            return Err(VaultError("vault write refused".to_owned()));
        }
        self.saved.lock().unwrap().push(credentials.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    pub bill_batches: Arc<Mutex<Vec<Vec<ReimbursementRecord>>>>,
    pub file_batches: Arc<Mutex<Vec<Vec<DocumentFile>>>>,
    pub identities: Arc<Mutex<Vec<Identity>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bill_batches(&self) -> Vec<Vec<ReimbursementRecord>> {
        self.bill_batches.lock().unwrap().clone()
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.identities.lock().unwrap().clone()
    }
}

impl RecordStore for RecordingStore {
    async fn save_bills(
        &self,
        records: &[ReimbursementRecord],
        _options: &SaveOptions,
    ) -> Result<(), StoreError> {
        self.bill_batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }

    async fn save_files(
        &self,
        documents: &[DocumentFile],
        _options: &SaveOptions,
    ) -> Result<(), StoreError> {
        self.file_batches.lock().unwrap().push(documents.to_vec());
        Ok(())
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.identities.lock().unwrap().push(identity.clone());
        Ok(())
    }
}

/// Materializer that stamps a fixed body instead of fetching, so engine
/// tests stay off the network.
#[derive(Default)]
pub(crate) struct StampMaterializer;

impl BillMaterializer for StampMaterializer {
    async fn materialize(&self, record: &mut ReimbursementRecord) -> Result<(), AgentError> {
        record.file_content = Some("JVBERi0=".to_owned());
        Ok(())
    }
}
