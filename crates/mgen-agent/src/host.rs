//! Capability interface onto the browser-automation host.
//!
//! The host runtime owns the page: navigation, the DOM, script evaluation,
//! and the network layer. The agent only ever talks to it through this
//! trait, so the whole engine runs against a scripted fake in tests. The
//! host is treated as a reliable primitive layer; element *absence* is an
//! ordinary answer, not an error.

use crate::error::HostError;

pub trait PortalHost {
    /// Navigates the page and resolves once the load completes. The
    /// resulting URL may differ from the requested one (the portal
    /// redirects to its outage surface when down).
    fn goto(&mut self, url: &str) -> impl std::future::Future<Output = Result<(), HostError>>;

    fn current_url(&self) -> impl std::future::Future<Output = String>;

    fn exists(&self, selector: &str) -> impl std::future::Future<Output = bool>;

    /// Number of nodes currently matching `selector`.
    fn count(&self, selector: &str) -> impl std::future::Future<Output = usize>;

    /// Trimmed text content of the first node matching `selector`.
    fn text(&self, selector: &str) -> impl std::future::Future<Output = Option<String>>;

    fn attr(
        &self,
        selector: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Option<String>>;

    /// Dispatches a trusted click. An in-page mutation, not a navigation.
    fn click(&mut self, selector: &str)
        -> impl std::future::Future<Output = Result<(), HostError>>;

    fn fill(
        &mut self,
        selector: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), HostError>>;

    fn submit(
        &mut self,
        selector: &str,
    ) -> impl std::future::Future<Output = Result<(), HostError>>;

    /// Detaches every node matching `selector` from the document. Used to
    /// clear stale result nodes so a later presence wait cannot match a
    /// leftover from the previous query.
    fn remove(&mut self, selector: &str) -> impl std::future::Future<Output = ()>;

    /// Serialized `(name, value)` pairs of a form's fields, hidden fields
    /// included, in document order.
    fn form_values(
        &self,
        selector: &str,
    ) -> impl std::future::Future<Output = Vec<(String, String)>>;

    /// Reads one key from the page's session storage.
    fn storage_get(&self, key: &str) -> impl std::future::Future<Output = Option<String>>;

    /// Enables or suspends user interaction with the page outside the
    /// login form. The authenticator suspends it while the form is in use
    /// and restores it unconditionally once authentication resolves.
    fn set_user_interaction(&mut self, enabled: bool);
}
