#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Root of the member portal. Overridable so tests can point the agent
    /// at a local mock server.
    pub portal_base_url: String,
    /// Base URL of the member REST API used for attestation documents.
    pub member_api_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Interval between probes for every bounded wait in the agent.
    pub poll_interval_ms: u64,
    /// Deadline for element/payload waits. Exceeding it aborts the run.
    pub wait_timeout_ms: u64,
    /// Deadline for the invisible bot-check token during silent auto-login.
    /// Exceeding it degrades to interactive login rather than aborting.
    pub auto_login_token_timeout_ms: u64,
    /// Deadline for a human to complete the native login form.
    pub interactive_login_timeout_ms: u64,
    /// The portal never renders more than this many rows per page. Larger
    /// visible counts mean stale DOM from a previous page state.
    pub page_size_cap: usize,
    /// How far each date window steps backward in time.
    pub window_step_months: u32,
    /// Consecutive empty date windows before traversal stops. A heuristic,
    /// not a provable bound: an account may have a longer gap with no bills.
    pub empty_window_threshold: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("portal_base_url", &self.portal_base_url)
            .field("member_api_base_url", &self.member_api_base_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("wait_timeout_ms", &self.wait_timeout_ms)
            .field(
                "auto_login_token_timeout_ms",
                &self.auto_login_token_timeout_ms,
            )
            .field(
                "interactive_login_timeout_ms",
                &self.interactive_login_timeout_ms,
            )
            .field("page_size_cap", &self.page_size_cap)
            .field("window_step_months", &self.window_step_months)
            .field("empty_window_threshold", &self.empty_window_threshold)
            .finish()
    }
}
