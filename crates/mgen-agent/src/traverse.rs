//! Pagination and period traversal.
//!
//! The reimbursement grid paginates in place: the "next page" control
//! mutates the DOM without a navigation. When a window's pages are
//! exhausted the engine rolls the query window backward in time by a fixed
//! step and resubmits the search form. Traversal ends after a run of
//! consecutive windows with no results — a heuristic for "older than the
//! account", configurable because nothing guarantees an account has no
//! longer gap.
//!
//! Each run is one-shot: it re-navigates from the portal's default state
//! and cannot be resumed. Every window's records are persisted as one batch
//! before the window advances, so a later fatal failure never rolls back
//! what was already saved.

use chrono::{Months, NaiveDate};

use mgen_core::records::{assign_group_amounts, ReimbursementRecord};
use mgen_core::AppConfig;

use crate::detail::reconcile_third_party;
use crate::documents::BillMaterializer;
use crate::error::AgentError;
use crate::extract::extract_row;
use crate::host::PortalHost;
use crate::persist::{RecordStore, SaveOptions};
use crate::poll::{self, PollSettings};
use crate::selectors::{
    DETAILS_FORM, NEXT_PAGE, NEXT_PAGE_DISABLED, NO_RESULTS_MARKER, PAGINATION,
    REIMBURSEMENTS_PATH, RESULT_GRID, RESULT_ROWS, SEARCH_END_FIELD, SEARCH_FORM,
    SEARCH_START_FIELD, VENDOR_DOWN_PATH,
};

const SEARCH_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy)]
pub struct TraversalSettings {
    pub poll: PollSettings,
    pub page_size_cap: usize,
    pub window_step_months: u32,
    pub empty_window_threshold: u32,
}

impl TraversalSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll: PollSettings::new(config.poll_interval_ms, config.wait_timeout_ms),
            page_size_cap: config.page_size_cap,
            window_step_months: config.window_step_months,
            empty_window_threshold: config.empty_window_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    AwaitingPageLoad,
    ProcessingRows,
    AdvancingPage,
    AdvancingPeriod,
    Done,
}

/// Pagination position. Mutated exclusively by the engine; never shared.
#[derive(Debug, Clone, Copy)]
pub struct TraversalCursor {
    pub page: u32,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub consecutive_empty: u32,
}

enum WindowOutcome {
    Rows,
    Empty,
}

pub struct Traversal<'a, H, S, M> {
    host: &'a mut H,
    store: &'a S,
    materializer: &'a M,
    settings: TraversalSettings,
    base_url: &'a str,
    state: TraversalState,
    cursor: TraversalCursor,
    hidden_form: Vec<(String, String)>,
    window_records: Vec<ReimbursementRecord>,
    collected: Vec<ReimbursementRecord>,
}

impl<'a, H, S, M> Traversal<'a, H, S, M>
where
    H: PortalHost,
    S: RecordStore,
    M: BillMaterializer,
{
    /// `today` anchors the first date window: the portal's default view
    /// covers `[today − step, today]`.
    pub fn new(
        host: &'a mut H,
        store: &'a S,
        materializer: &'a M,
        settings: TraversalSettings,
        base_url: &'a str,
        today: NaiveDate,
    ) -> Self {
        let cursor = TraversalCursor {
            page: 1,
            window_start: shift_months_back(today, settings.window_step_months),
            window_end: today,
            consecutive_empty: 0,
        };
        Self {
            host,
            store,
            materializer,
            settings,
            base_url,
            state: TraversalState::AwaitingPageLoad,
            cursor,
            hidden_form: Vec::new(),
            window_records: Vec::new(),
            collected: Vec::new(),
        }
    }

    /// Drives the state machine to completion and returns every record
    /// produced, in traversal order. Records are also persisted window by
    /// window along the way.
    ///
    /// # Errors
    ///
    /// Fatal on [`AgentError::VendorUnavailable`], any expired wait, any
    /// malformed cell, and any persistence failure. Batches saved before
    /// the failure stand.
    pub async fn run(mut self) -> Result<Vec<ReimbursementRecord>, AgentError> {
        let url = format!("{}{REIMBURSEMENTS_PATH}", self.base_url);
        self.host.goto(&url).await?;
        if self.host.current_url().await.contains(VENDOR_DOWN_PATH) {
            return Err(AgentError::VendorUnavailable);
        }

        loop {
            match self.state {
                TraversalState::AwaitingPageLoad => self.await_page_load().await?,
                TraversalState::ProcessingRows => self.process_rows().await?,
                TraversalState::AdvancingPage => self.advance_page().await?,
                TraversalState::AdvancingPeriod => self.advance_period().await?,
                TraversalState::Done => break,
            }
        }

        if !self.window_records.is_empty() {
            self.persist_window().await?;
        }
        Ok(self.collected)
    }

    /// Resolves the outcome of the current window: rows or the no-results
    /// marker. The grid, search panel, and pagination control are
    /// independent readiness signals and may appear in any order.
    async fn await_page_load(&mut self) -> Result<(), AgentError> {
        let host = &*self.host;
        let settings = self.settings;

        poll::until("reimbursement search panel", settings.poll, || async move {
            host.exists(SEARCH_FORM).await.then_some(())
        })
        .await?;

        let outcome = poll::until("result grid or no-results marker", settings.poll, || async move {
            if host.exists(RESULT_GRID).await {
                Some(WindowOutcome::Rows)
            } else if host.exists(NO_RESULTS_MARKER).await {
                Some(WindowOutcome::Empty)
            } else {
                None
            }
        })
        .await?;

        match outcome {
            WindowOutcome::Empty => {
                self.cursor.consecutive_empty += 1;
                tracing::info!(
                    start = %self.cursor.window_start,
                    end = %self.cursor.window_end,
                    consecutive_empty = self.cursor.consecutive_empty,
                    "window has no reimbursements"
                );
                if self.cursor.consecutive_empty >= self.settings.empty_window_threshold {
                    tracing::info!("empty-window threshold reached; traversal complete");
                    self.state = TraversalState::Done;
                } else {
                    self.state = TraversalState::AdvancingPeriod;
                }
            }
            WindowOutcome::Rows => {
                poll::until("pagination control", settings.poll, || async move {
                    host.exists(PAGINATION).await.then_some(())
                })
                .await?;

                // A leftover grid from unrelated page state can briefly
                // report an oversized row count; wait until it settles at
                // or below the portal's page size.
                let cap = settings.page_size_cap;
                poll::until("row count within page cap", settings.poll, || async move {
                    (host.count(RESULT_ROWS).await <= cap).then_some(())
                })
                .await?;

                self.cursor.consecutive_empty = 0;
                self.hidden_form = self.host.form_values(DETAILS_FORM).await;
                self.state = TraversalState::ProcessingRows;
            }
        }
        Ok(())
    }

    async fn process_rows(&mut self) -> Result<(), AgentError> {
        let count = self.host.count(RESULT_ROWS).await;
        tracing::debug!(
            page = self.cursor.page,
            rows = count,
            start = %self.cursor.window_start,
            end = %self.cursor.window_end,
            "processing result page"
        );
        for index in 0..count {
            let extracted =
                extract_row(&*self.host, self.base_url, &self.hidden_form, index).await?;
            if let Some(mut record) = extracted {
                reconcile_third_party(self.host, self.settings.poll, index, &mut record).await?;
                self.window_records.push(record);
            }
        }
        self.state = TraversalState::AdvancingPage;
        Ok(())
    }

    /// Clicks through to the next page when the control is present and
    /// enabled. The click mutates the grid in place, so no reload-style
    /// wait follows it.
    async fn advance_page(&mut self) -> Result<(), AgentError> {
        let clickable = self.host.exists(NEXT_PAGE).await
            && !self.host.exists(NEXT_PAGE_DISABLED).await;
        if clickable {
            self.host.click(NEXT_PAGE).await?;
            self.cursor.page += 1;
            self.state = TraversalState::ProcessingRows;
        } else {
            self.state = TraversalState::AdvancingPeriod;
        }
        Ok(())
    }

    async fn advance_period(&mut self) -> Result<(), AgentError> {
        if !self.window_records.is_empty() {
            self.persist_window().await?;
        }

        let window_end = self.cursor.window_start;
        let window_start = shift_months_back(window_end, self.settings.window_step_months);
        self.cursor.window_start = window_start;
        self.cursor.window_end = window_end;
        self.cursor.page = 1;
        tracing::info!(start = %window_start, end = %window_end, "advancing date window");

        // Drop the current results table and no-results marker before
        // resubmitting, so the next wait cannot match a stale node that
        // happens to look identical to the fresh one.
        self.host.remove(RESULT_GRID).await;
        self.host.remove(NO_RESULTS_MARKER).await;

        self.host
            .fill(SEARCH_START_FIELD, &format_search_date(window_start))
            .await?;
        self.host
            .fill(SEARCH_END_FIELD, &format_search_date(window_end))
            .await?;
        self.host.submit(SEARCH_FORM).await?;
        self.state = TraversalState::AwaitingPageLoad;
        Ok(())
    }

    async fn persist_window(&mut self) -> Result<(), AgentError> {
        for record in &mut self.window_records {
            self.materializer.materialize(record).await?;
        }
        assign_group_amounts(&mut self.window_records);
        let batch = std::mem::take(&mut self.window_records);
        tracing::info!(count = batch.len(), "persisting window batch");
        self.store
            .save_bills(&batch, &SaveOptions::keyed_by("vendorRef"))
            .await?;
        self.collected.extend(batch);
        Ok(())
    }
}

fn shift_months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn format_search_date(date: NaiveDate) -> String {
    date.format(SEARCH_DATE_FORMAT).to_string()
}

#[cfg(test)]
#[path = "traverse_test.rs"]
mod tests;
