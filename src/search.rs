//! Search-as-you-type controller for the high-cardinality facet.
//!
//! ```text
//!   Idle ──keystroke (debounced)──► Loading ──ok──► Rendered
//!                                     │  ▲
//!                                   err  └──retry── Error
//!                                     ▼
//!                                   Error
//! ```
//!
//! Filter changes outside the search facet re-issue immediately with the
//! current text. Selecting a value of the search facet itself never
//! refetches; it only re-renders the check marks.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde_json::json;

use crate::config::Config;
use crate::logging::{debug, log_request_cancelled, log_request_failed, log_request_issued, obj, v_str, Domain};
use crate::net::{OptionsTransport, SearchRequest};
use crate::page::Placeholder;
use crate::render::SharedView;
use crate::sched::{lock, Attempt, Debouncer, RequestStream};
use crate::state::Snapshot;
use crate::store::{FilterStore, Subscription};

const STREAM: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Loading,
    Rendered,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Rendered { items: usize },
    Empty,
    Cancelled,
    Failed,
}

struct SearchInner {
    facet: String,
    endpoint: String,
    limit: usize,
    timeout: Option<Duration>,
    transport: Arc<dyn OptionsTransport>,
    stream: RequestStream,
    debounce: Debouncer,
    query: Mutex<String>,
    phase: Mutex<SearchPhase>,
    filters_seen: Mutex<Option<Snapshot>>,
    store: FilterStore,
    view: SharedView,
}

#[derive(Clone)]
pub struct MeterSearch {
    inner: Arc<SearchInner>,
}

impl MeterSearch {
    pub fn new(
        cfg: &Config,
        endpoint: &str,
        transport: Arc<dyn OptionsTransport>,
        store: FilterStore,
        view: SharedView,
    ) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                facet: cfg.search_facet.clone(),
                endpoint: endpoint.to_string(),
                limit: cfg.search_limit,
                timeout: cfg.request_timeout(),
                transport,
                stream: RequestStream::new(STREAM),
                debounce: Debouncer::new(cfg.search_debounce()),
                query: Mutex::new(String::new()),
                phase: Mutex::new(SearchPhase::Idle),
                filters_seen: Mutex::new(None),
                store,
                view,
            }),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        *lock(&self.inner.phase)
    }

    pub fn query(&self) -> String {
        lock(&self.inner.query).clone()
    }

    /// Subscribes to the store. The immediate first notification only
    /// records the baseline filters.
    pub fn attach(&self) -> Subscription {
        let weak: Weak<SearchInner> = Arc::downgrade(&self.inner);
        self.inner.store.on_state_change(move |snapshot| {
            if let Some(inner) = weak.upgrade() {
                MeterSearch { inner }.on_filters(snapshot);
            }
        })
    }

    /// Keystroke in the search box: restarts the keystroke debounce.
    pub fn on_input(&self, text: &str) {
        *lock(&self.inner.query) = text.to_string();
        let this = self.clone();
        self.inner.debounce.schedule(move || {
            this.spawn_search();
        });
    }

    /// Re-issues after a failure. Returns false outside the `Error` phase.
    pub fn retry(&self) -> bool {
        if self.phase() != SearchPhase::Error {
            return false;
        }
        self.spawn_search();
        true
    }

    pub fn spawn_search(&self) -> tokio::task::JoinHandle<SearchOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.search_now().await })
    }

    pub fn build_request(&self, snapshot: &Snapshot) -> SearchRequest {
        SearchRequest {
            q: self.query().trim().to_string(),
            limit: self.inner.limit,
            start_date: snapshot.start_date.clone(),
            end_date: snapshot.end_date.clone(),
            selections: snapshot.selections_without(&self.inner.facet),
        }
    }

    /// Issues a request with the current text and filters, cancelling any
    /// request of this controller still in flight.
    pub async fn search_now(&self) -> SearchOutcome {
        let inner = &self.inner;
        let ticket = inner.stream.issue();
        let req = self.build_request(&inner.store.snapshot());
        log_request_issued(Domain::Search, inner.stream.name(), ticket.generation(), req.selections.len());

        self.set_phase(SearchPhase::Loading);
        lock(&inner.view).page.list_mut(&inner.facet).show_placeholder(Placeholder::Loading);

        let call = inner.transport.search_options(&inner.endpoint, &req);
        let reason = match inner.stream.run(&ticket, inner.timeout, call).await {
            Attempt::Completed(Ok(items)) => {
                if !inner.stream.is_latest(&ticket) {
                    return SearchOutcome::Cancelled;
                }
                return self.apply(items);
            }
            Attempt::Cancelled => {
                log_request_cancelled(Domain::Search, inner.stream.name(), ticket.generation());
                return SearchOutcome::Cancelled;
            }
            Attempt::Completed(Err(e)) => format!("{:#}", e),
            Attempt::TimedOut => "timed out".to_string(),
        };

        if !inner.stream.is_latest(&ticket) {
            return SearchOutcome::Cancelled;
        }
        log_request_failed(Domain::Search, inner.stream.name(), ticket.generation(), &reason);
        self.set_phase(SearchPhase::Error);
        lock(&inner.view).page.list_mut(&inner.facet).show_placeholder(Placeholder::Unavailable);
        SearchOutcome::Failed
    }

    fn apply(&self, items: Vec<String>) -> SearchOutcome {
        let inner = &self.inner;
        let snapshot = inner.store.snapshot();
        let count = {
            let mut view = lock(&inner.view);
            view.set_filter_options(&inner.facet, items, false, &snapshot);
            view.render_facet(&inner.facet, &snapshot);
            view.page.list(&inner.facet).map(|l| l.nodes().len()).unwrap_or(0)
        };
        self.set_phase(SearchPhase::Rendered);
        debug(Domain::Search, "results_rendered", obj(&[("facet", v_str(&inner.facet)), ("items", json!(count))]));
        if count == 0 {
            SearchOutcome::Empty
        } else {
            SearchOutcome::Rendered { items: count }
        }
    }

    fn on_filters(&self, snapshot: &Snapshot) {
        let inner = &self.inner;
        let filters_changed = {
            let mut seen = lock(&inner.filters_seen);
            let changed = seen
                .as_ref()
                .map(|prev| !prev.same_filters_except(snapshot, &inner.facet))
                .unwrap_or(false);
            *seen = Some(snapshot.clone());
            changed
        };

        if filters_changed {
            // the immediate request already carries the current text
            inner.debounce.cancel();
            self.spawn_search();
        } else if self.phase() == SearchPhase::Rendered {
            lock(&inner.view).render_facet(&inner.facet, snapshot);
        }
    }

    fn set_phase(&self, phase: SearchPhase) {
        *lock(&self.inner.phase) = phase;
    }
}
