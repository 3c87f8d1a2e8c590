//! Generic options refresh: one outstanding request at a time, every new
//! trigger aborts the previous one.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::logging::{
    info, log_request_cancelled, log_request_failed, log_request_issued, obj, v_str, warn, Domain,
    ProfileScope,
};
use crate::net::{OptionsRequest, OptionsResponse, OptionsTransport};
use crate::page::OptionsSummary;
use crate::render::SharedView;
use crate::sched::{lock, Attempt, RequestStream, Ticket};
use crate::state::Snapshot;
use crate::store::{FilterStore, RefreshTarget};

const STREAM: &str = "options";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response merged in; `rendered` facets were re-rendered.
    Applied { rendered: usize },
    Cancelled,
    /// Logged; whatever was rendered before stays on screen.
    Failed,
}

struct FetcherInner {
    transport: Arc<dyn OptionsTransport>,
    endpoint: String,
    facets: Vec<String>,
    search_facet: String,
    timeout: Option<Duration>,
    stream: RequestStream,
    store: FilterStore,
    view: SharedView,
}

#[derive(Clone)]
pub struct OptionsFetcher {
    inner: Arc<FetcherInner>,
}

impl OptionsFetcher {
    /// `facets` is the refresh-eligible list, fixed for the page lifetime.
    /// The search facet is dropped from it if present.
    pub fn new(
        transport: Arc<dyn OptionsTransport>,
        endpoint: &str,
        facets: Vec<String>,
        search_facet: &str,
        timeout: Option<Duration>,
        store: FilterStore,
        view: SharedView,
    ) -> Self {
        let facets = facets.into_iter().filter(|f| f != search_facet).collect();
        Self {
            inner: Arc::new(FetcherInner {
                transport,
                endpoint: endpoint.to_string(),
                facets,
                search_facet: search_facet.to_string(),
                timeout,
                stream: RequestStream::new(STREAM),
                store,
                view,
            }),
        }
    }

    pub fn facets(&self) -> &[String] {
        &self.inner.facets
    }

    pub fn build_request(&self, snapshot: &Snapshot) -> OptionsRequest {
        OptionsRequest {
            start_date: snapshot.start_date.clone(),
            end_date: snapshot.end_date.clone(),
            selections: snapshot.selections_without(&self.inner.search_facet),
            facets: self.inner.facets.clone(),
        }
    }

    /// Issues a request for `snapshot`, cancelling any request in flight.
    pub async fn run(&self, snapshot: Snapshot) -> FetchOutcome {
        let inner = &self.inner;
        let ticket = inner.stream.issue();
        let req = self.build_request(&snapshot);
        log_request_issued(Domain::Fetch, inner.stream.name(), ticket.generation(), req.facets.len());

        let call = inner.transport.fetch_options(&inner.endpoint, &req);
        match inner.stream.run(&ticket, inner.timeout, call).await {
            Attempt::Completed(Ok(resp)) => self.apply(&ticket, resp),
            Attempt::Completed(Err(e)) => {
                log_request_failed(Domain::Fetch, inner.stream.name(), ticket.generation(), &format!("{:#}", e));
                FetchOutcome::Failed
            }
            Attempt::TimedOut => {
                log_request_failed(Domain::Fetch, inner.stream.name(), ticket.generation(), "timed out");
                FetchOutcome::Failed
            }
            Attempt::Cancelled => {
                log_request_cancelled(Domain::Fetch, inner.stream.name(), ticket.generation());
                FetchOutcome::Cancelled
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn_refresh(&self, snapshot: Snapshot) -> tokio::task::JoinHandle<FetchOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.run(snapshot).await })
    }

    fn apply(&self, ticket: &Ticket, resp: OptionsResponse) -> FetchOutcome {
        let inner = &self.inner;
        if !inner.stream.is_latest(ticket) {
            return FetchOutcome::Cancelled;
        }
        let _scope = ProfileScope::new(Domain::Fetch, "apply_options");
        // merge against the selections as they are now, not as requested
        let snapshot = inner.store.snapshot();
        let mut view = lock(&inner.view);
        let mut rendered = 0;
        for (facet, options) in resp.options {
            if !snapshot.has_facet(&facet) {
                warn(Domain::Fetch, "unknown_facet", obj(&[("facet", v_str(&facet))]));
                continue;
            }
            if view.set_filter_options(&facet, options, true, &snapshot) {
                rendered += 1;
            }
        }
        if resp.dates.is_some() || resp.rows.is_some() {
            let dates = resp.dates.unwrap_or_default();
            view.page.set_summary(OptionsSummary {
                rows: resp.rows,
                date_min: dates.min,
                date_max: dates.max,
            });
        }
        drop(view);

        info(
            Domain::Fetch,
            "options_applied",
            obj(&[
                ("generation", json!(ticket.generation())),
                ("rendered", json!(rendered)),
                ("rows", json!(resp.rows)),
            ]),
        );
        FetchOutcome::Applied { rendered }
    }
}

impl RefreshTarget for OptionsFetcher {
    fn refresh(&self, snapshot: Snapshot) {
        self.spawn_refresh(snapshot);
    }
}
