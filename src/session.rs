//! Page-lifetime context: builds every component from the page declaration
//! and wires them together. Constructed once per view and passed around by
//! reference.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use serde_json::json;

use crate::config::Config;
use crate::fetch::OptionsFetcher;
use crate::logging::{info, obj, v_str, warn, Domain};
use crate::net::OptionsTransport;
use crate::page::{FacetDecl, Page, PageDecl};
use crate::render::{RenderStrategy, RendererRegistry, SharedView, View};
use crate::reorder::SearchReorder;
use crate::sched::lock;
use crate::search::MeterSearch;
use crate::state::{DateField, FilterState, Snapshot};
use crate::store::{FilterStore, RefreshTarget, Subscription};
use crate::submit::{FormSync, Submission};

pub struct FilterSession {
    store: FilterStore,
    view: SharedView,
    fetcher: OptionsFetcher,
    search: Option<MeterSearch>,
    reorders: BTreeMap<String, SearchReorder>,
    form: FormSync,
    // keeps the store's weak refresh target alive
    _refresh_target: Arc<dyn RefreshTarget>,
    _subscriptions: Vec<Subscription>,
}

impl FilterSession {
    /// Must be called from within a Tokio runtime.
    pub fn init(decl: &PageDecl, config: Config, transport: Arc<dyn OptionsTransport>) -> Result<Self> {
        let mut declared: Vec<&FacetDecl> = Vec::new();
        let mut seen = BTreeSet::new();
        for facet in &decl.facets {
            let name = facet.name.trim();
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name) {
                warn(Domain::System, "duplicate_facet", obj(&[("facet", v_str(name))]));
                continue;
            }
            declared.push(facet);
        }
        if declared.is_empty() {
            bail!("page declares no filter facets");
        }
        let facets: Vec<String> = declared.iter().map(|f| f.name.trim().to_string()).collect();
        let search_facet = config.search_facet.clone();
        let has_search = facets.contains(&search_facet);

        let mut state = FilterState::with_facets(facets.iter().cloned());
        state.start_date = decl.start_date.trim().to_string();
        state.end_date = decl.end_date.trim().to_string();
        for facet in &declared {
            for value in facet.initial_selection() {
                state.set_selected(facet.name.trim(), &value, true);
            }
        }
        state.apply_query(&decl.query, &facets);

        let mut registry = RendererRegistry::new();
        if has_search {
            registry.register_filter_renderer(&search_facet, RenderStrategy::SearchAsYouType)?;
            registry.mark_dynamic(&search_facet);
        }
        // only the search facet has a controller of its own
        for facet in declared.iter().filter(|f| f.dynamic && f.name.trim() != search_facet) {
            warn(
                Domain::System,
                "dynamic_without_controller",
                obj(&[("facet", v_str(facet.name.trim())), ("msg", v_str("rendered as a generic facet"))]),
            );
        }

        let mut page = Page::new(facets.iter().cloned());
        page.date_input_mut(DateField::Start).value = state.start_date.clone();
        page.date_input_mut(DateField::End).value = state.end_date.clone();

        let store = FilterStore::new(state, &config);
        let view = View::new(page, registry).shared();

        let fetcher = OptionsFetcher::new(
            Arc::clone(&transport),
            &decl.options_endpoint,
            facets.clone(),
            &search_facet,
            config.request_timeout(),
            store.clone(),
            view.clone(),
        );
        let refresh_target: Arc<dyn RefreshTarget> = Arc::new(fetcher.clone());
        store.set_refresh_target(Arc::downgrade(&refresh_target));

        let mut subscriptions = vec![Self::attach_renderer(&store, &view)];

        let search = if has_search {
            let endpoint = decl
                .search_endpoint
                .clone()
                .unwrap_or_else(|| config.search_endpoint());
            let search = MeterSearch::new(&config, &endpoint, Arc::clone(&transport), store.clone(), view.clone());
            subscriptions.push(search.attach());
            Some(search)
        } else {
            None
        };

        let reorders = facets
            .iter()
            .filter(|f| **f != search_facet)
            .map(|f| (f.clone(), SearchReorder::new(f, view.clone())))
            .collect();

        let form = FormSync::new(store.clone(), view.clone());

        info(
            Domain::System,
            "session_init",
            obj(&[
                ("facets", json!(facets)),
                ("refresh_facets", json!(fetcher.facets())),
                ("search_facet", if has_search { v_str(&search_facet) } else { json!(null) }),
            ]),
        );

        Ok(Self {
            store,
            view,
            fetcher,
            search,
            reorders,
            form,
            _refresh_target: refresh_target,
            _subscriptions: subscriptions,
        })
    }

    /// Re-renders the facets whose selection changed on every store update.
    fn attach_renderer(store: &FilterStore, view: &SharedView) -> Subscription {
        let view = view.clone();
        let previous: Mutex<Option<Snapshot>> = Mutex::new(None);
        store.on_state_change(move |snapshot| {
            let mut prev = lock(&previous);
            lock(&view).rerender_changed(prev.as_ref(), snapshot);
            *prev = Some(snapshot.clone());
        })
    }

    /// Initial population: one options refresh and, if present, one search
    /// with an empty query.
    pub fn start(&self) {
        self.fetcher.spawn_refresh(self.store.snapshot());
        if let Some(search) = &self.search {
            search.spawn_search();
        }
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn fetcher(&self) -> &OptionsFetcher {
        &self.fetcher
    }

    pub fn search(&self) -> Option<&MeterSearch> {
        self.search.as_ref()
    }

    pub fn reorder(&self, facet: &str) -> Option<&SearchReorder> {
        self.reorders.get(facet)
    }

    pub fn submit(&self) -> Submission {
        self.form.prepare_submit()
    }
}
