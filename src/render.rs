//! Renderer registry and the selection-preserving merge policy.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::logging::{debug, log_rendered, obj, v_str, Domain};
use crate::page::{Page, Placeholder};
use crate::state::Snapshot;

/// Union of `selected` and `fetched`, de-duplicated, selected values first.
///
/// A selection never disappears from the visible list just because the
/// latest response no longer contains it.
pub fn merge_options(selected: &[String], fetched: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(selected.len() + fetched.len());
    selected
        .iter()
        .chain(fetched.iter())
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Plain checkbox list, the default for every facet.
    Checkbox,
    /// Result list of the search-as-you-type controller; an empty result
    /// shows the "no options" placeholder.
    SearchAsYouType,
}

impl RenderStrategy {
    pub fn render(&self, page: &mut Page, facet: &str, candidates: &[String], snapshot: &Snapshot) {
        page.render_list(facet, candidates, &|v| snapshot.is_selected(facet, v));
        if *self == RenderStrategy::SearchAsYouType && candidates.is_empty() {
            page.list_mut(facet).show_placeholder(Placeholder::NoOptions);
        }
        let checked = page.list(facet).map(|l| l.checked_values().len()).unwrap_or(0);
        log_rendered(facet, candidates.len(), checked);
    }
}

#[derive(Debug, Default)]
pub struct RendererRegistry {
    strategies: HashMap<String, RenderStrategy>,
    dynamic: HashSet<String>,
    options: HashMap<String, Vec<String>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most one strategy per facet; a second registration is refused.
    pub fn register_filter_renderer(&mut self, facet: &str, strategy: RenderStrategy) -> Result<()> {
        if self.strategies.contains_key(facet) {
            bail!("renderer already registered for facet {}", facet);
        }
        self.strategies.insert(facet.to_string(), strategy);
        Ok(())
    }

    pub fn strategy_for(&self, facet: &str) -> RenderStrategy {
        self.strategies
            .get(facet)
            .copied()
            .unwrap_or(RenderStrategy::Checkbox)
    }

    /// Dynamic facets keep option bookkeeping but are skipped by the generic
    /// auto-render path.
    pub fn mark_dynamic(&mut self, facet: &str) {
        self.dynamic.insert(facet.to_string());
    }

    pub fn is_dynamic(&self, facet: &str) -> bool {
        self.dynamic.contains(facet)
    }

    pub fn latest_options(&self, facet: &str) -> &[String] {
        self.options.get(facet).map(Vec::as_slice).unwrap_or(&[])
    }

    fn store_options(&mut self, facet: &str, options: Vec<String>) {
        self.options.insert(facet.to_string(), options);
    }
}

/// Everything the engine renders into: the page model plus its registry.
#[derive(Debug, Default)]
pub struct View {
    pub page: Page,
    pub registry: RendererRegistry,
}

pub type SharedView = Arc<Mutex<View>>;

impl View {
    pub fn new(page: Page, registry: RendererRegistry) -> Self {
        Self { page, registry }
    }

    pub fn shared(self) -> SharedView {
        Arc::new(Mutex::new(self))
    }

    /// Records `options` for `facet` and, when `render` is set and the facet
    /// is not dynamic, re-renders it. Returns whether it rendered.
    pub fn set_filter_options(&mut self, facet: &str, options: Vec<String>, render: bool, snapshot: &Snapshot) -> bool {
        self.registry.store_options(facet, options);
        if !render || self.registry.is_dynamic(facet) {
            debug(Domain::Render, "options_recorded", obj(&[("facet", v_str(facet))]));
            return false;
        }
        self.render_facet(facet, snapshot);
        true
    }

    /// Renders the merged candidate list for `facet` with its strategy.
    pub fn render_facet(&mut self, facet: &str, snapshot: &Snapshot) {
        let candidates = merge_options(&snapshot.selected(facet), self.registry.latest_options(facet));
        let strategy = self.registry.strategy_for(facet);
        strategy.render(&mut self.page, facet, &candidates, snapshot);
    }

    /// Re-renders the non-dynamic facets whose selection differs between
    /// `prev` and `next` (all of them when there is no `prev`).
    pub fn rerender_changed(&mut self, prev: Option<&Snapshot>, next: &Snapshot) {
        let facets: Vec<String> = next
            .selections
            .keys()
            .filter(|facet| !self.registry.is_dynamic(facet))
            .filter(|facet| match prev {
                Some(prev) => prev.selections.get(*facet) != next.selections.get(*facet),
                None => true,
            })
            .cloned()
            .collect();
        for facet in facets {
            self.render_facet(&facet, next);
        }
    }
}
