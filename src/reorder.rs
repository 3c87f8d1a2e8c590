//! Local pin-and-reorder for an already rendered facet list. No network.
//!
//! Checked items are pinned first in their existing relative order. The
//! rest are ranked by match tier against the typed query, then
//! alphabetically (case-insensitive).

use std::cmp::Ordering;

use serde_json::json;

use crate::logging::{log, obj, v_str, Domain, Level, ProfileScope};
use crate::page::CheckboxNode;
use crate::render::SharedView;
use crate::sched::lock;

/// 0: starts with the query, 1: contains it, 2: anything else (or no query).
pub fn match_tier(text: &str, query: &str) -> u8 {
    if query.is_empty() {
        return 2;
    }
    let text = text.to_lowercase();
    if text.starts_with(query) {
        0
    } else if text.contains(query) {
        1
    } else {
        2
    }
}

pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Returns the new order as indices into `nodes`.
pub fn reorder_plan(nodes: &[CheckboxNode], raw_query: &str) -> Vec<usize> {
    let query = normalize_query(raw_query);
    let (checked, unchecked): (Vec<usize>, Vec<usize>) = (0..nodes.len()).partition(|&i| nodes[i].checked);

    let mut ranked: Vec<(u8, String, usize)> = unchecked
        .into_iter()
        .map(|i| (match_tier(&nodes[i].value, &query), nodes[i].value.to_lowercase(), i))
        .collect();
    ranked.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    checked.into_iter().chain(ranked.into_iter().map(|(_, _, i)| i)).collect()
}

/// Binds a facet list to its local filter box.
#[derive(Clone)]
pub struct SearchReorder {
    facet: String,
    view: SharedView,
}

impl SearchReorder {
    pub fn new(facet: &str, view: SharedView) -> Self {
        Self {
            facet: facet.to_string(),
            view,
        }
    }

    /// Re-parents the mounted nodes in place. Returns the new value order.
    pub fn on_input(&self, text: &str) -> Vec<String> {
        let _scope = ProfileScope::new(Domain::Reorder, "reorder");
        let mut view = lock(&self.view);
        let list = view.page.list_mut(&self.facet);
        let order = reorder_plan(list.nodes(), text);
        list.reorder(&order);
        let values: Vec<String> = list.values().into_iter().map(str::to_string).collect();
        log(
            Level::Trace,
            Domain::Reorder,
            "reordered",
            obj(&[("facet", v_str(&self.facet)), ("query", v_str(text)), ("items", json!(values.len()))]),
        );
        values
    }
}
