//! In-memory page model: the declared filter containers, the rendered
//! checkbox nodes per facet, the date inputs and the hidden-field container
//! rebuilt at submit time.
//!
//! A host UI mirrors this model; the engine never talks to a real DOM.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::logging::{obj, v_str, warn, Domain};
use crate::state::DateField;

pub type NodeId = u64;

/// Page-level declaration consumed once at initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDecl {
    pub options_endpoint: String,
    #[serde(default)]
    pub search_endpoint: Option<String>,
    /// Current page URL query, used to seed dates and selections.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub facets: Vec<FacetDecl>,
}

/// One declared filter container.
#[derive(Debug, Clone, Deserialize)]
pub struct FacetDecl {
    pub name: String,
    /// JSON-encoded array of initially selected values.
    #[serde(default)]
    pub selected: Option<String>,
    /// Rendered by its own controller rather than the generic path.
    #[serde(default)]
    pub dynamic: bool,
}

impl FacetDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            selected: None,
            dynamic: false,
        }
    }

    /// Decodes `selected`. Anything that is not a JSON array is logged and
    /// treated as no selection.
    pub fn initial_selection(&self) -> Vec<String> {
        let Some(raw) = self.selected.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
            return Vec::new();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(_) => {
                warn(
                    Domain::Store,
                    "bad_initial_selection",
                    obj(&[("facet", v_str(&self.name)), ("msg", v_str("not a JSON array")), ("raw", v_str(raw))]),
                );
                Vec::new()
            }
            Err(e) => {
                warn(
                    Domain::Store,
                    "bad_initial_selection",
                    obj(&[("facet", v_str(&self.name)), ("msg", v_str(&e.to_string())), ("raw", v_str(raw))]),
                );
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxNode {
    pub id: NodeId,
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    NoOptions,
    Unavailable,
}

impl Placeholder {
    pub fn text(&self) -> &'static str {
        match self {
            Placeholder::Loading => "Loading…",
            Placeholder::NoOptions => "No options",
            Placeholder::Unavailable => "Unable to load options",
        }
    }
}

/// The rendered option list of one facet.
#[derive(Debug, Default)]
pub struct FacetList {
    nodes: Vec<CheckboxNode>,
    placeholder: Option<Placeholder>,
}

impl FacetList {
    pub fn nodes(&self) -> &[CheckboxNode] {
        &self.nodes
    }

    pub fn values(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.value.as_str()).collect()
    }

    pub fn checked_values(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.checked)
            .map(|n| n.value.as_str())
            .collect()
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        self.placeholder
    }

    /// A placeholder replaces the list content.
    pub fn show_placeholder(&mut self, placeholder: Placeholder) {
        self.nodes.clear();
        self.placeholder = Some(placeholder);
    }

    /// Unmounts every node, e.g. when a host filters the list out of view.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Moves existing nodes into `order` (indices into the current list).
    /// Nodes keep their identity; indices out of range or repeated are
    /// ignored and any node not named keeps its relative place at the end.
    pub fn reorder(&mut self, order: &[usize]) {
        let mut taken = vec![false; self.nodes.len()];
        let mut next = Vec::with_capacity(self.nodes.len());
        for &i in order {
            if i < taken.len() && !taken[i] {
                taken[i] = true;
                next.push(i);
            }
        }
        next.extend((0..self.nodes.len()).filter(|&i| !taken[i]));

        let mut slots: Vec<Option<CheckboxNode>> = self.nodes.drain(..).map(Some).collect();
        self.nodes = next.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    /// Renders `values` in order, reusing nodes whose value is already
    /// mounted so their identity survives a re-render.
    fn render(&mut self, values: &[String], is_checked: &dyn Fn(&str) -> bool, next_id: &mut NodeId) {
        let mut existing: BTreeMap<String, CheckboxNode> =
            self.nodes.drain(..).map(|n| (n.value.clone(), n)).collect();
        self.nodes = values
            .iter()
            .map(|value| {
                let checked = is_checked(value);
                match existing.remove(value) {
                    Some(mut node) => {
                        node.checked = checked;
                        node
                    }
                    None => {
                        *next_id += 1;
                        CheckboxNode {
                            id: *next_id,
                            value: value.clone(),
                            checked,
                        }
                    }
                }
            })
            .collect();
        self.placeholder = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateInput {
    pub value: String,
    /// Bounds hinted by the last options response.
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenField {
    pub name: String,
    pub value: String,
}

/// Side information from the last successful options refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsSummary {
    pub rows: Option<u64>,
    pub date_min: String,
    pub date_max: String,
}

#[derive(Debug, Default)]
pub struct Page {
    lists: BTreeMap<String, FacetList>,
    dates: [DateInput; 2],
    hidden: Vec<HiddenField>,
    summary: OptionsSummary,
    next_id: NodeId,
}

impl Page {
    pub fn new<I, S>(facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lists: facets.into_iter().map(|f| (f.into(), FacetList::default())).collect(),
            ..Default::default()
        }
    }

    pub fn list(&self, facet: &str) -> Option<&FacetList> {
        self.lists.get(facet)
    }

    pub fn list_mut(&mut self, facet: &str) -> &mut FacetList {
        self.lists.entry(facet.to_string()).or_default()
    }

    pub fn render_list(&mut self, facet: &str, values: &[String], is_checked: &dyn Fn(&str) -> bool) {
        let list = self.lists.entry(facet.to_string()).or_default();
        list.render(values, is_checked, &mut self.next_id);
    }

    pub fn date_input(&self, field: DateField) -> &DateInput {
        &self.dates[field.index()]
    }

    pub fn date_input_mut(&mut self, field: DateField) -> &mut DateInput {
        &mut self.dates[field.index()]
    }

    pub fn hidden_fields(&self) -> &[HiddenField] {
        &self.hidden
    }

    /// Clears the hidden container and fills it with `fields`.
    pub fn rebuild_hidden_fields(&mut self, fields: Vec<HiddenField>) {
        self.hidden = fields;
    }

    pub fn summary(&self) -> &OptionsSummary {
        &self.summary
    }

    pub fn set_summary(&mut self, summary: OptionsSummary) {
        self.dates[DateField::Start.index()].min = summary.date_min.clone();
        self.dates[DateField::Start.index()].max = summary.date_max.clone();
        self.dates[DateField::End.index()].min = summary.date_min.clone();
        self.dates[DateField::End.index()].max = summary.date_max.clone();
        self.summary = summary;
    }
}
