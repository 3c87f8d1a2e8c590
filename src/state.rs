//! Canonical filter state and the immutable snapshots handed to listeners.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

pub const START_DATE_KEY: &str = "start_date";
pub const END_DATE_KEY: &str = "end_date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Start => START_DATE_KEY,
            DateField::End => END_DATE_KEY,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            DateField::Start => 0,
            DateField::End => 1,
        }
    }
}

/// Dates plus per-facet selection sets. Empty date strings mean "no bound".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub start_date: String,
    pub end_date: String,
    pub selections: BTreeMap<String, BTreeSet<String>>,
}

impl FilterState {
    /// Empty state with one (empty) selection set per declared facet.
    pub fn with_facets<I, S>(facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            start_date: String::new(),
            end_date: String::new(),
            selections: facets.into_iter().map(|f| (f.into(), BTreeSet::new())).collect(),
        }
    }

    pub fn date(&self, field: DateField) -> &str {
        match field {
            DateField::Start => &self.start_date,
            DateField::End => &self.end_date,
        }
    }

    /// Returns false when the value is unchanged.
    pub fn set_date(&mut self, field: DateField, value: &str) -> bool {
        let slot = match field {
            DateField::Start => &mut self.start_date,
            DateField::End => &mut self.end_date,
        };
        if slot == value {
            return false;
        }
        *slot = value.to_string();
        true
    }

    /// Returns false when the set already reflects `checked` or `facet` was
    /// never declared. The facet list is fixed at construction.
    pub fn set_selected(&mut self, facet: &str, value: &str, checked: bool) -> bool {
        let Some(set) = self.selections.get_mut(facet) else {
            return false;
        };
        if checked {
            set.insert(value.to_string())
        } else {
            set.remove(value)
        }
    }

    pub fn has_facet(&self, facet: &str) -> bool {
        self.selections.contains_key(facet)
    }

    pub fn is_selected(&self, facet: &str, value: &str) -> bool {
        self.selections.get(facet).map(|s| s.contains(value)).unwrap_or(false)
    }

    /// Seeds dates and selections from a URL query string. Facet keys are
    /// matched case-insensitively against `facets`; unknown keys are ignored.
    pub fn apply_query(&mut self, query: &str, facets: &[String]) {
        let query = query.trim_start_matches('?');
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                START_DATE_KEY => self.start_date = value.into_owned(),
                END_DATE_KEY => self.end_date = value.into_owned(),
                other => {
                    let Some(facet) = facets.iter().find(|f| f.eq_ignore_ascii_case(other)) else {
                        continue;
                    };
                    if !value.is_empty() {
                        self.selections
                            .entry(facet.clone())
                            .or_default()
                            .insert(value.into_owned());
                    }
                }
            }
        }
    }
}

/// Immutable point-in-time copy of [`FilterState`].
///
/// The store deep-copies its state into a fresh `Arc` on every accepted
/// mutation, so nothing can change what an issued snapshot observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<FilterState>);

impl Snapshot {
    pub fn new(state: FilterState) -> Self {
        Self(Arc::new(state))
    }

    /// Owned copy of the underlying state, for building the next version.
    pub fn to_state(&self) -> FilterState {
        FilterState::clone(&self.0)
    }

    pub fn selected(&self, facet: &str) -> Vec<String> {
        self.0
            .selections
            .get(facet)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Non-empty selections as request payload, minus `excluded`.
    pub fn selections_without(&self, excluded: &str) -> BTreeMap<String, Vec<String>> {
        self.0
            .selections
            .iter()
            .filter(|(facet, values)| facet.as_str() != excluded && !values.is_empty())
            .map(|(facet, values)| (facet.clone(), values.iter().cloned().collect()))
            .collect()
    }

    /// True when dates and every selection except `excluded` are equal.
    pub fn same_filters_except(&self, other: &Snapshot, excluded: &str) -> bool {
        self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.selections_without(excluded) == other.selections_without(excluded)
    }
}

impl Deref for Snapshot {
    type Target = FilterState;

    fn deref(&self) -> &FilterState {
        &self.0
    }
}
