//! Form submission sync: the store, not the mounted checkboxes, decides
//! what gets submitted.

use serde_json::json;

use crate::logging::{info, obj, Domain};
use crate::page::HiddenField;
use crate::render::SharedView;
use crate::sched::lock;
use crate::state::{DateField, END_DATE_KEY, START_DATE_KEY};
use crate::store::FilterStore;

/// Name/value pairs in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub fields: Vec<(String, String)>,
}

impl Submission {
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// `application/x-www-form-urlencoded` rendering, as the page URL after
    /// a GET submit.
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

#[derive(Clone)]
pub struct FormSync {
    store: FilterStore,
    view: SharedView,
}

impl FormSync {
    pub fn new(store: FilterStore, view: SharedView) -> Self {
        Self { store, view }
    }

    /// Runs immediately before the form is submitted.
    ///
    /// Pending date edits are committed first, then the visible date inputs
    /// are overwritten with the store's values and the hidden-field
    /// container is rebuilt with one field per selected value.
    pub fn prepare_submit(&self) -> Submission {
        self.store.flush_pending_dates();
        let snapshot = self.store.snapshot();

        let hidden: Vec<HiddenField> = snapshot
            .selections
            .iter()
            .flat_map(|(facet, values)| {
                values.iter().map(move |value| HiddenField {
                    name: facet.clone(),
                    value: value.clone(),
                })
            })
            .collect();

        let mut fields = vec![
            (START_DATE_KEY.to_string(), snapshot.start_date.clone()),
            (END_DATE_KEY.to_string(), snapshot.end_date.clone()),
        ];
        fields.extend(hidden.iter().map(|h| (h.name.clone(), h.value.clone())));

        {
            let mut view = lock(&self.view);
            view.page.date_input_mut(DateField::Start).value = snapshot.start_date.clone();
            view.page.date_input_mut(DateField::End).value = snapshot.end_date.clone();
            view.page.rebuild_hidden_fields(hidden);
        }

        info(
            Domain::Submit,
            "form_synced",
            obj(&[("fields", json!(fields.len()))]),
        );
        Submission { fields }
    }
}
