//! Filter state store: the single writer of [`FilterState`].
//!
//! Every accepted mutation swaps in a fresh [`Snapshot`], notifies all
//! listeners synchronously, then (re)starts the trailing-edge refresh
//! debounce. Rejected mutations (already selected, already absent, same
//! date) are silent: no notification and no refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::json;

use crate::config::Config;
use crate::logging::{debug, log, obj, v_str, warn, Domain, Level};
use crate::sched::{lock, Debouncer};
use crate::state::{DateField, FilterState, Snapshot};

pub type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Receiver of the debounced refresh. Implemented by the options fetcher.
pub trait RefreshTarget: Send + Sync {
    fn refresh(&self, snapshot: Snapshot);
}

struct StoreInner {
    current: Mutex<Snapshot>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    pending_dates: Mutex<[Option<String>; 2]>,
    date_debounce: [Debouncer; 2],
    refresh_debounce: Debouncer,
    refresh_target: Mutex<Option<Weak<dyn RefreshTarget>>>,
}

/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct FilterStore {
    inner: Arc<StoreInner>,
}

/// Handle returned by [`FilterStore::on_state_change`].
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Returns false if the listener was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.store.upgrade() else {
            return false;
        };
        let mut listeners = lock(&inner.listeners);
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}

impl FilterStore {
    pub fn new(initial: FilterState, cfg: &Config) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: Mutex::new(Snapshot::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                pending_dates: Mutex::new([None, None]),
                date_debounce: [Debouncer::new(cfg.date_debounce()), Debouncer::new(cfg.date_debounce())],
                refresh_debounce: Debouncer::new(cfg.refresh_debounce()),
                refresh_target: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.inner.current).clone()
    }

    /// Registers `listener` and invokes it once with the current snapshot.
    pub fn on_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        let listener: Listener = Arc::new(listener);
        lock(&self.inner.listeners).push((id, Arc::clone(&listener)));
        listener(&self.snapshot());
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    pub fn set_refresh_target(&self, target: Weak<dyn RefreshTarget>) {
        *lock(&self.inner.refresh_target) = Some(target);
    }

    /// Returns true if the selection changed. Values for facets the page
    /// never declared are rejected.
    pub fn handle_checkbox_change(&self, facet: &str, value: &str, checked: bool) -> bool {
        if !lock(&self.inner.current).has_facet(facet) {
            warn(
                Domain::Store,
                "unknown_facet",
                obj(&[("facet", v_str(facet)), ("value", v_str(value)), ("checked", json!(checked))]),
            );
            return false;
        }
        let accepted = self.mutate(|state| state.set_selected(facet, value, checked));
        log(
            if accepted { Level::Debug } else { Level::Trace },
            Domain::Store,
            if accepted { "selection_changed" } else { "selection_noop" },
            obj(&[("facet", v_str(facet)), ("value", v_str(value)), ("checked", json!(checked))]),
        );
        accepted
    }

    /// Records `value` and commits it after the date debounce.
    pub fn handle_date_change(&self, field: DateField, value: &str) {
        lock(&self.inner.pending_dates)[field.index()] = Some(value.trim().to_string());
        let weak = Arc::downgrade(&self.inner);
        self.inner.date_debounce[field.index()].schedule(move || {
            if let Some(inner) = weak.upgrade() {
                FilterStore { inner }.commit_date(field);
            }
        });
    }

    /// Commits date edits still waiting on their debounce. Returns true if
    /// any of them changed the state.
    pub fn flush_pending_dates(&self) -> bool {
        let mut changed = false;
        for field in [DateField::Start, DateField::End] {
            self.inner.date_debounce[field.index()].cancel();
            changed |= self.commit_date(field);
        }
        changed
    }

    pub fn has_pending_refresh(&self) -> bool {
        self.inner.refresh_debounce.is_pending()
    }

    fn commit_date(&self, field: DateField) -> bool {
        let pending = lock(&self.inner.pending_dates)[field.index()].take();
        let Some(value) = pending else {
            return false;
        };
        let accepted = self.mutate(|state| state.set_date(field, &value));
        if accepted {
            debug(
                Domain::Store,
                "date_changed",
                obj(&[("field", v_str(field.as_str())), ("value", v_str(&value))]),
            );
        }
        accepted
    }

    fn mutate<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut FilterState) -> bool,
    {
        let snapshot = {
            let mut current = lock(&self.inner.current);
            let mut next = current.to_state();
            if !apply(&mut next) {
                return false;
            }
            *current = Snapshot::new(next);
            current.clone()
        };
        self.notify(&snapshot);
        self.schedule_refresh();
        true
    }

    fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn schedule_refresh(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.refresh_debounce.schedule(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let target = lock(&inner.refresh_target).as_ref().and_then(Weak::upgrade);
            if let Some(target) = target {
                let snapshot = lock(&inner.current).clone();
                target.refresh(snapshot);
            }
        });
    }
}
