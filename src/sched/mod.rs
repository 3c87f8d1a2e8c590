//! Timing and cancellation primitives shared by the store and both request
//! streams.

pub mod debounce;
pub mod stream;

pub use debounce::Debouncer;
pub use stream::{Attempt, RequestStream, Ticket};

use std::sync::{Mutex, MutexGuard};

/// Locks `m`, recovering the data if a previous holder panicked.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
