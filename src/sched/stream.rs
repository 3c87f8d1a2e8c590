use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::lock;

/// Handle for one issued request. Only the most recently issued ticket on a
/// stream is live; issuing a new one cancels the rest.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    Completed(T),
    /// Superseded or explicitly cancelled. Never an error.
    Cancelled,
    TimedOut,
}

/// A single logical request stream with abort-the-previous semantics.
#[derive(Debug)]
pub struct RequestStream {
    name: &'static str,
    generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
}

impl RequestStream {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancels whatever is in flight and hands out the new latest ticket.
    pub fn issue(&self) -> Ticket {
        let token = CancellationToken::new();
        let mut current = lock(&self.current);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        Ticket { generation, token }
    }

    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = lock(&self.current).take() {
            previous.cancel();
        }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        !ticket.token.is_cancelled() && self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Drives `fut` until it completes, the ticket is cancelled, or `limit`
    /// elapses. A result that arrives after the ticket lost its place is
    /// reported as `Cancelled`, so callers only ever see the latest response.
    pub async fn run<F, T>(&self, ticket: &Ticket, limit: Option<Duration>, fut: F) -> Attempt<T>
    where
        F: Future<Output = T>,
    {
        let guarded = async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
                None => Some(fut.await),
            }
        };
        tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Attempt::Cancelled,
            out = guarded => match out {
                _ if !self.is_latest(ticket) => Attempt::Cancelled,
                Some(value) => Attempt::Completed(value),
                None => Attempt::TimedOut,
            },
        }
    }
}
