//! Live filter state and option-refresh engine.
//!
//! ```text
//! ┌──────────────┐ snapshot ┌──────────────┐ merge+render ┌──────────────┐
//! │ FilterStore  │─────────►│  Renderers   │─────────────►│     Page     │
//! └──────┬───────┘          └──────────────┘              └──────▲───────┘
//!        │ debounced refresh                                     │
//!        ▼                                                       │
//! ┌──────────────┐   POST options   ┌──────────────┐             │
//! │OptionsFetcher│─────────────────►│  Transport   │─────────────┘
//! └──────────────┘                  └──────▲───────┘
//! ┌──────────────┐   POST search           │
//! │ MeterSearch  │─────────────────────────┘
//! └──────────────┘
//! ```
//!
//! Each request stream keeps a single live request; issuing a new one
//! cancels the previous, so a stale response is never rendered.

pub mod config;
pub mod fetch;
pub mod logging;
pub mod net;
pub mod page;
pub mod render;
pub mod reorder;
pub mod sched;
pub mod search;
pub mod session;
pub mod state;
pub mod store;
pub mod submit;

pub use config::Config;
pub use session::FilterSession;
