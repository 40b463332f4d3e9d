//! Persistence for the relay.
//!
//! ## Files
//!
//! ```text
//! posted_articles.json      # History: identifiers already dispatched
//! debug/                    # Optional raw page dumps
//! └── page-<time>-<hash>.html
//! ```

pub mod dump;
pub mod history;

// Re-export for convenience
pub use history::{HistoryEntry, HistorySession, HistoryStore, SeenMarker};
