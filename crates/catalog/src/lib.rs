//! Anime catalog lookups against the Jikan API v4.
//!
//! Resolves an anime id to the title and poster image recorded in the watch
//! history and saved list. Payloads are validated before use; nothing from
//! the third-party response is trusted implicitly.

pub mod client;
pub mod rate_limiter;
pub mod types;

pub use client::JikanClient;
pub use rate_limiter::RateLimiter;
pub use types::{AnimeSummary, PayloadError};
