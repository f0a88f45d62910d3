//! Named Cache - memoize expensive lookups under a caller-chosen name
//!
//! Provides a permanent cache and a cache whose entries carry their own
//! expiry, both safe to share across tasks and threads.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, Clock, ManualClock, NamedCache, Shape, SystemClock, TimedEntry};
pub use config::Config;
pub use error::{CacheError, Result};
