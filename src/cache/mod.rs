//! Cache Module
//!
//! Provides named memoization with permanent and producer-expiring entries.

mod clock;
mod entry;
mod registry;
mod shape;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::TimedEntry;
pub use shape::Shape;
pub use stats::CacheStats;
pub use store::NamedCache;
