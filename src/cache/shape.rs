//! Producer Shape Module
//!
//! Distinguishes producers that return a value directly from producers that
//! return a future.

use std::fmt;

// == Shape ==
/// How a producer delivers its result.
///
/// The entry point a caller picks decides the shape, so no producer is ever
/// inspected or invoked to find out. A permanent key keeps the shape of the
/// call that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `FnOnce() -> Result<V>`
    Immediate,
    /// `FnOnce() -> impl Future<Output = Result<V>>`
    Deferred,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Immediate => f.write_str("immediate"),
            Shape::Deferred => f.write_str("deferred"),
        }
    }
}
