//! URL handling module for driftnet
//!
//! This module provides URL canonicalization and seed-scope matching.
//! Canonical URLs are the dedupe and lookup key everywhere else in the
//! crate: two spellings of the same destination must collapse to one key
//! before they reach the queue, the page store, or the tracking sets.

mod normalize;
mod scope;

pub use normalize::canonicalize;
pub use scope::{is_in_scope, scope_seed};
