//! `vigil-memory` – persisted behavioral memory.
//!
//! Currently one store: [`patterns::PatternLibrary`], the committed set of
//! learned movement patterns used for idle-motion mimicry.  Persisted as a
//! single flat JSON document, rewritten wholesale on every commit.

pub mod patterns;

pub use patterns::{PatternError, PatternLibrary, MAX_PATTERNS};
