//! Crate-level retrieval scenarios.

mod support;
