//! Engine test suite.
//!
//! Tests run against the in-memory store from `rsuma-storage`, wrapped in
//! thin counting adapters where a property is about how often a store was
//! touched rather than about the result.

mod support;
