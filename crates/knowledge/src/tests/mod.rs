//! Integration tests for the knowledge store.

mod store;
