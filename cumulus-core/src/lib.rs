//! Cumulus Core
//!
//! Host-facing abstractions for a resource lifecycle engine: attribute
//! values, schemas, diffs, diagnostics and the provider trait

pub mod context;
pub mod diagnostic;
pub mod differ;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod schema;
