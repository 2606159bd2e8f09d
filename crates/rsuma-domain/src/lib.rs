//! rsuma-domain: Resource sharing engine
//!
//! This crate contains the core resource-sharing logic layered on top of
//! the store traits from `rsuma-storage`:
//! - Chunked pagination over bounded paged fetches
//! - Shared-link resolution through granted permission tickets
//! - Resource query planning over heterogeneous filters
//! - Reconciliation of desired grant state against stored tickets
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rsuma-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  paging.rs      - Chunked lazy pagination   │
//! │  shared.rs      - Shared-link resolver      │
//! │  query.rs       - Resource query planner    │
//! │  permissions.rs - Permission reconciler     │
//! │  users.rs       - Per-resource user roster  │
//! │  audit.rs       - Permission change events  │
//! │  engine.rs      - Facade binding the parts  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All operations are request-scoped and stateless across requests; streams
//! are lazy and consumer-driven, so a caller that stops early triggers no
//! further store reads.

pub mod audit;
pub mod engine;
pub mod error;
pub mod paging;
pub mod permissions;
pub mod query;
pub mod shared;
pub mod users;

#[cfg(test)]
mod tests;

// Re-export commonly used types at the crate root
pub use audit::{AuditSink, PermissionChangeEvent, TracingAuditSink};
pub use engine::ResourceEngine;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use permissions::PermissionSetter;
pub use query::{Generator, PostFilter, QueryPlan, ResourceFinder, ResourceQuery};
pub use shared::SharedResourceFinder;
pub use users::{ResourceUserFinder, UserResourcePermission};
