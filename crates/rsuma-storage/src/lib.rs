//! rsuma-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for the rsuma sharing
//! engine, including:
//! - Model types for resources, scopes and permission tickets
//! - Store traits the engine consumes
//! - An in-memory implementation for testing and embedding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsuma-storage                  │
//! ├─────────────────────────────────────────────┤
//! │  types.rs   - Model types & filter specs    │
//! │  traits.rs  - Store trait definitions       │
//! │  memory.rs  - In-memory implementation      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryAuthzStore;
pub use traits::{IdentityProvider, PermissionTicketStore, ResourceStore, ScopeStore};
pub use types::{
    ClientRef, PermissionTicket, Resource, ResourceFilter, Scope, TicketFilter, UserRef,
};
