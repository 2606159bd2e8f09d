//! Store trait definitions.
//!
//! The engine never reaches a store through ambient state; every component
//! receives the stores it needs at construction. Implementations must be
//! thread-safe (Send + Sync) and support async operations.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{
    ClientRef, PermissionTicket, Resource, ResourceFilter, Scope, TicketFilter, UserRef,
};

/// Read access to the resource store.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Looks up a resource by id within a resource server.
    async fn find_by_id(
        &self,
        resource_server: &str,
        id: &str,
    ) -> StorageResult<Option<Resource>>;

    /// Returns resources matching `filter`, windowed by (first, max).
    ///
    /// Ordering must be stable across calls for a stable data set so that
    /// windowed reads compose.
    async fn find(
        &self,
        resource_server: &str,
        filter: &ResourceFilter,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>>;

    /// Returns resources with at least one ticket granted to `requester`,
    /// across resource servers, windowed by (first, max).
    async fn find_granted_to(
        &self,
        requester: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>>;

    /// Returns resources owned by `owner` that carry at least one granted
    /// ticket, windowed by (first, max).
    async fn find_granted_by_owner(
        &self,
        owner: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>>;
}

/// Read access to the scope store.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Looks up a scope by name within a resource server.
    async fn find_by_name(
        &self,
        resource_server: &str,
        name: &str,
    ) -> StorageResult<Option<Scope>>;

    /// Looks up a scope by id within a resource server.
    async fn find_by_id(&self, resource_server: &str, id: &str) -> StorageResult<Option<Scope>>;
}

/// Read/write access to the permission ticket store.
#[async_trait]
pub trait PermissionTicketStore: Send + Sync {
    /// Returns tickets matching `filter`, optionally windowed.
    async fn find(
        &self,
        resource_server: &str,
        filter: &TicketFilter,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<PermissionTicket>>;

    /// Returns granted tickets held by `requester` on resources named
    /// `resource_name` within a resource server.
    async fn find_granted(
        &self,
        resource_server: &str,
        resource_name: &str,
        requester: &str,
    ) -> StorageResult<Vec<PermissionTicket>>;

    /// Creates an ungranted ticket for (resource, scope, requester).
    async fn create(
        &self,
        resource_server: &str,
        resource: &Resource,
        scope: &Scope,
        requester: &str,
    ) -> StorageResult<PermissionTicket>;

    /// Persists a modified ticket.
    async fn update(&self, ticket: &PermissionTicket) -> StorageResult<()>;

    /// Deletes a ticket by id.
    async fn delete(&self, ticket_id: &str) -> StorageResult<()>;
}

/// Identity lookups used to translate filter values into principal ids and
/// to confirm that referenced users exist.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Looks up a user by internal id.
    async fn user_by_id(&self, id: &str) -> StorageResult<Option<UserRef>>;

    /// Looks up a user by username.
    async fn user_by_username(&self, username: &str) -> StorageResult<Option<UserRef>>;

    /// Looks up a service client by its public client id.
    async fn client_by_client_id(&self, client_id: &str) -> StorageResult<Option<ClientRef>>;
}
