//! In-memory storage implementation for testing and embedding.
//!
//! Uses DashMap for thread-safe concurrent access without explicit locks.
//! Every record carries an insertion sequence number so that filtered reads
//! return results in a stable order, which keeps windowed reads composable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::traits::{IdentityProvider, PermissionTicketStore, ResourceStore, ScopeStore};
use crate::types::{
    ClientRef, PermissionTicket, Resource, ResourceFilter, Scope, TicketFilter, UserRef,
};

/// In-memory implementation of all four store traits over shared maps.
///
/// Sharing one backing store between the traits lets ticket lookups join
/// against resources (`find_granted` matches tickets by resource name) the
/// way a relational backend would.
#[derive(Debug, Default)]
pub struct MemoryAuthzStore {
    resources: DashMap<String, (u64, Resource)>,
    tickets: DashMap<String, (u64, PermissionTicket)>,
    users: DashMap<String, UserRef>,
    clients: DashMap<String, ClientRef>,
    seq: AtomicU64,
}

impl MemoryAuthzStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a resource.
    pub fn add_resource(&self, resource: Resource) {
        self.resources
            .insert(resource.id.clone(), (self.next_seq(), resource));
    }

    /// Registers a user account.
    pub fn add_user(&self, user: UserRef) {
        self.users.insert(user.id.clone(), user);
    }

    /// Registers a service client.
    pub fn add_client(&self, client: ClientRef) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Inserts a pre-built ticket, bypassing `create`. Intended for seeding
    /// states a normal reconciliation would not produce, such as scope-less
    /// whole-resource grants.
    pub fn add_ticket(&self, ticket: PermissionTicket) {
        self.tickets
            .insert(ticket.id.clone(), (self.next_seq(), ticket));
    }

    /// Returns the number of stored tickets.
    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Collects entries matching `keep` in insertion order.
    fn collect_ordered<T: Clone, F>(map: &DashMap<String, (u64, T)>, keep: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut hits: Vec<(u64, T)> = map
            .iter()
            .filter(|entry| keep(&entry.value().1))
            .map(|entry| entry.value().clone())
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        hits.into_iter().map(|(_, value)| value).collect()
    }

    fn window<T>(items: Vec<T>, first: usize, max: usize) -> Vec<T> {
        items.into_iter().skip(first).take(max).collect()
    }
}

#[async_trait]
impl ResourceStore for MemoryAuthzStore {
    async fn find_by_id(
        &self,
        resource_server: &str,
        id: &str,
    ) -> StorageResult<Option<Resource>> {
        Ok(self
            .resources
            .get(id)
            .map(|entry| entry.value().1.clone())
            .filter(|resource| resource.resource_server == resource_server))
    }

    async fn find(
        &self,
        resource_server: &str,
        filter: &ResourceFilter,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        let hits = Self::collect_ordered(&self.resources, |resource| {
            resource.resource_server == resource_server && filter.matches(resource)
        });
        Ok(Self::window(hits, first, max))
    }

    async fn find_granted_to(
        &self,
        requester: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        let hits = Self::collect_ordered(&self.resources, |resource| {
            self.tickets.iter().any(|entry| {
                let ticket = &entry.value().1;
                ticket.granted && ticket.requester == requester && ticket.resource_id == resource.id
            })
        });
        Ok(Self::window(hits, first, max))
    }

    async fn find_granted_by_owner(
        &self,
        owner: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        let hits = Self::collect_ordered(&self.resources, |resource| {
            resource.owner == owner
                && self.tickets.iter().any(|entry| {
                    let ticket = &entry.value().1;
                    ticket.granted && ticket.resource_id == resource.id
                })
        });
        Ok(Self::window(hits, first, max))
    }
}

#[async_trait]
impl ScopeStore for MemoryAuthzStore {
    async fn find_by_name(
        &self,
        resource_server: &str,
        name: &str,
    ) -> StorageResult<Option<Scope>> {
        Ok(self.scope_where(resource_server, |scope| scope.name == name))
    }

    async fn find_by_id(&self, resource_server: &str, id: &str) -> StorageResult<Option<Scope>> {
        Ok(self.scope_where(resource_server, |scope| scope.id == id))
    }
}

impl MemoryAuthzStore {
    /// Scopes live on the resources that expose them; search across all
    /// resources of the server.
    fn scope_where<F>(&self, resource_server: &str, hit: F) -> Option<Scope>
    where
        F: Fn(&Scope) -> bool,
    {
        self.resources.iter().find_map(|entry| {
            let resource = &entry.value().1;
            if resource.resource_server != resource_server {
                return None;
            }
            resource.scopes.iter().find(|scope| hit(scope)).cloned()
        })
    }
}

#[async_trait]
impl PermissionTicketStore for MemoryAuthzStore {
    async fn find(
        &self,
        resource_server: &str,
        filter: &TicketFilter,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<PermissionTicket>> {
        let hits = Self::collect_ordered(&self.tickets, |ticket| {
            ticket.resource_server == resource_server && filter.matches(ticket)
        });
        Ok(Self::window(
            hits,
            first.unwrap_or(0),
            max.unwrap_or(usize::MAX),
        ))
    }

    async fn find_granted(
        &self,
        resource_server: &str,
        resource_name: &str,
        requester: &str,
    ) -> StorageResult<Vec<PermissionTicket>> {
        Ok(Self::collect_ordered(&self.tickets, |ticket| {
            ticket.granted
                && ticket.resource_server == resource_server
                && ticket.requester == requester
                && self
                    .resources
                    .get(&ticket.resource_id)
                    .map(|entry| entry.value().1.name == resource_name)
                    .unwrap_or(false)
        }))
    }

    #[instrument(skip(self, resource, scope), fields(resource_id = %resource.id, scope_id = %scope.id))]
    async fn create(
        &self,
        resource_server: &str,
        resource: &Resource,
        scope: &Scope,
        requester: &str,
    ) -> StorageResult<PermissionTicket> {
        let ticket = PermissionTicket {
            id: Uuid::new_v4().to_string(),
            resource_id: resource.id.clone(),
            owner: resource.owner.clone(),
            requester: requester.to_string(),
            scope_id: Some(scope.id.clone()),
            granted: false,
            granted_at: None,
            resource_server: resource_server.to_string(),
        };
        self.tickets
            .insert(ticket.id.clone(), (self.next_seq(), ticket.clone()));
        Ok(ticket)
    }

    async fn update(&self, ticket: &PermissionTicket) -> StorageResult<()> {
        match self.tickets.get_mut(&ticket.id) {
            Some(mut entry) => {
                entry.value_mut().1 = ticket.clone();
                Ok(())
            }
            None => Err(StorageError::TicketNotFound {
                ticket_id: ticket.id.clone(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, ticket_id: &str) -> StorageResult<()> {
        self.tickets
            .remove(ticket_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::TicketNotFound {
                ticket_id: ticket_id.to_string(),
            })
    }
}

#[async_trait]
impl IdentityProvider for MemoryAuthzStore {
    async fn user_by_id(&self, id: &str) -> StorageResult<Option<UserRef>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn user_by_username(&self, username: &str) -> StorageResult<Option<UserRef>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn client_by_client_id(&self, client_id: &str) -> StorageResult<Option<ClientRef>> {
        Ok(self
            .clients
            .iter()
            .find(|entry| entry.value().client_id == client_id)
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, name: &str, owner: &str, server: &str) -> Resource {
        Resource {
            id: id.to_string(),
            name: name.to_string(),
            uri: None,
            resource_type: None,
            owner: owner.to_string(),
            scopes: vec![Scope::new(format!("{id}-read"), "read")],
            resource_server: server.to_string(),
        }
    }

    #[tokio::test]
    async fn find_by_id_is_scoped_to_the_resource_server() {
        let store = MemoryAuthzStore::new();
        store.add_resource(resource("r1", "doc", "alice", "server1"));

        assert!(ResourceStore::find_by_id(&store, "server1", "r1")
            .await
            .unwrap()
            .is_some());
        assert!(ResourceStore::find_by_id(&store, "server2", "r1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_returns_results_in_insertion_order() {
        let store = MemoryAuthzStore::new();
        for n in 0..5 {
            store.add_resource(resource(&format!("r{n}"), &format!("doc-{n}"), "alice", "s"));
        }

        let all = ResourceStore::find(&store, "s", &ResourceFilter::default(), 0, 100)
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4"]);

        let window = ResourceStore::find(&store, "s", &ResourceFilter::default(), 2, 2)
            .await
            .unwrap();
        let ids: Vec<&str> = window.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
    }

    #[tokio::test]
    async fn create_then_update_marks_ticket_granted() {
        let store = MemoryAuthzStore::new();
        let res = resource("r1", "doc", "alice", "s");
        store.add_resource(res.clone());

        let scope = res.scopes[0].clone();
        let mut ticket = store.create("s", &res, &scope, "bob").await.unwrap();
        assert!(!ticket.granted);

        ticket.grant(chrono::Utc::now());
        store.update(&ticket).await.unwrap();

        let found = store.find_granted("s", "doc", "bob").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].granted_at.is_some());
    }

    #[tokio::test]
    async fn delete_of_unknown_ticket_is_an_error() {
        let store = MemoryAuthzStore::new();
        let err = store.delete("missing").await.unwrap_err();
        assert!(matches!(err, StorageError::TicketNotFound { .. }));
    }

    #[tokio::test]
    async fn granted_resource_lookups_join_through_tickets() {
        let store = MemoryAuthzStore::new();
        let res = resource("r1", "doc", "alice", "s");
        store.add_resource(res.clone());
        let scope = res.scopes[0].clone();

        let mut ticket = store.create("s", &res, &scope, "bob").await.unwrap();

        // Ungranted tickets are invisible to the granted lookups.
        assert!(store.find_granted_to("bob", 0, 100).await.unwrap().is_empty());

        ticket.grant(chrono::Utc::now());
        store.update(&ticket).await.unwrap();

        let to_bob = store.find_granted_to("bob", 0, 100).await.unwrap();
        assert_eq!(to_bob.len(), 1);
        let by_alice = store.find_granted_by_owner("alice", 0, 100).await.unwrap();
        assert_eq!(by_alice.len(), 1);
    }
}
