//! Shared fixtures for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rsuma_storage::{
    ClientRef, MemoryAuthzStore, PermissionTicket, PermissionTicketStore, Resource,
    ResourceFilter, ResourceStore, Scope, StorageResult, TicketFilter, UserRef,
};

use crate::audit::{AuditSink, PermissionChangeEvent};
use crate::engine::ResourceEngine;

pub const SERVER: &str = "server1";

/// All tickets stored for [`SERVER`], qualified because the memory store
/// implements `find` for several traits.
pub async fn all_tickets(store: &MemoryAuthzStore) -> Vec<PermissionTicket> {
    PermissionTicketStore::find(store, SERVER, &TicketFilter::default(), None, None)
        .await
        .unwrap()
}

pub fn user(id: &str) -> UserRef {
    UserRef::new(id, format!("{id}-name"))
}

pub fn resource(id: &str, name: &str, owner: &str, scope_names: &[&str]) -> Resource {
    Resource {
        id: id.to_string(),
        name: name.to_string(),
        uri: None,
        resource_type: None,
        owner: owner.to_string(),
        // Scope names are unique per resource server, so two resources
        // exposing "read" share one scope entity.
        scopes: scope_names
            .iter()
            .map(|scope| Scope::new(format!("scope-{scope}"), *scope))
            .collect(),
        resource_server: SERVER.to_string(),
    }
}

/// Resource store wrapper counting every read.
pub struct CountingResourceStore {
    inner: Arc<MemoryAuthzStore>,
    pub reads: AtomicUsize,
}

impl CountingResourceStore {
    pub fn new(inner: Arc<MemoryAuthzStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for CountingResourceStore {
    async fn find_by_id(
        &self,
        resource_server: &str,
        id: &str,
    ) -> StorageResult<Option<Resource>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(resource_server, id).await
    }

    async fn find(
        &self,
        resource_server: &str,
        filter: &ResourceFilter,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        ResourceStore::find(&*self.inner, resource_server, filter, first, max).await
    }

    async fn find_granted_to(
        &self,
        requester: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_granted_to(requester, first, max).await
    }

    async fn find_granted_by_owner(
        &self,
        owner: &str,
        first: usize,
        max: usize,
    ) -> StorageResult<Vec<Resource>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_granted_by_owner(owner, first, max).await
    }
}

/// Ticket store wrapper counting reads and every kind of write.
pub struct CountingTicketStore {
    inner: Arc<MemoryAuthzStore>,
    pub reads: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingTicketStore {
    pub fn new(inner: Arc<MemoryAuthzStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> (usize, usize, usize) {
        (
            self.creates.load(Ordering::SeqCst),
            self.updates.load(Ordering::SeqCst),
            self.deletes.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl PermissionTicketStore for CountingTicketStore {
    async fn find(
        &self,
        resource_server: &str,
        filter: &TicketFilter,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<PermissionTicket>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        PermissionTicketStore::find(&*self.inner, resource_server, filter, first, max).await
    }

    async fn find_granted(
        &self,
        resource_server: &str,
        resource_name: &str,
        requester: &str,
    ) -> StorageResult<Vec<PermissionTicket>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .find_granted(resource_server, resource_name, requester)
            .await
    }

    async fn create(
        &self,
        resource_server: &str,
        resource: &Resource,
        scope: &Scope,
        requester: &str,
    ) -> StorageResult<PermissionTicket> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .create(resource_server, resource, scope, requester)
            .await
    }

    async fn update(&self, ticket: &PermissionTicket) -> StorageResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(ticket).await
    }

    async fn delete(&self, ticket_id: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(ticket_id).await
    }
}

/// Audit sink capturing emitted events.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<PermissionChangeEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<PermissionChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn permissions_changed(&self, event: PermissionChangeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub type TestEngine = ResourceEngine<
    CountingResourceStore,
    MemoryAuthzStore,
    CountingTicketStore,
    MemoryAuthzStore,
    RecordingAuditSink,
>;

/// A fully wired engine over the in-memory store, with counting wrappers
/// around the resource and ticket stores.
pub struct Fixture {
    pub store: Arc<MemoryAuthzStore>,
    pub resources: Arc<CountingResourceStore>,
    pub tickets: Arc<CountingTicketStore>,
    pub audit: Arc<RecordingAuditSink>,
    pub engine: TestEngine,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryAuthzStore::new_shared();
        let resources = Arc::new(CountingResourceStore::new(Arc::clone(&store)));
        let tickets = Arc::new(CountingTicketStore::new(Arc::clone(&store)));
        let audit = Arc::new(RecordingAuditSink::default());
        let engine = ResourceEngine::new(
            Arc::clone(&resources),
            Arc::clone(&store),
            Arc::clone(&tickets),
            Arc::clone(&store),
            Arc::clone(&audit),
        );
        Self {
            store,
            resources,
            tickets,
            audit,
            engine,
        }
    }

    pub fn add_user(&self, id: &str) -> UserRef {
        let user = user(id);
        self.store.add_user(user.clone());
        user
    }

    pub fn add_client(&self, id: &str, client_id: &str) {
        self.store.add_client(ClientRef {
            id: id.to_string(),
            client_id: client_id.to_string(),
        });
    }

    pub fn add_resource(&self, id: &str, name: &str, owner: &str, scopes: &[&str]) -> Resource {
        let resource = resource(id, name, owner, scopes);
        self.store.add_resource(resource.clone());
        resource
    }
}
