//! Facade binding the query, sharing and reconciliation components to a set
//! of store handles.
//!
//! This is the surface an outer transport layer calls into. It adds the
//! not-found checks for referenced entities before dispatching to the
//! planner or reconciler.

use std::sync::Arc;

use tracing::instrument;

use rsuma_storage::{
    IdentityProvider, PermissionTicketStore, Resource, ResourceStore, ScopeStore, UserRef,
};

use crate::audit::AuditSink;
use crate::error::{DomainError, DomainResult};
use crate::permissions::PermissionSetter;
use crate::query::{ResourceFinder, ResourceQuery};
use crate::shared::SharedResourceFinder;
use crate::users::{ResourceUserFinder, UserResourcePermission};

/// The resource-sharing engine: five operations over four store handles.
pub struct ResourceEngine<R, S, P, I, A> {
    resources: Arc<R>,
    identity: Arc<I>,
    shared: Arc<SharedResourceFinder<R, P>>,
    finder: ResourceFinder<R, P, I>,
    users: ResourceUserFinder<P, S>,
    permissions: PermissionSetter<P, S, A>,
}

impl<R, S, P, I, A> ResourceEngine<R, S, P, I, A>
where
    R: ResourceStore + 'static,
    S: ScopeStore + 'static,
    P: PermissionTicketStore + 'static,
    I: IdentityProvider + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        resources: Arc<R>,
        scopes: Arc<S>,
        tickets: Arc<P>,
        identity: Arc<I>,
        audit: Arc<A>,
    ) -> Self {
        let shared = Arc::new(SharedResourceFinder::new(
            Arc::clone(&resources),
            Arc::clone(&tickets),
        ));
        let finder = ResourceFinder::new(
            Arc::clone(&resources),
            Arc::clone(&identity),
            Arc::clone(&shared),
        );
        let users = ResourceUserFinder::new(Arc::clone(&tickets), Arc::clone(&scopes));
        let permissions = PermissionSetter::new(tickets, scopes, audit);
        Self {
            resources,
            identity,
            shared,
            finder,
            users,
            permissions,
        }
    }

    /// Runs a resource query and returns full representations.
    pub async fn find_resources(
        &self,
        resource_server: &str,
        query: &ResourceQuery,
    ) -> DomainResult<Vec<Resource>> {
        self.finder.find_resources(resource_server, query).await
    }

    /// Runs a resource query and returns identifiers only.
    pub async fn find_resource_ids(
        &self,
        resource_server: &str,
        query: &ResourceQuery,
    ) -> DomainResult<Vec<String>> {
        self.finder.find_resource_ids(resource_server, query).await
    }

    /// Ids of resources shared with `user_id`.
    #[instrument(skip(self))]
    pub async fn shared_with_user(
        &self,
        resource_server: &str,
        user_id: &str,
        first: Option<i32>,
        max: Option<i32>,
    ) -> DomainResult<Vec<String>> {
        self.require_user(user_id).await?;
        self.shared
            .shared_with_user(resource_server, user_id, first, max)
            .await
    }

    /// Ids of resources `user_id` has shared with others.
    #[instrument(skip(self))]
    pub async fn shared_by_user(
        &self,
        resource_server: &str,
        user_id: &str,
        first: Option<i32>,
        max: Option<i32>,
    ) -> DomainResult<Vec<String>> {
        self.require_user(user_id).await?;
        self.shared
            .shared_by_user(resource_server, user_id, first, max)
            .await
    }

    /// Per-user granted scopes on one resource.
    #[instrument(skip(self))]
    pub async fn users_of_resource(
        &self,
        resource_server: &str,
        resource_id: &str,
    ) -> DomainResult<Vec<UserResourcePermission>> {
        let resource = self.require_resource(resource_server, resource_id).await?;
        self.users.users_of_resource(&resource).await
    }

    /// Replaces the granted scope set for (user, resource) with `scopes`.
    #[instrument(skip(self, scopes))]
    pub async fn set_permissions(
        &self,
        resource_server: &str,
        user_id: &str,
        resource_id: &str,
        scopes: &[String],
    ) -> DomainResult<()> {
        let user = self.require_user(user_id).await?;
        let resource = self.require_resource(resource_server, resource_id).await?;
        self.permissions
            .set_permissions(&user, &resource, scopes)
            .await
    }

    async fn require_user(&self, user_id: &str) -> DomainResult<UserRef> {
        self.identity
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn require_resource(
        &self,
        resource_server: &str,
        resource_id: &str,
    ) -> DomainResult<Resource> {
        self.resources
            .find_by_id(resource_server, resource_id)
            .await?
            .ok_or_else(|| DomainError::ResourceNotFound {
                resource_id: resource_id.to_string(),
            })
    }
}
