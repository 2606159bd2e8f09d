//! Resolves the sharing relation between users and resources.
//!
//! A resource is "shared with" a user when at least one granted ticket names
//! the user as requester, and "shared by" a user when the user owns the
//! resource and at least one granted ticket exists for another requester.

use std::collections::HashSet;
use std::sync::Arc;

use rsuma_storage::{PermissionTicketStore, Resource, ResourceStore, TicketFilter};

use crate::error::DomainResult;
use crate::paging::{limit_first, limit_max};

/// Resolves shared-with / shared-by relationships through granted tickets.
pub struct SharedResourceFinder<R, P> {
    resources: Arc<R>,
    tickets: Arc<P>,
}

impl<R, P> SharedResourceFinder<R, P>
where
    R: ResourceStore,
    P: PermissionTicketStore,
{
    pub fn new(resources: Arc<R>, tickets: Arc<P>) -> Self {
        Self { resources, tickets }
    }

    /// Distinct ids of resources shared with `user_id`, restricted to
    /// `resource_server`, in encounter order.
    ///
    /// The pagination window applies to the underlying granted-resource
    /// fetch, not to the de-duplicated id list.
    pub async fn shared_with_user(
        &self,
        resource_server: &str,
        user_id: &str,
        first: Option<i32>,
        max: Option<i32>,
    ) -> DomainResult<Vec<String>> {
        let granted = self
            .resources
            .find_granted_to(user_id, limit_first(first), limit_max(max))
            .await?;

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for resource in granted {
            let tickets = self
                .tickets
                .find_granted(&resource.resource_server, &resource.name, user_id)
                .await?;
            for ticket in tickets {
                if ticket.resource_server == resource_server
                    && seen.insert(ticket.resource_id.clone())
                {
                    ids.push(ticket.resource_id);
                }
            }
        }
        Ok(ids)
    }

    /// Distinct ids of resources `user_id` owns and has granted to at least
    /// one other requester, restricted to `resource_server`.
    pub async fn shared_by_user(
        &self,
        resource_server: &str,
        user_id: &str,
        first: Option<i32>,
        max: Option<i32>,
    ) -> DomainResult<Vec<String>> {
        let owned = self
            .resources
            .find_granted_by_owner(user_id, limit_first(first), limit_max(max))
            .await?;

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for resource in owned {
            let filter = TicketFilter {
                owner: Some(user_id.to_string()),
                granted: Some(true),
                resource_id: Some(resource.id.clone()),
                ..Default::default()
            };
            let tickets = self
                .tickets
                .find(&resource.resource_server, &filter, None, None)
                .await?;
            for ticket in tickets {
                if ticket.resource_server == resource_server
                    && seen.insert(ticket.resource_id.clone())
                {
                    ids.push(ticket.resource_id);
                }
            }
        }
        Ok(ids)
    }

    /// Whether `resource` carries a granted ticket naming `user_id` as
    /// requester. Absent arguments resolve to false.
    pub async fn is_shared_with_user(
        &self,
        user_id: Option<&str>,
        resource: Option<&Resource>,
    ) -> DomainResult<bool> {
        let (Some(user_id), Some(resource)) = (user_id, resource) else {
            return Ok(false);
        };

        let tickets = self
            .tickets
            .find_granted(&resource.resource_server, &resource.name, user_id)
            .await?;
        Ok(!tickets.is_empty())
    }

    /// Whether `resource` carries a granted ticket owned by `user_id`.
    /// Absent arguments resolve to false.
    pub async fn is_shared_by_user(
        &self,
        user_id: Option<&str>,
        resource: Option<&Resource>,
    ) -> DomainResult<bool> {
        let (Some(user_id), Some(resource)) = (user_id, resource) else {
            return Ok(false);
        };

        let filter = TicketFilter {
            resource_id: Some(resource.id.clone()),
            ..Default::default()
        };
        let tickets = self
            .tickets
            .find(&resource.resource_server, &filter, None, None)
            .await?;
        Ok(tickets
            .iter()
            .any(|ticket| ticket.granted && ticket.owner == user_id))
    }
}
