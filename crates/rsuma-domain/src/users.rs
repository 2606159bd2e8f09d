//! Aggregates granted tickets on one resource into per-user permission
//! entries.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use rsuma_storage::{PermissionTicketStore, Resource, ScopeStore, TicketFilter};

use crate::error::DomainResult;

/// All granted scope names one requester holds on one resource. Derived
/// from tickets, never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserResourcePermission {
    /// Requester id.
    pub id: String,
    pub scopes: Vec<String>,
}

/// Builds the per-resource user roster from granted tickets.
pub struct ResourceUserFinder<P, S> {
    tickets: Arc<P>,
    scopes: Arc<S>,
}

impl<P, S> ResourceUserFinder<P, S>
where
    P: PermissionTicketStore,
    S: ScopeStore,
{
    pub fn new(tickets: Arc<P>, scopes: Arc<S>) -> Self {
        Self { tickets, scopes }
    }

    /// Returns one entry per requester holding a granted scope on
    /// `resource`, in encounter order. The resource owner can never appear
    /// as a requester.
    pub async fn users_of_resource(
        &self,
        resource: &Resource,
    ) -> DomainResult<Vec<UserResourcePermission>> {
        let filter = TicketFilter {
            owner: Some(resource.owner.clone()),
            granted: Some(true),
            resource_id: Some(resource.id.clone()),
            ..Default::default()
        };
        let tickets = self
            .tickets
            .find(&resource.resource_server, &filter, None, None)
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut by_requester: HashMap<String, Vec<String>> = HashMap::new();
        for ticket in tickets {
            let Some(scope_id) = &ticket.scope_id else {
                continue;
            };
            let Some(scope) = self
                .scopes
                .find_by_id(&resource.resource_server, scope_id)
                .await?
            else {
                continue;
            };
            if !by_requester.contains_key(&ticket.requester) {
                order.push(ticket.requester.clone());
            }
            by_requester
                .entry(ticket.requester.clone())
                .or_default()
                .push(scope.name);
        }

        Ok(order
            .into_iter()
            .map(|id| {
                let scopes = by_requester.remove(&id).unwrap_or_default();
                UserResourcePermission { id, scopes }
            })
            .collect())
    }
}
