//! Reconciles a desired grant state against stored permission tickets.
//!
//! `set_permissions` is an idempotent replace: after it returns, the set of
//! granted scopes for the (grantee, resource) pair equals exactly the
//! desired set, and no other tickets remain for that pair.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use rsuma_storage::{
    PermissionTicket, PermissionTicketStore, Resource, Scope, ScopeStore, TicketFilter, UserRef,
};

use crate::audit::{AuditSink, PermissionChangeEvent};
use crate::error::{DomainError, DomainResult};

/// Reconciles per-user permissions on a resource.
pub struct PermissionSetter<P, S, A> {
    tickets: Arc<P>,
    scopes: Arc<S>,
    audit: Arc<A>,
}

impl<P, S, A> PermissionSetter<P, S, A>
where
    P: PermissionTicketStore,
    S: ScopeStore,
    A: AuditSink,
{
    pub fn new(tickets: Arc<P>, scopes: Arc<S>, audit: Arc<A>) -> Self {
        Self {
            tickets,
            scopes,
            audit,
        }
    }

    /// Replaces the granted scope set for `(grantee, resource)` with
    /// `desired`, creating, re-granting and deleting tickets as needed.
    ///
    /// Validation happens before any mutating call, so client errors never
    /// leave partial writes. An empty `desired` revokes everything.
    #[instrument(skip(self, grantee, resource), fields(grantee = %grantee.id, resource_id = %resource.id))]
    pub async fn set_permissions(
        &self,
        grantee: &UserRef,
        resource: &Resource,
        desired: &[String],
    ) -> DomainResult<()> {
        if grantee.id == resource.owner {
            return Err(DomainError::OwnerPermission {
                user_id: grantee.id.clone(),
                resource_id: resource.id.clone(),
            });
        }

        for name in desired {
            if !resource.scopes.iter().any(|scope| scope.name == *name) {
                return Err(DomainError::ScopeNotAllowed {
                    scope: name.clone(),
                    resource_id: resource.id.clone(),
                });
            }
        }

        let filter = TicketFilter {
            resource_id: Some(resource.id.clone()),
            requester: Some(grantee.id.clone()),
            ..Default::default()
        };
        let existing = self
            .tickets
            .find(&resource.resource_server, &filter, None, None)
            .await?;

        let changed = if existing.is_empty() {
            for name in desired {
                self.grant(resource, grantee, name).await?;
            }
            !desired.is_empty()
        } else {
            self.reconcile(grantee, resource, desired, existing).await?
        };

        if changed {
            self.audit
                .permissions_changed(PermissionChangeEvent {
                    user_id: grantee.id.clone(),
                    resource_id: resource.id.clone(),
                    scopes: desired.to_vec(),
                })
                .await;
        }
        Ok(())
    }

    /// Diffs `desired` against `existing` tickets and applies the minimal
    /// set of grant-updates, creations and deletions.
    async fn reconcile(
        &self,
        grantee: &UserRef,
        resource: &Resource,
        desired: &[String],
        existing: Vec<PermissionTicket>,
    ) -> DomainResult<bool> {
        // Index surviving tickets by scope id. Scope-less tickets and
        // duplicates for one scope can never match a named scope and go
        // straight to the revoke list.
        let mut existing_by_scope: HashMap<String, PermissionTicket> = HashMap::new();
        let mut to_revoke: Vec<PermissionTicket> = Vec::new();
        for ticket in existing {
            match &ticket.scope_id {
                Some(scope_id) if !existing_by_scope.contains_key(scope_id) => {
                    existing_by_scope.insert(scope_id.clone(), ticket);
                }
                _ => to_revoke.push(ticket),
            }
        }

        let mut changed = false;
        let mut to_create: Vec<&String> = Vec::new();
        for name in desired {
            let scope = self.require_scope(&resource.resource_server, name).await?;
            match existing_by_scope.remove(&scope.id) {
                Some(ticket) if !ticket.granted => {
                    let mut ticket = ticket;
                    ticket.grant(Utc::now());
                    self.tickets.update(&ticket).await?;
                    changed = true;
                }
                Some(_) => {
                    // already granted, nothing to do
                }
                None => to_create.push(name),
            }
        }

        for name in to_create {
            self.grant(resource, grantee, name).await?;
            changed = true;
        }

        // Everything left over was granted or requested before but is
        // absent from the new desired set.
        to_revoke.extend(existing_by_scope.into_values());
        for ticket in to_revoke {
            self.tickets.delete(&ticket.id).await?;
            changed = true;
        }

        Ok(changed)
    }

    /// Creates a granted ticket for one scope name.
    async fn grant(
        &self,
        resource: &Resource,
        grantee: &UserRef,
        scope_name: &str,
    ) -> DomainResult<()> {
        let scope = self
            .require_scope(&resource.resource_server, scope_name)
            .await?;
        let mut ticket = self
            .tickets
            .create(&resource.resource_server, resource, &scope, &grantee.id)
            .await?;
        ticket.grant(Utc::now());
        self.tickets.update(&ticket).await?;
        Ok(())
    }

    /// Resolves a scope by name, falling back to lookup by id.
    async fn require_scope(&self, resource_server: &str, scope: &str) -> DomainResult<Scope> {
        if let Some(found) = self.scopes.find_by_name(resource_server, scope).await? {
            return Ok(found);
        }
        if let Some(found) = self.scopes.find_by_id(resource_server, scope).await? {
            return Ok(found);
        }
        Err(DomainError::ScopeNotFound {
            scope: scope.to_string(),
        })
    }
}
