//! Model types and filter specs shared by the store traits.

use chrono::{DateTime, Utc};

/// A protected object registered with a resource server.
///
/// Owned by the resource store; the engine reads it and only ever mutates
/// permission state attached to it, never the resource itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub uri: Option<String>,
    pub resource_type: Option<String>,
    /// Owning principal id. Either a user or a service client acting as owner.
    pub owner: String,
    /// Scopes the resource exposes.
    pub scopes: Vec<Scope>,
    /// Tenant partition the resource belongs to.
    pub resource_server: String,
}

/// A named capability a resource can expose, unique per resource server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: String,
    pub name: String,
}

impl Scope {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A pending request or granted permission linking a requester to a resource.
///
/// Multiple tickets may exist for one (resource, requester) pair; after
/// reconciliation there is at most one per (resource, requester, scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTicket {
    pub id: String,
    pub resource_id: String,
    /// Owner of the resource at ticket creation time.
    pub owner: String,
    /// The grantee requesting or holding the permission.
    pub requester: String,
    /// Granted scope. `None` marks a whole-resource grant.
    pub scope_id: Option<String>,
    pub granted: bool,
    pub granted_at: Option<DateTime<Utc>>,
    pub resource_server: String,
}

impl PermissionTicket {
    /// Marks the ticket granted as of `at`.
    pub fn grant(&mut self, at: DateTime<Utc>) {
        self.granted = true;
        self.granted_at = Some(at);
    }
}

/// Reference to a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Reference to a service client that can own resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRef {
    pub id: String,
    pub client_id: String,
}

/// Filter for searching resources.
///
/// `owner` must already be a resolved principal id; translating client ids
/// and usernames is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub name: Option<String>,
    /// When set, `name` matches exactly instead of by substring.
    pub exact_name: bool,
    pub uri: Option<String>,
    pub owner: Option<String>,
    pub resource_type: Option<String>,
}

impl ResourceFilter {
    /// Returns true when `resource` satisfies every set filter key.
    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(name) = &self.name {
            let hit = if self.exact_name {
                resource.name == *name
            } else {
                resource
                    .name
                    .to_lowercase()
                    .contains(&name.to_lowercase())
            };
            if !hit {
                return false;
            }
        }
        if let Some(uri) = &self.uri {
            if resource.uri.as_deref() != Some(uri.as_str()) {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if resource.owner != *owner {
                return false;
            }
        }
        if let Some(resource_type) = &self.resource_type {
            if resource.resource_type.as_deref() != Some(resource_type.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Filter for searching permission tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub resource_id: Option<String>,
    pub requester: Option<String>,
    pub owner: Option<String>,
    pub granted: Option<bool>,
}

impl TicketFilter {
    /// Returns true when `ticket` satisfies every set filter key.
    pub fn matches(&self, ticket: &PermissionTicket) -> bool {
        if let Some(resource_id) = &self.resource_id {
            if ticket.resource_id != *resource_id {
                return false;
            }
        }
        if let Some(requester) = &self.requester {
            if ticket.requester != *requester {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if ticket.owner != *owner {
                return false;
            }
        }
        if let Some(granted) = self.granted {
            if ticket.granted != granted {
                return false;
            }
        }
        true
    }
}
