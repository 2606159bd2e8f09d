//! Domain error types for the sharing engine.

use thiserror::Error;

use rsuma_storage::StorageError;

/// How a failed operation is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid request; retrying without changes cannot succeed.
    Client,
    /// A referenced entity does not exist.
    NotFound,
    /// The backing store failed; fatal for the current request.
    Store,
}

/// Domain-specific errors for sharing operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Id filter combined with basic filters.
    #[error("when requesting a set of ids, none of the basic filters (name, uri, owner, type) may be set")]
    IdFilterConflict,

    /// `shared_only` without the owner that denotes the sharer.
    #[error("when requesting only shared resources, the owner filter must be provided")]
    MissingOwnerFilter,

    /// An owner may never hold a permission on their own resource.
    #[error("owner {user_id} cannot hold a permission on their own resource {resource_id}")]
    OwnerPermission {
        user_id: String,
        resource_id: String,
    },

    /// Requested scope is not in the resource's scope set.
    #[error("scope '{scope}' is not allowed for resource {resource_id}")]
    ScopeNotAllowed { scope: String, resource_id: String },

    /// Scope name resolved neither by name nor by id.
    #[error("scope '{scope}' does not exist")]
    ScopeNotFound { scope: String },

    /// Resource id did not resolve.
    #[error("resource not found: {resource_id}")]
    ResourceNotFound { resource_id: String },

    /// User id did not resolve.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    /// Store failure, propagated without retry.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Classifies the error for the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdFilterConflict
            | Self::MissingOwnerFilter
            | Self::OwnerPermission { .. }
            | Self::ScopeNotAllowed { .. }
            | Self::ScopeNotFound { .. } => ErrorKind::Client,
            Self::ResourceNotFound { .. } | Self::UserNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Store,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
