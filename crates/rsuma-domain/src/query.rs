//! Composes heterogeneous filters into one validated, paginated resource
//! stream.
//!
//! A query is planned once into a primary [`Generator`] plus an explicit
//! list of [`PostFilter`] predicates, then executed lazily: the generator
//! produces candidate resources, post-filters drop those outside the shared
//! relation, and the caller's pagination window is applied as the final
//! stage.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use rsuma_storage::{IdentityProvider, PermissionTicketStore, Resource, ResourceFilter, ResourceStore};

use crate::error::{DomainError, DomainResult};
use crate::paging::{chunked_stream, limit_stream};
use crate::shared::SharedResourceFinder;

/// Request-scoped filter spec for a resource query. Constructed per
/// request, consumed once.
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    /// Explicit id list; incompatible with the basic filters.
    pub ids: Vec<String>,
    /// Restrict to resources shared with this user id.
    pub shared_with: Option<String>,
    pub name: Option<String>,
    /// Match `name` exactly instead of by substring.
    pub exact_name: bool,
    pub uri: Option<String>,
    /// Owner filter; a client id, username or raw principal id.
    pub owner: Option<String>,
    pub resource_type: Option<String>,
    /// Restrict to resources the owner has shared with others. Requires
    /// `owner`, which then denotes the sharer.
    pub shared_only: bool,
    pub first: Option<i32>,
    pub max: Option<i32>,
}

/// Basic filter set handed to the resource store scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicFilters {
    pub name: Option<String>,
    pub exact_name: bool,
    pub uri: Option<String>,
    pub owner: Option<String>,
    pub resource_type: Option<String>,
}

/// Primary stream generator chosen for a query, in fixed precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generator {
    /// Look up each id individually, preserving input order.
    ByIds(Vec<String>),
    /// Walk resources shared with the given user.
    BySharedWith(String),
    /// Walk resources the given user has shared with others.
    BySharedBy(String),
    /// Scan the resource store with the basic filters.
    ByBasicFilters(BasicFilters),
}

/// Predicate applied over the generator's stream for a shared relation the
/// generator itself does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    SharedWith(String),
    SharedBy(String),
}

/// A validated, executable query plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub generator: Generator,
    pub post_filters: Vec<PostFilter>,
    pub first: Option<i32>,
    pub max: Option<i32>,
}

/// Treats blank and whitespace-only filter values as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validates a query and selects the cheapest generation strategy.
///
/// Fails fast on conflicting filter combinations; no store access happens
/// here.
pub fn plan(query: &ResourceQuery) -> DomainResult<QueryPlan> {
    let name = present(&query.name);
    let uri = present(&query.uri);
    let resource_type = present(&query.resource_type);
    let mut owner = present(&query.owner);

    let has_basic_without_owner = name.is_some() || uri.is_some() || resource_type.is_some();

    let mut shared_by = None;
    if query.shared_only {
        let Some(sharer) = owner else {
            return Err(DomainError::MissingOwnerFilter);
        };
        shared_by = Some(sharer.to_string());

        // With no other basic filter the sharer is fully represented by the
        // ticket-indexed shared-by path, so drop it from the basic scan.
        if !has_basic_without_owner {
            owner = None;
        }
    }

    let has_basic = has_basic_without_owner || owner.is_some();
    let shared_with = present(&query.shared_with).map(str::to_string);

    let generator = if !query.ids.is_empty() {
        if has_basic {
            return Err(DomainError::IdFilterConflict);
        }
        Generator::ByIds(query.ids.clone())
    } else {
        match (has_basic, &shared_with, &shared_by) {
            (false, Some(user), _) => Generator::BySharedWith(user.clone()),
            (false, None, Some(user)) => Generator::BySharedBy(user.clone()),
            _ => Generator::ByBasicFilters(BasicFilters {
                name: name.map(str::to_string),
                exact_name: query.exact_name,
                uri: uri.map(str::to_string),
                owner: owner.map(str::to_string),
                resource_type: resource_type.map(str::to_string),
            }),
        }
    };

    let mut post_filters = Vec::new();
    if let Some(shared_by) = shared_by {
        if !matches!(generator, Generator::BySharedBy(_)) {
            post_filters.push(PostFilter::SharedBy(shared_by));
        }
    }
    if let Some(shared_with) = shared_with {
        if !matches!(generator, Generator::BySharedWith(_)) {
            post_filters.push(PostFilter::SharedWith(shared_with));
        }
    }

    Ok(QueryPlan {
        generator,
        post_filters,
        first: query.first,
        max: query.max,
    })
}

/// Plans and executes resource queries against the stores.
pub struct ResourceFinder<R, P, I> {
    resources: Arc<R>,
    identity: Arc<I>,
    shared: Arc<SharedResourceFinder<R, P>>,
}

impl<R, P, I> ResourceFinder<R, P, I>
where
    R: ResourceStore + 'static,
    P: PermissionTicketStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(
        resources: Arc<R>,
        identity: Arc<I>,
        shared: Arc<SharedResourceFinder<R, P>>,
    ) -> Self {
        Self {
            resources,
            identity,
            shared,
        }
    }

    /// Runs `query` and collects the windowed result set.
    #[instrument(skip(self, query))]
    pub async fn find_resources(
        &self,
        resource_server: &str,
        query: &ResourceQuery,
    ) -> DomainResult<Vec<Resource>> {
        let plan = plan(query)?;
        debug!(generator = ?plan.generator, post_filters = plan.post_filters.len(), "resource query planned");

        let stream = self.generator_stream(resource_server, &plan.generator).await?;
        let stream = self.apply_post_filters(stream, &plan.post_filters).await?;
        let mut windowed = limit_stream(stream, plan.first, plan.max);

        let mut resources = Vec::new();
        while let Some(resource) = windowed.try_next().await? {
            resources.push(resource);
        }
        Ok(resources)
    }

    /// Like [`find_resources`](Self::find_resources) but maps each result to
    /// its id.
    pub async fn find_resource_ids(
        &self,
        resource_server: &str,
        query: &ResourceQuery,
    ) -> DomainResult<Vec<String>> {
        let resources = self.find_resources(resource_server, query).await?;
        Ok(resources.into_iter().map(|resource| resource.id).collect())
    }

    /// Builds the primary stream for the chosen generator.
    async fn generator_stream(
        &self,
        resource_server: &str,
        generator: &Generator,
    ) -> DomainResult<BoxStream<'static, DomainResult<Resource>>> {
        match generator {
            Generator::ByIds(ids) => {
                let mut seen = HashSet::new();
                let unique: Vec<String> = ids
                    .iter()
                    .filter(|id| seen.insert(id.as_str()))
                    .cloned()
                    .collect();
                let ids = stream::iter(unique.into_iter().map(Ok::<_, DomainError>)).boxed();
                Ok(self.lookup_stream(resource_server, ids))
            }
            Generator::BySharedWith(user_id) => {
                if self.identity.user_by_id(user_id).await?.is_none() {
                    return Ok(stream::empty().boxed());
                }
                let shared = Arc::clone(&self.shared);
                let server = resource_server.to_string();
                let user = user_id.clone();
                let ids = chunked_stream(move |first, max| {
                    let shared = Arc::clone(&shared);
                    let server = server.clone();
                    let user = user.clone();
                    async move {
                        shared
                            .shared_with_user(&server, &user, Some(first as i32), Some(max as i32))
                            .await
                    }
                });
                Ok(self.lookup_stream(resource_server, ids))
            }
            Generator::BySharedBy(user_id) => {
                if self.identity.user_by_id(user_id).await?.is_none() {
                    return Ok(stream::empty().boxed());
                }
                let shared = Arc::clone(&self.shared);
                let server = resource_server.to_string();
                let user = user_id.clone();
                let ids = chunked_stream(move |first, max| {
                    let shared = Arc::clone(&shared);
                    let server = server.clone();
                    let user = user.clone();
                    async move {
                        shared
                            .shared_by_user(&server, &user, Some(first as i32), Some(max as i32))
                            .await
                    }
                });
                Ok(self.lookup_stream(resource_server, ids))
            }
            Generator::ByBasicFilters(filters) => {
                let filter = ResourceFilter {
                    name: filters.name.clone(),
                    exact_name: filters.exact_name,
                    uri: filters.uri.clone(),
                    owner: match &filters.owner {
                        Some(owner) => Some(self.resolve_owner(owner).await?),
                        None => None,
                    },
                    resource_type: filters.resource_type.clone(),
                };
                let resources = Arc::clone(&self.resources);
                let server = resource_server.to_string();
                Ok(chunked_stream(move |first, max| {
                    let resources = Arc::clone(&resources);
                    let server = server.clone();
                    let filter = filter.clone();
                    async move {
                        resources
                            .find(&server, &filter, first, max)
                            .await
                            .map_err(DomainError::from)
                    }
                }))
            }
        }
    }

    /// Maps a stream of resource ids to resources, dropping misses.
    fn lookup_stream(
        &self,
        resource_server: &str,
        ids: BoxStream<'static, DomainResult<String>>,
    ) -> BoxStream<'static, DomainResult<Resource>> {
        let resources = Arc::clone(&self.resources);
        let server = resource_server.to_string();
        ids.and_then(move |id| {
            let resources = Arc::clone(&resources);
            let server = server.clone();
            async move {
                resources
                    .find_by_id(&server, &id)
                    .await
                    .map_err(DomainError::from)
            }
        })
        .try_filter_map(|found| future::ready(Ok(found)))
        .boxed()
    }

    /// Wraps the stream with one membership predicate per post-filter.
    ///
    /// The filtered user is resolved once up front; an unknown user makes
    /// the predicate constantly false, matching the membership checks.
    async fn apply_post_filters(
        &self,
        stream: BoxStream<'static, DomainResult<Resource>>,
        post_filters: &[PostFilter],
    ) -> DomainResult<BoxStream<'static, DomainResult<Resource>>> {
        let mut stream = stream;
        for post_filter in post_filters {
            let shared = Arc::clone(&self.shared);
            stream = match post_filter {
                PostFilter::SharedWith(user_id) => {
                    let user = self.resolve_user_id(user_id).await?;
                    stream
                        .and_then(move |resource| {
                            let shared = Arc::clone(&shared);
                            let user = user.clone();
                            async move {
                                let keep = shared
                                    .is_shared_with_user(user.as_deref(), Some(&resource))
                                    .await?;
                                Ok(keep.then_some(resource))
                            }
                        })
                        .try_filter_map(|kept| future::ready(Ok(kept)))
                        .boxed()
                }
                PostFilter::SharedBy(user_id) => {
                    let user = self.resolve_user_id(user_id).await?;
                    stream
                        .and_then(move |resource| {
                            let shared = Arc::clone(&shared);
                            let user = user.clone();
                            async move {
                                let keep = shared
                                    .is_shared_by_user(user.as_deref(), Some(&resource))
                                    .await?;
                                Ok(keep.then_some(resource))
                            }
                        })
                        .try_filter_map(|kept| future::ready(Ok(kept)))
                        .boxed()
                }
            };
        }
        Ok(stream)
    }

    async fn resolve_user_id(&self, user_id: &str) -> DomainResult<Option<String>> {
        Ok(self
            .identity
            .user_by_id(user_id)
            .await?
            .map(|user| user.id))
    }

    /// Translates an owner filter value into a principal id: client id
    /// first, then username, falling back to the raw value.
    async fn resolve_owner(&self, owner: &str) -> DomainResult<String> {
        if let Some(client) = self.identity.client_by_client_id(owner).await? {
            return Ok(client.id);
        }
        if let Some(user) = self.identity.user_by_username(owner).await? {
            return Ok(user.id);
        }
        Ok(owner.to_string())
    }
}
