//! Result windowing and chunked streaming over bounded paged fetches.
//!
//! Backing stores expose `fetch(offset, limit)` reads with a bounded result
//! size. [`chunked_stream`] turns such a fetch into a lazy, forward-only
//! stream so that callers can walk an entire table without loading it
//! eagerly, and without fetching chunks a consumer never asks for.

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::{DomainError, DomainResult};

/// Platform default result window applied when a caller gives no limit.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Fixed fetch size used when walking a backing table.
pub const CHUNK_SIZE: usize = 100;

/// Clamps a caller-supplied first-result offset to non-negative.
pub fn limit_first(first: Option<i32>) -> usize {
    match first {
        Some(first) if first > 0 => first as usize,
        _ => 0,
    }
}

/// Clamps a caller-supplied max-results count; absent or non-positive
/// values fall back to [`DEFAULT_MAX_RESULTS`].
pub fn limit_max(max: Option<i32>) -> usize {
    match max {
        Some(max) if max >= 1 => max as usize,
        _ => DEFAULT_MAX_RESULTS,
    }
}

/// Turns a bounded paged fetch into a lazy, forward-only stream.
///
/// `fetch` is called with offsets increasing in [`CHUNK_SIZE`] steps and the
/// stream terminates the first time it returns an empty chunk. At most one
/// chunk is buffered; a consumer that stops early triggers no further
/// fetches. Ordering follows whatever `fetch` provides per chunk, consumed
/// in increasing-offset order.
pub fn chunked_stream<'a, T, F, Fut>(mut fetch: F) -> BoxStream<'a, DomainResult<T>>
where
    T: Send + 'a,
    F: FnMut(usize, usize) -> Fut + Send + 'a,
    Fut: Future<Output = DomainResult<Vec<T>>> + Send + 'a,
{
    stream::try_unfold(0usize, move |offset| {
        let chunk = fetch(offset, CHUNK_SIZE);
        async move {
            let items = chunk.await?;
            if items.is_empty() {
                Ok::<_, DomainError>(None)
            } else {
                Ok(Some((items, offset + CHUNK_SIZE)))
            }
        }
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
    .try_flatten()
    .boxed()
}

/// Applies the caller's pagination window as the final stream stage.
pub fn limit_stream<'a, T: Send + 'a>(
    stream: BoxStream<'a, DomainResult<T>>,
    first: Option<i32>,
    max: Option<i32>,
) -> BoxStream<'a, DomainResult<T>> {
    stream.skip(limit_first(first)).take(limit_max(max)).boxed()
}
