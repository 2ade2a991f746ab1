//! Draining paginated listings.
//!
//! Matching against a partial group list silently drops matches and turns
//! them into removals, so every listing is read to its last page before
//! anything downstream runs.

use std::collections::HashSet;

use groupsync_core::{Page, UpstreamError};

use crate::error::{upstream, RunPhase, SyncError};

/// Upper bound on pages read from one listing.
pub const MAX_PAGES: usize = 10_000;

/// Call `fetch` from the first page until a page reports no successor.
///
/// Items are concatenated in page order. A repeated continuation token or
/// more than [`MAX_PAGES`] pages yields [`SyncError::Pagination`].
pub fn drain<T, F>(what: &'static str, phase: RunPhase, mut fetch: F) -> Result<Vec<T>, SyncError>
where
    F: FnMut(Option<u64>) -> Result<Page<T>, UpstreamError>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        if pages == MAX_PAGES {
            return Err(SyncError::Pagination { phase, what, pages });
        }
        let page = fetch(cursor).map_err(upstream(phase))?;
        pages += 1;
        items.extend(page.items);

        match page.next {
            None => break,
            Some(next) if !seen.insert(next) => {
                return Err(SyncError::Pagination { phase, what, pages });
            }
            Some(next) => cursor = Some(next),
        }
    }

    tracing::debug!(what, pages, items = items.len(), "drained listing");
    Ok(items)
}
