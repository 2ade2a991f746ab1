//! Error types for groupsync-sync.

use std::fmt;

use thiserror::Error;

use groupsync_core::UpstreamError;

/// The part of a run an upstream failure interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    FetchingGroups,
    ResolvingUser,
    InspectingMembership,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::FetchingGroups => write!(f, "fetching groups"),
            RunPhase::ResolvingUser => write!(f, "resolving user"),
            RunPhase::InspectingMembership => write!(f, "inspecting membership"),
        }
    }
}

/// All errors that end a reconciliation run early.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A collaborator call failed.
    #[error("{phase}: {source}")]
    Upstream {
        phase: RunPhase,
        #[source]
        source: UpstreamError,
    },

    /// A paginated listing kept returning pages.
    #[error("{phase}: listing {what} did not finish after {pages} page(s)")]
    Pagination {
        phase: RunPhase,
        what: &'static str,
        pages: usize,
    },
}

/// Convenience constructor for [`SyncError::Upstream`], shaped for `map_err`.
pub(crate) fn upstream(phase: RunPhase) -> impl FnOnce(UpstreamError) -> SyncError {
    move |source| SyncError::Upstream { phase, source }
}
