//! groupsync core library — domain types, name matching, collaborator seams.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs shared by every crate
//! - [`matcher`] — pairs identity-provider groups with docs groups by name
//! - [`directory`] — traits the reconciler uses to reach both upstream systems
//! - [`error`] — [`UpstreamError`]

pub mod directory;
pub mod error;
pub mod matcher;
pub mod types;

pub use directory::{DocsDirectory, IdpDirectory, Page};
pub use error::{UpstreamError, UpstreamSystem};
pub use matcher::{find_match, match_groups, normalize_group_name};
pub use types::{
    Action, DocsGroup, DocsGroupId, DocsUser, DocsUserId, GroupMapping, IdpGroup, IdpUser,
    MembershipSet, UserIdentity,
};
