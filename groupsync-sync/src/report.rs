//! Per-run report returned by [`crate::reconcile_user`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use groupsync_core::{Action, DocsGroup, DocsUserId, GroupMapping, MembershipSet, UserIdentity};

use crate::inspector::ProbeFailure;

/// Outcome of one membership mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionResult {
    /// The docs service accepted the mutation.
    Applied { action: Action },
    /// Dry run: the mutation *would* have been sent.
    WouldApply { action: Action },
    /// The docs service rejected the mutation or could not be reached.
    Failed { action: Action, error: String },
}

impl ActionResult {
    pub fn action(&self) -> &Action {
        match self {
            ActionResult::Applied { action }
            | ActionResult::WouldApply { action }
            | ActionResult::Failed { action, .. } => action,
        }
    }
}

/// Outcome of creating a docs group for an unmatched IdP group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupCreation {
    Created { group: DocsGroup },
    /// Dry run: the group would be created and `then_add` added to it.
    WouldCreate { name: String, then_add: DocsUserId },
    Failed { name: String, error: String },
}

/// Everything a completed run did or, in a dry run, would have done.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub user: UserIdentity,
    pub idp_username: String,
    pub dry_run: bool,
    pub mappings: Vec<GroupMapping>,
    pub membership: MembershipSet,
    pub groups: Vec<GroupCreation>,
    pub actions: Vec<ActionResult>,
    pub probe_failures: Vec<ProbeFailure>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn failed_actions(&self) -> impl Iterator<Item = &ActionResult> {
        self.actions
            .iter()
            .filter(|r| matches!(r, ActionResult::Failed { .. }))
    }

    /// `true` if any action or group creation failed.
    pub fn has_failures(&self) -> bool {
        self.failed_actions().next().is_some()
            || self
                .groups
                .iter()
                .any(|g| matches!(g, GroupCreation::Failed { .. }))
    }
}
