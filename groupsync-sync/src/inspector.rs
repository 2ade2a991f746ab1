//! Membership inspection on both sides of a mapping list.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use groupsync_core::{DocsDirectory, DocsGroupId, GroupMapping, MembershipSet, UserIdentity};

use crate::error::{RunPhase, SyncError};
use crate::paging::drain;

/// A docs membership query that failed; the group was treated as "not a member".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub group_id: DocsGroupId,
    pub error: String,
}

/// Result of [`inspect`].
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    pub membership: MembershipSet,
    pub probe_failures: Vec<ProbeFailure>,
}

/// Work out where `user` is a member according to each system.
///
/// The IdP side is read from `idp_user_groups`. The docs side is queried once
/// per distinct docs group. A failed query is logged and counted as "not a
/// member", which can lead to a redundant add but never to a removal.
pub fn inspect(
    docs: &dyn DocsDirectory,
    user: &UserIdentity,
    mappings: &[GroupMapping],
    idp_user_groups: &HashSet<String>,
) -> Inspection {
    let mut inspection = Inspection::default();

    inspection.membership.idp_side = mappings
        .iter()
        .filter(|m| idp_user_groups.contains(&m.idp_name))
        .map(|m| m.docs_id.clone())
        .collect();

    let distinct: BTreeSet<&DocsGroupId> = mappings.iter().map(|m| &m.docs_id).collect();
    for group_id in distinct {
        match is_member(docs, group_id, user) {
            Ok(true) => {
                inspection.membership.docs_side.insert(group_id.clone());
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    group = %group_id,
                    user = %user.docs_user_id,
                    error = %err,
                    "membership query failed; treating as not a member"
                );
                inspection.probe_failures.push(ProbeFailure {
                    group_id: group_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        idp_side = inspection.membership.idp_side.len(),
        docs_side = inspection.membership.docs_side.len(),
        "inspected memberships"
    );
    inspection
}

/// Whether the docs service lists `user` among the members of `group_id`,
/// searching by the user's display name.
pub fn is_member(
    docs: &dyn DocsDirectory,
    group_id: &DocsGroupId,
    user: &UserIdentity,
) -> Result<bool, SyncError> {
    let members = drain("group members", RunPhase::InspectingMembership, |cursor| {
        docs.group_members_page(group_id, &user.docs_display_name, cursor)
    })?;
    Ok(members.contains(&user.docs_user_id))
}
