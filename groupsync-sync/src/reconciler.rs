//! Reconciliation of one user's group memberships.
//!
//! ## Run phases
//!
//! 1. Drain both group listings and match them by name.
//! 2. Resolve the user in the docs service, then in the identity provider by
//!    email. No IdP user ends the run with [`RunOutcome::UserNotFound`].
//! 3. Inspect memberships on both sides; optionally create docs groups for
//!    unmatched IdP groups the user belongs to.
//! 4. Plan one action per docs group whose two sides disagree and apply them.
//!
//! Actions are independent: a failed add or remove is recorded and the
//! remaining actions are still attempted. Nothing is retried or rolled back.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;

use groupsync_core::{
    find_match, match_groups, normalize_group_name, Action, DocsDirectory, DocsGroup,
    DocsUserId, GroupMapping, IdpDirectory, IdpGroup, IdpUser, MembershipSet, UserIdentity,
};

use crate::error::{upstream, RunPhase, SyncError};
use crate::inspector::inspect;
use crate::paging::drain;
use crate::report::{ActionResult, GroupCreation, RunReport};

/// Switches for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Create a docs group for an IdP group the user belongs to when no docs
    /// group matches it.
    pub auto_create_groups: bool,
    /// Plan only: no group is created and no mutation is sent.
    pub dry_run: bool,
}

/// How a run ended when no upstream call failed.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(Box<RunReport>),
    /// The docs user's email does not belong to any IdP user.
    UserNotFound { email: String },
}

/// Reconcile the docs memberships of `docs_user_id` with the identity provider.
pub fn reconcile_user(
    idp: &dyn IdpDirectory,
    docs: &dyn DocsDirectory,
    docs_user_id: &DocsUserId,
    options: ReconcileOptions,
) -> Result<RunOutcome, SyncError> {
    let idp_groups = drain("identity provider groups", RunPhase::FetchingGroups, |cursor| {
        idp.groups_page(cursor)
    })?;
    let docs_groups = drain("docs groups", RunPhase::FetchingGroups, |cursor| {
        docs.groups_page(cursor)
    })?;
    tracing::info!(
        idp = idp_groups.len(),
        docs = docs_groups.len(),
        "fetched group listings"
    );
    let mut mappings = match_groups(&idp_groups, &docs_groups);
    tracing::debug!(mappings = mappings.len(), "matched groups by name");

    let user: UserIdentity = docs
        .user_info(docs_user_id)
        .map_err(upstream(RunPhase::ResolvingUser))?
        .into();
    let Some(idp_user) = resolve_idp_user(idp, &user.email)? else {
        tracing::warn!(user = %user.docs_user_id, email = %user.email, "user not found in identity provider");
        return Ok(RunOutcome::UserNotFound { email: user.email });
    };
    let idp_user_groups: HashSet<String> = idp_user.groups.iter().cloned().collect();
    tracing::debug!(
        user = %user.docs_user_id,
        groups = idp_user_groups.len(),
        "user is member of identity provider groups"
    );

    let inspection = inspect(docs, &user, &mappings, &idp_user_groups);
    let mut membership = inspection.membership;

    let groups = if options.auto_create_groups {
        create_missing_groups(
            docs,
            &idp_groups,
            &idp_user_groups,
            &mut mappings,
            &mut membership,
            &user.docs_user_id,
            options.dry_run,
        )
    } else {
        Vec::new()
    };

    let planned = plan_actions(&mappings, &membership, &user.docs_user_id);
    let actions = apply_actions(docs, planned, options.dry_run);

    let report = RunReport {
        user,
        idp_username: idp_user.username,
        dry_run: options.dry_run,
        mappings,
        membership,
        groups,
        actions,
        probe_failures: inspection.probe_failures,
        finished_at: Utc::now(),
    };
    tracing::info!(
        user = %report.user.docs_user_id,
        actions = report.actions.len(),
        failed = report.failed_actions().count(),
        dry_run = report.dry_run,
        "sync complete"
    );
    Ok(RunOutcome::Completed(Box::new(report)))
}

/// Find the IdP user owning `email`.
///
/// Tries the exact-email lookup first, then scans every user comparing emails
/// case-insensitively.
pub fn resolve_idp_user(idp: &dyn IdpDirectory, email: &str) -> Result<Option<IdpUser>, SyncError> {
    if email.is_empty() {
        return Ok(None);
    }

    let exact = idp
        .users_by_email(email)
        .map_err(upstream(RunPhase::ResolvingUser))?;
    if let Some(user) = exact.into_iter().next() {
        return Ok(Some(user));
    }

    tracing::debug!(email, "no exact email match; scanning all users");
    let wanted = email.to_lowercase();
    let users = drain("identity provider users", RunPhase::ResolvingUser, |cursor| {
        idp.users_page(cursor)
    })?;
    Ok(users.into_iter().find(|u| u.email.to_lowercase() == wanted))
}

/// The set difference between the two sides of `membership`, one action per
/// distinct docs group, in mapping order.
///
/// Groups present on both sides or on neither produce nothing.
pub fn plan_actions(
    mappings: &[GroupMapping],
    membership: &MembershipSet,
    user_id: &DocsUserId,
) -> Vec<Action> {
    let mut visited = BTreeSet::new();
    let mut actions = Vec::new();

    for mapping in mappings {
        let group_id = &mapping.docs_id;
        if !visited.insert(group_id) {
            continue;
        }
        let wanted = membership.idp_side.contains(group_id);
        let present = membership.docs_side.contains(group_id);
        match (wanted, present) {
            (true, false) => actions.push(Action::Add {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
            }),
            (false, true) => actions.push(Action::Remove {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
            }),
            _ => {}
        }
    }

    actions
}

fn create_missing_groups(
    docs: &dyn DocsDirectory,
    idp_groups: &[IdpGroup],
    idp_user_groups: &HashSet<String>,
    mappings: &mut Vec<GroupMapping>,
    membership: &mut MembershipSet,
    user_id: &DocsUserId,
    dry_run: bool,
) -> Vec<GroupCreation> {
    let mut created: Vec<DocsGroup> = Vec::new();
    let mut planned: HashSet<String> = HashSet::new();
    let mut outcomes = Vec::new();

    for group in idp_groups {
        let name = group.name.as_str();
        if !idp_user_groups.contains(name) || mappings.iter().any(|m| m.idp_name == name) {
            continue;
        }

        if let Some(existing) = find_match(name, &created) {
            mappings.push(mapping_for(name, existing));
            membership.idp_side.insert(existing.id.clone());
            continue;
        }

        if dry_run {
            if planned.insert(normalize_group_name(name)) {
                tracing::info!(group = name, "[dry-run] would create missing group");
                outcomes.push(GroupCreation::WouldCreate {
                    name: name.to_string(),
                    then_add: user_id.clone(),
                });
            }
            continue;
        }

        tracing::info!(group = name, "creating missing group");
        match docs.create_group(name) {
            Ok(docs_group) => {
                mappings.push(mapping_for(name, &docs_group));
                membership.idp_side.insert(docs_group.id.clone());
                created.push(docs_group.clone());
                outcomes.push(GroupCreation::Created { group: docs_group });
            }
            Err(err) => {
                tracing::error!(group = name, error = %err, "failed to create group");
                outcomes.push(GroupCreation::Failed {
                    name: name.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    outcomes
}

fn mapping_for(idp_name: &str, docs_group: &DocsGroup) -> GroupMapping {
    GroupMapping {
        idp_name: idp_name.to_string(),
        docs_name: docs_group.name.clone(),
        docs_id: docs_group.id.clone(),
    }
}

fn apply_actions(docs: &dyn DocsDirectory, actions: Vec<Action>, dry_run: bool) -> Vec<ActionResult> {
    actions
        .into_iter()
        .map(|action| {
            if dry_run {
                tracing::info!("[dry-run] would {action}");
                return ActionResult::WouldApply { action };
            }

            let result = match &action {
                Action::Add { group_id, user_id } => docs.add_user(group_id, user_id),
                Action::Remove { group_id, user_id } => docs.remove_user(group_id, user_id),
            };
            match result {
                Ok(()) => {
                    tracing::info!(group = %action.group_id(), user = %action.user_id(), "{}", action.verb());
                    ActionResult::Applied { action }
                }
                Err(err) => {
                    tracing::error!(
                        group = %action.group_id(),
                        user = %action.user_id(),
                        error = %err,
                        "failed to {}",
                        action.verb()
                    );
                    ActionResult::Failed {
                        action,
                        error: err.to_string(),
                    }
                }
            }
        })
        .collect()
}
