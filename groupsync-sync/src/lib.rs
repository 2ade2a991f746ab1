//! # groupsync-sync
//!
//! Membership reconciliation for one user per run.
//!
//! Call [`reconcile_user`] with the two upstream collaborators and the docs-side
//! id of the user who just signed in. The run drains both group listings,
//! matches them by name, inspects the user's memberships on each side and
//! applies the add/remove actions that make the docs service mirror the
//! identity provider.

pub mod error;
pub mod inspector;
pub mod paging;
pub mod reconciler;
pub mod report;

pub use error::{RunPhase, SyncError};
pub use inspector::{inspect, Inspection, ProbeFailure};
pub use reconciler::{plan_actions, reconcile_user, resolve_idp_user, ReconcileOptions, RunOutcome};
pub use report::{ActionResult, GroupCreation, RunReport};
