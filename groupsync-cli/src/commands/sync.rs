//! `groupsync sync`: reconcile one Outline user from the terminal.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use colored::Colorize;

use groupsync_core::{DocsGroupId, DocsUserId};
use groupsync_sync::{
    reconcile_user, ActionResult, GroupCreation, ReconcileOptions, RunOutcome, RunReport,
};

use super::upstream::UpstreamArgs;

/// Arguments for `groupsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Outline user id to reconcile.
    pub user_id: String,

    /// Show what would change without touching Outline.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Create an Outline group for each of the user's unmatched IdP groups.
    #[arg(long, env = "AUTO_CREATE_GROUPS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub auto_create_groups: bool,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        self.upstream.init_logging();
        let idp = self.upstream.authentik();
        let docs = self.upstream.outline();
        let options = ReconcileOptions {
            auto_create_groups: self.auto_create_groups,
            dry_run: self.dry_run,
        };
        let user = DocsUserId::from(self.user_id.as_str());

        let outcome = reconcile_user(&idp, &docs, &user, options)
            .with_context(|| format!("sync failed for user '{user}'"))?;
        let report = match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::UserNotFound { email } => {
                bail!("user '{user}' ({email}) not found in Authentik")
            }
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if report.has_failures() {
            bail!(
                "{} of {} changes failed for user '{user}'",
                report.failed_actions().count()
                    + report
                        .groups
                        .iter()
                        .filter(|g| matches!(g, GroupCreation::Failed { .. }))
                        .count(),
                report.actions.len() + report.groups.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let names = group_names(report);
    let label = |id: &DocsGroupId| {
        names
            .get(id)
            .map(|name| format!("{name} ({id})"))
            .unwrap_or_else(|| id.to_string())
    };

    for group in &report.groups {
        match group {
            GroupCreation::Created { group } => {
                println!("{prefix}  +  created group {} ({})", group.name, group.id)
            }
            GroupCreation::WouldCreate { name, then_add } => {
                println!("{prefix}  ~  create group {name}, then add {then_add}")
            }
            GroupCreation::Failed { name, error } => {
                println!("{prefix}  {}  create group {name}: {error}", "✗".red())
            }
        }
    }

    let changes = report.actions.len() + report.groups.len();
    if changes == 0 {
        println!(
            "{prefix}✓ '{}' <{}> already in sync ({} mapped groups)",
            report.user.docs_display_name,
            report.user.email,
            report.mappings.len()
        );
    } else {
        println!(
            "{prefix}✓ '{}' <{}> reconciled ({changes} changes)",
            report.user.docs_display_name,
            report.user.email,
        );
    }

    for result in &report.actions {
        let action = result.action();
        let target = label(action.group_id());
        match result {
            ActionResult::Applied { .. } => {
                println!("  {}  {} {target}", "✎".green(), action.verb())
            }
            ActionResult::WouldApply { .. } => println!("  ~  {} {target}", action.verb()),
            ActionResult::Failed { error, .. } => {
                println!("  {}  {} {target}: {error}", "✗".red(), action.verb())
            }
        }
    }

    for failure in &report.probe_failures {
        println!(
            "  {}  membership of {} unknown: {}",
            "?".yellow(),
            label(&failure.group_id),
            failure.error
        );
    }
}

fn group_names(report: &RunReport) -> HashMap<DocsGroupId, String> {
    let mut names: HashMap<DocsGroupId, String> = report
        .mappings
        .iter()
        .map(|m| (m.docs_id.clone(), m.docs_name.clone()))
        .collect();
    for group in &report.groups {
        if let GroupCreation::Created { group } = group {
            names.insert(group.id.clone(), group.name.clone());
        }
    }
    names
}
