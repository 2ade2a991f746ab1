//! `groupsync groups`: show how identity provider groups map onto Outline.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use groupsync_core::{match_groups, DocsDirectory, DocsGroup, IdpDirectory, IdpGroup};
use groupsync_sync::{paging::drain, RunPhase};

use super::upstream::UpstreamArgs;

/// Arguments for `groupsync groups`.
#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Debug, Serialize)]
struct GroupRow {
    idp_name: String,
    docs_name: Option<String>,
    docs_id: Option<String>,
}

#[derive(Serialize)]
struct GroupsJson {
    matched: usize,
    unmatched: usize,
    groups: Vec<GroupRow>,
}

#[derive(Tabled)]
struct GroupTableRow {
    #[tabled(rename = "authentik group")]
    idp_name: String,
    #[tabled(rename = "outline group")]
    docs_name: String,
    #[tabled(rename = "outline id")]
    docs_id: String,
}

impl GroupsArgs {
    pub fn run(self) -> Result<()> {
        self.upstream.init_logging();
        let idp = self.upstream.authentik();
        let docs = self.upstream.outline();

        let idp_groups = drain("identity provider groups", RunPhase::FetchingGroups, |cursor| {
            idp.groups_page(cursor)
        })
        .context("failed to list Authentik groups")?;
        let docs_groups = drain("docs groups", RunPhase::FetchingGroups, |cursor| {
            docs.groups_page(cursor)
        })
        .context("failed to list Outline groups")?;

        let rows = build_rows(&idp_groups, &docs_groups);
        if self.json {
            let matched = rows.iter().filter(|r| r.docs_id.is_some()).count();
            let payload = GroupsJson {
                matched,
                unmatched: rows.len() - matched,
                groups: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize groups JSON")?
            );
            return Ok(());
        }

        print_table(rows, docs_groups.len());
        Ok(())
    }
}

/// One row per distinct IdP group, in IdP order.
fn build_rows(idp_groups: &[IdpGroup], docs_groups: &[DocsGroup]) -> Vec<GroupRow> {
    let mappings = match_groups(idp_groups, docs_groups);
    let mut seen = std::collections::HashSet::new();
    idp_groups
        .iter()
        .filter(|g| seen.insert(g.name.as_str()))
        .map(|g| {
            let mapping = mappings.iter().find(|m| m.idp_name == g.name);
            GroupRow {
                idp_name: g.name.clone(),
                docs_name: mapping.map(|m| m.docs_name.clone()),
                docs_id: mapping.map(|m| m.docs_id.to_string()),
            }
        })
        .collect()
}

fn print_table(rows: Vec<GroupRow>, docs_count: usize) {
    let matched = rows.iter().filter(|r| r.docs_id.is_some()).count();
    println!(
        "groupsync v{} | {} authentik groups | {} outline groups | {} matched",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        docs_count,
        matched,
    );
    if rows.is_empty() {
        println!("No groups in Authentik.");
        return;
    }

    let table_rows: Vec<GroupTableRow> = rows
        .into_iter()
        .map(|row| GroupTableRow {
            idp_name: row.idp_name,
            docs_name: row
                .docs_name
                .unwrap_or_else(|| "unmatched".yellow().to_string()),
            docs_id: row.docs_id.unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}
