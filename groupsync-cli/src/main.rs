//! groupsync: keep Outline group membership in step with Authentik.
//!
//! # Usage
//!
//! ```text
//! groupsync serve [--listen 0.0.0.0:8000] [--auto-create-groups]
//! groupsync sync <docs-user-id> [--dry-run] [--json]
//! groupsync groups [--json]
//! ```
//!
//! Every option can also come from the environment or a `.env` file.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{groups::GroupsArgs, serve::ServeArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "groupsync",
    version,
    about = "Mirror identity provider group membership into Outline",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server that reconciles a user on every sign-in.
    Serve(ServeArgs),

    /// Reconcile one Outline user now.
    Sync(SyncArgs),

    /// List identity provider groups and the Outline group each maps to.
    Groups(GroupsArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Groups(args) => args.run(),
    }
}
