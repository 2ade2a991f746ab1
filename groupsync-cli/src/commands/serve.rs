//! `groupsync serve`: the webhook gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};

use groupsync_daemon::ServerConfig;
use groupsync_sync::ReconcileOptions;

use super::upstream::UpstreamArgs;

/// Arguments for `groupsync serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    /// Shared secret Outline signs webhook deliveries with.
    #[arg(long, env = "OUTLINE_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,

    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Create an Outline group for each of the user's unmatched IdP groups.
    #[arg(long, env = "AUTO_CREATE_GROUPS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub auto_create_groups: bool,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        self.upstream.init_logging();
        let idp = Arc::new(self.upstream.authentik());
        let docs = Arc::new(self.upstream.outline());
        let config = ServerConfig {
            listen: self.listen,
            webhook_secret: self.webhook_secret,
            options: ReconcileOptions {
                auto_create_groups: self.auto_create_groups,
                dry_run: false,
            },
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime
            .block_on(groupsync_daemon::serve(config, idp, docs))
            .context("webhook server failed")
    }
}
