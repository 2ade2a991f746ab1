//! Connection settings shared by every subcommand.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};

use groupsync_clients::{AuthentikClient, ClientConfig, OutlineClient};

#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Authentik base URL, e.g. https://auth.example.org
    #[arg(long, env = "AUTHENTIK_URL")]
    pub authentik_url: String,

    /// Authentik API token.
    #[arg(long, env = "AUTHENTIK_TOKEN", hide_env_values = true)]
    pub authentik_token: String,

    /// Outline base URL, e.g. https://docs.example.org
    #[arg(long, env = "OUTLINE_URL")]
    pub outline_url: String,

    /// Outline API token.
    #[arg(long, env = "OUTLINE_TOKEN", hide_env_values = true)]
    pub outline_token: String,

    /// Per-request timeout for both upstreams.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub log_json: bool,
}

impl UpstreamArgs {
    pub fn init_logging(&self) {
        groupsync_daemon::init_tracing(self.debug, self.log_json);
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn authentik(&self) -> AuthentikClient {
        tracing::debug!(url = %self.authentik_url, "authentik client");
        AuthentikClient::new(ClientConfig::new(
            self.authentik_url.as_str(),
            self.authentik_token.as_str(),
            self.timeout(),
        ))
    }

    pub fn outline(&self) -> OutlineClient {
        tracing::debug!(url = %self.outline_url, "outline client");
        OutlineClient::new(ClientConfig::new(
            self.outline_url.as_str(),
            self.outline_token.as_str(),
            self.timeout(),
        ))
    }
}
