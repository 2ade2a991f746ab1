//! Request plumbing shared by both clients.

use std::time::Duration;

use serde::de::DeserializeOwned;

use groupsync_core::{UpstreamError, UpstreamSystem};

/// Longest slice of an error body kept in [`UpstreamError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for one upstream system.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme, host and optional path prefix, e.g. `https://docs.example.org`.
    pub base_url: String,
    /// API token sent as a bearer credential.
    pub token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
        }
    }

    pub(crate) fn agent(&self) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .user_agent(concat!("groupsync/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Turn a `ureq` result into a response or an [`UpstreamError`].
pub(crate) fn check(
    system: UpstreamSystem,
    endpoint: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, UpstreamError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let mut body = response.into_string().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            Err(UpstreamError::Status {
                system,
                endpoint: endpoint.to_string(),
                status,
                body,
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(UpstreamError::Transport {
            system,
            endpoint: endpoint.to_string(),
            message: transport.to_string(),
        }),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    system: UpstreamSystem,
    endpoint: &str,
    response: ureq::Response,
) -> Result<T, UpstreamError> {
    response
        .into_json::<T>()
        .map_err(|err| UpstreamError::Decode {
            system,
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })
}
