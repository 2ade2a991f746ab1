//! Error types for calls into the identity provider and the docs service.

use std::fmt;

use thiserror::Error;

/// Which upstream system a failed call was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamSystem {
    Idp,
    Docs,
}

impl fmt::Display for UpstreamSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamSystem::Idp => write!(f, "authentik"),
            UpstreamSystem::Docs => write!(f, "outline"),
        }
    }
}

/// All errors a collaborator call can return.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success HTTP status.
    #[error("{system} {endpoint} returned HTTP {status}: {body}")]
    Status {
        system: UpstreamSystem,
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("{system} {endpoint} transport error: {message}")]
    Transport {
        system: UpstreamSystem,
        endpoint: String,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{system} {endpoint} returned an unreadable payload: {message}")]
    Decode {
        system: UpstreamSystem,
        endpoint: String,
        message: String,
    },
}
