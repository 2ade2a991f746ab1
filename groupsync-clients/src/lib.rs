//! # groupsync-clients
//!
//! Blocking HTTP clients for the two upstream systems:
//! - [`AuthentikClient`] implements [`groupsync_core::IdpDirectory`]
//! - [`OutlineClient`] implements [`groupsync_core::DocsDirectory`]
//!
//! Both are built once per process from a [`ClientConfig`] and shared by
//! reference across runs.

pub mod authentik;
mod http;
pub mod outline;

pub use authentik::AuthentikClient;
pub use http::ClientConfig;
pub use outline::OutlineClient;
