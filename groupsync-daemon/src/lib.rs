//! Webhook gateway: signature check, event parsing and the HTTP server that
//! turns each sign-in event into one reconciliation run.

mod error;
pub mod locks;
pub mod protocol;
mod runtime;
pub mod signature;

pub use error::DaemonError;
pub use locks::{UserGuard, UserLocks};
pub use protocol::{StatusResponse, SyncStatus, WebhookEvent, SIGNIN_EVENT};
pub use runtime::{init_tracing, router, serve, AppState, ServerConfig};
pub use signature::{SignatureError, SIGNATURE_HEADER};
