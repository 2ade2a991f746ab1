//! Webhook payload and response shapes.

use serde::{Deserialize, Serialize};

use groupsync_core::DocsUserId;

/// The only event that triggers a run.
pub const SIGNIN_EVENT: &str = "users.signin";

/// Closed vocabulary of the `status` field in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Running,
    MissingSignature,
    InvalidSignature,
    Unauthorized,
    WrongEvent,
    UserNotFoundInAuthentik,
    AuthentikError,
    Success,
}

/// JSON body of every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn new(status: SyncStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::AuthentikError,
            error: Some(message.into()),
        }
    }
}

/// Inbound webhook event, `{ event, payload: { model: { id } } }`.
///
/// Only `event` is required; the model is read for sign-in events.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Option<EventPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub model: Option<EventModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventModel {
    pub id: String,
}

impl WebhookEvent {
    /// The docs user id to reconcile, or `None` when this is not a sign-in
    /// event carrying a user model.
    pub fn signin_user(&self) -> Option<DocsUserId> {
        if self.event != SIGNIN_EVENT {
            return None;
        }
        let id = self.payload.as_ref()?.model.as_ref()?.id.trim();
        (!id.is_empty()).then(|| DocsUserId::from(id))
    }
}
