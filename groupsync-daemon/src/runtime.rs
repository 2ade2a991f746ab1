use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;

use groupsync_core::{DocsDirectory, DocsUserId, IdpDirectory};
use groupsync_sync::{reconcile_user, ReconcileOptions, RunOutcome};

use crate::error::DaemonError;
use crate::locks::{UserGuard, UserLocks};
use crate::protocol::{StatusResponse, SyncStatus, WebhookEvent};
use crate::signature::{self, SignatureError, SIGNATURE_HEADER};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub webhook_secret: String,
    pub options: ReconcileOptions,
}

/// Shared state behind every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    idp: Arc<dyn IdpDirectory>,
    docs: Arc<dyn DocsDirectory>,
    webhook_secret: String,
    options: ReconcileOptions,
    locks: UserLocks,
}

impl AppState {
    pub fn new(
        idp: Arc<dyn IdpDirectory>,
        docs: Arc<dyn DocsDirectory>,
        webhook_secret: impl Into<String>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                idp,
                docs,
                webhook_secret: webhook_secret.into(),
                options,
                locks: UserLocks::new(),
            }),
        }
    }

    pub fn locks(&self) -> &UserLocks {
        &self.inner.locks
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/sync", post(sync))
        .with_state(state)
}

/// Bind `config.listen` and serve until ctrl-c.
pub async fn serve(
    config: ServerConfig,
    idp: Arc<dyn IdpDirectory>,
    docs: Arc<dyn DocsDirectory>,
) -> Result<(), DaemonError> {
    let state = AppState::new(idp, docs, config.webhook_secret, config.options);
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| DaemonError::Bind {
            addr: config.listen,
            source,
        })?;
    tracing::info!(
        addr = %config.listen,
        auto_create_groups = config.options.auto_create_groups,
        "webhook gateway listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(DaemonError::Serve)?;
    tracing::info!("webhook gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::new(SyncStatus::Running))
}

async fn sync(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Json<StatusResponse> {
    Json(handle_webhook(&state, &headers, &body).await)
}

async fn handle_webhook(state: &AppState, headers: &HeaderMap, body: &[u8]) -> StatusResponse {
    let header = match headers.get(SIGNATURE_HEADER).map(|v| v.to_str()) {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => return rejected(SignatureError::Malformed),
    };
    if let Err(err) = signature::verify(header, body, &state.inner.webhook_secret) {
        return rejected(err);
    }

    let event: WebhookEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "webhook body is not a valid event");
            return StatusResponse::new(SyncStatus::WrongEvent);
        }
    };
    let Some(user) = event.signin_user() else {
        tracing::debug!(event = %event.event, "ignoring event");
        return StatusResponse::new(SyncStatus::WrongEvent);
    };

    let guard = state.locks().acquire(&user).await;
    run(state, user, guard).await
}

fn rejected(err: SignatureError) -> StatusResponse {
    tracing::warn!(error = %err, "rejected webhook");
    StatusResponse::new(err.into())
}

/// The blocking task owns `guard`, so the user stays locked until the run ends
/// even when the request itself is dropped.
async fn run(state: &AppState, user: DocsUserId, guard: UserGuard) -> StatusResponse {
    tracing::info!(user = %user, "sign-in received, reconciling");
    let inner = Arc::clone(&state.inner);
    let run_user = user.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        reconcile_user(
            inner.idp.as_ref(),
            inner.docs.as_ref(),
            &run_user,
            inner.options,
        )
    })
    .await;

    match joined {
        Ok(Ok(RunOutcome::Completed(report))) => {
            let failed = report.failed_actions().count();
            if failed > 0 || !report.probe_failures.is_empty() {
                tracing::warn!(
                    user = %user,
                    failed_actions = failed,
                    probe_failures = report.probe_failures.len(),
                    "reconciliation finished with failures"
                );
            } else {
                tracing::info!(user = %user, actions = report.actions.len(), "reconciliation finished");
            }
            StatusResponse::new(SyncStatus::Success)
        }
        Ok(Ok(RunOutcome::UserNotFound { email })) => {
            tracing::warn!(user = %user, email = %email, "user not found in identity provider");
            StatusResponse::new(SyncStatus::UserNotFoundInAuthentik)
        }
        Ok(Err(err)) => {
            tracing::error!(user = %user, error = %err, "reconciliation failed");
            StatusResponse::upstream_error(err.to_string())
        }
        Err(err) => {
            tracing::error!(user = %user, error = %err, "reconciliation task failed");
            StatusResponse::upstream_error(format!("reconciliation task failed: {err}"))
        }
    }
}
