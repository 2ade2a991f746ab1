use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use groupsync_core::{
    DocsDirectory, DocsGroup, DocsGroupId, DocsUser, DocsUserId, IdpDirectory, IdpGroup, IdpUser,
    Page, UpstreamError, UpstreamSystem,
};
use groupsync_daemon::{router, signature::signature_header, AppState, SIGNATURE_HEADER};
use groupsync_sync::ReconcileOptions;

const SECRET: &str = "ol_whs_test";

struct Idp {
    users: Vec<IdpUser>,
    down: bool,
}

impl IdpDirectory for Idp {
    fn groups_page(&self, _cursor: Option<u64>) -> Result<Page<IdpGroup>, UpstreamError> {
        if self.down {
            return Err(UpstreamError::Transport {
                system: UpstreamSystem::Idp,
                endpoint: "/api/v3/core/groups/".into(),
                message: "connection refused".into(),
            });
        }
        Ok(Page::last(vec![IdpGroup::new("Engineering"), IdpGroup::new("Ops")]))
    }

    fn users_by_email(&self, email: &str) -> Result<Vec<IdpUser>, UpstreamError> {
        Ok(self.users.iter().filter(|u| u.email == email).cloned().collect())
    }

    fn users_page(&self, _cursor: Option<u64>) -> Result<Page<IdpUser>, UpstreamError> {
        Ok(Page::last(self.users.clone()))
    }
}

#[derive(Default)]
struct Docs {
    members: Mutex<BTreeMap<DocsGroupId, BTreeSet<DocsUserId>>>,
}

impl Docs {
    fn with_member(group: &str, user: &str) -> Self {
        let docs = Docs::default();
        docs.members
            .lock()
            .unwrap()
            .entry(DocsGroupId::from(group))
            .or_default()
            .insert(DocsUserId::from(user));
        docs
    }

    fn members_of(&self, group: &str) -> Vec<String> {
        self.members
            .lock()
            .unwrap()
            .get(&DocsGroupId::from(group))
            .map(|m| m.iter().map(|u| u.0.clone()).collect())
            .unwrap_or_default()
    }
}

impl DocsDirectory for Docs {
    fn groups_page(&self, _cursor: Option<u64>) -> Result<Page<DocsGroup>, UpstreamError> {
        Ok(Page::last(vec![
            DocsGroup::new("engineering", "g-eng"),
            DocsGroup::new("OPS", "g-ops"),
        ]))
    }

    fn user_info(&self, id: &DocsUserId) -> Result<DocsUser, UpstreamError> {
        let email = match id.0.as_str() {
            "u-ada" => "ada@example.org",
            _ => "ghost@example.org",
        };
        Ok(DocsUser {
            id: id.clone(),
            name: "Some User".into(),
            email: email.into(),
        })
    }

    fn group_members_page(
        &self,
        group: &DocsGroupId,
        _query: &str,
        _cursor: Option<u64>,
    ) -> Result<Page<DocsUserId>, UpstreamError> {
        let members = self.members.lock().unwrap();
        let items = members
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        Ok(Page::last(items))
    }

    fn add_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        self.members
            .lock()
            .unwrap()
            .entry(group.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    fn remove_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        if let Some(members) = self.members.lock().unwrap().get_mut(group) {
            members.remove(user);
        }
        Ok(())
    }

    fn create_group(&self, name: &str) -> Result<DocsGroup, UpstreamError> {
        Ok(DocsGroup::new(name, format!("created-{name}")))
    }
}

fn ada_idp() -> Idp {
    Idp {
        users: vec![IdpUser {
            username: "ada".into(),
            name: "Ada".into(),
            email: "ada@example.org".into(),
            groups: vec!["Engineering".into()],
        }],
        down: false,
    }
}

fn app(idp: Idp, docs: Arc<Docs>) -> axum::Router {
    router(AppState::new(
        Arc::new(idp),
        docs,
        SECRET,
        ReconcileOptions::default(),
    ))
}

fn signin(user: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt-1",
        "event": "users.signin",
        "payload": {"id": user, "model": {"id": user, "name": "Ada"}}
    }))
    .unwrap()
}

fn signed(body: Vec<u8>) -> Request<Body> {
    let header = signature_header(SECRET, "1700000000", &body).unwrap();
    Request::builder()
        .method("POST")
        .uri("/sync")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, header)
        .body(Body::from(body))
        .unwrap()
}

async fn call(app: axum::Router, request: Request<Body>) -> Value {
    let res = app.oneshot(request).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_reports_running() {
    let app = app(ada_idp(), Arc::new(Docs::default()));
    let body = call(app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_eq!(body, json!({"status": "running"}));
}

#[tokio::test]
async fn missing_signature() {
    let docs = Arc::new(Docs::default());
    let request = Request::builder()
        .method("POST")
        .uri("/sync")
        .body(Body::from(signin("u-ada")))
        .unwrap();
    let body = call(app(ada_idp(), docs.clone()), request).await;
    assert_eq!(body["status"], "missing-signature");
    assert!(docs.members_of("g-eng").is_empty());
}

#[tokio::test]
async fn malformed_signature() {
    let request = Request::builder()
        .method("POST")
        .uri("/sync")
        .header(SIGNATURE_HEADER, "sha256=deadbeef")
        .body(Body::from(signin("u-ada")))
        .unwrap();
    let body = call(app(ada_idp(), Arc::new(Docs::default())), request).await;
    assert_eq!(body["status"], "invalid-signature");
}

#[tokio::test]
async fn tampered_body_is_unauthorized() {
    let docs = Arc::new(Docs::default());
    let header = signature_header(SECRET, "1700000000", &signin("u-ada")).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/sync")
        .header(SIGNATURE_HEADER, header)
        .body(Body::from(signin("u-bob")))
        .unwrap();
    let body = call(app(ada_idp(), docs.clone()), request).await;
    assert_eq!(body["status"], "unauthorized");
    assert!(docs.members_of("g-eng").is_empty());
}

#[tokio::test]
async fn other_events_are_wrong_event() {
    let body = serde_json::to_vec(&json!({
        "event": "documents.update",
        "payload": {"model": {"id": "doc-1"}}
    }))
    .unwrap();
    let res = call(app(ada_idp(), Arc::new(Docs::default())), signed(body)).await;
    assert_eq!(res["status"], "wrong-event");
}

#[tokio::test]
async fn unparseable_body_is_wrong_event() {
    let res = call(
        app(ada_idp(), Arc::new(Docs::default())),
        signed(b"not json".to_vec()),
    )
    .await;
    assert_eq!(res["status"], "wrong-event");
}

#[tokio::test]
async fn signin_reconciles_memberships() {
    let docs = Arc::new(Docs::with_member("g-ops", "u-ada"));
    let res = call(app(ada_idp(), docs.clone()), signed(signin("u-ada"))).await;

    assert_eq!(res, json!({"status": "success"}));
    assert_eq!(docs.members_of("g-eng"), vec!["u-ada"]);
    assert!(docs.members_of("g-ops").is_empty());
}

#[tokio::test]
async fn unknown_user_is_reported() {
    let docs = Arc::new(Docs::default());
    let res = call(app(ada_idp(), docs.clone()), signed(signin("u-ghost"))).await;
    assert_eq!(res["status"], "user-not-found-in-authentik");
    assert!(docs.members_of("g-eng").is_empty());
}

#[tokio::test]
async fn upstream_failure_carries_error_text() {
    let idp = Idp {
        down: true,
        ..ada_idp()
    };
    let res = call(app(idp, Arc::new(Docs::default())), signed(signin("u-ada"))).await;
    assert_eq!(res["status"], "authentik-error");
    assert!(res["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn concurrent_signins_for_one_user_converge() {
    let docs = Arc::new(Docs::with_member("g-ops", "u-ada"));
    let app = app(ada_idp(), docs.clone());

    let first = tokio::spawn(call(app.clone(), signed(signin("u-ada"))));
    let second = tokio::spawn(call(app.clone(), signed(signin("u-ada"))));
    assert_eq!(first.await.unwrap()["status"], "success");
    assert_eq!(second.await.unwrap()["status"], "success");

    assert_eq!(docs.members_of("g-eng"), vec!["u-ada"]);
    assert!(docs.members_of("g-ops").is_empty());
}

/// Docs service whose group listing is slow and which records how many runs
/// overlap inside it.
#[derive(Default)]
struct SlowDocs {
    inner: Docs,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl DocsDirectory for SlowDocs {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<DocsGroup>, UpstreamError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(300));
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.inner.groups_page(cursor)
    }

    fn user_info(&self, id: &DocsUserId) -> Result<DocsUser, UpstreamError> {
        self.inner.user_info(id)
    }

    fn group_members_page(
        &self,
        group: &DocsGroupId,
        query: &str,
        cursor: Option<u64>,
    ) -> Result<Page<DocsUserId>, UpstreamError> {
        self.inner.group_members_page(group, query, cursor)
    }

    fn add_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        self.inner.add_user(group, user)
    }

    fn remove_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        self.inner.remove_user(group, user)
    }

    fn create_group(&self, name: &str) -> Result<DocsGroup, UpstreamError> {
        self.inner.create_group(name)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_request_keeps_the_user_locked_until_its_run_ends() {
    let docs = Arc::new(SlowDocs::default());
    let state = AppState::new(
        Arc::new(ada_idp()),
        docs.clone(),
        SECRET,
        ReconcileOptions::default(),
    );
    let app = router(state.clone());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        app.clone().oneshot(signed(signin("u-ada"))),
    )
    .await;
    assert!(abandoned.is_err(), "first delivery should still be running");
    assert_eq!(state.locks().in_flight(), 1);

    let redelivered = call(app, signed(signin("u-ada"))).await;
    assert_eq!(redelivered["status"], "success");
    assert_eq!(docs.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(docs.inner.members_of("g-eng"), vec!["u-ada"]);
}
