//! Outline API client (docs side).
//!
//! Outline's API is RPC-style: every call is a `POST /api/<method>` with a
//! JSON body, and every success response wraps its payload in `data`.
//! Listings take `limit`/`offset`; a page shorter than `limit` is the last one.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use groupsync_core::{
    DocsDirectory, DocsGroup, DocsGroupId, DocsUser, DocsUserId, Page, UpstreamError,
    UpstreamSystem,
};

use crate::http::{check, decode, ClientConfig};

const PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct GroupList {
    groups: Vec<GroupRecord>,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    id: String,
    name: String,
}

impl From<GroupRecord> for DocsGroup {
    fn from(record: GroupRecord) -> Self {
        DocsGroup::new(record.name, record.id)
    }
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembershipList {
    users: Vec<MemberRecord>,
}

#[derive(Debug, Deserialize)]
struct MemberRecord {
    id: String,
}

/// Blocking Outline client.
#[derive(Debug, Clone)]
pub struct OutlineClient {
    config: ClientConfig,
    agent: ureq::Agent,
}

impl OutlineClient {
    pub fn new(config: ClientConfig) -> Self {
        let agent = config.agent();
        Self { config, agent }
    }

    fn post(&self, method: &str, body: Value) -> Result<ureq::Response, UpstreamError> {
        let url = format!("{}/api/{}", self.config.base_url, method);
        tracing::debug!(method, "outline request");
        let result = self
            .agent
            .post(&url)
            .set("Authorization", &self.config.bearer())
            .set("Accept", "application/json")
            .send_json(body);
        check(UpstreamSystem::Docs, method, result)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, UpstreamError> {
        let response = self.post(method, body)?;
        let envelope: Envelope<T> = decode(UpstreamSystem::Docs, method, response)?;
        Ok(envelope.data)
    }
}

/// Page boundary for offset pagination: a full page may have a successor.
fn next_offset(offset: u64, returned: usize) -> Option<u64> {
    (returned as u64 >= PAGE_SIZE).then_some(offset + returned as u64)
}

impl DocsDirectory for OutlineClient {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<DocsGroup>, UpstreamError> {
        let offset = cursor.unwrap_or(0);
        let list: GroupList = self.call(
            "groups.list",
            json!({ "limit": PAGE_SIZE, "offset": offset }),
        )?;
        let next = next_offset(offset, list.groups.len());
        Ok(Page {
            items: list.groups.into_iter().map(DocsGroup::from).collect(),
            next,
        })
    }

    fn user_info(&self, id: &DocsUserId) -> Result<DocsUser, UpstreamError> {
        let user: UserRecord = self.call("users.info", json!({ "id": id.0 }))?;
        Ok(DocsUser {
            id: DocsUserId::from(user.id),
            name: user.name,
            email: user.email.unwrap_or_default(),
        })
    }

    fn group_members_page(
        &self,
        group: &DocsGroupId,
        query: &str,
        cursor: Option<u64>,
    ) -> Result<Page<DocsUserId>, UpstreamError> {
        let offset = cursor.unwrap_or(0);
        let list: MembershipList = self.call(
            "groups.memberships",
            json!({ "id": group.0, "query": query, "limit": PAGE_SIZE, "offset": offset }),
        )?;
        let next = next_offset(offset, list.users.len());
        Ok(Page {
            items: list.users.into_iter().map(|u| DocsUserId::from(u.id)).collect(),
            next,
        })
    }

    fn add_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        self.post("groups.add_user", json!({ "id": group.0, "userId": user.0 }))?;
        Ok(())
    }

    fn remove_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        self.post("groups.remove_user", json!({ "id": group.0, "userId": user.0 }))?;
        Ok(())
    }

    fn create_group(&self, name: &str) -> Result<DocsGroup, UpstreamError> {
        let group: GroupRecord = self.call("groups.create", json!({ "name": name }))?;
        Ok(group.into())
    }
}
