//! Authentik core API client (identity provider side).
//!
//! Endpoints, all `GET` with a bearer token:
//! - `/api/v3/core/groups/?page=N&page_size=100&include_users=false`
//! - `/api/v3/core/users/?email=E`
//! - `/api/v3/core/users/?page=N&page_size=100`
//!
//! List responses carry `pagination.next`, the following page number or `0`
//! on the last page.

use serde::{de::DeserializeOwned, Deserialize};

use groupsync_core::{IdpDirectory, IdpGroup, IdpUser, Page, UpstreamError, UpstreamSystem};

use crate::http::{check, decode, ClientConfig};

const PAGE_SIZE: &str = "100";
const GROUPS: &str = "/api/v3/core/groups/";
const USERS: &str = "/api/v3/core/users/";

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default)]
    pagination: Pagination,
    results: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: u64,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    groups_obj: Option<Vec<GroupRecord>>,
}

impl From<UserRecord> for IdpUser {
    fn from(record: UserRecord) -> Self {
        Self {
            username: record.username,
            name: record.name,
            email: record.email,
            groups: record
                .groups_obj
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
        }
    }
}

impl<T> Paginated<T> {
    fn into_page<U: From<T>>(self) -> Page<U> {
        Page {
            items: self.results.into_iter().map(U::from).collect(),
            next: (self.pagination.next > 0).then_some(self.pagination.next),
        }
    }
}

impl From<GroupRecord> for IdpGroup {
    fn from(record: GroupRecord) -> Self {
        IdpGroup::new(record.name)
    }
}

/// Blocking Authentik client.
#[derive(Debug, Clone)]
pub struct AuthentikClient {
    config: ClientConfig,
    agent: ureq::Agent,
}

impl AuthentikClient {
    pub fn new(config: ClientConfig) -> Self {
        let agent = config.agent();
        Self { config, agent }
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<ureq::Response, UpstreamError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &self.config.bearer())
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::debug!(endpoint, "authentik request");
        check(UpstreamSystem::Idp, endpoint, request.call())
    }

    fn list<T, U>(
        &self,
        endpoint: &str,
        cursor: Option<u64>,
        extra: &[(&str, &str)],
    ) -> Result<Page<U>, UpstreamError>
    where
        T: DeserializeOwned,
        U: From<T>,
    {
        let page = cursor.unwrap_or(1).to_string();
        let mut query = vec![("page", page.as_str()), ("page_size", PAGE_SIZE)];
        query.extend_from_slice(extra);
        let response = self.get(endpoint, &query)?;
        let body: Paginated<T> = decode(UpstreamSystem::Idp, endpoint, response)?;
        Ok(body.into_page())
    }
}

impl IdpDirectory for AuthentikClient {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<IdpGroup>, UpstreamError> {
        self.list::<GroupRecord, IdpGroup>(GROUPS, cursor, &[("include_users", "false")])
    }

    fn users_by_email(&self, email: &str) -> Result<Vec<IdpUser>, UpstreamError> {
        let response = self.get(USERS, &[("email", email)])?;
        let body: Paginated<UserRecord> = decode(UpstreamSystem::Idp, USERS, response)?;
        Ok(body.results.into_iter().map(IdpUser::from).collect())
    }

    fn users_page(&self, cursor: Option<u64>) -> Result<Page<IdpUser>, UpstreamError> {
        self.list::<UserRecord, IdpUser>(USERS, cursor, &[])
    }
}
