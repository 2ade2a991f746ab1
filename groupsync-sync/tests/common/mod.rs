//! In-memory identity provider and docs service for reconciliation tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use groupsync_core::{
    DocsDirectory, DocsGroup, DocsGroupId, DocsUser, DocsUserId, IdpDirectory, IdpGroup, IdpUser,
    Page, UpstreamError, UpstreamSystem,
};

fn paginate<T: Clone>(items: &[T], page_size: usize, cursor: Option<u64>) -> Page<T> {
    let start = cursor.unwrap_or(0) as usize;
    let end = (start + page_size).min(items.len());
    let next = (end < items.len()).then_some(end as u64);
    Page {
        items: items[start.min(items.len())..end].to_vec(),
        next,
    }
}

fn refused(system: UpstreamSystem, endpoint: &str) -> UpstreamError {
    UpstreamError::Status {
        system,
        endpoint: endpoint.to_string(),
        status: 500,
        body: "injected failure".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

pub struct FakeIdp {
    pub groups: Vec<IdpGroup>,
    pub users: Vec<IdpUser>,
    pub page_size: usize,
    /// Make every group listing call fail.
    pub fail_groups: bool,
}

impl FakeIdp {
    pub fn new(groups: &[&str]) -> Self {
        Self {
            groups: groups.iter().map(|g| IdpGroup::new(*g)).collect(),
            users: Vec::new(),
            page_size: 100,
            fail_groups: false,
        }
    }

    pub fn with_user(mut self, email: &str, groups: &[&str]) -> Self {
        self.users.push(IdpUser {
            username: email.split('@').next().unwrap_or(email).to_string(),
            name: email.to_string(),
            email: email.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    pub fn set_user_groups(&mut self, email: &str, groups: &[&str]) {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.email == email)
            .expect("known user");
        user.groups = groups.iter().map(|g| g.to_string()).collect();
    }
}

impl IdpDirectory for FakeIdp {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<IdpGroup>, UpstreamError> {
        if self.fail_groups {
            return Err(refused(UpstreamSystem::Idp, "core/groups"));
        }
        Ok(paginate(&self.groups, self.page_size, cursor))
    }

    fn users_by_email(&self, email: &str) -> Result<Vec<IdpUser>, UpstreamError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.email == email)
            .cloned()
            .collect())
    }

    fn users_page(&self, cursor: Option<u64>) -> Result<Page<IdpUser>, UpstreamError> {
        Ok(paginate(&self.users, self.page_size, cursor))
    }
}

// ---------------------------------------------------------------------------
// Docs service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(String, String),
    Remove(String, String),
    Create(String),
}

#[derive(Default)]
struct DocsState {
    groups: Vec<DocsGroup>,
    members: BTreeMap<DocsGroupId, BTreeSet<DocsUserId>>,
    calls: Vec<Call>,
    next_id: usize,
}

pub struct FakeDocs {
    state: Mutex<DocsState>,
    users: Vec<DocsUser>,
    pub page_size: usize,
    pub fail_mutations_for: HashSet<String>,
    pub fail_probes_for: HashSet<String>,
    pub fail_create: bool,
}

impl FakeDocs {
    pub fn new(groups: &[(&str, &str)]) -> Self {
        let state = DocsState {
            groups: groups.iter().map(|(n, id)| DocsGroup::new(*n, *id)).collect(),
            ..DocsState::default()
        };
        Self {
            state: Mutex::new(state),
            users: Vec::new(),
            page_size: 100,
            fail_mutations_for: HashSet::new(),
            fail_probes_for: HashSet::new(),
            fail_create: false,
        }
    }

    pub fn with_user(mut self, id: &str, name: &str, email: &str) -> Self {
        self.users.push(DocsUser {
            id: DocsUserId::from(id),
            name: name.to_string(),
            email: email.to_string(),
        });
        self
    }

    pub fn with_member(self, group_id: &str, user_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .members
            .entry(DocsGroupId::from(group_id))
            .or_default()
            .insert(DocsUserId::from(user_id));
        self
    }

    pub fn members_of(&self, group_id: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&DocsGroupId::from(group_id))
            .map(|m| m.iter().map(|u| u.0.clone()).collect())
            .unwrap_or_default()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .iter()
            .map(|g| g.name.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

impl DocsDirectory for FakeDocs {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<DocsGroup>, UpstreamError> {
        let state = self.state.lock().unwrap();
        Ok(paginate(&state.groups, self.page_size, cursor))
    }

    fn user_info(&self, id: &DocsUserId) -> Result<DocsUser, UpstreamError> {
        self.users
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                system: UpstreamSystem::Docs,
                endpoint: "users.info".to_string(),
                status: 404,
                body: "not found".to_string(),
            })
    }

    fn group_members_page(
        &self,
        group: &DocsGroupId,
        query: &str,
        cursor: Option<u64>,
    ) -> Result<Page<DocsUserId>, UpstreamError> {
        if self.fail_probes_for.contains(&group.0) {
            return Err(refused(UpstreamSystem::Docs, "groups.memberships"));
        }
        let state = self.state.lock().unwrap();
        let matching: Vec<DocsUserId> = state
            .members
            .get(group)
            .into_iter()
            .flatten()
            .filter(|id| {
                self.users
                    .iter()
                    .any(|u| &u.id == *id && u.name.contains(query))
            })
            .cloned()
            .collect();
        Ok(paginate(&matching, self.page_size, cursor))
    }

    fn add_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Add(group.0.clone(), user.0.clone()));
        if self.fail_mutations_for.contains(&group.0) {
            return Err(refused(UpstreamSystem::Docs, "groups.add_user"));
        }
        state
            .members
            .entry(group.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    fn remove_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Remove(group.0.clone(), user.0.clone()));
        if self.fail_mutations_for.contains(&group.0) {
            return Err(refused(UpstreamSystem::Docs, "groups.remove_user"));
        }
        if let Some(members) = state.members.get_mut(group) {
            members.remove(user);
        }
        Ok(())
    }

    fn create_group(&self, name: &str) -> Result<DocsGroup, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(name.to_string()));
        if self.fail_create {
            return Err(refused(UpstreamSystem::Docs, "groups.create"));
        }
        state.next_id += 1;
        let group = DocsGroup::new(name, format!("created-{}", state.next_id));
        state.groups.push(group.clone());
        Ok(group)
    }
}
