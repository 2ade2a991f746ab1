//! Name matching between identity-provider groups and docs groups.
//!
//! Match precedence for one IdP group, scanning docs groups in list order:
//! 1. Case-insensitive equality of the raw names.
//! 2. Equality of the normalized names (see [`normalize_group_name`]).
//!
//! The first docs group satisfying the highest-precedence rule wins. An IdP
//! group with no match produces no mapping.

use std::collections::HashSet;

use crate::types::{DocsGroup, GroupMapping, IdpGroup};

/// Lower-case `name` and strip `-`, `_` and spaces.
pub fn normalize_group_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect()
}

/// Pair every IdP group with at most one docs group.
///
/// Output follows IdP list order. Repeated IdP names are mapped once, from
/// their first occurrence. Several IdP groups may map to the same docs group.
pub fn match_groups(idp_groups: &[IdpGroup], docs_groups: &[DocsGroup]) -> Vec<GroupMapping> {
    let index = DocsIndex::new(docs_groups);
    let mut seen = HashSet::new();
    let mut mappings = Vec::new();

    for idp in idp_groups {
        if !seen.insert(idp.name.as_str()) {
            continue;
        }
        if let Some(docs) = index.find(&idp.name) {
            mappings.push(GroupMapping {
                idp_name: idp.name.clone(),
                docs_name: docs.name.clone(),
                docs_id: docs.id.clone(),
            });
        }
    }

    mappings
}

/// Find the docs group `name` would be matched to, if any.
pub fn find_match<'a>(name: &str, docs_groups: &'a [DocsGroup]) -> Option<&'a DocsGroup> {
    DocsIndex::new(docs_groups).find(name)
}

/// Docs groups with their comparison keys computed once.
struct DocsIndex<'a> {
    entries: Vec<(&'a DocsGroup, String, String)>,
}

impl<'a> DocsIndex<'a> {
    fn new(docs_groups: &'a [DocsGroup]) -> Self {
        let entries = docs_groups
            .iter()
            .map(|g| (g, g.name.to_lowercase(), normalize_group_name(&g.name)))
            .collect();
        Self { entries }
    }

    fn find(&self, idp_name: &str) -> Option<&'a DocsGroup> {
        let lowered = idp_name.to_lowercase();
        if let Some((group, _, _)) = self.entries.iter().find(|(_, l, _)| *l == lowered) {
            return Some(group);
        }

        let normalized = normalize_group_name(idp_name);
        self.entries
            .iter()
            .find(|(_, _, n)| *n == normalized)
            .map(|(group, _, _)| *group)
    }
}
