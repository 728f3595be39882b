//! Role model - display records for technical role names, plus the `RoleSet`
//! value object used wherever role lists are compared, filtered or stored.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;

/// Technical name of the distinguished ownership role.
pub const OWNER_ROLE: &str = "owner";

/// Separator used when a role list is persisted as a single column.
const ROLE_SEPARATOR: char = ',';

/// Display record for a technical role name.
///
/// A blank `entity_id` means the role applies to every entity of `entity_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub display_name: String,
    pub technical_name: String,
    pub entity_type: String,
    pub entity_id: String,
}

impl Role {
    pub fn new(
        entity_type: impl Into<String>,
        technical_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            technical_name: technical_name.into(),
            entity_type: entity_type.into(),
            entity_id: String::new(),
        }
    }

    /// Scope the role to one entity instead of the whole entity type.
    pub fn for_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = entity_id.into();
        self
    }

    pub fn is_type_wide(&self) -> bool {
        self.entity_id.is_empty()
    }
}

/// Ordered, duplicate-free set of technical role names.
///
/// Equality is set equality, so `[b, a, a]` equals `[a, b]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-joined role string. Blank tokens are dropped.
    pub fn parse(joined: &str) -> Self {
        joined.split(ROLE_SEPARATOR).collect()
    }

    /// Serialize back to the comma-joined storage form.
    pub fn to_joined(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Exact token match; `"own"` does not match `"owner"`.
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True when at least one of `roles` is in the set.
    pub fn contains_any<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        roles.into_iter().any(|role| self.contains(role))
    }

    pub fn is_owner(&self) -> bool {
        self.contains(OWNER_ROLE)
    }

    /// Returns false when the role was already present or is blank.
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        match normalize(role.into()) {
            Some(name) => self.0.insert(name),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names in this set that are missing from `other`.
    pub fn difference<'a>(&'a self, other: &'a RoleSet) -> impl Iterator<Item = &'a str> {
        self.0.difference(&other.0).map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Names are trimmed; blank names are not roles.
fn normalize(name: String) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == name.len() {
        Some(name)
    } else {
        Some(trimmed.to_string())
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .filter_map(|name| normalize(name.into()))
                .collect(),
        )
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(roles: Vec<String>) -> Self {
        roles.into_iter().collect()
    }
}

impl IntoIterator for RoleSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_joined())
    }
}
