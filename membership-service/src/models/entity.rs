//! Entity reference - the tenant-owned resource access is granted against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resource such as `("project", "acme-proj")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// Object identifier in the authorization graph, `type:id`.
    pub fn object(&self) -> String {
        format!("{}:{}", self.entity_type, self.entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
