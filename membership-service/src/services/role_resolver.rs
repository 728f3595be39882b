//! Technical role names to display records.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{EntityRef, Role, RoleSet};
use crate::services::{RoleStore, ServiceError};

#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// One display record per known name; a record scoped to the entity wins
    /// over the type-wide one. Names without a record are dropped.
    pub async fn resolve(
        &self,
        entity: &EntityRef,
        names: &RoleSet,
    ) -> Result<Vec<Role>, ServiceError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let roles = self
            .store
            .roles_by_technical_names(entity, &names.to_vec())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity = %entity, "Role lookup failed");
                e
            })?;

        let mut by_name: HashMap<String, Role> = HashMap::with_capacity(roles.len());
        for role in roles {
            match by_name.get(&role.technical_name) {
                Some(existing) if !existing.is_type_wide() => {}
                _ => {
                    by_name.insert(role.technical_name.clone(), role);
                }
            }
        }

        // Follow the set's order so output is deterministic.
        Ok(names.iter().filter_map(|name| by_name.remove(name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryDatastore;

    fn project() -> EntityRef {
        EntityRef::new("project", "acme-proj")
    }

    fn resolver() -> RoleResolver {
        let store = InMemoryDatastore::new();
        store.add_role(Role::new("project", "owner", "Owner"));
        store.add_role(Role::new("project", "viewer", "Viewer"));
        store.add_role(Role::new("project", "viewer", "Acme Reader").for_entity("acme-proj"));
        RoleResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_unknown_names_are_dropped() {
        let roles = resolver()
            .resolve(&project(), &RoleSet::parse("owner,vault_maintainer"))
            .await
            .unwrap();
        assert_eq!(roles, vec![Role::new("project", "owner", "Owner")]);
    }

    #[tokio::test]
    async fn test_entity_scoped_record_wins() {
        let roles = resolver()
            .resolve(&project(), &RoleSet::parse("viewer"))
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].display_name, "Acme Reader");
    }

    #[tokio::test]
    async fn test_empty_names_skip_the_store() {
        let store = InMemoryDatastore::new();
        store.set_unavailable(true);
        let resolver = RoleResolver::new(Arc::new(store));
        assert!(resolver.resolve(&project(), &RoleSet::new()).await.unwrap().is_empty());
    }
}
