//! Role assignment: replaces each user's role set on an entity and reports a
//! change only when the effective set moved.
//!
//! A batch is applied in order and is not transactional. A failing change
//! stops the batch; changes before it stay written.

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::models::{EntityRef, RoleBindingChange, RoleSet};
use crate::services::authz::{AuthorizationMutation, AuthorizationQuery};
use crate::services::{RoleChange, RoleChangeSink, ServiceError};

#[derive(Clone)]
pub struct RoleBindingService {
    query: Arc<dyn AuthorizationQuery>,
    mutation: Arc<dyn AuthorizationMutation>,
    sink: Arc<dyn RoleChangeSink>,
}

impl RoleBindingService {
    pub fn new(
        query: Arc<dyn AuthorizationQuery>,
        mutation: Arc<dyn AuthorizationMutation>,
        sink: Arc<dyn RoleChangeSink>,
    ) -> Self {
        Self {
            query,
            mutation,
            sink,
        }
    }

    /// Every change is validated before anything is written.
    #[instrument(skip(self, entity, changes), fields(entity = %entity, changes = changes.len()))]
    pub async fn assign_role_bindings(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        changes: &[RoleBindingChange],
    ) -> Result<bool, ServiceError> {
        for change in changes {
            change.validate()?;
            if change.role_set().is_empty() {
                return Err(ServiceError::Validation(format!(
                    "at least one role is required for user {}",
                    change.user_id
                )));
            }
        }

        for change in changes {
            self.apply(entity, &change.user_id, &change.role_set())
                .await?;
        }

        Ok(true)
    }

    /// Replace one user's roles. Returns whether the role set changed.
    pub async fn apply(
        &self,
        entity: &EntityRef,
        user_id: &str,
        new_roles: &RoleSet,
    ) -> Result<bool, ServiceError> {
        let current = self
            .query
            .roles_for_user(entity, user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity = %entity, user_id = %user_id, "Failed to read current roles");
                e
            })?;

        self.mutation
            .write_roles(entity, user_id, new_roles)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity = %entity, user_id = %user_id, "Failed to write roles");
                e
            })?;

        if current == *new_roles {
            tracing::debug!(user_id = %user_id, roles = %new_roles, "Role set unchanged");
            return Ok(false);
        }

        self.sink.on_role_changed(RoleChange {
            entity: entity.clone(),
            user_id: user_id.to_string(),
            old_roles: current,
            new_roles: new_roles.clone(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryAuthz, RecordingRoleChangeSink};
    use async_trait::async_trait;

    const TENANT: &str = "tenant-a";

    fn project() -> EntityRef {
        EntityRef::new("project", "acme-proj")
    }

    fn service(authz: &Arc<InMemoryAuthz>, sink: &Arc<RecordingRoleChangeSink>) -> RoleBindingService {
        RoleBindingService::new(authz.clone(), authz.clone(), sink.clone())
    }

    #[tokio::test]
    async fn test_dropping_a_role_reports_one_change() {
        let authz = Arc::new(InMemoryAuthz::new());
        authz.grant(&project(), "u-1", RoleSet::parse("owner,vault_maintainer"));
        let sink = Arc::new(RecordingRoleChangeSink::new());

        let ok = service(&authz, &sink)
            .assign_role_bindings(TENANT, &project(), &[RoleBindingChange::new("u-1", ["owner"])])
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(
            sink.changes(),
            vec![RoleChange {
                entity: project(),
                user_id: "u-1".to_string(),
                old_roles: RoleSet::parse("owner,vault_maintainer"),
                new_roles: RoleSet::parse("owner"),
            }]
        );
        assert_eq!(
            authz.roles_for_user(&project(), "u-1").await.unwrap(),
            RoleSet::parse("owner")
        );
    }

    #[tokio::test]
    async fn test_repeating_an_assignment_is_silent() {
        let authz = Arc::new(InMemoryAuthz::new());
        let sink = Arc::new(RecordingRoleChangeSink::new());
        let service = service(&authz, &sink);
        let change = [RoleBindingChange::new("u-1", ["viewer", "owner"])];

        service.assign_role_bindings(TENANT, &project(), &change).await.unwrap();
        service.assign_role_bindings(TENANT, &project(), &change).await.unwrap();

        assert_eq!(sink.len(), 1);
        assert!(sink.changes()[0].old_roles.is_empty());
        // Both writes still reached the store.
        assert_eq!(authz.write_count(), 2);
    }

    #[tokio::test]
    async fn test_order_and_duplicates_do_not_count_as_change() {
        let authz = Arc::new(InMemoryAuthz::new());
        authz.grant(&project(), "u-1", RoleSet::parse("owner,viewer"));
        let sink = Arc::new(RecordingRoleChangeSink::new());

        service(&authz, &sink)
            .assign_role_bindings(
                TENANT,
                &project(),
                &[RoleBindingChange::new("u-1", ["viewer", "owner", "viewer"])],
            )
            .await
            .unwrap();

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_empty_roles_rejects_whole_batch() {
        let authz = Arc::new(InMemoryAuthz::new());
        let sink = Arc::new(RecordingRoleChangeSink::new());

        for empty in [Vec::<String>::new(), vec![" ".to_string()]] {
            let changes = vec![
                RoleBindingChange::new("u-1", ["owner"]),
                RoleBindingChange::new("u-2", empty),
            ];
            let err = service(&authz, &sink)
                .assign_role_bindings(TENANT, &project(), &changes)
                .await
                .unwrap_err();
            assert!(err.is_validation());
        }

        assert!(sink.is_empty());
        assert_eq!(authz.write_count(), 0);
    }

    #[tokio::test]
    async fn test_padded_role_names_are_stored_trimmed() {
        let authz = Arc::new(InMemoryAuthz::new());
        let sink = Arc::new(RecordingRoleChangeSink::new());

        service(&authz, &sink)
            .assign_role_bindings(
                TENANT,
                &project(),
                &[RoleBindingChange::new("u-1", [" owner ", " "])],
            )
            .await
            .unwrap();

        let stored = authz.roles_for_user(&project(), "u-1").await.unwrap();
        assert_eq!(stored, RoleSet::parse("owner"));
        assert!(stored.is_owner());
        assert_eq!(sink.changes()[0].new_roles, RoleSet::parse("owner"));
    }

    /// Rejects writes for one user.
    struct RejectsUser {
        inner: Arc<InMemoryAuthz>,
        user_id: &'static str,
    }

    #[async_trait]
    impl AuthorizationMutation for RejectsUser {
        async fn write_roles(
            &self,
            entity: &EntityRef,
            user_id: &str,
            roles: &RoleSet,
        ) -> Result<(), ServiceError> {
            if user_id == self.user_id {
                return Err(ServiceError::Authorization(anyhow::anyhow!("write rejected")));
            }
            self.inner.write_roles(entity, user_id, roles).await
        }
    }

    #[tokio::test]
    async fn test_failure_stops_batch_without_rollback() {
        let authz = Arc::new(InMemoryAuthz::new());
        let sink = Arc::new(RecordingRoleChangeSink::new());
        let service = RoleBindingService::new(
            authz.clone(),
            Arc::new(RejectsUser {
                inner: authz.clone(),
                user_id: "u-2",
            }),
            sink.clone(),
        );

        let changes = vec![
            RoleBindingChange::new("u-1", ["owner"]),
            RoleBindingChange::new("u-2", ["owner"]),
            RoleBindingChange::new("u-3", ["owner"]),
        ];
        let err = service
            .assign_role_bindings(TENANT, &project(), &changes)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Authorization(_)));
        assert!(authz.roles_for_user(&project(), "u-1").await.unwrap().is_owner());
        assert!(authz.roles_for_user(&project(), "u-3").await.unwrap().is_empty());
        assert_eq!(sink.len(), 1);
    }
}
