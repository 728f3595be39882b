//! Granting access by email address.
//!
//! An address that already belongs to an account is granted through the
//! role-binding path; any other address gets (or updates) an invite.

use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::models::{EntityRef, Invite, InviteRequest, RoleSet};
use crate::services::{Datastore, RoleBindingService, ServiceError};

#[derive(Clone)]
pub struct InviteService {
    datastore: Arc<dyn Datastore>,
    role_bindings: RoleBindingService,
}

impl InviteService {
    pub fn new(datastore: Arc<dyn Datastore>, role_bindings: RoleBindingService) -> Self {
        Self {
            datastore,
            role_bindings,
        }
    }

    /// Returns the number of invites written. Direct grants to existing
    /// accounts are not counted.
    #[instrument(skip(self, entity, requests), fields(entity = %entity, requests = requests.len()))]
    pub async fn invite_users(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        requests: &[InviteRequest],
    ) -> Result<i32, ServiceError> {
        for request in requests {
            request.validate()?;
            if RoleSet::from(request.roles.clone()).is_empty() {
                return Err(ServiceError::Validation(format!(
                    "at least one role is required for {}",
                    request.email
                )));
            }
        }

        let mut written = 0;
        for request in requests {
            let email = request.email.trim().to_lowercase();
            let roles = RoleSet::from(request.roles.clone());

            if let Some(user) = self.datastore.find_user_by_email(tenant_id, &email).await? {
                tracing::info!(user_id = %user.user_id, "Address has an account, granting directly");
                self.role_bindings.apply(entity, &user.user_id, &roles).await?;
                continue;
            }

            let invite = Invite::new(tenant_id, &email, entity, &roles);
            self.datastore.upsert_invite(&invite).await.map_err(|e| {
                tracing::error!(error = %e, entity = %entity, "Failed to store invite");
                e
            })?;
            written += 1;
        }

        tracing::info!(written, "Invites stored");
        Ok(written)
    }

    #[instrument(skip(self, entity), fields(entity = %entity))]
    pub async fn remove_invite(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        email: &str,
    ) -> Result<bool, ServiceError> {
        let email = email.trim().to_lowercase();
        let removed = self
            .datastore
            .delete_invite(tenant_id, entity, &email)
            .await?;
        if !removed {
            tracing::debug!(email = %email, "No invite to remove");
        }
        Ok(removed)
    }
}
