//! Relational collaborators: user records, invitations and role display
//! records, plus an in-memory implementation of both traits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::models::{EntityRef, Invite, PageRequest, Role, SortBy, User};
use crate::services::sorter::compare_users;
use crate::services::ServiceError;

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Live users of `tenant_id` among `user_ids`, filtered by `search_term`
    /// (case-insensitive substring over email and names), ordered by
    /// `sort_by` with user id as tie-breaker, then windowed by `page`.
    async fn users_by_ids(
        &self,
        tenant_id: &str,
        user_ids: &[String],
        page: PageRequest,
        search_term: Option<&str>,
        sort_by: SortBy,
    ) -> Result<Vec<User>, ServiceError>;

    /// Every invite on the entity, ordered by email.
    async fn invites_for_entity(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
    ) -> Result<Vec<Invite>, ServiceError>;

    /// Live user with this email (case-insensitive), if any.
    async fn find_user_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, ServiceError>;

    /// Insert the invite or replace the roles of the existing one. An invite
    /// whose role list is empty is deleted instead.
    async fn upsert_invite(&self, invite: &Invite) -> Result<(), ServiceError>;

    /// Returns whether an invite existed.
    async fn delete_invite(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        email: &str,
    ) -> Result<bool, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Display records for `names` on the entity's type: type-wide records
    /// plus any scoped to this entity id. Unknown names are absent.
    async fn roles_by_technical_names(
        &self,
        entity: &EntityRef,
        names: &[String],
    ) -> Result<Vec<Role>, ServiceError>;
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Users, invites and roles held in process memory.
#[derive(Default)]
pub struct InMemoryDatastore {
    users: Mutex<Vec<User>>,
    invites: Mutex<Vec<Invite>>,
    roles: Mutex<Vec<Role>>,
    unavailable: AtomicBool,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(user);
    }

    pub fn add_role(&self, role: Role) {
        self.roles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(role);
    }

    /// Soft-delete a user, as account removal does.
    pub fn remove_user(&self, tenant_id: &str, user_id: &str) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = users
            .iter_mut()
            .find(|u| u.tenant_id == tenant_id && u.user_id == user_id)
        {
            user.deleted_utc = Some(chrono::Utc::now());
        }
    }

    pub fn invites(&self) -> Vec<Invite> {
        self.invites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::Datastore(anyhow::anyhow!(
                "datastore unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn users_by_ids(
        &self,
        tenant_id: &str,
        user_ids: &[String],
        page: PageRequest,
        search_term: Option<&str>,
        sort_by: SortBy,
    ) -> Result<Vec<User>, ServiceError> {
        self.check_available()?;

        let mut matched: Vec<User> = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|u| u.tenant_id == tenant_id && !u.is_deleted())
            .filter(|u| user_ids.contains(&u.user_id))
            .filter(|u| u.matches_search(search_term))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            compare_users(a, b, sort_by).then_with(|| a.user_id.cmp(&b.user_id))
        });

        let window = matched.into_iter().skip(page.offset());
        Ok(match page.limit() {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        })
    }

    async fn invites_for_entity(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
    ) -> Result<Vec<Invite>, ServiceError> {
        self.check_available()?;

        let mut invites: Vec<Invite> = self
            .invites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|i| i.tenant_id == tenant_id && &i.entity() == entity)
            .cloned()
            .collect();
        invites.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(invites)
    }

    async fn find_user_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, ServiceError> {
        self.check_available()?;

        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|u| u.tenant_id == tenant_id && !u.is_deleted() && same_email(&u.email, email))
            .cloned())
    }

    async fn upsert_invite(&self, invite: &Invite) -> Result<(), ServiceError> {
        self.check_available()?;

        let mut invites = self.invites.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = invites.iter().position(|i| {
            i.tenant_id == invite.tenant_id
                && i.entity_type == invite.entity_type
                && i.entity_id == invite.entity_id
                && same_email(&i.email, &invite.email)
        });

        match (existing, invite.role_set().is_empty()) {
            (Some(index), true) => {
                invites.remove(index);
            }
            (Some(index), false) => {
                invites[index].roles = invite.roles.clone();
                invites[index].updated_utc = invite.updated_utc;
            }
            (None, true) => {}
            (None, false) => invites.push(invite.clone()),
        }
        Ok(())
    }

    async fn delete_invite(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        email: &str,
    ) -> Result<bool, ServiceError> {
        self.check_available()?;

        let mut invites = self.invites.lock().unwrap_or_else(PoisonError::into_inner);
        let before = invites.len();
        invites.retain(|i| {
            !(i.tenant_id == tenant_id && &i.entity() == entity && same_email(&i.email, email))
        });
        Ok(invites.len() != before)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.check_available()
    }
}

#[async_trait]
impl RoleStore for InMemoryDatastore {
    async fn roles_by_technical_names(
        &self,
        entity: &EntityRef,
        names: &[String],
    ) -> Result<Vec<Role>, ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::RoleStore(anyhow::anyhow!(
                "role store unavailable"
            )));
        }

        Ok(self
            .roles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.entity_type == entity.entity_type)
            .filter(|r| r.is_type_wide() || r.entity_id == entity.entity_id)
            .filter(|r| names.contains(&r.technical_name))
            .cloned()
            .collect())
    }
}
