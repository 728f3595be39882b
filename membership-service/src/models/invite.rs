//! Invite model - pending grants for email addresses without an account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{EntityRef, RoleSet};

/// Invite entity. Primary key is `(email, entity_type, entity_id, tenant_id)`.
///
/// `roles` holds the comma-joined technical role names; use [`Invite::role_set`]
/// rather than inspecting the string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invite {
    pub tenant_id: String,
    pub email: String,
    pub entity_type: String,
    pub entity_id: String,
    pub roles: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invite {
    pub fn new(
        tenant_id: impl Into<String>,
        email: impl Into<String>,
        entity: &EntityRef,
        roles: &RoleSet,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.into(),
            email: email.into(),
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            roles: roles.to_joined(),
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn role_set(&self) -> RoleSet {
        RoleSet::parse(&self.roles)
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(&self.entity_type, &self.entity_id)
    }

    /// Case-insensitive substring match against the email. `None` matches all.
    pub fn matches_search(&self, search_term: Option<&str>) -> bool {
        match search_term {
            Some(term) => self.email.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }
}

/// One element of an invite request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(email: &str, roles: &str) -> Invite {
        Invite::new(
            "tenant-a",
            email,
            &EntityRef::new("project", "acme-proj"),
            &RoleSet::parse(roles),
        )
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let invite = invite("Jane.FOOBAR@example.com", "owner");
        assert!(invite.matches_search(Some("foobar")));
        assert!(invite.matches_search(Some("FOOBAR")));
        assert!(invite.matches_search(None));
        assert!(!invite.matches_search(Some("bazqux")));
    }

    #[test]
    fn test_roles_round_trip_through_storage_form() {
        let invite = invite("a@example.com", "viewer,owner");
        assert_eq!(invite.roles, "owner,viewer");
        assert!(invite.role_set().is_owner());
    }

    #[test]
    fn test_invite_request_validation() {
        let ok = InviteRequest {
            email: "new.user@example.com".to_string(),
            roles: vec!["viewer".to_string()],
        };
        assert!(ok.validate().is_ok());

        let no_roles = InviteRequest {
            email: "new.user@example.com".to_string(),
            roles: vec![],
        };
        assert!(no_roles.validate().is_err());

        let bad_email = InviteRequest {
            email: "not-an-email".to_string(),
            roles: vec!["viewer".to_string()],
        };
        assert!(bad_email.validate().is_err());
    }
}
