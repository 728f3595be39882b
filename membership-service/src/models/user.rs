//! User model - tenant-scoped identity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity (tenant-scoped).
///
/// `user_id` is empty for invitees, who are known only by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub tenant_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub invitation_pending: bool,
    pub created_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new account-backed user.
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            invitation_pending: false,
            created_utc: Utc::now(),
            deleted_utc: None,
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self.last_name = Some(last_name.to_string());
        self
    }

    /// Projection of a pending invitation: email only, no account.
    pub fn invitee(tenant_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: String::new(),
            tenant_id: tenant_id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            invitation_pending: true,
            created_utc: Utc::now(),
            deleted_utc: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_utc.is_some()
    }

    /// Case-insensitive substring match against email, first and last name.
    /// `None` matches all.
    pub fn matches_search(&self, search_term: Option<&str>) -> bool {
        let Some(term) = search_term else {
            return true;
        };
        let term = term.to_lowercase();
        [
            Some(self.email.as_str()),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(&term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_covers_names_and_email() {
        let user = User::new("tenant-a", "u-1", "jane@example.com").with_name("Jane", "Foobar");
        assert!(user.matches_search(Some("FOOBAR")));
        assert!(user.matches_search(Some("jan")));
        assert!(user.matches_search(Some("example.com")));
        assert!(user.matches_search(None));
        assert!(!user.matches_search(Some("bazqux")));
    }

    #[test]
    fn test_invitee_has_no_account() {
        let invitee = User::invitee("tenant-a", "new@example.com");
        assert!(invitee.user_id.is_empty());
        assert!(invitee.invitation_pending);
        assert!(!invitee.is_deleted());
    }
}
