//! Membership projections returned to callers and the request types that
//! drive listing and role assignment.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Role, RoleSet, SortBy, User};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// `limit` sentinel meaning "no limit".
pub const UNBOUNDED_LIMIT: i32 = -1;

/// A member with display-ready roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantedUser {
    pub user: User,
    pub roles: Vec<Role>,
}

/// Counts across both sources, independent of the requested page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub total_count: usize,
    pub owner_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantedUserConnection {
    pub users: Vec<GrantedUser>,
    pub page_info: PageInfo,
}

/// Validated pagination window. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Unbounded,
    Bounded { limit: usize, page: usize },
}

impl PageRequest {
    pub fn try_new(limit: i32, page: i32) -> Result<Self, String> {
        if limit == UNBOUNDED_LIMIT {
            return Ok(PageRequest::Unbounded);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(format!(
                "limit must be between 1 and {} (or {} for no limit), got {}",
                MAX_PAGE_SIZE, UNBOUNDED_LIMIT, limit
            ));
        }
        if page < 0 {
            return Err(format!("page must not be negative, got {}", page));
        }
        Ok(PageRequest::Bounded {
            limit: limit as usize,
            page: page as usize,
        })
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            PageRequest::Unbounded => None,
            PageRequest::Bounded { limit, .. } => Some(*limit),
        }
    }

    /// Rows to skip. Page 0 is treated like page 1.
    pub fn offset(&self) -> usize {
        match self {
            PageRequest::Unbounded => 0,
            PageRequest::Bounded { limit, page } => limit.saturating_mul(page.saturating_sub(1)),
        }
    }

    /// Whether `granted_count` members already fill this page completely,
    /// leaving no room for invitees.
    pub fn is_filled_by(&self, granted_count: usize) -> bool {
        match self {
            PageRequest::Unbounded => false,
            PageRequest::Bounded { limit, page } => {
                granted_count >= limit.saturating_mul((*page).max(1))
            }
        }
    }
}

/// Arguments of a membership listing.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub search_term: Option<String>,
    pub role_filter: Vec<String>,
    pub show_invitees: bool,
    pub sort_by: Option<SortBy>,
}

/// Requested full role set for one user on an entity.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleBindingChange {
    #[validate(length(min = 1, message = "user id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Vec<String>,
}

impl RoleBindingChange {
    pub fn new<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn role_set(&self) -> RoleSet {
        self.roles.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::try_new(-1, 7), Ok(PageRequest::Unbounded));
        assert!(PageRequest::try_new(0, 1).is_err());
        assert!(PageRequest::try_new(1001, 1).is_err());
        assert!(PageRequest::try_new(-2, 1).is_err());
        assert!(PageRequest::try_new(10, -1).is_err());
        assert_eq!(
            PageRequest::try_new(1000, 0),
            Ok(PageRequest::Bounded { limit: 1000, page: 0 })
        );
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::Unbounded.offset(), 0);
        assert_eq!(PageRequest::Bounded { limit: 10, page: 0 }.offset(), 0);
        assert_eq!(PageRequest::Bounded { limit: 10, page: 1 }.offset(), 0);
        assert_eq!(PageRequest::Bounded { limit: 10, page: 3 }.offset(), 20);
    }

    #[test]
    fn test_is_filled_by() {
        let page_two = PageRequest::Bounded { limit: 10, page: 2 };
        assert!(page_two.is_filled_by(20));
        assert!(!page_two.is_filled_by(19));
        assert!(!PageRequest::Unbounded.is_filled_by(usize::MAX));
        assert!(!PageRequest::Bounded { limit: 10, page: 0 }.is_filled_by(9));
    }

    #[test]
    fn test_role_binding_change_validation() {
        assert!(RoleBindingChange::new("u-1", ["owner"]).validate().is_ok());
        assert!(RoleBindingChange::new("u-1", Vec::<String>::new())
            .validate()
            .is_err());
        assert!(RoleBindingChange::new("", ["owner"]).validate().is_err());
    }
}
