//! Ordering of member listings.

use std::cmp::Ordering;

use crate::models::{GrantedUser, SortBy, SortDirection, SortField, User};

fn sort_key(user: &User, field: SortField) -> &str {
    match field {
        SortField::UserId => &user.user_id,
        SortField::Email => &user.email,
        SortField::FirstName => user.first_name.as_deref().unwrap_or(""),
        SortField::LastName => user.last_name.as_deref().unwrap_or(""),
    }
}

/// Byte-wise comparison of the chosen field. Missing names compare as `""`.
pub fn compare_users(a: &User, b: &User, sort_by: SortBy) -> Ordering {
    let ordering = sort_key(a, sort_by.field).cmp(sort_key(b, sort_by.field));
    match sort_by.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Sorts members with a default order injected at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSorter {
    default_sort: SortBy,
}

impl UserSorter {
    pub fn new(default_sort: SortBy) -> Self {
        Self { default_sort }
    }

    pub fn default_sort(&self) -> SortBy {
        self.default_sort
    }

    /// The caller's order, or the configured default.
    pub fn resolve(&self, sort_by: Option<SortBy>) -> SortBy {
        sort_by.unwrap_or(self.default_sort)
    }

    /// Stable in-place sort; members with equal keys keep their relative order.
    pub fn sort(&self, members: &mut [GrantedUser], sort_by: Option<SortBy>) {
        let sort_by = self.resolve(sort_by);
        members.sort_by(|a, b| compare_users(&a.user, &b.user, sort_by));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: &str, first: Option<&str>, last: Option<&str>) -> GrantedUser {
        let mut user = User::new("tenant-a", user_id, format!("{}@example.com", user_id));
        user.first_name = first.map(str::to_string);
        user.last_name = last.map(str::to_string);
        GrantedUser {
            user,
            roles: Vec::new(),
        }
    }

    fn ids(members: &[GrantedUser]) -> Vec<&str> {
        members.iter().map(|m| m.user.user_id.as_str()).collect()
    }

    fn fixture() -> Vec<GrantedUser> {
        vec![
            member("u-3", Some("Cara"), Some("beta")),
            member("u-1", Some("Abe"), Some("Alpha")),
            member("u-2", None, None),
            member("u-4", Some("Bo"), Some("Alpha")),
        ]
    }

    #[test]
    fn test_default_is_last_name_ascending_with_missing_first() {
        let mut members = fixture();
        UserSorter::default().sort(&mut members, None);
        // Case-sensitive: "Alpha" < "beta"; ties keep input order.
        assert_eq!(ids(&members), vec!["u-2", "u-1", "u-4", "u-3"]);
    }

    #[test]
    fn test_descending() {
        let mut members = fixture();
        let sort_by = SortBy::new(SortField::FirstName, SortDirection::Desc);
        UserSorter::default().sort(&mut members, Some(sort_by));
        assert_eq!(ids(&members), vec!["u-3", "u-4", "u-1", "u-2"]);
    }

    #[test]
    fn test_injected_default() {
        let mut members = fixture();
        let sorter = UserSorter::new(SortBy::new(SortField::UserId, SortDirection::Asc));
        sorter.sort(&mut members, None);
        assert_eq!(ids(&members), vec!["u-1", "u-2", "u-3", "u-4"]);
    }

    #[test]
    fn test_unknown_field_orders_like_last_name() {
        let sorter = UserSorter::default();
        let mut by_unknown = fixture();
        let mut by_last_name = fixture();

        sorter.sort(
            &mut by_unknown,
            Some(SortBy::parse("favourite_colour", "desc").unwrap()),
        );
        sorter.sort(
            &mut by_last_name,
            Some(SortBy::new(SortField::LastName, SortDirection::Desc)),
        );

        assert_eq!(ids(&by_unknown), ids(&by_last_name));
    }
}
