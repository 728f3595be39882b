//! GraphQL input and output types.

use juniper::{GraphQLInputObject, GraphQLObject};

use crate::models::{
    EntityRef, GrantedUser, GrantedUserConnection, InviteRequest, PageInfo, Role,
    RoleBindingChange, SortBy, User,
};

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct EntityInput {
    pub entity_type: String,
    pub entity_id: String,
}

impl From<EntityInput> for EntityRef {
    fn from(input: EntityInput) -> Self {
        EntityRef::new(input.entity_type, input.entity_id)
    }
}

/// Sort order. An unknown `field` sorts by last name; `direction` must be
/// `ASC` or `DESC`.
#[derive(Debug, Clone, GraphQLInputObject)]
pub struct SortByInput {
    pub field: String,
    pub direction: String,
}

impl TryFrom<SortByInput> for SortBy {
    type Error = String;

    fn try_from(input: SortByInput) -> Result<Self, Self::Error> {
        SortBy::parse(&input.field, &input.direction)
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct RoleBindingInput {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl From<RoleBindingInput> for RoleBindingChange {
    fn from(input: RoleBindingInput) -> Self {
        RoleBindingChange::new(input.user_id, input.roles)
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct InviteInput {
    pub email: String,
    pub roles: Vec<String>,
}

impl From<InviteInput> for InviteRequest {
    fn from(input: InviteInput) -> Self {
        InviteRequest {
            email: input.email,
            roles: input.roles,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "User", description = "A member account, or an invitee known only by email")]
pub struct UserData {
    /// Absent for invitees.
    pub user_id: Option<String>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub invitation_pending: bool,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            user_id: (!user.user_id.is_empty()).then_some(user.user_id),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            invitation_pending: user.invitation_pending,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "Role")]
pub struct RoleData {
    pub display_name: String,
    pub technical_name: String,
}

impl From<Role> for RoleData {
    fn from(role: Role) -> Self {
        Self {
            display_name: role.display_name,
            technical_name: role.technical_name,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "GrantedUser")]
pub struct GrantedUserData {
    pub user: UserData,
    pub roles: Vec<RoleData>,
}

impl From<GrantedUser> for GrantedUserData {
    fn from(member: GrantedUser) -> Self {
        Self {
            user: member.user.into(),
            roles: member.roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "PageInfo")]
pub struct PageInfoData {
    pub owner_count: i32,
    pub total_count: i32,
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl From<PageInfo> for PageInfoData {
    fn from(info: PageInfo) -> Self {
        Self {
            owner_count: saturating_i32(info.owner_count),
            total_count: saturating_i32(info.total_count),
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "GrantedUserConnection")]
pub struct GrantedUserConnectionData {
    pub users: Vec<GrantedUserData>,
    pub page_info: PageInfoData,
}

impl From<GrantedUserConnection> for GrantedUserConnectionData {
    fn from(connection: GrantedUserConnection) -> Self {
        Self {
            users: connection.users.into_iter().map(Into::into).collect(),
            page_info: connection.page_info.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitee_has_null_user_id() {
        let data = UserData::from(User::invitee("tenant-a", "new@example.com"));
        assert!(data.user_id.is_none());
        assert!(data.invitation_pending);

        let data = UserData::from(User::new("tenant-a", "u-1", "a@example.com"));
        assert_eq!(data.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_sort_input_rejects_bad_direction() {
        let bad = SortByInput {
            field: "email".to_string(),
            direction: "UP".to_string(),
        };
        assert!(SortBy::try_from(bad).is_err());
    }
}
