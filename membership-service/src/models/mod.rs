pub mod entity;
pub mod invite;
pub mod membership;
pub mod role;
pub mod sort;
pub mod user;

pub use entity::EntityRef;
pub use invite::{Invite, InviteRequest};
pub use membership::{
    GrantedUser, GrantedUserConnection, MemberQuery, PageInfo, PageRequest, RoleBindingChange,
    MAX_PAGE_SIZE, UNBOUNDED_LIMIT,
};
pub use role::{Role, RoleSet, OWNER_ROLE};
pub use sort::{SortBy, SortDirection, SortField};
pub use user::User;
