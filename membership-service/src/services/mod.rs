//! Services layer for membership-service.
//!
//! The engine (listing, role assignment, invites) sits on narrow adapter
//! traits; each adapter has a production implementation and an in-memory one.

pub mod authz;
mod database;
mod datastore;
pub mod error;
mod invites;
mod membership;
pub mod metrics;
pub mod pagination;
mod role_bindings;
mod role_events;
mod role_resolver;
mod sorter;

pub use authz::{
    AuthorizationMutation, AuthorizationQuery, FgaClient, InMemoryAuthz, RoleAssignments,
};
pub use database::Database;
pub use datastore::{Datastore, InMemoryDatastore, RoleStore};
pub use error::ServiceError;
pub use invites::InviteService;
pub use membership::MembershipService;
pub use role_bindings::RoleBindingService;
pub use role_events::{AuditLogSink, RecordingRoleChangeSink, RoleChange, RoleChangeSink};
pub use role_resolver::RoleResolver;
pub use sorter::{compare_users, UserSorter};
