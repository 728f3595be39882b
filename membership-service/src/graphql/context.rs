use crate::services::{InviteService, MembershipService, RoleBindingService};

/// GraphQL request context
///
/// Handles to the engine services; cloned per request.
#[derive(Clone)]
pub struct GraphQLContext {
    pub membership: MembershipService,
    pub role_bindings: RoleBindingService,
    pub invites: InviteService,
}

impl juniper::Context for GraphQLContext {}

impl GraphQLContext {
    pub fn new(
        membership: MembershipService,
        role_bindings: RoleBindingService,
        invites: InviteService,
    ) -> Self {
        Self {
            membership,
            role_bindings,
            invites,
        }
    }
}
