//! GraphQL schema definition.

use juniper::{graphql_value, EmptySubscription, FieldError, FieldResult, RootNode};
use tracing::error;

use super::context::GraphQLContext;
use super::types::{
    EntityInput, GrantedUserConnectionData, InviteInput, RoleBindingInput, SortByInput,
};
use crate::models::{
    EntityRef, InviteRequest, MemberQuery, RoleBindingChange, SortBy, UNBOUNDED_LIMIT,
};
use crate::services::ServiceError;

const DEFAULT_PAGE: i32 = 1;

fn bad_input(message: impl Into<String>) -> FieldError {
    FieldError::new(message.into(), graphql_value!({ "code": "BAD_USER_INPUT" }))
}

/// Validation messages reach the caller verbatim; upstream failures do not.
fn to_field_error(e: ServiceError) -> FieldError {
    match e {
        ServiceError::Validation(message) => bad_input(message),
        e @ ServiceError::Timeout { .. } => {
            error!(error = %e, "Request timed out upstream");
            FieldError::new("Upstream service timed out", graphql_value!({ "code": "TIMEOUT" }))
        }
        e => {
            error!(error = %e, "Request failed");
            FieldError::new("Internal server error", graphql_value!({ "code": "INTERNAL" }))
        }
    }
}

pub struct Query;

#[juniper::graphql_object(context = GraphQLContext)]
impl Query {
    /// Members of an entity: granted users first, then (optionally) invitees.
    ///
    /// `limit` defaults to -1 (everything); otherwise 1..=1000. `page` is
    /// 1-based and defaults to 1.
    async fn users_of_entity(
        ctx: &GraphQLContext,
        tenant_id: String,
        entity: EntityInput,
        limit: Option<i32>,
        page: Option<i32>,
        show_invitees: Option<bool>,
        search_term: Option<String>,
        roles: Option<Vec<String>>,
        sort_by: Option<SortByInput>,
    ) -> FieldResult<GrantedUserConnectionData> {
        let sort_by = sort_by.map(SortBy::try_from).transpose().map_err(bad_input)?;

        let query = MemberQuery {
            search_term,
            role_filter: roles.unwrap_or_default(),
            show_invitees: show_invitees.unwrap_or(false),
            sort_by,
        };
        let entity = EntityRef::from(entity);

        let connection = ctx
            .membership
            .list_members(
                &tenant_id,
                &entity,
                limit.unwrap_or(UNBOUNDED_LIMIT),
                page.unwrap_or(DEFAULT_PAGE),
                &query,
            )
            .await
            .map_err(to_field_error)?;

        Ok(connection.into())
    }
}

pub struct Mutation;

#[juniper::graphql_object(context = GraphQLContext)]
impl Mutation {
    /// Replace each listed user's roles on the entity. Every element must
    /// carry at least one role.
    async fn assign_role_bindings(
        ctx: &GraphQLContext,
        tenant_id: String,
        entity_type: String,
        entity_id: String,
        input: Vec<RoleBindingInput>,
    ) -> FieldResult<bool> {
        let entity = EntityRef::new(entity_type, entity_id);
        let changes: Vec<RoleBindingChange> = input.into_iter().map(Into::into).collect();

        ctx.role_bindings
            .assign_role_bindings(&tenant_id, &entity, &changes)
            .await
            .map_err(to_field_error)
    }

    /// Grant roles by email. Returns the number of invites written.
    async fn invite_users_to_entity(
        ctx: &GraphQLContext,
        tenant_id: String,
        entity_type: String,
        entity_id: String,
        input: Vec<InviteInput>,
    ) -> FieldResult<i32> {
        let entity = EntityRef::new(entity_type, entity_id);
        let requests: Vec<InviteRequest> = input.into_iter().map(Into::into).collect();

        ctx.invites
            .invite_users(&tenant_id, &entity, &requests)
            .await
            .map_err(to_field_error)
    }

    async fn remove_invite(
        ctx: &GraphQLContext,
        tenant_id: String,
        entity_type: String,
        entity_id: String,
        email: String,
    ) -> FieldResult<bool> {
        let entity = EntityRef::new(entity_type, entity_id);

        ctx.invites
            .remove_invite(&tenant_id, &entity, &email)
            .await
            .map_err(to_field_error)
    }
}

pub type Schema = RootNode<'static, Query, Mutation, EmptySubscription<GraphQLContext>>;

pub fn create_schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}
