//! Membership listing: merges authorization grants with pending invites into
//! one paged, searchable, owner-counted view.
//!
//! Granted members always come first, ordered and paged by the datastore;
//! invitees follow and are paged in memory with [`invite_slice_bounds`].

use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    EntityRef, GrantedUser, GrantedUserConnection, Invite, MemberQuery, PageInfo, PageRequest,
    Role, RoleSet, SortBy, User,
};
use crate::services::authz::{AuthorizationQuery, RoleAssignments};
use crate::services::pagination::invite_slice_bounds;
use crate::services::sorter::compare_users;
use crate::services::{metrics, Datastore, RoleResolver, ServiceError, UserSorter};

#[derive(Clone)]
pub struct MembershipService {
    authz: Arc<dyn AuthorizationQuery>,
    datastore: Arc<dyn Datastore>,
    resolver: RoleResolver,
    sorter: UserSorter,
}

impl MembershipService {
    pub fn new(
        authz: Arc<dyn AuthorizationQuery>,
        datastore: Arc<dyn Datastore>,
        resolver: RoleResolver,
        sorter: UserSorter,
    ) -> Self {
        Self {
            authz,
            datastore,
            resolver,
            sorter,
        }
    }

    /// List the members of `entity`. `limit = -1` lists everything.
    #[instrument(
        skip(self, entity, query),
        fields(entity = %entity, show_invitees = query.show_invitees)
    )]
    pub async fn list_members(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        limit: i32,
        page: i32,
        query: &MemberQuery,
    ) -> Result<GrantedUserConnection, ServiceError> {
        let result = self.aggregate(tenant_id, entity, limit, page, query).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_validation() => "invalid",
            Err(_) => "error",
        };
        metrics::record_membership_query(outcome);

        result
    }

    async fn aggregate(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        limit: i32,
        page: i32,
        query: &MemberQuery,
    ) -> Result<GrantedUserConnection, ServiceError> {
        let page_request = PageRequest::try_new(limit, page).map_err(ServiceError::Validation)?;
        let sort_by = self.sorter.resolve(query.sort_by);
        let search_term = query.search_term.as_deref();

        let assignments = self.granted_assignments(entity, &query.role_filter).await?;
        let user_ids: Vec<String> = assignments.keys().cloned().collect();

        // The count pass and the page pass are separate reads with no shared
        // snapshot. A user removed in between is still counted in total_count
        // but missing from the page; the next call converges.
        let all_users = self
            .users_by_ids(tenant_id, &user_ids, PageRequest::Unbounded, search_term, sort_by)
            .await?;
        let page_users = match page_request {
            PageRequest::Unbounded => all_users.clone(),
            bounded => {
                self.users_by_ids(tenant_id, &user_ids, bounded, search_term, sort_by)
                    .await?
            }
        };

        let granted_count = all_users.len();
        let granted_owners = all_users
            .iter()
            .filter(|u| assignments.get(&u.user_id).is_some_and(RoleSet::is_owner))
            .count();

        let invites = self.filtered_invites(tenant_id, entity, query).await?;
        let invite_owners = invites.iter().filter(|i| i.role_set().is_owner()).count();

        let page_info = PageInfo {
            total_count: granted_count + invites.len(),
            owner_count: granted_owners + invite_owners,
        };

        let visible_invites = if query.show_invitees && !page_request.is_filled_by(granted_count) {
            invites_on_page(tenant_id, invites, page_request, granted_count, sort_by)
        } else {
            Vec::new()
        };

        let granted_members: Vec<(User, RoleSet)> = page_users
            .into_iter()
            .map(|user| {
                let roles = assignments.get(&user.user_id).cloned().unwrap_or_default();
                (user, roles)
            })
            .collect();

        let page_roles: RoleSet = granted_members
            .iter()
            .chain(&visible_invites)
            .flat_map(|(_, roles)| roles.iter())
            .collect();
        let catalog = self.resolver.resolve(entity, &page_roles).await?;

        let mut users = with_display_roles(granted_members, &catalog);
        self.sorter.sort(&mut users, Some(sort_by));
        users.extend(with_display_roles(visible_invites, &catalog));

        tracing::debug!(
            total_count = page_info.total_count,
            owner_count = page_info.owner_count,
            returned = users.len(),
            "Membership listing assembled"
        );

        Ok(GrantedUserConnection { users, page_info })
    }

    async fn granted_assignments(
        &self,
        entity: &EntityRef,
        role_filter: &[String],
    ) -> Result<RoleAssignments, ServiceError> {
        let result = if role_filter.is_empty() {
            self.authz.users_for_entity(entity).await
        } else {
            self.authz
                .users_for_entity_role_filtered(entity, role_filter)
                .await
        };

        result.map_err(|e| {
            tracing::error!(error = %e, entity = %entity, "Failed to read grants");
            e
        })
    }

    async fn users_by_ids(
        &self,
        tenant_id: &str,
        user_ids: &[String],
        page: PageRequest,
        search_term: Option<&str>,
        sort_by: SortBy,
    ) -> Result<Vec<User>, ServiceError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.datastore
            .users_by_ids(tenant_id, user_ids, page, search_term, sort_by)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, tenant_id = %tenant_id, "Failed to load users");
                e
            })
    }

    /// Invites matching the search term and, when given, the role filter.
    async fn filtered_invites(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        query: &MemberQuery,
    ) -> Result<Vec<Invite>, ServiceError> {
        let role_filter: RoleSet = query.role_filter.iter().map(String::as_str).collect();
        let search_term = query.search_term.as_deref();

        let invites = self
            .datastore
            .invites_for_entity(tenant_id, entity)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, entity = %entity, "Failed to load invites");
                e
            })?;

        Ok(invites
            .into_iter()
            .filter(|invite| invite.matches_search(search_term))
            .filter(|invite| {
                role_filter.is_empty() || invite.role_set().contains_any(role_filter.iter())
            })
            .collect())
    }
}

/// The invitees that fall on the requested page, in listing order.
fn invites_on_page(
    tenant_id: &str,
    invites: Vec<Invite>,
    page_request: PageRequest,
    granted_count: usize,
    sort_by: SortBy,
) -> Vec<(User, RoleSet)> {
    let mut invitees: Vec<(User, RoleSet)> = invites
        .into_iter()
        .map(|invite| (User::invitee(tenant_id, &invite.email), invite.role_set()))
        .collect();
    // Stable, so invitees without the sort key stay in email order.
    invitees.sort_by(|a, b| compare_users(&a.0, &b.0, sort_by));

    let (start, end) = match page_request {
        PageRequest::Unbounded => (0, invitees.len()),
        PageRequest::Bounded { limit, page } => {
            invite_slice_bounds(limit, granted_count, page, invitees.len())
        }
    };

    invitees.drain(start..end).collect()
}

fn with_display_roles(members: Vec<(User, RoleSet)>, catalog: &[Role]) -> Vec<GrantedUser> {
    members
        .into_iter()
        .map(|(user, names)| GrantedUser {
            roles: names
                .iter()
                .filter_map(|name| catalog.iter().find(|role| role.technical_name == name))
                .cloned()
                .collect(),
            user,
        })
        .collect()
}
