//! PostgreSQL datastore for users, invites and role display records.
//!
//! Every call is bounded by the configured search timeout.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::future::Future;
use std::time::Duration;

use crate::models::{EntityRef, Invite, PageRequest, Role, SortBy, User};
use crate::services::{Datastore, RoleStore, ServiceError};

const USER_COLUMNS: &str =
    "user_id, tenant_id, email, first_name, last_name, invitation_pending, created_utc, deleted_utc";

/// `%term%` with LIKE wildcards in `term` escaped by backslash.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn users_query(sort_by: SortBy) -> String {
    let direction = sort_by.direction.as_sql();
    format!(
        r#"
        SELECT {columns}
        FROM users
        WHERE tenant_id = $1
          AND user_id = ANY($2)
          AND deleted_utc IS NULL
          AND ($3::TEXT IS NULL
               OR email ILIKE $3 ESCAPE '\'
               OR first_name ILIKE $3 ESCAPE '\'
               OR last_name ILIKE $3 ESCAPE '\')
        ORDER BY COALESCE({column}, '') COLLATE "C" {direction}, user_id COLLATE "C" ASC
        LIMIT $4 OFFSET $5
        "#,
        columns = USER_COLUMNS,
        column = sort_by.field.column(),
        direction = direction,
    )
}

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    timeout: Duration,
}

impl Database {
    pub fn new(pool: PgPool, search_timeout_ms: u64) -> Self {
        Self {
            pool,
            timeout: Duration::from_millis(search_timeout_ms),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, query: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(error = %e, operation, "Database query failed");
                Err(ServiceError::Database(e))
            }
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                tracing::warn!(operation, timeout_ms, "Database query timed out");
                Err(ServiceError::Timeout {
                    operation,
                    timeout_ms,
                })
            }
        }
    }
}

#[async_trait]
impl Datastore for Database {
    async fn users_by_ids(
        &self,
        tenant_id: &str,
        user_ids: &[String],
        page: PageRequest,
        search_term: Option<&str>,
        sort_by: SortBy,
    ) -> Result<Vec<User>, ServiceError> {
        let sql = users_query(sort_by);
        let pattern = search_term.map(like_pattern);
        let limit = page.limit().map(|l| l as i64);
        let offset = page.offset() as i64;

        self.bounded(
            "users_by_ids",
            sqlx::query_as::<_, User>(&sql)
                .bind(tenant_id)
                .bind(user_ids)
                .bind(pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn invites_for_entity(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
    ) -> Result<Vec<Invite>, ServiceError> {
        self.bounded(
            "invites_for_entity",
            sqlx::query_as::<_, Invite>(
                r#"
                SELECT tenant_id, email, entity_type, entity_id, roles, created_utc, updated_utc
                FROM invites
                WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
                ORDER BY email COLLATE "C"
                "#,
            )
            .bind(tenant_id)
            .bind(&entity.entity_type)
            .bind(&entity.entity_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn find_user_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM users WHERE tenant_id = $1 AND LOWER(email) = LOWER($2) AND deleted_utc IS NULL",
            USER_COLUMNS
        );
        self.bounded(
            "find_user_by_email",
            sqlx::query_as::<_, User>(&sql)
                .bind(tenant_id)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn upsert_invite(&self, invite: &Invite) -> Result<(), ServiceError> {
        if invite.role_set().is_empty() {
            self.delete_invite(&invite.tenant_id, &invite.entity(), &invite.email)
                .await?;
            return Ok(());
        }

        self.bounded(
            "upsert_invite",
            sqlx::query(
                r#"
                INSERT INTO invites (tenant_id, email, entity_type, entity_id, roles, created_utc, updated_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (email, entity_type, entity_id, tenant_id)
                DO UPDATE SET roles = EXCLUDED.roles, updated_utc = EXCLUDED.updated_utc
                "#,
            )
            .bind(&invite.tenant_id)
            .bind(&invite.email)
            .bind(&invite.entity_type)
            .bind(&invite.entity_id)
            .bind(&invite.roles)
            .bind(invite.created_utc)
            .bind(invite.updated_utc)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_invite(
        &self,
        tenant_id: &str,
        entity: &EntityRef,
        email: &str,
    ) -> Result<bool, ServiceError> {
        let result = self
            .bounded(
                "delete_invite",
                sqlx::query(
                    r#"
                    DELETE FROM invites
                    WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
                      AND LOWER(email) = LOWER($4)
                    "#,
                )
                .bind(tenant_id)
                .bind(&entity.entity_type)
                .bind(&entity.entity_id)
                .bind(email)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.bounded(
            "health_check",
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for Database {
    async fn roles_by_technical_names(
        &self,
        entity: &EntityRef,
        names: &[String],
    ) -> Result<Vec<Role>, ServiceError> {
        self.bounded(
            "roles_by_technical_names",
            sqlx::query_as::<_, Role>(
                r#"
                SELECT display_name, technical_name, entity_type, entity_id
                FROM roles
                WHERE entity_type = $1
                  AND technical_name = ANY($2)
                  AND (entity_id = '' OR entity_id = $3)
                "#,
            )
            .bind(&entity.entity_type)
            .bind(names)
            .bind(&entity.entity_id)
            .fetch_all(&self.pool),
        )
        .await
        .map_err(|e| match e {
            ServiceError::Database(e) => ServiceError::RoleStore(anyhow::Error::new(e)),
            other => other,
        })
    }
}
