//! Adapters for the relationship-based authorization service.
//!
//! Grants are tuples `(user:{id}, {role}, {entity_type}:{entity_id})`. The
//! query side answers "who holds which roles on this entity", the mutation
//! side replaces one user's role set on an entity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedRequestExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::instrument;

use crate::config::AuthzConfig;
use crate::models::{EntityRef, RoleSet};
use crate::services::ServiceError;

/// `user_id -> roles` for one entity.
pub type RoleAssignments = HashMap<String, RoleSet>;

const USER_PREFIX: &str = "user:";
const READ_PAGE_SIZE: u32 = 100;

#[async_trait]
pub trait AuthorizationQuery: Send + Sync {
    async fn users_for_entity(&self, entity: &EntityRef) -> Result<RoleAssignments, ServiceError>;

    /// Users holding at least one of `role_filter`, with their complete role
    /// sets.
    async fn users_for_entity_role_filtered(
        &self,
        entity: &EntityRef,
        role_filter: &[String],
    ) -> Result<RoleAssignments, ServiceError>;

    async fn roles_for_user(
        &self,
        entity: &EntityRef,
        user_id: &str,
    ) -> Result<RoleSet, ServiceError> {
        let mut assignments = self.users_for_entity(entity).await?;
        Ok(assignments.remove(user_id).unwrap_or_default())
    }
}

#[async_trait]
pub trait AuthorizationMutation: Send + Sync {
    /// Replace the user's roles on the entity with `roles`. Writing a tuple
    /// that already exists is not an error.
    async fn write_roles(
        &self,
        entity: &EntityRef,
        user_id: &str,
        roles: &RoleSet,
    ) -> Result<(), ServiceError>;
}

fn filter_assignments(assignments: RoleAssignments, role_filter: &[String]) -> RoleAssignments {
    assignments
        .into_iter()
        .filter(|(_, roles)| roles.contains_any(role_filter.iter().map(String::as_str)))
        .collect()
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TupleKey {
    user: String,
    relation: String,
    object: String,
}

impl TupleKey {
    fn grant(entity: &EntityRef, user_id: &str, role: &str) -> Self {
        Self {
            user: format!("{}{}", USER_PREFIX, user_id),
            relation: role.to_string(),
            object: entity.object(),
        }
    }
}

#[derive(Serialize)]
struct ReadTupleKey {
    object: String,
}

#[derive(Serialize)]
struct ReadRequest {
    tuple_key: ReadTupleKey,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    continuation_token: Option<String>,
}

#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    tuples: Vec<Tuple>,
    #[serde(default)]
    continuation_token: String,
}

#[derive(Deserialize)]
struct Tuple {
    key: TupleKey,
}

#[derive(Serialize)]
struct TupleKeys {
    tuple_keys: Vec<TupleKey>,
}

#[derive(Serialize, Default)]
struct WriteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<TupleKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletes: Option<TupleKeys>,
}

impl WriteRequest {
    fn new(writes: Vec<TupleKey>, deletes: Vec<TupleKey>) -> Self {
        Self {
            writes: (!writes.is_empty()).then_some(TupleKeys { tuple_keys: writes }),
            deletes: (!deletes.is_empty()).then_some(TupleKeys { tuple_keys: deletes }),
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
enum WriteStatus {
    Applied,
    Duplicate,
}

/// Rejections for writing an existing tuple or deleting a missing one.
fn is_duplicate_write(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already exists")
        || message.contains("did not exist")
        || message.contains("does not exist")
}

/// Client for an OpenFGA-compatible relationship API.
#[derive(Clone)]
pub struct FgaClient {
    http: reqwest::Client,
    api_url: String,
    store_id: String,
    api_token: Option<String>,
    timeout_ms: u64,
}

impl FgaClient {
    pub fn new(config: &AuthzConfig) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        tracing::info!(
            api_url = %config.api_url,
            store_id = %config.store_id,
            "Authorization client configured"
        );

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            store_id: config.store_id.clone(),
            api_token: config.api_token.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/stores/{}/{}", self.api_url, self.store_id, action)
    }

    fn post(&self, action: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(self.endpoint(action)).with_trace_context();
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            tracing::warn!(timeout_ms = self.timeout_ms, "Authorization service timed out");
            ServiceError::Timeout {
                operation: "authorization",
                timeout_ms: self.timeout_ms,
            }
        } else {
            tracing::error!(error = %e, "Authorization service request failed");
            ServiceError::Authorization(anyhow::anyhow!("Request failed: {}", e))
        }
    }

    async fn read_all(&self, entity: &EntityRef) -> Result<RoleAssignments, ServiceError> {
        let mut assignments = RoleAssignments::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let body = ReadRequest {
                tuple_key: ReadTupleKey {
                    object: entity.object(),
                },
                page_size: READ_PAGE_SIZE,
                continuation_token: continuation_token.take(),
            };

            let response = self
                .post("read")
                .json(&body)
                .send()
                .await
                .map_err(|e| self.send_error(e))?;

            let status = response.status();
            if !status.is_success() {
                let error = response.json::<ErrorBody>().await.unwrap_or_default();
                tracing::error!(
                    status = %status,
                    code = %error.code,
                    message = %error.message,
                    entity = %entity,
                    "Authorization read rejected"
                );
                return Err(ServiceError::Authorization(anyhow::anyhow!(
                    "Read failed with status {}: {}",
                    status,
                    error.message
                )));
            }

            let page: ReadResponse = response.json().await.map_err(|e| self.send_error(e))?;

            for tuple in page.tuples {
                // Usersets such as `team:x#member` are not direct grants.
                let Some(user_id) = tuple.key.user.strip_prefix(USER_PREFIX) else {
                    continue;
                };
                assignments
                    .entry(user_id.to_string())
                    .or_default()
                    .insert(tuple.key.relation);
            }

            if page.continuation_token.is_empty() {
                break;
            }
            continuation_token = Some(page.continuation_token);
        }

        Ok(assignments)
    }

    async fn write(&self, body: &WriteRequest) -> Result<WriteStatus, ServiceError> {
        let response = self
            .post("write")
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(WriteStatus::Applied);
        }

        let error = response.json::<ErrorBody>().await.unwrap_or_default();
        if status.is_client_error() && is_duplicate_write(&error.message) {
            return Ok(WriteStatus::Duplicate);
        }

        tracing::error!(
            status = %status,
            code = %error.code,
            message = %error.message,
            "Authorization write rejected"
        );
        Err(ServiceError::Authorization(anyhow::anyhow!(
            "Write failed with status {}: {}",
            status,
            error.message
        )))
    }
}

#[async_trait]
impl AuthorizationQuery for FgaClient {
    #[instrument(skip(self, entity), fields(entity = %entity))]
    async fn users_for_entity(&self, entity: &EntityRef) -> Result<RoleAssignments, ServiceError> {
        self.read_all(entity).await
    }

    #[instrument(skip(self, entity), fields(entity = %entity))]
    async fn users_for_entity_role_filtered(
        &self,
        entity: &EntityRef,
        role_filter: &[String],
    ) -> Result<RoleAssignments, ServiceError> {
        let assignments = self.read_all(entity).await?;
        Ok(filter_assignments(assignments, role_filter))
    }
}

#[async_trait]
impl AuthorizationMutation for FgaClient {
    #[instrument(skip(self, entity, roles), fields(entity = %entity, roles = %roles))]
    async fn write_roles(
        &self,
        entity: &EntityRef,
        user_id: &str,
        roles: &RoleSet,
    ) -> Result<(), ServiceError> {
        let current = self.roles_for_user(entity, user_id).await?;

        let writes: Vec<TupleKey> = roles
            .difference(&current)
            .map(|role| TupleKey::grant(entity, user_id, role))
            .collect();
        let deletes: Vec<TupleKey> = current
            .difference(roles)
            .map(|role| TupleKey::grant(entity, user_id, role))
            .collect();

        if writes.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let request = WriteRequest::new(writes, deletes);
        if self.write(&request).await? == WriteStatus::Applied {
            return Ok(());
        }

        // A concurrent writer got there first and the batch was rejected as a
        // whole. Apply tuple by tuple so only the conflicting ones are skipped.
        tracing::debug!(user_id = %user_id, "Duplicate tuple in batch, retrying individually");
        let WriteRequest { writes, deletes } = request;
        for key in writes.into_iter().flat_map(|k| k.tuple_keys) {
            self.write(&WriteRequest::new(vec![key], Vec::new())).await?;
        }
        for key in deletes.into_iter().flat_map(|k| k.tuple_keys) {
            self.write(&WriteRequest::new(Vec::new(), vec![key])).await?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Authorization graph held in process memory.
#[derive(Default)]
pub struct InMemoryAuthz {
    grants: Mutex<HashMap<EntityRef, RoleAssignments>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryAuthz {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a grant without counting it as a write.
    pub fn grant(&self, entity: &EntityRef, user_id: &str, roles: RoleSet) {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity.clone())
            .or_default()
            .insert(user_id.to_string(), roles);
    }

    /// Make every subsequent call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `write_roles` calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::Authorization(anyhow::anyhow!(
                "authorization service unavailable"
            )));
        }
        Ok(())
    }

    fn snapshot(&self, entity: &EntityRef) -> RoleAssignments {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuthorizationQuery for InMemoryAuthz {
    async fn users_for_entity(&self, entity: &EntityRef) -> Result<RoleAssignments, ServiceError> {
        self.check_available()?;
        Ok(self.snapshot(entity))
    }

    async fn users_for_entity_role_filtered(
        &self,
        entity: &EntityRef,
        role_filter: &[String],
    ) -> Result<RoleAssignments, ServiceError> {
        self.check_available()?;
        Ok(filter_assignments(self.snapshot(entity), role_filter))
    }
}

#[async_trait]
impl AuthorizationMutation for InMemoryAuthz {
    async fn write_roles(
        &self,
        entity: &EntityRef,
        user_id: &str,
        roles: &RoleSet,
    ) -> Result<(), ServiceError> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
        let assignments = grants.entry(entity.clone()).or_default();
        if roles.is_empty() {
            assignments.remove(user_id);
        } else {
            assignments.insert(user_id.to_string(), roles.clone());
        }
        Ok(())
    }
}
