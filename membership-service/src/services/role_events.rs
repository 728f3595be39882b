//! Role-change notifications.

use std::sync::{Mutex, PoisonError};

use crate::models::{EntityRef, RoleSet};
use crate::services::metrics;

/// A user's effective role set on an entity moved from `old_roles` to
/// `new_roles`. Never emitted when the two sets are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub entity: EntityRef,
    pub user_id: String,
    pub old_roles: RoleSet,
    pub new_roles: RoleSet,
}

/// Fire-and-forget hook; a sink cannot fail the mutation that fed it.
pub trait RoleChangeSink: Send + Sync {
    fn on_role_changed(&self, change: RoleChange);
}

/// Emits an audit log line and bumps `role_changes_total`.
#[derive(Debug, Clone, Default)]
pub struct AuditLogSink;

impl RoleChangeSink for AuditLogSink {
    fn on_role_changed(&self, change: RoleChange) {
        metrics::record_role_change(&change.entity.entity_type);
        tracing::info!(
            target: "audit",
            entity = %change.entity,
            user_id = %change.user_id,
            old_roles = %change.old_roles,
            new_roles = %change.new_roles,
            "Role set changed"
        );
    }
}

/// Keeps every change it receives.
#[derive(Debug, Default)]
pub struct RecordingRoleChangeSink {
    changes: Mutex<Vec<RoleChange>>,
}

impl RecordingRoleChangeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<RoleChange> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoleChangeSink for RecordingRoleChangeSink {
    fn on_role_changed(&self, change: RoleChange) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
    }
}
