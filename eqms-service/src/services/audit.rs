//! Audit trail recorder: fire-and-forget persistence of who-did-what.
//!
//! Write failures are logged and swallowed; the business operation's
//! own outcome is authoritative for the HTTP response.

use async_trait::async_trait;
use eqms_core::error::AppError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::NewAuditLog;
use crate::services::Database;

/// Destination for audit entries. Production writes to PostgreSQL; the
/// in-memory implementation backs tests.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: NewAuditLog) -> Result<(), AppError>;
}

/// Sink writing to the append-only `audit_log` table.
pub struct PgAuditSink {
    db: Database,
}

impl PgAuditSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: NewAuditLog) -> Result<(), AppError> {
        self.db.insert_audit_log(&entry).await
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<NewAuditLog>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<NewAuditLog> {
        self.entries.lock().expect("audit sink lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: NewAuditLog) -> Result<(), AppError> {
        self.entries
            .lock()
            .expect("audit sink lock poisoned")
            .push(entry);
        Ok(())
    }
}

/// Recorder handed to middleware and handlers. `submit` never blocks
/// the response path and never surfaces sink errors.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Queue an entry for persistence after the response has been
    /// produced. Fire-and-forget; failures are logged locally.
    pub fn submit(&self, entry: NewAuditLog) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(entry.clone()).await {
                tracing::error!(
                    error = %e,
                    action = %entry.action,
                    entity_type = ?entry.entity_type,
                    "Failed to write audit log entry"
                );
            }
        });
    }

    /// Explicit helper for creations with full new-value capture.
    pub fn log_create(
        &self,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Option<Uuid>,
        entity_identifier: Option<String>,
        new_values: Option<Value>,
    ) {
        self.submit(
            NewAuditLog::mutation(
                actor_id,
                "create",
                entity_type,
                entity_type,
                entity_id,
                entity_identifier,
                true,
                None,
                201,
            )
            .with_values(None, new_values),
        );
    }

    /// Explicit helper for updates with old/new-value capture.
    #[allow(clippy::too_many_arguments)]
    pub fn log_update(
        &self,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Option<Uuid>,
        entity_identifier: Option<String>,
        old_values: Option<Value>,
        new_values: Option<Value>,
    ) {
        self.submit(
            NewAuditLog::mutation(
                actor_id,
                "update",
                entity_type,
                entity_type,
                entity_id,
                entity_identifier,
                true,
                None,
                200,
            )
            .with_values(old_values, new_values),
        );
    }

    /// Explicit helper for deletions, capturing the removed state.
    pub fn log_delete(
        &self,
        actor_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Option<Uuid>,
        entity_identifier: Option<String>,
        old_values: Option<Value>,
    ) {
        self.submit(
            NewAuditLog::mutation(
                actor_id,
                "delete",
                entity_type,
                entity_type,
                entity_id,
                entity_identifier,
                true,
                None,
                200,
            )
            .with_values(old_values, None),
        );
    }

    /// Explicit helper for failed operations.
    #[allow(clippy::too_many_arguments)]
    pub fn log_failure(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        action_category: &str,
        entity_type: &str,
        entity_identifier: Option<String>,
        error_message: &str,
        status_code: i32,
    ) {
        self.submit(NewAuditLog::mutation(
            actor_id,
            action,
            action_category,
            entity_type,
            None,
            entity_identifier,
            false,
            Some(error_message.to_string()),
            status_code,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(sink: &MemoryAuditSink, expected: usize) {
        for _ in 0..100 {
            if sink.entries().len() >= expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn submit_is_fire_and_forget() {
        let sink = Arc::new(MemoryAuditSink::new());
        let recorder = AuditRecorder::new(sink.clone());

        recorder.log_create(
            Some(Uuid::new_v4()),
            "equipment",
            Some(Uuid::new_v4()),
            Some("TW-0042".to_string()),
            Some(serde_json::json!({"name": "Torque wrench"})),
        );

        drain(&sink, 1).await;
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "create");
        assert!(entries[0].success);
        assert_eq!(entries[0].status_code, 201);
    }

    #[tokio::test]
    async fn failure_entries_carry_the_error() {
        let sink = Arc::new(MemoryAuditSink::new());
        let recorder = AuditRecorder::new(sink.clone());

        recorder.log_failure(
            None,
            "login",
            "auth",
            "user",
            Some("ghost@example.com".to_string()),
            "Invalid credentials",
            401,
        );

        drain(&sink, 1).await;
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
        assert_eq!(entries[0].error_message.as_deref(), Some("Invalid credentials"));
        assert_eq!(entries[0].status_code, 401);
    }
}
