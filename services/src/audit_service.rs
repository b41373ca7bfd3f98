use crate::auth::Principal;
use crate::error::{SelectionError, SelectionResult};
use db::models::audit_event::{AuditAction, Model as AuditEvent};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};

/// Thin facade over the append-only audit log.
pub struct AuditService;

impl AuditService {
    /// Appends one event on the caller's connection. Pass the open
    /// transaction so the audit row shares the business write's fate.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        action: AuditAction,
        resource: &str,
        details: &str,
    ) -> Result<AuditEvent, DbErr> {
        AuditEvent::record(conn, user_id, action, resource, details).await
    }

    /// Records an error surfaced by a mutating entry point. The business
    /// transaction has already rolled back, so this write stands on its own
    /// and a failure to record it can only be logged.
    pub(crate) async fn record_rejection(
        db: &DatabaseConnection,
        user_id: i64,
        action: AuditAction,
        resource: &str,
        error: &SelectionError,
    ) {
        if let Err(audit_err) =
            AuditEvent::record(db, user_id, action, resource, &error.to_string()).await
        {
            tracing::error!("failed to record rejection event: {audit_err}");
        }
    }

    /// Newest-first scan, optionally restricted to one initiating user.
    pub async fn recent(
        db: &DatabaseConnection,
        principal: &Principal,
        limit: u64,
        user_id: Option<i64>,
    ) -> SelectionResult<Vec<AuditEvent>> {
        principal.require_manager()?;
        Ok(AuditEvent::recent(db, limit, user_id).await?)
    }
}
