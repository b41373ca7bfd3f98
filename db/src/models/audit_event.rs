//! Append-only audit log.
//!
//! Every state transition, preference mutation, assignment event, and
//! notification attempt writes exactly one row here, inside the business
//! transaction where one exists. Rows are never updated or deleted.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Initiating principal; 0 for system-originated events.
    pub user_id: i64,
    pub action: AuditAction,
    /// Resource tag, e.g. "period:7" or "preference:3:7".
    pub resource: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef implemented")
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "audit_action_enum")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AuditAction {
    #[sea_orm(string_value = "period_created")]
    PeriodCreated,
    #[sea_orm(string_value = "period_opened")]
    PeriodOpened,
    #[sea_orm(string_value = "period_closed")]
    PeriodClosed,
    #[sea_orm(string_value = "period_processed")]
    PeriodProcessed,
    #[sea_orm(string_value = "period_completed")]
    PeriodCompleted,
    #[sea_orm(string_value = "period_aborted")]
    PeriodAborted,
    #[sea_orm(string_value = "period_updated")]
    PeriodUpdated,
    #[sea_orm(string_value = "period_deleted")]
    PeriodDeleted,
    #[sea_orm(string_value = "period_rejected")]
    PeriodRejected,
    #[sea_orm(string_value = "preference_submitted")]
    PreferenceSubmitted,
    #[sea_orm(string_value = "preference_rejected")]
    PreferenceRejected,
    #[sea_orm(string_value = "assignment_manual")]
    AssignmentManual,
    #[sea_orm(string_value = "assignment_rejected")]
    AssignmentRejected,
    #[sea_orm(string_value = "notification_sent")]
    NotificationSent,
    #[sea_orm(string_value = "notification_failed")]
    NotificationFailed,
}

impl Model {
    /// Appends one event. Callers holding a transaction pass it here so the
    /// audit row commits or rolls back with the business write.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        action: AuditAction,
        resource: &str,
        details: &str,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            user_id: Set(user_id),
            action: Set(action),
            resource: Set(resource.to_string()),
            details: Set(details.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        active.insert(conn).await
    }

    /// Newest first; commit order is preserved by the (created_at, id) sort.
    pub async fn recent<C: ConnectionTrait>(
        conn: &C,
        limit: u64,
        user_id: Option<i64>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = Entity::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit);

        if let Some(user_id) = user_id {
            query = query.filter(Column::UserId.eq(user_id));
        }

        query.all(conn).await
    }
}
