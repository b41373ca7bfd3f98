//! Entity and lifecycle table for selection periods.
//!
//! A period moves through `upcoming -> open -> closed -> processing ->
//! completed`. Every action is checked against the transition table at the
//! service boundary; nothing deeper in the business logic changes a status.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "selection_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Terminal the selection is scoped to; `None` means system-wide.
    pub terminal_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Status,
    /// How many ranked choices a driver must submit (1-3).
    pub required_selections: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::terminal::Entity",
        from = "Column::TerminalId",
        to = "super::terminal::Column::Id"
    )]
    Terminal,
    #[sea_orm(has_many = "super::preference::Entity")]
    Preferences,
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
    #[sea_orm(has_many = "super::period_route::Entity")]
    PeriodRoutes,
}

impl Related<super::terminal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Terminal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_status_enum")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Everything an actor can ask a period to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum PeriodAction {
    Open,
    Submit,
    Close,
    Process,
    Complete,
    Abort,
    Notify,
    NotifyAssign,
    Edit,
    Delete,
}

impl Status {
    /// The transition table. `Some(next)` is the status after the action;
    /// `None` means the action is illegal in this state. Actions that keep
    /// the period in place (submit, notify) return the current status.
    pub fn next(self, action: PeriodAction) -> Option<Status> {
        match (self, action) {
            (Status::Upcoming, PeriodAction::Open) => Some(Status::Open),
            (Status::Upcoming, PeriodAction::Notify) => Some(Status::Upcoming),
            (Status::Open, PeriodAction::Notify) => Some(Status::Open),
            (Status::Open, PeriodAction::Submit) => Some(Status::Open),
            (Status::Open, PeriodAction::Close) => Some(Status::Closed),
            (Status::Closed, PeriodAction::Process) => Some(Status::Processing),
            (Status::Processing, PeriodAction::Complete) => Some(Status::Completed),
            (Status::Processing, PeriodAction::Abort) => Some(Status::Closed),
            (Status::Completed, PeriodAction::NotifyAssign) => Some(Status::Completed),
            // Name/description stay editable until the period is frozen.
            (status, PeriodAction::Edit) if status != Status::Completed => Some(status),
            // Deletion never leaves this state; the service checks that no
            // assignments would be orphaned before acting on it.
            (Status::Upcoming, PeriodAction::Delete) => Some(Status::Upcoming),
            (Status::Closed, PeriodAction::Delete) => Some(Status::Closed),
            _ => None,
        }
    }
}

impl Model {
    pub async fn set_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        status: Status,
    ) -> Result<Self, DbErr> {
        let mut active: ActiveModel = self.clone().into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(conn).await
    }
}
