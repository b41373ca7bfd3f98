//! Entity for the engine's output: one run (or float-pool slot) per eligible
//! driver per period.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub period_id: i64,
    /// `None` places the driver in the float pool.
    pub route_id: Option<i64>,
    /// Which ranked choice the driver received (1-3). `None` for manual
    /// awards and float-pool placements.
    pub choice_received: Option<i32>,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::selection_period::Entity",
        from = "Column::PeriodId",
        to = "super::selection_period::Column::Id"
    )]
    SelectionPeriod,
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::Id"
    )]
    Route,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl Related<super::selection_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelectionPeriod.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_float_pool(&self) -> bool {
        self.route_id.is_none()
    }

    pub async fn find_by_employee_and_period<C: ConnectionTrait>(
        conn: &C,
        employee_id: i64,
        period_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::EmployeeId.eq(employee_id))
            .filter(Column::PeriodId.eq(period_id))
            .one(conn)
            .await
    }

    pub async fn find_by_route_and_period<C: ConnectionTrait>(
        conn: &C,
        route_id: i64,
        period_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::RouteId.eq(route_id))
            .filter(Column::PeriodId.eq(period_id))
            .one(conn)
            .await
    }

    pub async fn list_for_period<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::PeriodId.eq(period_id))
            .all(conn)
            .await
    }

    pub async fn count_for_period<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
    ) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::PeriodId.eq(period_id))
            .count(conn)
            .await
    }
}
