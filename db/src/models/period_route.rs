//! Join table linking a selection period to its run catalog.
//!
//! A run that is not in a period's catalog cannot be chosen or awarded in
//! that period.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "period_routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub route_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::selection_period::Entity",
        from = "Column::PeriodId",
        to = "super::selection_period::Column::Id",
        on_delete = "Cascade"
    )]
    SelectionPeriod,
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::Id",
        on_delete = "Cascade"
    )]
    Route,
}

impl Related<super::selection_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelectionPeriod.def()
    }
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn add<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
        route_id: i64,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            period_id: Set(period_id),
            route_id: Set(route_id),
        };
        active.insert(conn).await
    }

    pub async fn catalog_ids<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        let rows = Entity::find()
            .filter(Column::PeriodId.eq(period_id))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.route_id).collect())
    }

    /// Active catalog runs for a period, as full route models.
    pub async fn catalog_routes<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
    ) -> Result<Vec<super::route::Model>, DbErr> {
        use super::route;

        let ids = Self::catalog_ids(conn, period_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        route::Entity::find()
            .filter(route::Column::Id.is_in(ids))
            .filter(route::Column::Active.eq(true))
            .all(conn)
            .await
    }

    pub async fn replace_catalog<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
        route_ids: &[i64],
    ) -> Result<(), DbErr> {
        Entity::delete_many()
            .filter(Column::PeriodId.eq(period_id))
            .exec(conn)
            .await?;

        for route_id in route_ids {
            Self::add(conn, period_id, *route_id).await?;
        }

        Ok(())
    }
}
