//! Entity and business logic for managing runs.
//!
//! A route (a "run" on the driver-facing side) carries its schedule, pay
//! basis, and the qualification flags the assignment engine checks before
//! awarding it.

use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "routes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Run number, unique within a terminal.
    pub run_number: String,
    pub origin: String,
    pub destination: String,
    pub route_type: RouteType,
    /// Operating days, e.g. "Mon-Fri".
    pub days: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub distance: f64,
    pub work_time: f64,
    pub rate_type: RateType,
    pub requires_doubles_endorsement: bool,
    pub requires_chain_experience: bool,
    pub active: bool,
    pub terminal_id: Option<i64>,
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
}

impl Related<super::terminal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Terminal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "route_type_enum")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RouteType {
    #[sea_orm(string_value = "singles")]
    Singles,

    #[sea_orm(string_value = "doubles")]
    Doubles,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "rate_type_enum")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RateType {
    #[sea_orm(string_value = "hourly")]
    Hourly,

    #[sea_orm(string_value = "mileage")]
    Mileage,

    #[sea_orm(string_value = "flat_rate")]
    FlatRate,
}

/// Parameters for creating or editing a run.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub run_number: String,
    pub origin: String,
    pub destination: String,
    pub route_type: RouteType,
    pub days: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub distance: f64,
    pub work_time: f64,
    pub rate_type: RateType,
    pub requires_doubles_endorsement: bool,
    pub requires_chain_experience: bool,
    pub terminal_id: Option<i64>,
}

impl Model {
    pub async fn create(db: &DatabaseConnection, params: NewRoute) -> Result<Self, DbErr> {
        Self::validate_requirements(&params)?;

        let active = ActiveModel {
            run_number: Set(params.run_number),
            origin: Set(params.origin),
            destination: Set(params.destination),
            route_type: Set(params.route_type),
            days: Set(params.days),
            start_time: Set(params.start_time),
            end_time: Set(params.end_time),
            distance: Set(params.distance),
            work_time: Set(params.work_time),
            rate_type: Set(params.rate_type),
            requires_doubles_endorsement: Set(params.requires_doubles_endorsement),
            requires_chain_experience: Set(params.requires_chain_experience),
            active: Set(true),
            terminal_id: Set(params.terminal_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        active.insert(db).await
    }

    pub async fn edit(db: &DatabaseConnection, id: i64, params: NewRoute) -> Result<Self, DbErr> {
        Self::validate_requirements(&params)?;

        let mut route: ActiveModel = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Route not found".to_string()))?
            .into();

        route.run_number = Set(params.run_number);
        route.origin = Set(params.origin);
        route.destination = Set(params.destination);
        route.route_type = Set(params.route_type);
        route.days = Set(params.days);
        route.start_time = Set(params.start_time);
        route.end_time = Set(params.end_time);
        route.distance = Set(params.distance);
        route.work_time = Set(params.work_time);
        route.rate_type = Set(params.rate_type);
        route.requires_doubles_endorsement = Set(params.requires_doubles_endorsement);
        route.requires_chain_experience = Set(params.requires_chain_experience);
        route.terminal_id = Set(params.terminal_id);
        route.updated_at = Set(Utc::now());

        route.update(db).await
    }

    pub async fn deactivate(&self, db: &DatabaseConnection) -> Result<Self, DbErr> {
        let mut active: ActiveModel = self.clone().into();
        active.active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn find_by_run_number(
        db: &DatabaseConnection,
        terminal_id: Option<i64>,
        run_number: &str,
    ) -> Result<Option<Self>, DbErr> {
        let mut query = Entity::find().filter(Column::RunNumber.eq(run_number));
        if let Some(terminal_id) = terminal_id {
            query = query.filter(Column::TerminalId.eq(terminal_id));
        }
        query.one(db).await
    }

    // Doubles runs can never be driven without the endorsement.
    fn validate_requirements(params: &NewRoute) -> Result<(), DbErr> {
        if params.route_type == RouteType::Doubles && !params.requires_doubles_endorsement {
            return Err(DbErr::Custom(
                "doubles runs must require the doubles endorsement".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_route(run_number: &str) -> NewRoute {
    use chrono::NaiveTime;

    NewRoute {
        run_number: run_number.to_string(),
        origin: "Portland".to_string(),
        destination: "Seattle".to_string(),
        route_type: RouteType::Singles,
        days: "Mon-Fri".to_string(),
        start_time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        distance: 174.0,
        work_time: 8.5,
        rate_type: RateType::Mileage,
        requires_doubles_endorsement: false,
        requires_chain_experience: false,
        terminal_id: None,
    }
}
