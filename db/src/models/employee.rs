use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

/// Represents a driver in the `employees` table.
///
/// `hire_date` is the seniority key; ties are broken by `last_name`, then
/// `employee_number`, so the ordering is total regardless of storage layout.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company-wide unique employee number.
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hire_date: NaiveDate,
    pub doubles_endorsement: bool,
    pub chain_experience: bool,
    pub eligible: bool,
    pub terminal_id: Option<i64>,
    /// Link to the authentication account, owned by the auth layer.
    pub account_id: Option<i64>,
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
}

impl Related<super::terminal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Terminal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DatabaseConnection,
        employee_number: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        hire_date: NaiveDate,
        doubles_endorsement: bool,
        chain_experience: bool,
        terminal_id: Option<i64>,
    ) -> Result<Self, DbErr> {
        let active = ActiveModel {
            employee_number: Set(employee_number.to_string()),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            email: Set(email.to_string()),
            hire_date: Set(hire_date),
            doubles_endorsement: Set(doubles_endorsement),
            chain_experience: Set(chain_experience),
            eligible: Set(true),
            terminal_id: Set(terminal_id),
            account_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        active.insert(db).await
    }

    pub async fn set_eligible(&self, db: &DatabaseConnection, eligible: bool) -> Result<Self, DbErr> {
        let mut active: ActiveModel = self.clone().into();
        active.eligible = Set(eligible);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Drivers who participate in a selection. A terminal-bound period only
    /// considers drivers of that terminal; a system-wide period takes everyone.
    pub async fn eligible_for_terminal<C: ConnectionTrait>(
        conn: &C,
        terminal_id: Option<i64>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = Entity::find().filter(Column::Eligible.eq(true));
        if let Some(terminal_id) = terminal_id {
            query = query.filter(Column::TerminalId.eq(terminal_id));
        }
        query.all(conn).await
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
