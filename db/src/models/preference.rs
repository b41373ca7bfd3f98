//! Entity for driver-submitted ranked run choices.
//!
//! One record per (employee, period). The three choice columns are the
//! storage projection of an ordered sequence of at most three run ids;
//! leading slots are always filled first. `choices()` reconstructs the
//! sequence so callers never branch on individual slots.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

/// Upper bound on ranked choices per submission.
pub const MAX_CHOICES: usize = 3;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "preferences")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub period_id: i64,
    pub first_choice_id: Option<i64>,
    pub second_choice_id: Option<i64>,
    pub third_choice_id: Option<i64>,
    /// Opaque token returned to the driver on submission; reissued on
    /// replacement.
    pub confirmation_number: String,
    pub submitted_at: DateTime<Utc>,
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
        to = "super::selection_period::Column::Id",
        on_delete = "Cascade"
    )]
    SelectionPeriod,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::selection_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelectionPeriod.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Ranked choices in order, without the empty trailing slots.
    pub fn choices(&self) -> Vec<i64> {
        [self.first_choice_id, self.second_choice_id, self.third_choice_id]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Splits an ordered choice list back into the three storage slots.
    pub fn slots(choices: &[i64]) -> (Option<i64>, Option<i64>, Option<i64>) {
        (
            choices.first().copied(),
            choices.get(1).copied(),
            choices.get(2).copied(),
        )
    }

    /// Time-prefixed so confirmation numbers sort in issue order; the random
    /// suffix keeps them unique within a second.
    pub fn generate_confirmation_number() -> String {
        let suffix: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_uppercase();

        format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
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

    pub async fn list_for_period<C: ConnectionTrait>(
        conn: &C,
        period_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::PeriodId.eq(period_id))
            .all(conn)
            .await
    }
}
