use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202603150006_create_preferences"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("preferences"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("employee_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("period_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("first_choice_id")).integer())
                    .col(ColumnDef::new(Alias::new("second_choice_id")).integer())
                    .col(ColumnDef::new(Alias::new("third_choice_id")).integer())
                    .col(ColumnDef::new(Alias::new("confirmation_number")).string().not_null())
                    .col(ColumnDef::new(Alias::new("submitted_at")).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("preferences"), Alias::new("employee_id"))
                            .to(Alias::new("employees"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("preferences"), Alias::new("period_id"))
                            .to(Alias::new("selection_periods"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one submission per employee per period.
        manager
            .create_index(
                Index::create()
                    .name("idx_preferences_employee_period")
                    .table(Alias::new("preferences"))
                    .col(Alias::new("employee_id"))
                    .col(Alias::new("period_id"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Engine scans all submissions for one period.
        manager
            .create_index(
                Index::create()
                    .name("idx_preferences_period")
                    .table(Alias::new("preferences"))
                    .col(Alias::new("period_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("preferences")).to_owned())
            .await
    }
}
