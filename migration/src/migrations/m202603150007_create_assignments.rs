use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202603150007_create_assignments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("assignments"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("employee_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("period_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("route_id")).integer())
                    .col(ColumnDef::new(Alias::new("choice_received")).integer())
                    .col(ColumnDef::new(Alias::new("effective_date")).date().not_null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("assignments"), Alias::new("employee_id"))
                            .to(Alias::new("employees"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("assignments"), Alias::new("period_id"))
                            .to(Alias::new("selection_periods"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("assignments"), Alias::new("route_id"))
                            .to(Alias::new("routes"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assignments_employee_period")
                    .table(Alias::new("assignments"))
                    .col(Alias::new("employee_id"))
                    .col(Alias::new("period_id"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Backs the one-driver-per-run check.
        manager
            .create_index(
                Index::create()
                    .name("idx_assignments_period_route")
                    .table(Alias::new("assignments"))
                    .col(Alias::new("period_id"))
                    .col(Alias::new("route_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("assignments")).to_owned())
            .await
    }
}
