use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202603150003_create_routes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("routes"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("run_number")).string().not_null())
                    .col(ColumnDef::new(Alias::new("origin")).string().not_null())
                    .col(ColumnDef::new(Alias::new("destination")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("route_type"))
                            .enumeration(
                                Alias::new("route_type_enum"),
                                vec![Alias::new("singles"), Alias::new("doubles")],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("days")).string().not_null())
                    .col(ColumnDef::new(Alias::new("start_time")).time().not_null())
                    .col(ColumnDef::new(Alias::new("end_time")).time().not_null())
                    .col(ColumnDef::new(Alias::new("distance")).double().not_null())
                    .col(ColumnDef::new(Alias::new("work_time")).double().not_null())
                    .col(
                        ColumnDef::new(Alias::new("rate_type"))
                            .enumeration(
                                Alias::new("rate_type_enum"),
                                vec![
                                    Alias::new("hourly"),
                                    Alias::new("mileage"),
                                    Alias::new("flat_rate"),
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("requires_doubles_endorsement")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("requires_chain_experience")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("active")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("terminal_id")).integer())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("routes"), Alias::new("terminal_id"))
                            .to(Alias::new("terminals"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Run numbers repeat across terminals but not within one.
        manager
            .create_index(
                Index::create()
                    .name("idx_routes_terminal_run_number")
                    .table(Alias::new("routes"))
                    .col(Alias::new("terminal_id"))
                    .col(Alias::new("run_number"))
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("routes")).to_owned())
            .await
    }
}
