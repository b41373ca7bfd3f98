use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202603150005_create_period_routes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("period_routes"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("period_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("route_id")).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(Alias::new("period_id"))
                            .col(Alias::new("route_id")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("period_routes"), Alias::new("period_id"))
                            .to(Alias::new("selection_periods"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("period_routes"), Alias::new("route_id"))
                            .to(Alias::new("routes"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("period_routes")).to_owned())
            .await
    }
}
