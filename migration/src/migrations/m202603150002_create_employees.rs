use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202603150002_create_employees"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("employees"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("employee_number")).string().not_null().unique_key())
                    .col(ColumnDef::new(Alias::new("first_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("last_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("email")).string().not_null())
                    .col(ColumnDef::new(Alias::new("hire_date")).date().not_null())
                    .col(ColumnDef::new(Alias::new("doubles_endorsement")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("chain_experience")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("eligible")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("terminal_id")).integer())
                    .col(ColumnDef::new(Alias::new("account_id")).integer())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("employees"), Alias::new("terminal_id"))
                            .to(Alias::new("terminals"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Backs the seniority sort used by the assignment engine.
        manager
            .create_index(
                Index::create()
                    .name("idx_employees_seniority")
                    .table(Alias::new("employees"))
                    .col(Alias::new("hire_date"))
                    .col(Alias::new("last_name"))
                    .col(Alias::new("employee_number"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("employees")).to_owned())
            .await
    }
}
