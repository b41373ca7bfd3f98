use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202603150001_create_terminals::Migration),
            Box::new(migrations::m202603150002_create_employees::Migration),
            Box::new(migrations::m202603150003_create_routes::Migration),
            Box::new(migrations::m202603150004_create_selection_periods::Migration),
            Box::new(migrations::m202603150005_create_period_routes::Migration),
            Box::new(migrations::m202603150006_create_preferences::Migration),
            Box::new(migrations::m202603150007_create_assignments::Migration),
            Box::new(migrations::m202603150008_create_audit_events::Migration),
        ]
    }
}
