use colored::*;
use futures::FutureExt;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

pub async fn run_all_migrations(url: &str) {
    let db = sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed");

    println!("Building the route-selection schema...");
    let schema_manager = SchemaManager::new(&db);

    let migrations = <migration::Migrator as MigratorTrait>::migrations();
    let total = migrations.len();
    for migration in migrations {
        run_migration(&schema_manager, migration).await;
    }

    println!("{} schema step(s) applied.", total);
}

async fn run_migration(schema_manager: &SchemaManager<'_>, migration: Box<dyn MigrationTrait>) {
    // "m202603150003_create_routes" reads better as "create_routes".
    let step = migration
        .name()
        .split_once('_')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_else(|| migration.name().to_string());

    let name_str = format!("Applying {}", step.bold());
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(name_str.len()));
    print!("{}{} ", name_str, dots);
    io::stdout().flush().unwrap();

    let start = Instant::now();
    let result = std::panic::AssertUnwindSafe(migration.up(schema_manager))
        .catch_unwind()
        .await;

    match result {
        Ok(_) => {
            let time_str = format!("({:.2?})", start.elapsed()).dimmed();
            println!("{} {}", "done".green(), time_str);
        }
        Err(_) => {
            println!("{}", "failed".red());
            std::process::exit(1);
        }
    }
}
