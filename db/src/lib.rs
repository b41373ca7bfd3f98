pub mod models;
pub mod test_utils;

use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::fs;
use std::path::Path;

/// Connects to the SQLite database at `database_path`, creating the file and
/// its parent directory when missing, and applies any pending migrations.
pub async fn connect(database_path: &str) -> DatabaseConnection {
    prepare_sqlite_path(database_path);

    let connection_str = format!("sqlite://{}?mode=rwc", database_path);
    let db = Database::connect(&connection_str)
        .await
        .expect("Failed to connect to the database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

fn prepare_sqlite_path(database_path: &str) {
    let db_path = Path::new(database_path);

    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).expect("Could not create database folder");
            log::info!("Created database directory: {}", parent.display());
        }
    }
}
