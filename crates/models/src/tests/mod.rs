use migration::MigratorTrait;
use sea_orm::DatabaseConnection;

/// Database connection and configuration tests
pub mod db_tests;

/// CRUD operations tests for the entities
pub mod crud_tests;

/// Connect and migrate, or `None` when tests should skip (SKIP_DB_TESTS set or no database).
pub async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let db = match crate::db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}
