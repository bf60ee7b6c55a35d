//! Test database setup
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};

/// Opens a fresh in-memory SQLite database with the full schema.
///
/// Each call gets its own database, so tests can run in parallel. The pool is
/// limited to one connection because every connection to `sqlite::memory:`
/// would otherwise see a different, empty database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = surveyor::db::connect("sqlite::memory:", 1).await?;
    surveyor::db::create_schema(&db).await?;
    Ok(db)
}
