//! Database connection and schema bootstrap.

use crate::orm::{
    choices, groups, permission_grants, questions, sessions, survey_assignments,
    survey_responses, surveys, user_groups, users,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

/// Backs the one-response-per-question rule against concurrent submissions.
const RESPONSE_UNIQUE_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     idx_survey_responses_assignment_question \
     ON survey_responses (survey_assignment_id, question_id)";

/// Opens a connection pool.
///
/// An in-memory SQLite url (`sqlite::memory:`) must use a single connection,
/// otherwise every pooled connection sees its own empty database.
pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(max_connections)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Creates every table from the entity definitions if missing.
/// Tables are created parents first so foreign keys resolve.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, sessions::Entity).await?;
    create_table(db, &schema, groups::Entity).await?;
    create_table(db, &schema, user_groups::Entity).await?;
    create_table(db, &schema, permission_grants::Entity).await?;
    create_table(db, &schema, surveys::Entity).await?;
    create_table(db, &schema, questions::Entity).await?;
    create_table(db, &schema, choices::Entity).await?;
    create_table(db, &schema, survey_assignments::Entity).await?;
    create_table(db, &schema, survey_responses::Entity).await?;

    db.execute(Statement::from_string(
        backend,
        RESPONSE_UNIQUE_INDEX.to_owned(),
    ))
    .await?;

    log::info!("Database schema is up to date");
    Ok(())
}

/// True when a write failed on a unique index or key. Both backends only
/// report this through the message text.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("unique") || message.contains("duplicate")
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unique_violation() {
        assert!(is_unique_violation(&DbErr::Exec(
            "error returned from database: UNIQUE constraint failed: survey_responses.survey_assignment_id, survey_responses.question_id".to_owned()
        )));
        assert!(is_unique_violation(&DbErr::Exec(
            "duplicate key value violates unique constraint \"idx_survey_responses_assignment_question\"".to_owned()
        )));
        assert!(!is_unique_violation(&DbErr::Conn("connection refused".to_owned())));
    }
}
