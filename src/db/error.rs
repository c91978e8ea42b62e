use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(ref db_err) => {
                if db_err.is_unique_violation() {
                    DatabaseError::Duplicate(db_err.message().to_string())
                } else if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                    DatabaseError::Constraint(db_err.message().to_string())
                } else {
                    DatabaseError::Sqlx(err)
                }
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}
