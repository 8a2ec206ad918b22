use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

// SQLSTATE codes without a dedicated `ErrorKind`.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code().map(|code| code.into_owned());
            match (db.kind(), code.as_deref()) {
                (ErrorKind::UniqueViolation, _) => RepoError::Duplicate {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                },
                (ErrorKind::ForeignKeyViolation, _) | (_, Some(INVALID_TEXT_REPRESENTATION)) => {
                    RepoError::InvalidInput {
                        message: db.message().to_string(),
                    }
                }
                (ErrorKind::NotNullViolation | ErrorKind::CheckViolation, _) => {
                    RepoError::Integrity {
                        message: db.message().to_string(),
                    }
                }
                (_, Some(QUERY_CANCELED)) => RepoError::Timeout,
                _ => RepoError::from_persistence(db.message()),
            }
        }
        other => RepoError::from_persistence(other),
    }
}
