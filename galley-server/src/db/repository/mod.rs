//! Repository Module
//!
//! Provides CRUD operations for the SurrealDB tables.

pub mod expired;
pub mod product;
pub mod sale;

pub use expired::ExpiredRecordRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

use shared::error::AppError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => {
                AppError::with_message(shared::error::ErrorCode::NotFound, msg)
            }
            RepoError::Duplicate(msg) => {
                AppError::with_message(shared::error::ErrorCode::AlreadyExists, msg)
            }
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: "table:id" everywhere
// =============================================================================
//
// All ids go through surrealdb::RecordId:
//   - parse:     let id: RecordId = "product:abc".parse()?;
//   - construct: let id = RecordId::from_table_key("product", "abc");
//   - table:     id.table()
//   - plain key: id.key().to_string()
//   - CRUD:      db.select(id) / db.delete(id) take RecordId directly
//
// Record keys come from an injected IdSource and are dash-free hex, so
// they never need angle-bracket escaping in query strings.

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

/// Strip a "table:" prefix from an id if present
pub(crate) fn strip_table_prefix<'a>(table: &str, id: &'a str) -> &'a str {
    id.strip_prefix(table)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_table_prefix() {
        assert_eq!(strip_table_prefix("product", "product:abc"), "abc");
        assert_eq!(strip_table_prefix("product", "abc"), "abc");
        assert_eq!(strip_table_prefix("product", "sale_record:abc"), "sale_record:abc");
    }

    #[test]
    fn test_repo_error_to_app_error() {
        let err: AppError = RepoError::NotFound("Product x not found".into()).into();
        assert_eq!(err.code, shared::error::ErrorCode::NotFound);

        let err: AppError = RepoError::Database("boom".into()).into();
        assert_eq!(err.code, shared::error::ErrorCode::DatabaseError);
    }
}
