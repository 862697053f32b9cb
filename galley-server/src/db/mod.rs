//! Database layer
//!
//! Embedded SurrealDB storage. The production binary opens a RocksDB
//! backed instance under the work directory; tests use the in-memory
//! engine through [`DbService::new_memory`].

pub mod models;
pub mod repository;

use std::path::Path;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use shared::error::AppError;

const NAMESPACE: &str = "galley";
const DATABASE: &str = "inventory";

/// Database service holding the embedded SurrealDB handle
#[derive(Debug, Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database at the given path
    pub async fn new(db_path: &Path) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {}", e)))?;
        Self::prepare(db).await
    }

    /// Open a fresh in-memory database (used by tests)
    pub async fn new_memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {}", e)))?;
        Self::prepare(db).await
    }

    async fn prepare(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {}", e)))?;

        define_schema(&db)
            .await
            .map_err(|e| AppError::database(format!("Failed to define schema: {}", e)))?;

        Ok(Self { db })
    }
}

/// Define tables and indexes
///
/// The unique index on `expired_record.product` is the storage-level
/// guard behind the at-most-once register rule: even if two cascades
/// race past the in-process lot lock, the second insert is rejected.
async fn define_schema(db: &Surreal<Db>) -> surrealdb::Result<()> {
    db.query("DEFINE TABLE IF NOT EXISTS product SCHEMALESS")
        .await?
        .check()?;
    db.query("DEFINE TABLE IF NOT EXISTS sale_record SCHEMALESS")
        .await?
        .check()?;
    db.query("DEFINE TABLE IF NOT EXISTS expired_record SCHEMALESS")
        .await?
        .check()?;

    db.query("DEFINE INDEX IF NOT EXISTS product_lot_name ON TABLE product FIELDS lot_name")
        .await?
        .check()?;
    db.query("DEFINE INDEX IF NOT EXISTS product_image_url ON TABLE product FIELDS image_url")
        .await?
        .check()?;
    db.query(
        "DEFINE INDEX IF NOT EXISTS expired_record_product ON TABLE expired_record FIELDS product UNIQUE",
    )
    .await?
    .check()?;

    Ok(())
}
