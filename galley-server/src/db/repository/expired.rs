//! Expired-stock register repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoResult};
use crate::db::models::ExpiredRecord;
use crate::utils::IdSource;

const TABLE: &str = "expired_record";

#[derive(Clone)]
pub struct ExpiredRecordRepository {
    base: BaseRepository,
    ids: Arc<dyn IdSource>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}

impl ExpiredRecordRepository {
    pub fn new(db: Surreal<Db>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            base: BaseRepository::new(db),
            ids,
        }
    }

    /// Find the register entry for a product, if one exists
    pub async fn find_by_product(&self, product: &RecordId) -> RepoResult<Option<ExpiredRecord>> {
        let product_owned = product.clone();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM expired_record WHERE product = $product LIMIT 1")
            .bind(("product", product_owned))
            .await?;
        let records: Vec<ExpiredRecord> = result.take(0)?;
        Ok(records.into_iter().next())
    }

    /// Register a product as expired, at most once
    ///
    /// If an entry for the product already exists it is returned
    /// unchanged. A lost race against a concurrent insert trips the
    /// unique index on `product`; that case re-reads and returns the
    /// winner's entry instead of surfacing the index error.
    pub async fn create_for(
        &self,
        product: &RecordId,
        recorded_at: DateTime<Utc>,
    ) -> RepoResult<ExpiredRecord> {
        if let Some(existing) = self.find_by_product(product).await? {
            return Ok(existing);
        }

        let record = ExpiredRecord {
            id: None,
            product: product.clone(),
            recorded_at,
        };

        let key = self.ids.next_id();
        let created: Result<Option<ExpiredRecord>, surrealdb::Error> =
            self.base.db().create((TABLE, key)).content(record).await;

        match created {
            Ok(Some(record)) => Ok(record),
            Ok(None) => match self.find_by_product(product).await? {
                Some(existing) => Ok(existing),
                None => Err(super::RepoError::Database(
                    "Failed to create expired record".to_string(),
                )),
            },
            Err(e) => match self.find_by_product(product).await? {
                Some(existing) => Ok(existing),
                None => Err(e.into()),
            },
        }
    }

    /// Find all register entries
    pub async fn find_all(&self) -> RepoResult<Vec<ExpiredRecord>> {
        let records: Vec<ExpiredRecord> = self.base.db().select(TABLE).await?;
        Ok(records)
    }

    /// Count register entries
    pub async fn count(&self) -> RepoResult<usize> {
        let mut result = self
            .base
            .db()
            .query("SELECT count() AS count FROM expired_record GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.count).unwrap_or(0))
    }
}
