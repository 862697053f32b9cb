//! Sale ledger repository

use std::sync::Arc;

use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, strip_table_prefix};
use crate::db::models::SaleRecord;
use crate::utils::IdSource;

const TABLE: &str = "sale_record";

#[derive(Clone)]
pub struct SaleRepository {
    base: BaseRepository,
    ids: Arc<dyn IdSource>,
}

impl SaleRepository {
    pub fn new(db: Surreal<Db>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            base: BaseRepository::new(db),
            ids,
        }
    }

    /// Append a consumption event to the ledger
    pub async fn create(&self, record: SaleRecord) -> RepoResult<SaleRecord> {
        let key = self.ids.next_id();
        let created: Option<SaleRecord> =
            self.base.db().create((TABLE, key)).content(record).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create sale record".to_string()))
    }

    /// Find a ledger entry by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<SaleRecord>> {
        let pure_id = strip_table_prefix(TABLE, id);
        let record: Option<SaleRecord> = self.base.db().select((TABLE, pure_id)).await?;
        Ok(record)
    }

    /// Find every ledger entry for a product
    pub async fn find_by_product(&self, product: &RecordId) -> RepoResult<Vec<SaleRecord>> {
        let product_owned = product.clone();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM sale_record WHERE product = $product")
            .bind(("product", product_owned))
            .await?;
        let records: Vec<SaleRecord> = result.take(0)?;
        Ok(records)
    }

    /// Find all ledger entries
    pub async fn find_all(&self) -> RepoResult<Vec<SaleRecord>> {
        let records: Vec<SaleRecord> = self.base.db().select(TABLE).await?;
        Ok(records)
    }
}
