//! Product Repository

use std::sync::Arc;

use serde::Serialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, strip_table_prefix};
use crate::db::models::{Product, ProductCreate, ProductStatus};
use crate::utils::IdSource;

const TABLE: &str = "product";

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
    ids: Arc<dyn IdSource>,
}

/// Mutable product fields, used for merge updates so the record id is
/// never part of the payload
#[derive(Debug, Serialize)]
struct ProductPatch {
    product_code: String,
    name: String,
    lot_name: String,
    expiry_date: chrono::NaiveDate,
    quantity: u32,
    image_url: Option<String>,
    status: ProductStatus,
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    status: ProductStatus,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            base: BaseRepository::new(db),
            ids,
        }
    }

    /// Find product by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let pure_id = strip_table_prefix(TABLE, id);
        let product: Option<Product> = self.base.db().select((TABLE, pure_id)).await?;
        Ok(product)
    }

    /// Find the product carrying a given image URL
    pub async fn find_by_image_url(&self, url: &str) -> RepoResult<Option<Product>> {
        let url_owned = url.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM product WHERE image_url = $url LIMIT 1")
            .bind(("url", url_owned))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products.into_iter().next())
    }

    /// Find every product in a lot
    pub async fn find_by_lot(&self, lot_name: &str) -> RepoResult<Vec<Product>> {
        let lot_owned = lot_name.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM product WHERE lot_name = $lot")
            .bind(("lot", lot_owned))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products)
    }

    /// Find all products
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self.base.db().select(TABLE).await?;
        Ok(products)
    }

    /// Insert a new product with a freshly generated key
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        if data.name.trim().is_empty() {
            return Err(RepoError::Validation("Product name is required".into()));
        }
        if data.lot_name.trim().is_empty() {
            return Err(RepoError::Validation("Lot name is required".into()));
        }

        let product = Product {
            id: None,
            product_code: data.product_code,
            name: data.name,
            lot_name: data.lot_name,
            expiry_date: data.expiry_date,
            quantity: data.quantity,
            image_url: data.image_url,
            status: data.status.unwrap_or_default(),
        };

        let key = self.ids.next_id();
        let created: Option<Product> = self.base.db().create((TABLE, key)).content(product).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Set a product's lifecycle status
    pub async fn update_status(&self, id: &str, status: ProductStatus) -> RepoResult<Product> {
        let pure_id = strip_table_prefix(TABLE, id);
        let updated: Option<Product> = self
            .base
            .db()
            .update((TABLE, pure_id))
            .merge(StatusPatch { status })
            .await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Overwrite the mutable fields of an existing product
    pub async fn save(&self, product: &Product) -> RepoResult<Product> {
        let Some(id) = product.id.as_ref() else {
            return Err(RepoError::Validation(
                "Cannot save a product without an id".into(),
            ));
        };
        let key = id.key().to_string();

        let patch = ProductPatch {
            product_code: product.product_code.clone(),
            name: product.name.clone(),
            lot_name: product.lot_name.clone(),
            expiry_date: product.expiry_date,
            quantity: product.quantity,
            image_url: product.image_url.clone(),
            status: product.status,
        };

        let updated: Option<Product> = self.base.db().update((TABLE, key)).merge(patch).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Hard delete a product
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let pure_id = strip_table_prefix(TABLE, id);
        let _deleted: Option<Product> = self.base.db().delete((TABLE, pure_id)).await?;
        Ok(true)
    }
}
