//! Expiry evaluation, lot cascade, and sale recording
//!
//! Everything downstream of "is this product still good" lives here:
//!
//! - [`evaluate`]: pure day-difference trichotomy against a reference
//!   date
//! - [`ExpiryService::verify`]: non-destructive check that triggers a
//!   lot-wide cascade when the product turns out to be expired
//! - [`ExpiryService::check_and_consume`]: gated exit path that either
//!   appends a ledger entry or marks the unit expired
//!
//! All store calls are bounded by the configured timeout; a slow store
//! surfaces as a retryable timeout error instead of hanging the
//! request.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::Mutex;
use tokio::time::timeout;

use shared::error::{AppError, AppResult};

use crate::db::models::{Product, ProductStatus, SaleRecord, Segment};
use crate::db::repository::{
    ExpiredRecordRepository, ProductRepository, RepoResult, SaleRepository,
};
use crate::utils::IdSource;

/// Dispatch origin stamped on every ledger entry
pub const SALE_ORIGIN: &str = "Central Warehouse";

/// Placeholder feedback until per-flight reporting exists
const SALE_FEEDBACK: &str = "No feedback recorded";

/// Expiry state of a product relative to a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryStatus {
    /// Expiry date is in the past
    Expired,
    /// Expiry date is the reference date itself; still sellable
    ExpiresToday,
    /// Expiry date is in the future
    Valid,
}

/// Result of evaluating an expiry date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryCheck {
    /// Whole days from the reference date to the expiry date
    /// (negative once expired)
    pub days_diff: i64,
    pub status: ExpiryStatus,
}

/// Evaluate an expiry date against a reference date
///
/// The boundary day counts as sellable: a product expiring today is
/// `ExpiresToday`, not `Expired`.
pub fn evaluate(expiry_date: NaiveDate, today: NaiveDate) -> ExpiryCheck {
    let days_diff = (expiry_date - today).num_days();
    let status = match days_diff {
        d if d < 0 => ExpiryStatus::Expired,
        0 => ExpiryStatus::ExpiresToday,
        _ => ExpiryStatus::Valid,
    };
    ExpiryCheck { days_diff, status }
}

/// How a product is referenced in a verification request
#[derive(Debug, Clone)]
pub enum ProductRef {
    Uuid(String),
    ImageUrl(String),
}

/// Response body of a verification
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpiryStatus>,
    /// Days past expiry, present only when expired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    /// Days until expiry, present when not expired (0 on the boundary
    /// day)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<i64>,
}

impl VerifyOutcome {
    fn not_found() -> Self {
        Self {
            error: Some("Product not found".to_string()),
            uuid: None,
            product_name: None,
            expiry_date: None,
            quantity: None,
            image_url: None,
            status: None,
            days_overdue: None,
            days_left: None,
        }
    }
}

/// Response body of a consumption attempt
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpiryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Id of the created ledger entry, present only when a sale was
    /// recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<Segment>,
}

impl ConsumeOutcome {
    fn not_found() -> Self {
        Self {
            error: Some("Product not found".to_string()),
            status: None,
            message: None,
            sale_uuid: None,
            product_name: None,
            expiry_date: None,
            days_left: None,
            segment: None,
        }
    }
}

/// Expiry service
///
/// Clones share the lot lock table, so concurrent cascades for the
/// same lot serialize regardless of which handler clone runs them.
#[derive(Clone)]
pub struct ExpiryService {
    products: ProductRepository,
    expired: ExpiredRecordRepository,
    sales: SaleRepository,
    ids: Arc<dyn IdSource>,
    lot_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    store_timeout: Duration,
    cascade_on_consume: bool,
}

impl ExpiryService {
    pub fn new(
        db: Surreal<Db>,
        ids: Arc<dyn IdSource>,
        store_timeout: Duration,
        cascade_on_consume: bool,
    ) -> Self {
        Self {
            products: ProductRepository::new(db.clone(), ids.clone()),
            expired: ExpiredRecordRepository::new(db.clone(), ids.clone()),
            sales: SaleRepository::new(db, ids.clone()),
            ids,
            lot_locks: Arc::new(DashMap::new()),
            store_timeout,
            cascade_on_consume,
        }
    }

    /// Run a store operation under the configured timeout
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        match timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::warn!(operation, "Store operation timed out");
                Err(AppError::timeout(operation))
            }
        }
    }

    fn lot_lock(&self, lot_name: &str) -> Arc<Mutex<()>> {
        self.lot_locks
            .entry(lot_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Verify a product's expiry state without consuming it
    ///
    /// Looking up an expired product is not a read-only act: it
    /// triggers the lot-wide cascade, so by the time the response goes
    /// out every unit of the lot is marked and registered.
    pub async fn verify(&self, reference: ProductRef, today: NaiveDate) -> AppResult<VerifyOutcome> {
        let product = match &reference {
            ProductRef::Uuid(uuid) => {
                self.bounded("find_by_id", self.products.find_by_id(uuid)).await?
            }
            ProductRef::ImageUrl(url) => {
                self.bounded("find_by_image_url", self.products.find_by_image_url(url))
                    .await?
            }
        };

        let Some(product) = product else {
            tracing::info!(reference = ?reference, "Verification requested for unknown product");
            return Ok(VerifyOutcome::not_found());
        };

        let check = evaluate(product.expiry_date, today);

        let mut outcome = VerifyOutcome {
            error: None,
            uuid: Some(product.key()),
            product_name: Some(product.name.clone()),
            expiry_date: Some(product.expiry_date),
            quantity: Some(product.quantity),
            image_url: product.image_url.clone(),
            status: Some(check.status),
            days_overdue: None,
            days_left: None,
        };

        match check.status {
            ExpiryStatus::Expired => {
                let affected = self.cascade_expire(&product.lot_name).await?;
                outcome.days_overdue = Some(check.days_diff.abs());
                tracing::info!(
                    product = %product.key(),
                    lot = %product.lot_name,
                    affected = affected.len(),
                    days_overdue = check.days_diff.abs(),
                    "Expired product verified, lot cascade applied"
                );
            }
            ExpiryStatus::ExpiresToday | ExpiryStatus::Valid => {
                outcome.days_left = Some(check.days_diff);
            }
        }

        Ok(outcome)
    }

    /// Mark every product of a lot expired and register each one
    ///
    /// Per-unit store failures are logged and skipped so one bad
    /// record cannot abort the rest of the lot. Re-running the cascade
    /// is harmless: status writes are idempotent and the register
    /// refuses duplicates.
    pub async fn cascade_expire(&self, lot_name: &str) -> AppResult<Vec<Product>> {
        let lock = self.lot_lock(lot_name);
        let result = {
            let _guard = lock.lock().await;
            self.run_cascade(lot_name).await
        };

        // Drop the idle entry so the lock table stays bounded by the
        // lots with a cascade in flight. Count 2 = our handle plus
        // the map's; anything higher means another task already
        // cloned the lock and is waiting on it.
        self.lot_locks
            .remove_if(lot_name, |_, entry| Arc::strong_count(entry) <= 2);

        result
    }

    async fn run_cascade(&self, lot_name: &str) -> AppResult<Vec<Product>> {
        let lot = self
            .bounded("find_by_lot", self.products.find_by_lot(lot_name))
            .await?;

        let now = Utc::now();
        let mut affected = Vec::with_capacity(lot.len());

        for unit in lot {
            let Some(id) = unit.id.clone() else {
                continue;
            };
            let key = id.key().to_string();

            let updated = match timeout(
                self.store_timeout,
                self.products.update_status(&key, ProductStatus::Expired),
            )
            .await
            {
                Ok(Ok(updated)) => updated,
                Ok(Err(e)) => {
                    tracing::warn!(product = %key, error = %e, "Failed to mark product expired, skipping");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(product = %key, "Timed out marking product expired, skipping");
                    continue;
                }
            };

            match timeout(self.store_timeout, self.expired.create_for(&id, now)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(product = %key, error = %e, "Failed to register expired product");
                }
                Err(_) => {
                    tracing::warn!(product = %key, "Timed out registering expired product");
                }
            }

            affected.push(updated);
        }

        Ok(affected)
    }

    /// Gate a consumption on expiry, recording a sale when sellable
    ///
    /// An expired unit is marked and refused; no ledger entry is
    /// written. A unit expiring today still sells. Note the stored
    /// quantity is left untouched by a sale; the ledger entry is the
    /// record of consumption.
    pub async fn check_and_consume(&self, uuid: &str, today: NaiveDate) -> AppResult<ConsumeOutcome> {
        let product = self
            .bounded("find_by_id", self.products.find_by_id(uuid))
            .await?;

        let Some(product) = product else {
            tracing::info!(uuid, "Consumption requested for unknown product");
            return Ok(ConsumeOutcome::not_found());
        };

        let check = evaluate(product.expiry_date, today);

        if check.status == ExpiryStatus::Expired {
            if self.cascade_on_consume {
                self.cascade_expire(&product.lot_name).await?;
            } else {
                self.bounded(
                    "update_status",
                    self.products
                        .update_status(&product.key(), ProductStatus::Expired),
                )
                .await?;
            }

            tracing::info!(
                product = %product.key(),
                days_overdue = check.days_diff.abs(),
                "Refused sale of expired product"
            );

            return Ok(ConsumeOutcome {
                error: None,
                status: Some(ExpiryStatus::Expired),
                message: Some("Product is expired and cannot be sold".to_string()),
                sale_uuid: None,
                product_name: Some(product.name),
                expiry_date: Some(product.expiry_date),
                days_left: None,
                segment: None,
            });
        }

        let Some(product_id) = product.id.clone() else {
            return Err(AppError::internal("Product record is missing its id"));
        };

        // Tag suffix is capped at six chars; a shorter id just yields
        // a shorter tag
        let tag: String = self.ids.next_id().chars().take(6).collect();
        let record = SaleRecord {
            id: None,
            flight_tag: format!("FL-{}", tag),
            origin: SALE_ORIGIN.to_string(),
            event_date: today,
            segment: Segment::Retail,
            passengers_count: 0,
            product: product_id,
            standard_spec_qty: 1,
            quantity_returned: 0,
            quantity_consumed: 1,
            unit_cost: Decimal::new(105, 1),
            crew_feedback: SALE_FEEDBACK.to_string(),
        };

        let saved = self.bounded("create_sale", self.sales.create(record)).await?;

        let sale_uuid = saved.id.as_ref().map(|id| id.key().to_string());
        tracing::info!(
            product = %product.key(),
            sale = sale_uuid.as_deref().unwrap_or(""),
            days_left = check.days_diff,
            "Sale recorded"
        );

        Ok(ConsumeOutcome {
            error: None,
            status: Some(check.status),
            message: Some("Product is valid. Sale recorded".to_string()),
            sale_uuid,
            product_name: Some(product.name),
            expiry_date: Some(product.expiry_date),
            days_left: Some(check.days_diff),
            segment: Some(Segment::Retail),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_evaluate_expired() {
        let check = evaluate(date(2026, 8, 25), date(2026, 8, 29));
        assert_eq!(check.status, ExpiryStatus::Expired);
        assert_eq!(check.days_diff, -4);
    }

    #[test]
    fn test_evaluate_boundary_day_is_sellable() {
        let check = evaluate(date(2026, 8, 29), date(2026, 8, 29));
        assert_eq!(check.status, ExpiryStatus::ExpiresToday);
        assert_eq!(check.days_diff, 0);
    }

    #[test]
    fn test_evaluate_valid() {
        let check = evaluate(date(2026, 9, 3), date(2026, 8, 29));
        assert_eq!(check.status, ExpiryStatus::Valid);
        assert_eq!(check.days_diff, 5);
    }

    #[test]
    fn test_evaluate_one_day_past() {
        let check = evaluate(date(2026, 8, 28), date(2026, 8, 29));
        assert_eq!(check.status, ExpiryStatus::Expired);
        assert_eq!(check.days_diff, -1);
    }

    #[test]
    fn test_evaluate_across_month_boundary() {
        let check = evaluate(date(2026, 9, 1), date(2026, 8, 29));
        assert_eq!(check.status, ExpiryStatus::Valid);
        assert_eq!(check.days_diff, 3);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ExpiryStatus::ExpiresToday).unwrap(),
            "\"EXPIRES_TODAY\""
        );
        assert_eq!(
            serde_json::to_string(&ExpiryStatus::Expired).unwrap(),
            "\"EXPIRED\""
        );
        assert_eq!(
            serde_json::to_string(&ExpiryStatus::Valid).unwrap(),
            "\"VALID\""
        );
    }

    #[test]
    fn test_outcome_omits_absent_fields() {
        let outcome = VerifyOutcome::not_found();
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"error":"Product not found"}"#);
    }

    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::db::DbService;
    use crate::db::models::ProductCreate;
    use crate::utils::UuidSource;

    async fn mem_service(
        ids: Arc<dyn IdSource>,
        store_timeout: Duration,
    ) -> (ExpiryService, Surreal<Db>) {
        let db = DbService::new_memory().await.unwrap();
        let service = ExpiryService::new(db.db.clone(), ids, store_timeout, false);
        (service, db.db)
    }

    fn payload(lot: &str, expiry: NaiveDate) -> ProductCreate {
        ProductCreate {
            product_code: "P-001".to_string(),
            name: "Orange juice".to_string(),
            lot_name: lot.to_string(),
            expiry_date: expiry,
            quantity: 1,
            image_url: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_lock_table_entry_dropped_after_cascade() {
        let ids: Arc<dyn IdSource> = Arc::new(UuidSource);
        let (service, db) = mem_service(ids.clone(), Duration::from_secs(5)).await;
        let products = ProductRepository::new(db, ids);

        products
            .create(payload("L-1", date(2026, 1, 1)))
            .await
            .unwrap();

        let affected = service.cascade_expire("L-1").await.unwrap();
        assert_eq!(affected.len(), 1);
        assert!(service.lot_locks.is_empty());
    }

    /// Id source shorter than the tag suffix cap
    struct ShortIds(AtomicU32);

    impl IdSource for ShortIds {
        fn next_id(&self) -> String {
            format!("s{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn test_short_ids_yield_short_flight_tag() {
        let ids: Arc<dyn IdSource> = Arc::new(ShortIds(AtomicU32::new(0)));
        let (service, db) = mem_service(ids.clone(), Duration::from_secs(5)).await;
        let products = ProductRepository::new(db.clone(), ids.clone());

        let p = products
            .create(payload("L-1", date(2099, 1, 1)))
            .await
            .unwrap();

        let outcome = service
            .check_and_consume(&p.key(), date(2026, 8, 29))
            .await
            .unwrap();
        assert!(outcome.sale_uuid.is_some());

        let sales = SaleRepository::new(db, ids).find_all().await.unwrap();
        assert_eq!(sales.len(), 1);
        assert!(sales[0].flight_tag.starts_with("FL-s"));
        assert!(sales[0].flight_tag.len() <= 9);
    }
}
