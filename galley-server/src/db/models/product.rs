//! Product model
//!
//! A product is a single physical unit tracked from intake to exit.
//! Units taken in together share a `lot_name`; expiry handling treats
//! the lot as the cascade boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Lifecycle status of a stored product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Sellable, expiry not yet crossed
    #[default]
    Active,
    /// Past expiry, excluded from sale
    Expired,
}

/// Product record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// Catalog code, shared by units of the same article
    pub product_code: String,
    pub name: String,
    /// Intake batch this unit belongs to
    pub lot_name: String,
    pub expiry_date: NaiveDate,
    pub quantity: u32,
    /// Serving URL of the associated image, if one was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl Product {
    /// Plain record key (without the table prefix), empty if unsaved
    pub fn key(&self) -> String {
        self.id
            .as_ref()
            .map(|id| id.key().to_string())
            .unwrap_or_default()
    }
}

/// Payload for inserting a new product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub product_code: String,
    pub name: String,
    pub lot_name: String,
    pub expiry_date: NaiveDate,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::Active).unwrap(),
            "\"ACTIVE\""
        );
        assert_eq!(
            serde_json::to_string(&ProductStatus::Expired).unwrap(),
            "\"EXPIRED\""
        );
    }

    #[test]
    fn test_status_defaults_to_active() {
        let json = r#"{
            "product_code": "P-001",
            "name": "Orange juice",
            "lot_name": "L-2026-01",
            "expiry_date": "2026-09-15",
            "quantity": 12
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.status, ProductStatus::Active);
        assert!(product.id.is_none());
        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_record_id_round_trip() {
        let json = r#"{
            "id": "product:abc123",
            "product_code": "P-001",
            "name": "Orange juice",
            "lot_name": "L-2026-01",
            "expiry_date": "2026-09-15",
            "quantity": 12,
            "status": "EXPIRED"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.key(), "abc123");
        assert_eq!(product.status, ProductStatus::Expired);

        let out = serde_json::to_string(&product).unwrap();
        assert!(out.contains("\"product:abc123\""));
    }
}
