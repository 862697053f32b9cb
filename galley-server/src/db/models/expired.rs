//! Expired-stock register model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Register entry marking one product unit as expired
///
/// At most one entry exists per product; the table carries a unique
/// index on `product` so a repeated cascade cannot double-register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredRecord {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// The expired product
    #[serde(with = "serde_helpers::record_id")]
    pub product: RecordId,
    /// When the expiry was detected
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_record_round_trip() {
        let record = ExpiredRecord {
            id: None,
            product: "product:abc".parse().unwrap(),
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"product:abc\""));

        let back: ExpiredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.product, record.product);
    }
}
