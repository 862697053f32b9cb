//! Sale / consumption ledger model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Sales channel the consumption is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    #[default]
    Retail,
    Business,
    Economy,
}

/// One consumption event for a single product unit
///
/// Quantities describe the event itself: one unit offered, none
/// returned, one consumed. The operational fields (`flight_tag`,
/// `passengers_count`, `crew_feedback`) carry fixed placeholder values
/// until per-flight reporting is wired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// Short reference tag, "FL-" plus a random suffix
    pub flight_tag: String,
    /// Dispatch origin label
    pub origin: String,
    /// Date the consumption was recorded
    pub event_date: NaiveDate,
    pub segment: Segment,
    pub passengers_count: u32,
    /// The consumed product
    #[serde(with = "serde_helpers::record_id")]
    pub product: RecordId,
    /// Units offered in this event
    pub standard_spec_qty: u32,
    pub quantity_returned: u32,
    pub quantity_consumed: u32,
    pub unit_cost: Decimal,
    pub crew_feedback: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_serialization() {
        assert_eq!(
            serde_json::to_string(&Segment::Retail).unwrap(),
            "\"RETAIL\""
        );
        assert_eq!(
            serde_json::to_string(&Segment::Business).unwrap(),
            "\"BUSINESS\""
        );
    }

    #[test]
    fn test_sale_record_round_trip() {
        let record = SaleRecord {
            id: None,
            flight_tag: "FL-a1b2c3".to_string(),
            origin: "Central Warehouse".to_string(),
            event_date: NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
            segment: Segment::Retail,
            passengers_count: 0,
            product: "product:abc".parse().unwrap(),
            standard_spec_qty: 1,
            quantity_returned: 0,
            quantity_consumed: 1,
            unit_cost: Decimal::new(105, 1),
            crew_feedback: "No feedback recorded".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"product:abc\""));
        assert!(json.contains("\"RETAIL\""));

        let back: SaleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.flight_tag, record.flight_tag);
        assert_eq!(back.quantity_consumed, 1);
        assert_eq!(back.unit_cost, Decimal::new(105, 1));
    }
}
