use serde::{Deserialize, Serialize};

// ============ Request Models ============

/// A purchase receipt as submitted by the client.
///
/// Every field is kept as the raw string the client sent; parsing and
/// validation happen in the scoring pipeline, not during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Name of the store the purchase was made at.
    #[serde(default)]
    pub retailer: String,
    /// Purchase date, `YYYY-MM-DD`.
    pub purchase_date: String,
    /// Purchase time, 24-hour `HH:MM`.
    pub purchase_time: String,
    /// Purchased items, in the order printed on the receipt.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Total amount paid, e.g. `"35.35"`.
    pub total: String,
}

/// A single line item on a receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub short_description: String,
    pub price: String,
}

impl Item {
    pub fn new(short_description: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            short_description: short_description.into(),
            price: price.into(),
        }
    }
}

// ============ Response Models ============

/// Response for `POST /receipts/process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReceiptResponse {
    pub id: String,
}

/// Response for `GET /receipts/:id/points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsResponse {
    pub points: u64,
}
