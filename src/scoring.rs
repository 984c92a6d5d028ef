/// Receipt scoring pipeline
///
/// Runs the rules from [`crate::rules`] in a fixed order and sums them:
/// 1. Retailer name
/// 2. Round total / quarter multiple (one parse of the total)
/// 3. Item pairs
/// 4. Item descriptions
/// 5. Purchase day parity
/// 6. Purchase time window
///
/// The first validation failure aborts scoring. Item prices are the one
/// exception: a bad price only zeroes that item's contribution.
use crate::errors::ReceiptError;
use crate::models::Receipt;
use crate::rules;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-rule contributions for one receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub retailer: u64,
    pub round_total: u64,
    pub quarter_multiple: u64,
    pub item_pairs: u64,
    pub item_descriptions: u64,
    pub purchase_day: u64,
    pub purchase_time: u64,
}

impl ScoreBreakdown {
    /// Final score: the sum of every contribution, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        [
            self.retailer,
            self.round_total,
            self.quarter_multiple,
            self.item_pairs,
            self.item_descriptions,
            self.purchase_day,
            self.purchase_time,
        ]
        .into_iter()
        .fold(0u64, u64::saturating_add)
    }
}

/// Score a receipt, evaluating dates against `now`.
pub fn score_breakdown_at(
    receipt: &Receipt,
    now: DateTime<Utc>,
) -> Result<ScoreBreakdown, ReceiptError> {
    let retailer = rules::retailer_points(&receipt.retailer);
    let (round_total, quarter_multiple) = rules::total_points(&receipt.total)?;
    let item_pairs = rules::item_pair_points(receipt.items.len());
    let item_descriptions = rules::items_description_points(&receipt.items);
    let purchase_day = rules::purchase_day_points(&receipt.purchase_date, now)?;
    let purchase_time =
        rules::purchase_time_points(&receipt.purchase_time, &receipt.purchase_date, now)?;

    Ok(ScoreBreakdown {
        retailer,
        round_total,
        quarter_multiple,
        item_pairs,
        item_descriptions,
        purchase_day,
        purchase_time,
    })
}

/// Score a receipt, evaluating dates against `now`.
pub fn score_receipt_at(receipt: &Receipt, now: DateTime<Utc>) -> Result<u64, ReceiptError> {
    score_breakdown_at(receipt, now).map(|breakdown| breakdown.total())
}

/// Score a receipt against the current time.
pub fn score_receipt(receipt: &Receipt) -> Result<u64, ReceiptError> {
    score_receipt_at(receipt, Utc::now())
}
