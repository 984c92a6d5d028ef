//! Scoring rules.
//!
//! Each rule turns one part of a receipt into a point contribution. Rules are
//! independent of each other; the pipeline in [`crate::scoring`] decides the
//! order and sums the results.

use crate::errors::ReceiptError;
use crate::models::Item;
use crate::parsers::{parse_calendar_date, parse_currency_amount, parse_wall_clock};
use chrono::{DateTime, Timelike, Utc};
use unicode_general_category::{get_general_category, GeneralCategory};

pub const ROUND_TOTAL_POINTS: u64 = 50;
pub const QUARTER_MULTIPLE_POINTS: u64 = 25;
pub const ITEM_PAIR_POINTS: u64 = 5;
pub const ODD_DAY_POINTS: u64 = 6;
pub const AFTERNOON_WINDOW_POINTS: u64 = 10;

const DESCRIPTION_PRICE_MULTIPLIER: f64 = 0.2;

// Window bounds as HHMM, both exclusive.
const AFTERNOON_WINDOW_START: u32 = 1400;
const AFTERNOON_WINDOW_END: u32 = 1600;

/// One point for every letter or decimal digit in the retailer name.
///
/// Combining marks, letter-like numerals and other numeric forms score nothing.
pub fn retailer_points(retailer: &str) -> u64 {
    retailer.chars().filter(|&c| is_letter_or_digit(c)).count() as u64
}

fn is_letter_or_digit(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::DecimalNumber
    )
}

/// 50 points if the total has no cents.
pub fn round_total_points(total: f64) -> u64 {
    if total == total.floor() {
        ROUND_TOTAL_POINTS
    } else {
        0
    }
}

/// 25 points if the total is a multiple of 0.25.
pub fn quarter_multiple_points(total: f64) -> u64 {
    let quarters = total * 4.0;
    if quarters == quarters.floor() {
        QUARTER_MULTIPLE_POINTS
    } else {
        0
    }
}

/// Parse the total once and apply both total rules.
///
/// Returns `(round_total, quarter_multiple)`.
pub fn total_points(total: &str) -> Result<(u64, u64), ReceiptError> {
    let amount = parse_currency_amount(total)?;
    Ok((round_total_points(amount), quarter_multiple_points(amount)))
}

/// 5 points for every two items.
pub fn item_pair_points(item_count: usize) -> u64 {
    (item_count / 2) as u64 * ITEM_PAIR_POINTS
}

/// Points for a single item, if its trimmed description length is a multiple of 3.
///
/// Only ASCII spaces are trimmed and the length is measured in bytes.
pub fn item_description_points(item: &Item) -> Result<u64, ReceiptError> {
    let trimmed = item.short_description.trim_matches(' ');
    if trimmed.len() % 3 != 0 {
        return Ok(0);
    }

    let price = parse_currency_amount(&item.price)?;
    Ok((price * DESCRIPTION_PRICE_MULTIPLIER).ceil() as u64)
}

/// Sum of [`item_description_points`] over every item, saturating at `u64::MAX`.
///
/// An item whose price does not parse contributes nothing; it does not
/// reject the receipt.
pub fn items_description_points(items: &[Item]) -> u64 {
    items
        .iter()
        .map(|item| match item_description_points(item) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("Skipping item {:?}: {}", item, e);
                0
            }
        })
        .fold(0u64, u64::saturating_add)
}

/// 6 points if the day in the purchase date is odd.
pub fn purchase_day_points(date: &str, now: DateTime<Utc>) -> Result<u64, ReceiptError> {
    let day = parse_calendar_date(date, now)?;
    Ok(if day % 2 == 1 { ODD_DAY_POINTS } else { 0 })
}

/// 10 points if the purchase time is after 14:00 and before 16:00.
pub fn purchase_time_points(
    time: &str,
    date: &str,
    now: DateTime<Utc>,
) -> Result<u64, ReceiptError> {
    let instant = parse_wall_clock(time, date, now)?;
    let hhmm = instant.hour() * 100 + instant.minute();

    if hhmm > AFTERNOON_WINDOW_START && hhmm < AFTERNOON_WINDOW_END {
        Ok(AFTERNOON_WINDOW_POINTS)
    } else {
        Ok(0)
    }
}
