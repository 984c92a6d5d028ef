/// Field parsers for untrusted receipt input
///
/// Every parser fails closed: anything that is not exactly the expected shape
/// is rejected rather than coerced. The date and time parsers take the
/// evaluation time explicitly so "in the future" is decided against a single
/// instant per receipt.
use crate::errors::ReceiptError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]{2}$").expect("amount pattern compiles"));

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern compiles"));

// Hour may be one or two digits, minutes are always two.
static CLOCK_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{1,2}:[0-9]{2}$")
        .expect("clock pattern compiles")
});

/// Parse a dollar amount such as `"35.35"` or `"1,234.56"`.
///
/// Thousands separators are stripped first. The remainder must be ASCII digits
/// with exactly one decimal point followed by exactly two digits, so whole
/// dollar amounts like `"36"` are rejected.
pub fn parse_currency_amount(raw: &str) -> Result<f64, ReceiptError> {
    let amount = raw.replace(',', "");

    if amount.chars().any(|c| !c.is_ascii_digit() && c != '.') {
        return Err(ReceiptError::InvalidCharacter {
            value: raw.to_string(),
        });
    }

    if !AMOUNT_SHAPE.is_match(&amount) {
        return Err(ReceiptError::InvalidPrecision {
            value: raw.to_string(),
        });
    }

    amount
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ReceiptError::InvalidPrecision {
            value: raw.to_string(),
        })
}

/// Parse a `YYYY-MM-DD` purchase date and return its day of month.
///
/// The date is read as midnight UTC and must not be later than `now`.
pub fn parse_calendar_date(raw: &str, now: DateTime<Utc>) -> Result<u32, ReceiptError> {
    if !DATE_SHAPE.is_match(raw) {
        return Err(ReceiptError::InvalidDate {
            value: raw.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        });
    }

    let date =
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ReceiptError::InvalidDate {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;

    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    if midnight > now {
        return Err(ReceiptError::FutureDate {
            value: raw.to_string(),
        });
    }

    Ok(date.day())
}

/// Combine a purchase date and time into a single instant.
///
/// The pair is parsed as `YYYY-MM-DD HH:MM` and read as UTC; the instant must
/// not be later than `now`.
pub fn parse_wall_clock(
    time: &str,
    date: &str,
    now: DateTime<Utc>,
) -> Result<NaiveDateTime, ReceiptError> {
    let combined = format!("{} {}", date, time);

    if !CLOCK_SHAPE.is_match(&combined) {
        return Err(ReceiptError::InvalidTime {
            value: combined,
            reason: "expected YYYY-MM-DD HH:MM".to_string(),
        });
    }

    let instant = NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %H:%M").map_err(|e| {
        ReceiptError::InvalidTime {
            value: combined.clone(),
            reason: e.to_string(),
        }
    })?;

    if Utc.from_utc_datetime(&instant) > now {
        return Err(ReceiptError::FutureTime { value: combined });
    }

    Ok(instant)
}
