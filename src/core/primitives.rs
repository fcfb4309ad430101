use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::core::FieldValue;

/// Best-effort numeric reading of a field value.
///
/// Text is parsed as an exact decimal after stripping grouping separators,
/// currency and percent signs; ISO dates map to fractional years. Returns
/// `None` when nothing numeric can be recovered.
#[must_use]
pub fn coerce_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(number) => number.is_finite().then_some(*number),
        FieldValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        FieldValue::Text(text) => parse_numeric_text(text),
        FieldValue::Missing => None,
    }
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|ch| !matches!(ch, ',' | '_' | '$' | '%' | ' '))
        .collect();
    if let Ok(decimal) = Decimal::from_str(&cleaned) {
        return decimal.to_f64();
    }
    if let Ok(decimal) = Decimal::from_scientific(&cleaned) {
        return decimal.to_f64();
    }

    parse_date_text(trimmed).map(datetime_to_fractional_year)
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Maps a timestamp to `year + elapsed_fraction_of_year`.
///
/// Keeps date-keyed series on the same axis units as plain `year` columns.
#[must_use]
pub fn datetime_to_fractional_year(time: DateTime<Utc>) -> f64 {
    let year = time.year();
    let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return f64::from(year);
    };
    let Some(next) = NaiveDate::from_ymd_opt(year + 1, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return f64::from(year);
    };
    let elapsed = (time.naive_utc() - start).num_milliseconds() as f64;
    let total = (next - start).num_milliseconds() as f64;
    if total <= 0.0 {
        return f64::from(year);
    }
    f64::from(year) + elapsed / total
}
