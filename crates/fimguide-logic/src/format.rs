//! Amount and date formatting shared by every dashboard view
//!
//! Two date renderings coexist and must not be mixed up:
//! - `format_display_date` — "Month D, YYYY", for labels shown to the user
//! - `format_payload_date` — "YYYY/MM/DD", for form fields sent to the backend

use chrono::{DateTime, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Date layouts the backend has been seen to send, tried in order.
const DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Format an amount with two fraction digits and `,` thousands separators.
///
/// No currency symbol is added; callers prefix `$` where they need it.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let whole: String = grouped.chars().rev().collect();

    if negative {
        format!("-{}.{}", whole, fraction)
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Two fraction digits, no grouping (table footers).
pub fn format_fixed(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Long display form, e.g. "January 5, 2025".
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Submission form, e.g. "2025/01/05".
pub fn format_payload_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Display form for an optional date; absent dates render blank.
pub fn display_date_or_blank(date: Option<NaiveDate>) -> String {
    date.map(format_display_date).unwrap_or_default()
}

/// Parse a user or backend supplied amount.
///
/// Accepts an optional leading `$`, `,` separators and surrounding spaces.
/// Scientific notation is accepted for values that came through a float.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parse a calendar date from any layout the backend uses.
///
/// RFC 3339 timestamps keep their calendar date as written (the offset is not
/// applied), so "2025-01-01T00:00:00.000Z" is January 1st everywhere.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.naive_local().date());
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(trimmed, layout).ok())
        // "2025-01-01 00:00:00" and other timestamp spellings
        .or_else(|| {
            trimmed
                .get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        })
}
