//! Backend response normalization
//!
//! Every JSON payload from the FIM Guide backend passes through here before
//! the rest of the crate sees it. The backend has shipped several response
//! shapes for the same data, so this module:
//! - accepts decimals as numbers, numeric strings, "" or null (→ 0)
//! - accepts dates in every layout `format::parse_date` knows (bad → absent)
//! - unwraps the `{result: [...]}` / `{res: [...]}` envelopes
//! - flattens the `{borrower: {..}, lender: {..}}` loan detail map and stamps
//!   each snapshot with the role it was found under

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::format::{parse_amount, parse_date};
use crate::notification::NotificationRule;
use crate::types::{
    ComingUp, LoanDetails, LoanSnapshot, LoanState, LoanSummary, PaymentRecord, RecentPayment,
    Role, UserProfile,
};
use crate::verification::VerificationStatus;

// ============================================================================
// Field-level deserializers
// ============================================================================

/// Null deserializes to `T::default()` instead of failing.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decimal from a JSON number or string; anything unusable is zero.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value).unwrap_or(Decimal::ZERO))
}

/// Calendar date from any known layout; anything unusable is absent.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => parse_date(&s),
        _ => None,
    })
}

/// Identifier sent either as a number or a string.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
}

/// Verification code as number or numeric string; unknown codes are pending.
pub fn lenient_verification<'de, D>(deserializer: D) -> Result<VerificationStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let code = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(code.map(VerificationStatus::from_code).unwrap_or_default())
}

/// 0/1 flag, also accepting JSON booleans and "0"/"1".
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1" || s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_amount(&n.to_string()),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

// ============================================================================
// Loan detail
// ============================================================================

/// Loan snapshot body as it appears under `borrower.<loan_no>`
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    loan_details: LoanDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    coming_up: ComingUp,
    #[serde(default, deserialize_with = "null_as_default")]
    loan_state: LoanState,
    #[serde(
        default,
        rename = "recentPayments",
        alias = "recent_payments",
        deserialize_with = "null_as_default"
    )]
    recent_payments: Vec<RecentPayment>,
}

impl SnapshotBody {
    fn into_snapshot(self, loan_no: String, role: Role) -> LoanSnapshot {
        LoanSnapshot {
            loan_no,
            role,
            nickname: self.nickname.filter(|n| !n.trim().is_empty()),
            loan_details: self.loan_details,
            coming_up: self.coming_up,
            loan_state: self.loan_state,
            recent_payments: self.recent_payments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoanDetailEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    borrower: BTreeMap<String, SnapshotBody>,
    #[serde(default, deserialize_with = "null_as_default")]
    lender: BTreeMap<String, SnapshotBody>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Flatten a `/my-loans/{user}/loanNo/{loan}` response into snapshots.
///
/// Loan numbers are upper-cased; the backend keys its maps in lower case.
pub fn loan_snapshots(value: Value) -> Result<Vec<LoanSnapshot>> {
    let envelope: LoanDetailEnvelope =
        serde_json::from_value(value).context("Malformed loan detail response")?;
    if let Some(errors) = envelope.errors.filter(|e| !e.is_null()) {
        bail!("Backend rejected loan detail request: {}", errors);
    }

    let mut snapshots = Vec::with_capacity(envelope.borrower.len() + envelope.lender.len());
    for (role, map) in [(Role::Borrower, envelope.borrower), (Role::Lender, envelope.lender)] {
        for (loan_no, body) in map {
            snapshots.push(body.into_snapshot(loan_no.to_ascii_uppercase(), role));
        }
    }
    debug!("Normalized {} loan snapshots", snapshots.len());
    Ok(snapshots)
}

/// Pick the snapshot for `loan_no` (case-insensitive).
///
/// When the user is on both sides of the loan and no role is given, the
/// lender view wins, matching how the dashboard merged the two maps.
pub fn find_snapshot(
    snapshots: Vec<LoanSnapshot>,
    loan_no: &str,
    role: Option<Role>,
) -> Option<LoanSnapshot> {
    let mut matches: Vec<LoanSnapshot> = snapshots
        .into_iter()
        .filter(|s| s.loan_no.eq_ignore_ascii_case(loan_no.trim()))
        .collect();

    if let Some(role) = role {
        if let Some(pos) = matches.iter().position(|s| s.role == role) {
            return Some(matches.swap_remove(pos));
        }
    }
    match matches.iter().position(|s| s.role == Role::Lender) {
        Some(pos) => Some(matches.swap_remove(pos)),
        None => matches.pop(),
    }
}

// ============================================================================
// Lists and envelopes
// ============================================================================

/// Unwrap a list that may arrive bare or inside `result` / `res` / `data`.
fn unwrap_list(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in ["result", "res", "data"] {
                match map.remove(key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(other) => bail!("Expected a list under '{}', got {}", key, other),
                    None => {}
                }
            }
            Err(anyhow!("Response has no list payload"))
        }
        Value::Null => Ok(Vec::new()),
        other => bail!("Expected a list response, got {}", other),
    }
}

/// Decode list items, skipping (and logging) the ones that do not parse.
fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

/// Loan list from `/my-loans/{user}` or `/userloan/{user}`
pub fn loan_summaries(value: Value) -> Result<Vec<LoanSummary>> {
    Ok(decode_items(unwrap_list(value)?, "loan summary"))
}

/// Confirmation history from `/api/photo/{loan}`
pub fn payment_history(value: Value) -> Result<Vec<PaymentRecord>> {
    Ok(decode_items(unwrap_list(value)?, "payment record"))
}

/// Reminder rules from `/notification/{user}/{loan}`
pub fn notification_rules(value: Value) -> Result<Vec<NotificationRule>> {
    Ok(decode_items(unwrap_list(value)?, "notification rule"))
}

#[derive(Debug, Deserialize)]
struct ProfileDetails {
    us_id: Value,
    #[serde(default)]
    us_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    details: Option<ProfileDetails>,
}

/// User lookup from `/sub?auth0_sub=...`
pub fn user_profile(value: Value) -> Result<UserProfile> {
    let envelope: ProfileEnvelope =
        serde_json::from_value(value).context("Malformed user lookup response")?;
    let details = envelope
        .details
        .ok_or_else(|| anyhow!("No account is linked to this identity"))?;
    let user_id = id_from_value(&details.us_id)
        .ok_or_else(|| anyhow!("User lookup returned no user id"))?;
    Ok(UserProfile {
        user_id,
        email: details.us_email.filter(|e| !e.trim().is_empty()),
    })
}

/// Email from `/users/{user}/email`
pub fn account_email(value: Value) -> Option<String> {
    value
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}
