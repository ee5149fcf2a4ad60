//! Loan snapshot data contract
//!
//! Canonical shapes for everything the dashboard reads from the backend.
//! Wire spellings (`loanNo` vs `loan_no`, `nr_*` prefixes, numbers sent as
//! strings) are reconciled in `adapter`; the rest of the crate only sees these.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::adapter::{lenient_date, lenient_decimal, lenient_id, lenient_verification, null_as_default};
use crate::verification::VerificationStatus;

/// The viewing user's relationship to a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    Borrower,
    Lender,
}

impl Role {
    /// Capitalized form used for payer roles in the confirmation history
    pub fn title(&self) -> &'static str {
        match self {
            Role::Borrower => "Borrower",
            Role::Lender => "Lender",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Borrower => write!(f, "borrower"),
            Role::Lender => write!(f, "lender"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "borrower" => Ok(Role::Borrower),
            "lender" => Ok(Role::Lender),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Overall loan status from `loan_details.status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoanStatus {
    Active,
    Complete,
    /// Any other backend status, kept verbatim for display
    Other(String),
}

impl LoanStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, LoanStatus::Complete)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::Complete => "Complete",
            LoanStatus::Other(s) => s,
        }
    }
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Other(String::new())
    }
}

impl From<String> for LoanStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Active" => LoanStatus::Active,
            "Complete" => LoanStatus::Complete,
            _ => LoanStatus::Other(value),
        }
    }
}

impl From<LoanStatus> for String {
    fn from(value: LoanStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Whether the lender has funded the loan (`loan_state.loan_amount_paid`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AmountPaid {
    Yes,
    No,
    #[default]
    Unknown,
}

impl From<String> for AmountPaid {
    fn from(value: String) -> Self {
        match value.trim() {
            "Y" | "y" => AmountPaid::Yes,
            "N" | "n" => AmountPaid::No,
            _ => AmountPaid::Unknown,
        }
    }
}

impl From<AmountPaid> for String {
    fn from(value: AmountPaid) -> Self {
        match value {
            AmountPaid::Yes => "Y".to_string(),
            AmountPaid::No => "N".to_string(),
            AmountPaid::Unknown => String::new(),
        }
    }
}

/// Payment standing from `loan_state.status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoanStateStatus {
    OnTime,
    Future,
    Other(String),
}

impl Default for LoanStateStatus {
    fn default() -> Self {
        LoanStateStatus::Other(String::new())
    }
}

impl From<String> for LoanStateStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "On time" => LoanStateStatus::OnTime,
            "Future" => LoanStateStatus::Future,
            _ => LoanStateStatus::Other(value),
        }
    }
}

impl From<LoanStateStatus> for String {
    fn from(value: LoanStateStatus) -> Self {
        match value {
            LoanStateStatus::OnTime => "On time".to_string(),
            LoanStateStatus::Future => "Future".to_string(),
            LoanStateStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LoanStatus,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub loan_amount: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub interest_rate: Decimal,
    #[serde(default, deserialize_with = "lenient_date")]
    pub contract_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub score: Decimal,
}

/// Next scheduled obligation and running balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComingUp {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount_due: Decimal,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub balance: Decimal,
}

/// One missed installment contributing to `total_due`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DueHistoryRow {
    #[serde(default, deserialize_with = "lenient_date")]
    pub schedule_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub interest: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub principal: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub due_amount: Decimal,
}

/// Funding and past-due metadata, separate from the payment schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub loan_amount_paid: AmountPaid,
    #[serde(default, deserialize_with = "lenient_date")]
    pub loan_schedule_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LoanStateStatus,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_due: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub due_history: Vec<DueHistoryRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPayment {
    #[serde(default, deserialize_with = "lenient_date")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub actual_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub scheduled_paid_amount: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub paid_amount: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// Aggregated view-model for one loan as seen by one user role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSnapshot {
    pub loan_no: String,
    pub role: Role,
    pub nickname: Option<String>,
    pub loan_details: LoanDetails,
    pub coming_up: ComingUp,
    pub loan_state: LoanState,
    #[serde(rename = "recentPayments")]
    pub recent_payments: Vec<RecentPayment>,
}

impl LoanSnapshot {
    /// Empty snapshot for a loan; every amount zero, every date absent
    pub fn new(loan_no: impl Into<String>, role: Role) -> Self {
        Self {
            loan_no: loan_no.into(),
            role,
            nickname: None,
            loan_details: LoanDetails::default(),
            coming_up: ComingUp::default(),
            loan_state: LoanState::default(),
            recent_payments: Vec::new(),
        }
    }
}

/// One entry of the user's loan list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    #[serde(alias = "loanNo", deserialize_with = "lenient_id")]
    pub loan_no: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
}

impl LoanSummary {
    /// Nickname when the backend has one, loan number otherwise
    pub fn label(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.loan_no
        } else {
            &self.nickname
        }
    }
}

/// A submitted payment confirmation (one confirmation history row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub cfid: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub payer_role: Option<Role>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_verification")]
    pub verification_status: VerificationStatus,
    #[serde(default, alias = "lender_comment")]
    pub comment_lender: Option<String>,
}

/// Identity resolved from the backend's user lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Lender".parse::<Role>().unwrap(), Role::Lender);
        assert_eq!(" borrower ".parse::<Role>().unwrap(), Role::Borrower);
        assert!("guarantor".parse::<Role>().is_err());
        assert_eq!(Role::Lender.to_string(), "lender");
        assert_eq!(Role::Borrower.title(), "Borrower");
    }

    #[test]
    fn test_status_strings_survive() {
        assert_eq!(LoanStatus::from("Complete".to_string()), LoanStatus::Complete);
        assert_eq!(
            LoanStatus::from("Defaulted".to_string()).as_str(),
            "Defaulted"
        );
        assert_eq!(AmountPaid::from("N".to_string()), AmountPaid::No);
        assert_eq!(AmountPaid::from("".to_string()), AmountPaid::Unknown);
        assert_eq!(
            LoanStateStatus::from("On time".to_string()),
            LoanStateStatus::OnTime
        );
    }

    #[test]
    fn test_summary_label_falls_back_to_loan_no() {
        let summary = LoanSummary {
            loan_no: "FA0002".to_string(),
            role: Some(Role::Lender),
            nickname: "  ".to_string(),
        };
        assert_eq!(summary.label(), "FA0002");
    }

    #[test]
    fn test_payment_record_accepts_both_comment_spellings() {
        let record: PaymentRecord = serde_json::from_value(serde_json::json!({
            "cfid": 17,
            "payer_role": "Lender",
            "payment_date": "2025-03-02T00:00:00.000Z",
            "amount": "125.50",
            "payment_method": null,
            "verification_status": null,
            "lender_comment": "received"
        }))
        .unwrap();
        assert_eq!(record.cfid, "17");
        assert_eq!(record.payer_role, Some(Role::Lender));
        assert_eq!(record.amount, Decimal::new(12550, 2));
        assert_eq!(record.payment_method, "");
        assert!(record.verification_status.is_pending());
        assert_eq!(record.comment_lender.as_deref(), Some("received"));
    }
}
