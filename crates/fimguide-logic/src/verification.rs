//! Payment verification statuses and review rules
//!
//! The backend stores the reviewer's verdict as a small integer. The codes
//! are fixed by the backend and must not be renumbered:
//!
//! | code | status        |
//! |------|---------------|
//! | 1    | Unverified    |
//! | 2    | Not received  |
//! | 3    | Wrong amount  |
//! | 4    | Wrong date    |
//! | 5    | Verified      |
//!
//! Anything else (null, 0, unknown) means no verdict yet.

use anyhow::{bail, Result};
use serde::{Serialize, Serializer};
use std::str::FromStr;

use crate::types::{PaymentRecord, Role};

/// Warning shown before a payment is marked verified
pub const VERIFY_WARNING: &str = "Once verified, you can't undo this change!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    /// No verdict recorded yet
    #[default]
    Pending,
    Unverified,
    NotReceived,
    WrongAmount,
    WrongDate,
    /// Final: a verified payment can no longer be reviewed
    Verified,
}

impl VerificationStatus {
    /// Statuses a reviewer can pick, in dropdown order
    pub const CHOICES: [VerificationStatus; 5] = [
        VerificationStatus::Unverified,
        VerificationStatus::NotReceived,
        VerificationStatus::WrongAmount,
        VerificationStatus::WrongDate,
        VerificationStatus::Verified,
    ];

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => VerificationStatus::Unverified,
            2 => VerificationStatus::NotReceived,
            3 => VerificationStatus::WrongAmount,
            4 => VerificationStatus::WrongDate,
            5 => VerificationStatus::Verified,
            _ => VerificationStatus::Pending,
        }
    }

    /// Wire code; pending has none and is sent as 0
    pub fn code(self) -> u8 {
        match self {
            VerificationStatus::Pending => 0,
            VerificationStatus::Unverified => 1,
            VerificationStatus::NotReceived => 2,
            VerificationStatus::WrongAmount => 3,
            VerificationStatus::WrongDate => 4,
            VerificationStatus::Verified => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "Verification Pending",
            VerificationStatus::Unverified => "Unverified",
            VerificationStatus::NotReceived => "Not received",
            VerificationStatus::WrongAmount => "Wrong amount",
            VerificationStatus::WrongDate => "Wrong date",
            VerificationStatus::Verified => "Verified",
        }
    }

    pub fn is_pending(self) -> bool {
        self == VerificationStatus::Pending
    }

    pub fn is_final(self) -> bool {
        self == VerificationStatus::Verified
    }

    /// Marking a payment verified cannot be undone, so it needs a confirmation
    pub fn requires_confirmation(self) -> bool {
        self == VerificationStatus::Verified
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for VerificationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> serde::Deserialize<'de> for VerificationStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::adapter::lenient_verification(deserializer)
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    /// Accepts a wire code ("1".."5") or a name ("wrong-amount", "Not received").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let status = match normalized.as_str() {
            "1" | "unverified" => VerificationStatus::Unverified,
            "2" | "notreceived" => VerificationStatus::NotReceived,
            "3" | "wrongamount" => VerificationStatus::WrongAmount,
            "4" | "wrongdate" => VerificationStatus::WrongDate,
            "5" | "verified" => VerificationStatus::Verified,
            _ => {
                return Err(format!(
                    "unknown verification status '{}' (expected unverified, not-received, wrong-amount, wrong-date or verified)",
                    s
                ))
            }
        };
        Ok(status)
    }
}

/// Whether `viewer` may set a verdict on `record`.
///
/// Nobody reviews their own payment, and verified payments are closed.
pub fn can_review(viewer: Role, record: &PaymentRecord) -> bool {
    record.payer_role != Some(viewer) && !record.verification_status.is_final()
}

/// Validate a verdict change before it is sent to the backend.
pub fn check_review(viewer: Role, record: &PaymentRecord, target: VerificationStatus) -> Result<()> {
    if record.payer_role == Some(viewer) {
        bail!(
            "Payment {} was submitted by the {}; only the other party can review it",
            record.cfid,
            viewer
        );
    }
    if record.verification_status.is_final() {
        bail!("Payment {} is already verified and cannot be changed", record.cfid);
    }
    if target.is_pending() {
        bail!("Pending is not a selectable verification status");
    }
    Ok(())
}

/// True when any confirmation still waits for a verdict
pub fn has_pending_verification(records: &[PaymentRecord]) -> bool {
    records.iter().any(|r| r.verification_status.is_pending())
}
