//! Payment confirmations: upload form, receiver comments, history ordering

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Reverse;
use std::path::Path;

use crate::format::{format_payload_date, parse_amount};
use crate::types::{PaymentRecord, Role};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill all required fields before uploading.";
const UNKNOWN_BACKEND_ERROR: &str = "Unknown error from backend";

/// Receipt file attached to a confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Accepts images and PDFs, identified by extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let mime = attachment_mime(&file_name).ok_or_else(|| {
            anyhow!(
                "Unsupported attachment '{}': expected an image or a PDF",
                file_name
            )
        })?;
        if bytes.is_empty() {
            bail!("Attachment '{}' is empty", file_name);
        }
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Attachment path has no file name: {}", path.display()))?;
        Self::new(file_name, bytes)
    }
}

/// MIME type for a receipt file name, `None` for anything but images and PDFs
pub fn attachment_mime(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Upload form as filled in by the user; nothing validated yet
#[derive(Debug, Clone, Default)]
pub struct UploadDraft {
    pub loan_no: String,
    pub amount: String,
    pub payment_date: Option<NaiveDate>,
    pub payer_role: Option<Role>,
    pub payment_method: Option<String>,
    pub comment: Option<String>,
    pub attachment: Option<Attachment>,
}

/// A complete, validated payment confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpload {
    pub loan_no: String,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payer_role: Role,
    pub payment_method: String,
    pub comment: String,
    pub attachment: Attachment,
}

impl UploadDraft {
    pub fn validate(self) -> Result<PaymentUpload> {
        let loan_no = self.loan_no.trim().to_string();
        let amount = parse_amount(&self.amount).filter(|a| *a > Decimal::ZERO);
        let (Some(amount), Some(payment_date), Some(payer_role)) =
            (amount, self.payment_date, self.payer_role)
        else {
            bail!(REQUIRED_FIELDS_MESSAGE);
        };
        if loan_no.is_empty() {
            bail!(REQUIRED_FIELDS_MESSAGE);
        }
        let attachment = self
            .attachment
            .ok_or_else(|| anyhow!("Attach a receipt image or PDF before uploading."))?;

        Ok(PaymentUpload {
            loan_no,
            amount,
            payment_date,
            payer_role,
            payment_method: self.payment_method.unwrap_or_default().trim().to_string(),
            comment: self.comment.unwrap_or_default().trim().to_string(),
            attachment,
        })
    }
}

impl PaymentUpload {
    /// Text parts of the multipart body; the attachment goes under `image`.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("luid", self.loan_no.clone()),
            ("payment_date", format_payload_date(self.payment_date)),
            ("amount", self.amount.normalize().to_string()),
            ("payment_method", self.payment_method.clone()),
            ("comments", self.comment.clone()),
            ("payer_role", self.payer_role.title().to_string()),
        ]
    }
}

/// Upload endpoint answer
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadReceipt {
    pub fn into_result(self) -> Result<String> {
        let message = self.message.filter(|m| !m.trim().is_empty());
        if self.success {
            Ok(message.unwrap_or_else(|| "Upload successful!".to_string()))
        } else {
            Err(anyhow!(
                "Upload failed: {}",
                message.as_deref().unwrap_or(UNKNOWN_BACKEND_ERROR)
            ))
        }
    }
}

/// Whether a receiver comment edit needs to be sent.
///
/// Absent comments compare equal to empty ones.
pub fn comment_changed(stored: Option<&str>, new: Option<&str>) -> bool {
    stored.unwrap_or("") != new.unwrap_or("")
}

/// Newest payment first; undated records last.
pub fn sort_history(records: &mut [PaymentRecord]) {
    records.sort_by_key(|r| (r.payment_date.is_none(), Reverse(r.payment_date)));
}
