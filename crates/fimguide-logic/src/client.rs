//! REST client for the FIM Guide backend
//!
//! `LoanBackend` is the seam between the dashboard and the network: one
//! method per endpoint, returning already-normalized types. `HttpLoanBackend`
//! is the reqwest implementation; tests use an in-memory one.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::adapter;
use crate::config::DashboardConfig;
use crate::notification::{NewRulePayload, NotificationRule, RulePatchPayload};
use crate::payment::{PaymentUpload, UploadReceipt};
use crate::types::{LoanSnapshot, LoanSummary, PaymentRecord, UserProfile};
use crate::verification::VerificationStatus;

#[async_trait]
pub trait LoanBackend: Send + Sync {
    /// Resolve an identity provider subject to a backend user (bearer)
    async fn fetch_profile(&self, subject: &str, access_token: &str) -> Result<UserProfile>;

    /// Loans the user takes part in, with role
    async fn fetch_loans(&self, user_id: &str) -> Result<Vec<LoanSummary>>;

    /// Every snapshot of one loan visible to the user (one per role)
    async fn fetch_loan_detail(&self, user_id: &str, loan_no: &str) -> Result<Vec<LoanSnapshot>>;

    async fn fetch_payment_history(&self, loan_no: &str) -> Result<Vec<PaymentRecord>>;

    async fn upload_payment(&self, upload: &PaymentUpload) -> Result<UploadReceipt>;

    async fn update_verification_status(
        &self,
        record_id: &str,
        status: VerificationStatus,
    ) -> Result<()>;

    async fn update_lender_comment(&self, record_id: &str, comment: &str) -> Result<()>;

    /// Loan list used by the settings screen (no roles)
    async fn fetch_user_loans(&self, user_id: &str) -> Result<Vec<LoanSummary>>;

    async fn fetch_notification_rules(
        &self,
        user_id: &str,
        loan_no: &str,
    ) -> Result<Vec<NotificationRule>>;

    async fn create_notification_rule(&self, body: &NewRulePayload) -> Result<()>;

    async fn update_notification_rule(&self, rule_id: &str, body: &RulePatchPayload)
        -> Result<()>;

    async fn fetch_account_email(&self, user_id: &str) -> Result<Option<String>>;

    async fn update_account_email(&self, user_id: &str, email: &str) -> Result<()>;

    /// Attach an identity provider subject to an existing user (bearer)
    async fn link_identity(&self, user_id: &str, subject: &str, access_token: &str) -> Result<()>;
}

/// `LoanBackend` over the backend's REST API
pub struct HttpLoanBackend {
    http: Client,
    base_url: String,
}

impl HttpLoanBackend {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        info!("Using backend {}", config.api_url);
        Ok(Self {
            http,
            base_url: config.api_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body; non-2xx becomes an error
    /// carrying the status and the start of the body.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Failed to {}: backend returned {}: {}",
                what,
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response to {}", what))?;
        debug!("{} -> {} bytes", what, text.len());
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| format!("Failed to parse response to {}", what))
    }

    async fn get(&self, path: &str, what: &str) -> Result<Value> {
        self.send(self.http.get(self.url(path)), what).await
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<Value> {
        self.send(self.http.request(method, self.url(path)).json(body), what)
            .await
    }
}

#[async_trait]
impl LoanBackend for HttpLoanBackend {
    async fn fetch_profile(&self, subject: &str, access_token: &str) -> Result<UserProfile> {
        let request = self
            .http
            .get(self.url("/sub"))
            .query(&[("auth0_sub", subject)])
            .bearer_auth(access_token);
        let value = self.send(request, "look up signed-in user").await?;
        adapter::user_profile(value)
    }

    async fn fetch_loans(&self, user_id: &str) -> Result<Vec<LoanSummary>> {
        let value = self
            .get(&format!("/my-loans/{}", user_id), "fetch loans")
            .await?;
        adapter::loan_summaries(value)
    }

    async fn fetch_loan_detail(&self, user_id: &str, loan_no: &str) -> Result<Vec<LoanSnapshot>> {
        let value = self
            .get(
                &format!("/my-loans/{}/loanNo/{}", user_id, loan_no),
                "fetch loan detail",
            )
            .await?;
        adapter::loan_snapshots(value)
    }

    async fn fetch_payment_history(&self, loan_no: &str) -> Result<Vec<PaymentRecord>> {
        let value = self
            .get(&format!("/api/photo/{}", loan_no), "fetch payment history")
            .await?;
        adapter::payment_history(value)
    }

    async fn upload_payment(&self, upload: &PaymentUpload) -> Result<UploadReceipt> {
        let image = multipart::Part::bytes(upload.attachment.bytes.clone())
            .file_name(upload.attachment.file_name.clone())
            .mime_str(upload.attachment.mime)
            .context("Invalid attachment type")?;
        let mut form = multipart::Form::new().part("image", image);
        for (name, value) in upload.form_fields() {
            form = form.text(name, value);
        }

        // Failed uploads still answer with a {success, message} body
        let response = self
            .http
            .post(self.url("/api/photo/upload"))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload payment confirmation")?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<UploadReceipt>(&text) {
            Ok(receipt) => Ok(receipt),
            Err(_) if !status.is_success() => Err(anyhow!(
                "Upload failed: backend returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )),
            Err(e) => Err(anyhow!("Failed to parse upload response: {}", e)),
        }
    }

    async fn update_verification_status(
        &self,
        record_id: &str,
        status: VerificationStatus,
    ) -> Result<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("/api/photo/paymentverification/{}", record_id),
            &json!({ "verification_status": status }),
            "update verification status",
        )
        .await
        .map(|_| ())
    }

    async fn update_lender_comment(&self, record_id: &str, comment: &str) -> Result<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("/api/photo/lendercomment/{}", record_id),
            &json!({ "lender_comment": comment }),
            "save comment",
        )
        .await
        .map(|_| ())
    }

    async fn fetch_user_loans(&self, user_id: &str) -> Result<Vec<LoanSummary>> {
        let value = self
            .get(&format!("/userloan/{}", user_id), "fetch user loans")
            .await?;
        adapter::loan_summaries(value)
    }

    async fn fetch_notification_rules(
        &self,
        user_id: &str,
        loan_no: &str,
    ) -> Result<Vec<NotificationRule>> {
        let value = self
            .get(
                &format!("/notification/{}/{}", user_id, loan_no),
                "fetch reminder rules",
            )
            .await?;
        adapter::notification_rules(value)
    }

    async fn create_notification_rule(&self, body: &NewRulePayload) -> Result<()> {
        self.write(reqwest::Method::POST, "/notification", body, "create reminder rule")
            .await
            .map(|_| ())
    }

    async fn update_notification_rule(
        &self,
        rule_id: &str,
        body: &RulePatchPayload,
    ) -> Result<()> {
        self.write(
            reqwest::Method::PATCH,
            &format!("/notification/{}", rule_id),
            body,
            "update reminder rule",
        )
        .await
        .map(|_| ())
    }

    async fn fetch_account_email(&self, user_id: &str) -> Result<Option<String>> {
        let value = self
            .get(&format!("/users/{}/email", user_id), "fetch account email")
            .await?;
        Ok(adapter::account_email(value))
    }

    async fn update_account_email(&self, user_id: &str, email: &str) -> Result<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("/users/{}/email", user_id),
            &json!({ "email": email }),
            "update account email",
        )
        .await
        .map(|_| ())
    }

    async fn link_identity(&self, user_id: &str, subject: &str, access_token: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/update"))
            .bearer_auth(access_token)
            .json(&json!({ "id": user_id, "auth0_sub": subject }));
        self.send(request, "link identity").await.map(|_| ())
    }
}
