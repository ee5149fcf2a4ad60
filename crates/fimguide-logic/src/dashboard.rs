//! Dashboard orchestration
//!
//! Ties the session, the backend and the pure view logic together. Reads
//! degrade: a failed fetch logs a warning and yields an empty result, the way
//! the dashboard keeps rendering when one panel's data is missing. Writes
//! propagate their errors and re-fetch the affected read on success.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::adapter::find_snapshot;
use crate::client::LoanBackend;
use crate::coming_up::ComingUpPanel;
use crate::notification::{NotificationSettings, RuleWrite};
use crate::payment::{comment_changed, sort_history, UploadDraft};
use crate::session::{extract_subject, Session};
use crate::types::{LoanSnapshot, LoanSummary, PaymentRecord, Role};
use crate::verification::{check_review, has_pending_verification, VerificationStatus};

/// Everything shown for the selected loan
#[derive(Debug, Clone)]
pub struct LoanView {
    pub summary: LoanSummary,
    pub snapshot: LoanSnapshot,
    pub panel: ComingUpPanel,
}

/// Confirmation history for one loan, newest first
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    pub loan_no: String,
    pub records: Vec<PaymentRecord>,
    pub pending_verification: bool,
}

impl HistoryView {
    fn new(loan_no: &str, mut records: Vec<PaymentRecord>) -> Self {
        sort_history(&mut records);
        Self {
            loan_no: loan_no.to_string(),
            pending_verification: has_pending_verification(&records),
            records,
        }
    }

    pub fn record(&self, record_id: &str) -> Option<&PaymentRecord> {
        self.records.iter().find(|r| r.cfid == record_id)
    }
}

/// Resolve an identity provider access token into a session
pub async fn sign_in<B: LoanBackend>(backend: &B, access_token: &str) -> Result<Session> {
    let subject = extract_subject(access_token)?;
    let profile = backend.fetch_profile(&subject, access_token).await?;
    info!("Signed in as user {}", profile.user_id);
    Ok(Session::from_profile(profile, subject, access_token.to_string()))
}

pub struct Dashboard<B: LoanBackend> {
    backend: B,
    session: Session,
    default_reminder_days: u8,
}

impl<B: LoanBackend> Dashboard<B> {
    pub fn new(backend: B, session: Session, default_reminder_days: u8) -> Self {
        Self {
            backend,
            session,
            default_reminder_days,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn user_id(&self) -> &str {
        &self.session.user_id
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn loans(&self) -> Vec<LoanSummary> {
        match self.backend.fetch_loans(self.user_id()).await {
            Ok(loans) => loans,
            Err(e) => {
                warn!("Failed to fetch loans for user {}: {:#}", self.user_id(), e);
                Vec::new()
            }
        }
    }

    /// Loans as listed on the settings screen
    pub async fn settings_loans(&self) -> Vec<LoanSummary> {
        match self.backend.fetch_user_loans(self.user_id()).await {
            Ok(loans) => loans,
            Err(e) => {
                warn!("Failed to fetch user loans for {}: {:#}", self.user_id(), e);
                Vec::new()
            }
        }
    }

    /// Open the requested loan, or the first listed one.
    ///
    /// `role` picks a side when the user is both lender and borrower.
    pub async fn open_loan(
        &self,
        selection: Option<&str>,
        role: Option<Role>,
        today: NaiveDate,
    ) -> Option<LoanView> {
        let loans = self.loans().await;
        let summary = match selection {
            Some(wanted) => loans
                .iter()
                .filter(|l| l.loan_no.eq_ignore_ascii_case(wanted.trim()))
                .find(|l| role.is_none() || l.role == role)
                .or_else(|| loans.iter().find(|l| l.loan_no.eq_ignore_ascii_case(wanted.trim())))
                .cloned(),
            None => loans.first().cloned(),
        }?;

        let snapshots = match self
            .backend
            .fetch_loan_detail(self.user_id(), &summary.loan_no)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to fetch loan {}: {:#}", summary.loan_no, e);
                return None;
            }
        };
        let snapshot = find_snapshot(snapshots, &summary.loan_no, role.or(summary.role))?;
        debug!("Opened loan {} as {}", snapshot.loan_no, snapshot.role);

        let panel = ComingUpPanel::build(&snapshot, today);
        Some(LoanView {
            summary,
            snapshot,
            panel,
        })
    }

    pub async fn history(&self, loan_no: &str) -> HistoryView {
        match self.backend.fetch_payment_history(loan_no).await {
            Ok(records) => HistoryView::new(loan_no, records),
            Err(e) => {
                warn!("Failed to fetch payment history for {}: {:#}", loan_no, e);
                HistoryView::new(loan_no, Vec::new())
            }
        }
    }

    /// The viewer's role on a loan; lender when they are on both sides and
    /// no role was asked for.
    pub async fn resolve_role(&self, loan_no: &str, requested: Option<Role>) -> Result<Role> {
        let roles: Vec<Role> = self
            .backend
            .fetch_loans(self.user_id())
            .await?
            .into_iter()
            .filter(|l| l.loan_no.eq_ignore_ascii_case(loan_no.trim()))
            .filter_map(|l| l.role)
            .collect();
        if roles.is_empty() {
            bail!("Loan {} is not one of your loans", loan_no);
        }
        match requested {
            Some(role) if roles.contains(&role) => Ok(role),
            Some(role) => bail!("You are not the {} on loan {}", role, loan_no),
            None if roles.contains(&Role::Lender) => Ok(Role::Lender),
            None => Ok(roles[0]),
        }
    }

    pub async fn notification_settings(&self, loan_no: &str) -> NotificationSettings {
        let rules = match self
            .backend
            .fetch_notification_rules(self.user_id(), loan_no)
            .await
        {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Failed to fetch reminder rules for {}: {:#}", loan_no, e);
                Vec::new()
            }
        };
        NotificationSettings::from_rules(
            self.user_id(),
            loan_no,
            &rules,
            self.default_reminder_days,
        )
    }

    /// Session email first, backend otherwise
    pub async fn account_email(&self) -> Option<String> {
        if let Some(email) = self.session.email.as_ref().filter(|e| !e.is_empty()) {
            return Some(email.clone());
        }
        match self.backend.fetch_account_email(self.user_id()).await {
            Ok(email) => email,
            Err(e) => {
                warn!("Failed to fetch account email: {:#}", e);
                None
            }
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    async fn history_for_write(&self, loan_no: &str) -> Result<HistoryView> {
        let records = self.backend.fetch_payment_history(loan_no).await?;
        Ok(HistoryView::new(loan_no, records))
    }

    pub async fn set_verification(
        &self,
        loan_no: &str,
        record_id: &str,
        viewer: Role,
        status: VerificationStatus,
    ) -> Result<HistoryView> {
        let history = self.history_for_write(loan_no).await?;
        let record = history
            .record(record_id)
            .ok_or_else(|| anyhow!("No payment {} on loan {}", record_id, loan_no))?;
        check_review(viewer, record, status)?;

        self.backend
            .update_verification_status(record_id, status)
            .await?;
        info!("Payment {} on {} marked {}", record_id, loan_no, status);
        self.history_for_write(loan_no).await
    }

    /// Save the receiver's comment. Returns `None` when it did not change.
    pub async fn save_comment(
        &self,
        loan_no: &str,
        record_id: &str,
        viewer: Role,
        comment: Option<&str>,
    ) -> Result<Option<HistoryView>> {
        let history = self.history_for_write(loan_no).await?;
        let record = history
            .record(record_id)
            .ok_or_else(|| anyhow!("No payment {} on loan {}", record_id, loan_no))?;
        if record.payer_role == Some(viewer) {
            bail!(
                "Payment {} was submitted by the {}; only the receiver can comment on it",
                record_id,
                viewer
            );
        }
        if !comment_changed(record.comment_lender.as_deref(), comment) {
            debug!("Comment on payment {} unchanged, nothing to save", record_id);
            return Ok(None);
        }

        self.backend
            .update_lender_comment(record_id, comment.unwrap_or(""))
            .await?;
        info!("Comment saved on payment {}", record_id);
        self.history_for_write(loan_no).await.map(Some)
    }

    /// Reminder settings to edit and save. Unlike `notification_settings`, a
    /// failed read is an error: saving from an empty fallback would create
    /// rules that already exist.
    pub async fn notification_settings_for_write(
        &self,
        loan_no: &str,
    ) -> Result<NotificationSettings> {
        let rules = self
            .backend
            .fetch_notification_rules(self.user_id(), loan_no)
            .await
            .with_context(|| format!("Failed to fetch reminder rules for {}", loan_no))?;
        Ok(NotificationSettings::from_rules(
            self.user_id(),
            loan_no,
            &rules,
            self.default_reminder_days,
        ))
    }

    /// Validate and send a confirmation; returns the backend message and the
    /// refreshed history.
    ///
    /// The payer is the viewer's own side of the loan. With no payer given it
    /// is resolved like any other role.
    pub async fn upload_payment(&self, mut draft: UploadDraft) -> Result<(String, HistoryView)> {
        let payer = self
            .resolve_role(&draft.loan_no, draft.payer_role)
            .await?;
        draft.payer_role = Some(payer);
        let upload = draft.validate()?;
        let message = self.backend.upload_payment(&upload).await?.into_result()?;
        info!(
            "Uploaded {} confirmation of {} for {}",
            upload.payer_role, upload.amount, upload.loan_no
        );
        let history = self.history_for_write(&upload.loan_no).await?;
        Ok((message, history))
    }

    /// Persist edited reminder settings. Returns the number of writes sent.
    pub async fn save_notification_settings(
        &self,
        settings: &mut NotificationSettings,
    ) -> Result<usize> {
        let writes = settings.plan_save()?;
        for write in &writes {
            match write {
                RuleWrite::Update { rule_id, body } => {
                    self.backend.update_notification_rule(rule_id, body).await?
                }
                RuleWrite::Create(body) => self.backend.create_notification_rule(body).await?,
            }
        }
        if !writes.is_empty() {
            let loan_no = settings.loan_no().to_string();
            info!("Saved {} reminder rule(s) for {}", writes.len(), loan_no);
            match self.notification_settings_for_write(&loan_no).await {
                Ok(fresh) => *settings = fresh,
                Err(e) => {
                    warn!("Could not reload reminder rules for {}: {:#}", loan_no, e);
                    settings.mark_saved();
                }
            }
        }
        Ok(writes.len())
    }

    pub async fn update_account_email(&mut self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            bail!("'{}' is not a valid email address", email);
        }
        self.backend
            .update_account_email(&self.session.user_id, email)
            .await?;
        self.session.email = Some(email.to_string());
        Ok(())
    }

    /// Link the signed-in identity provider subject to this user
    pub async fn link_identity(&self) -> Result<()> {
        let subject = self
            .session
            .subject
            .as_deref()
            .ok_or_else(|| anyhow!("No identity provider subject in this session"))?;
        let token = self.session.bearer()?;
        self.backend
            .link_identity(self.user_id(), subject, token)
            .await?;
        info!("Linked {} to user {}", subject, self.user_id());
        Ok(())
    }
}
