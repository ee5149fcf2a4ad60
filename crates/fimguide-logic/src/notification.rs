//! Email reminder rules per (user, loan)
//!
//! Each loan carries up to two reminder rules on the backend, one per kind.
//! The settings form edits both at once; saving turns the edits into one
//! PATCH (existing rule) or POST (new rule) per kind.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::adapter::{lenient_flag, null_as_default};

/// Default reminder interval in days
pub const DEFAULT_INTERVAL_DAYS: u8 = 7;
/// Longest interval the backend accepts
pub const MAX_INTERVAL_DAYS: u8 = 14;

/// Reminder kind, kept in its wire spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderKind {
    #[serde(rename = "Payment_Due_Reminder")]
    PaymentDue,
    #[serde(rename = "Payment_Receiveable_Reminder")]
    PaymentReceivable,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 2] = [ReminderKind::PaymentDue, ReminderKind::PaymentReceivable];

    pub fn wire_name(self) -> &'static str {
        match self {
            ReminderKind::PaymentDue => "Payment_Due_Reminder",
            ReminderKind::PaymentReceivable => "Payment_Receiveable_Reminder",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReminderKind::PaymentDue => "Payment due reminder",
            ReminderKind::PaymentReceivable => "Payment receivable reminder",
        }
    }
}

/// A reminder rule as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationRule {
    #[serde(rename = "nr_rule_id", deserialize_with = "crate::adapter::lenient_id")]
    pub rule_id: String,
    #[serde(rename = "nr_notification_type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<ReminderKind>,
    #[serde(rename = "nr_email", default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(rename = "nr_is_enabled", default, deserialize_with = "lenient_flag")]
    pub enabled: bool,
    #[serde(rename = "nr_interval_days", default, deserialize_with = "lenient_days")]
    pub interval_days: Option<u8>,
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<ReminderKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        ReminderKind::ALL
            .into_iter()
            .find(|k| k.wire_name().eq_ignore_ascii_case(s.trim()))
    }))
}

fn lenient_days<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let days = match &value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(days.and_then(|d| u8::try_from(d).ok()))
}

/// One half of the settings form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSetting {
    pub enabled: bool,
    pub interval_days: u8,
}

/// Editable reminder settings for one loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationForm {
    pub email: String,
    pub due: ReminderSetting,
    pub receive: ReminderSetting,
}

impl NotificationForm {
    pub fn new(default_days: u8) -> Self {
        let setting = ReminderSetting {
            enabled: false,
            interval_days: default_days.min(MAX_INTERVAL_DAYS),
        };
        Self {
            email: String::new(),
            due: setting,
            receive: setting,
        }
    }

    pub fn setting(&self, kind: ReminderKind) -> ReminderSetting {
        match kind {
            ReminderKind::PaymentDue => self.due,
            ReminderKind::PaymentReceivable => self.receive,
        }
    }

    fn setting_mut(&mut self, kind: ReminderKind) -> &mut ReminderSetting {
        match kind {
            ReminderKind::PaymentDue => &mut self.due,
            ReminderKind::PaymentReceivable => &mut self.receive,
        }
    }
}

impl Default for NotificationForm {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_DAYS)
    }
}

/// PATCH /notification/{id} body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePatchPayload {
    pub nr_email: String,
    pub nr_is_enabled: u8,
    pub nr_interval_days: u8,
}

/// POST /notification body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRulePayload {
    pub email_id: String,
    pub is_enabled: u8,
    pub interval_days: u8,
    pub new_rule_user_id: u64,
    pub loan_no: String,
    pub notification_type: ReminderKind,
}

/// A single backend write produced by saving the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleWrite {
    Update { rule_id: String, body: RulePatchPayload },
    Create(NewRulePayload),
}

/// Loaded reminder settings for one (user, loan) plus local edits
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    user_id: String,
    loan_no: String,
    due_rule: Option<String>,
    receive_rule: Option<String>,
    saved: NotificationForm,
    form: NotificationForm,
}

impl NotificationSettings {
    /// Apply fetched rules over a default form.
    ///
    /// Each rule fills the half of the form matching its kind; rules of an
    /// unknown kind are ignored. The email comes from whichever rule has one.
    pub fn from_rules(
        user_id: impl Into<String>,
        loan_no: impl Into<String>,
        rules: &[NotificationRule],
        default_days: u8,
    ) -> Self {
        let mut form = NotificationForm::new(default_days);
        let mut due_rule = None;
        let mut receive_rule = None;

        for rule in rules {
            let Some(kind) = rule.kind else { continue };
            if form.email.is_empty() && !rule.email.trim().is_empty() {
                form.email = rule.email.trim().to_string();
            }
            let setting = form.setting_mut(kind);
            setting.enabled = rule.enabled;
            if let Some(days) = rule.interval_days {
                setting.interval_days = days.min(MAX_INTERVAL_DAYS);
            }
            match kind {
                ReminderKind::PaymentDue => due_rule = Some(rule.rule_id.clone()),
                ReminderKind::PaymentReceivable => receive_rule = Some(rule.rule_id.clone()),
            }
        }

        Self {
            user_id: user_id.into(),
            loan_no: loan_no.into(),
            due_rule,
            receive_rule,
            saved: form.clone(),
            form,
        }
    }

    pub fn form(&self) -> &NotificationForm {
        &self.form
    }

    pub fn loan_no(&self) -> &str {
        &self.loan_no
    }

    pub fn rule_id(&self, kind: ReminderKind) -> Option<&str> {
        match kind {
            ReminderKind::PaymentDue => self.due_rule.as_deref(),
            ReminderKind::PaymentReceivable => self.receive_rule.as_deref(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.form != self.saved
    }

    pub fn set_email(&mut self, email: &str) {
        self.form.email = email.trim().to_string();
    }

    /// Update one reminder; `None` keeps the current value.
    pub fn set_reminder(
        &mut self,
        kind: ReminderKind,
        enabled: Option<bool>,
        interval_days: Option<u8>,
    ) -> Result<()> {
        if let Some(days) = interval_days {
            if days > MAX_INTERVAL_DAYS {
                bail!(
                    "Reminder interval must be between 0 and {} days, got {}",
                    MAX_INTERVAL_DAYS,
                    days
                );
            }
        }
        let setting = self.form.setting_mut(kind);
        if let Some(enabled) = enabled {
            setting.enabled = enabled;
        }
        if let Some(days) = interval_days {
            setting.interval_days = days;
        }
        Ok(())
    }

    /// Writes needed to persist the form; empty when nothing changed.
    pub fn plan_save(&self) -> Result<Vec<RuleWrite>> {
        if !self.is_dirty() {
            return Ok(Vec::new());
        }
        let mut writes = Vec::with_capacity(2);
        for kind in ReminderKind::ALL {
            let setting = self.form.setting(kind);
            let enabled = u8::from(setting.enabled);
            match self.rule_id(kind) {
                Some(rule_id) => writes.push(RuleWrite::Update {
                    rule_id: rule_id.to_string(),
                    body: RulePatchPayload {
                        nr_email: self.form.email.clone(),
                        nr_is_enabled: enabled,
                        nr_interval_days: setting.interval_days,
                    },
                }),
                None => {
                    let new_rule_user_id = self.user_id.trim().parse::<u64>().map_err(|_| {
                        anyhow!(
                            "Cannot create reminder: user id '{}' is not numeric",
                            self.user_id
                        )
                    })?;
                    writes.push(RuleWrite::Create(NewRulePayload {
                        email_id: self.form.email.clone(),
                        is_enabled: enabled,
                        interval_days: setting.interval_days,
                        new_rule_user_id,
                        loan_no: self.loan_no.clone(),
                        notification_type: kind,
                    }));
                }
            }
        }
        Ok(writes)
    }

    /// Record the current form as persisted.
    pub fn mark_saved(&mut self) {
        self.saved = self.form.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::notification_rules;
    use serde_json::json;

    fn fetched() -> Vec<NotificationRule> {
        notification_rules(json!({
            "res": [
                { "nr_rule_id": 31, "nr_notification_type": "Payment_Due_Reminder",
                  "nr_email": "ana@example.com", "nr_is_enabled": 1, "nr_interval_days": 3 },
                { "nr_rule_id": "32", "nr_notification_type": "Something_Else",
                  "nr_email": "x@example.com", "nr_is_enabled": 1, "nr_interval_days": 1 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_rules_apply_to_matching_half() {
        let settings = NotificationSettings::from_rules("12", "FA0001", &fetched(), 7);
        let form = settings.form();
        assert_eq!(form.email, "ana@example.com");
        assert_eq!(form.due, ReminderSetting { enabled: true, interval_days: 3 });
        assert_eq!(form.receive, ReminderSetting { enabled: false, interval_days: 7 });
        assert_eq!(settings.rule_id(ReminderKind::PaymentDue), Some("31"));
        assert_eq!(settings.rule_id(ReminderKind::PaymentReceivable), None);
        assert!(!settings.is_dirty());
    }

    #[test]
    fn test_clean_form_saves_nothing() {
        let settings = NotificationSettings::from_rules("12", "FA0001", &fetched(), 7);
        assert!(settings.plan_save().unwrap().is_empty());
    }

    #[test]
    fn test_save_patches_existing_and_creates_missing() {
        let mut settings = NotificationSettings::from_rules("12", "FA0001", &fetched(), 7);
        settings
            .set_reminder(ReminderKind::PaymentReceivable, Some(true), Some(10))
            .unwrap();
        assert!(settings.is_dirty());

        let writes = settings.plan_save().unwrap();
        assert_eq!(
            writes[0],
            RuleWrite::Update {
                rule_id: "31".to_string(),
                body: RulePatchPayload {
                    nr_email: "ana@example.com".to_string(),
                    nr_is_enabled: 1,
                    nr_interval_days: 3,
                },
            }
        );
        let RuleWrite::Create(create) = &writes[1] else {
            panic!("expected a create, got {:?}", writes[1]);
        };
        assert_eq!(
            serde_json::to_value(create).unwrap(),
            json!({
                "emailId": "ana@example.com",
                "isEnabled": 1,
                "intervalDays": 10,
                "newRuleUserId": 12,
                "loanNo": "FA0001",
                "notificationType": "Payment_Receiveable_Reminder"
            })
        );

        settings.mark_saved();
        assert!(!settings.is_dirty());
    }

    #[test]
    fn test_interval_range_enforced() {
        let mut settings = NotificationSettings::from_rules("12", "FA0001", &[], 7);
        assert!(settings
            .set_reminder(ReminderKind::PaymentDue, None, Some(15))
            .is_err());
        assert!(settings
            .set_reminder(ReminderKind::PaymentDue, None, Some(0))
            .is_ok());
        assert_eq!(settings.form().due.interval_days, 0);
    }

    #[test]
    fn test_create_requires_numeric_user() {
        let mut settings = NotificationSettings::from_rules("auth0|abc", "FA0001", &[], 7);
        settings.set_email("ana@example.com");
        assert!(settings.plan_save().is_err());
    }
}
