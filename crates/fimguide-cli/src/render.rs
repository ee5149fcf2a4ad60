//! Plain-text rendering of dashboard views
//!
//! Every function returns the text instead of printing it, so main decides
//! where it goes and tests can read it.

use std::fmt::Write;

use fimguide_logic::coming_up::ComingUpPanel;
use fimguide_logic::dashboard::{HistoryView, LoanView};
use fimguide_logic::due_history::DueBreakdown;
use fimguide_logic::format::{display_date_or_blank, format_amount, format_display_date};
use fimguide_logic::notification::{NotificationForm, ReminderKind};
use fimguide_logic::types::{LoanSnapshot, LoanSummary, Role};
use fimguide_logic::verification::can_review;

pub fn loan_list(loans: &[LoanSummary]) -> String {
    if loans.is_empty() {
        return "No loans found.\n".to_string();
    }
    let mut out = String::new();
    writeln!(out, "{:<10}  {:<9}  {}", "Loan", "Role", "Nickname").ok();
    writeln!(out, "{}", "-".repeat(40)).ok();
    for loan in loans {
        let role = loan.role.map(|r| r.title()).unwrap_or("-");
        writeln!(out, "{:<10}  {:<9}  {}", loan.loan_no, role, loan.label()).ok();
    }
    out
}

pub fn coming_up(panel: &ComingUpPanel) -> String {
    let mut out = String::from("Coming up\n");
    match panel {
        ComingUpPanel::Completed { balance } => {
            writeln!(out, "  Your Loan has been fully repaid").ok();
            writeln!(out, "  Current Balance: $ {}", format_amount(*balance)).ok();
        }
        ComingUpPanel::Active {
            amount_label,
            amount_due,
            due_date,
            message,
            due_breakdown,
            current_balance,
        } => {
            writeln!(out, "  {}: ${}", amount_label, format_amount(*amount_due)).ok();
            writeln!(out, "  Due Date: {}", display_date_or_blank(*due_date)).ok();
            if !message.is_empty() {
                writeln!(out).ok();
                writeln!(out, "  {}", message.message()).ok();
            }
            if let Some(amount) = message.shown_amount() {
                writeln!(out, "  ${}", format_amount(amount)).ok();
            }
            if let Some(breakdown) = due_breakdown {
                out.push_str(&past_due_breakdown(breakdown));
            }
            if let Some(date) = message.date {
                writeln!(out, "  By {}", format_display_date(date)).ok();
            }
            if let Some(instructions) = message.instructions {
                writeln!(out, "  {}", instructions).ok();
            }
            writeln!(out).ok();
            writeln!(out, "  Current Balance: ${}", format_amount(*current_balance)).ok();
        }
    }
    out
}

fn past_due_breakdown(breakdown: &DueBreakdown) -> String {
    let mut out = String::from("    Past Due Breakdown\n");
    writeln!(
        out,
        "    {:<18} {:>10} {:>10} {:>10}",
        "Schedule Date", "Interest", "Principal", "Total Due"
    )
    .ok();
    for row in &breakdown.rows {
        writeln!(
            out,
            "    {:<18} {:>10} {:>10} {:>10}",
            display_date_or_blank(row.schedule_date),
            format_amount(row.interest),
            format_amount(row.principal),
            format_amount(row.due_amount)
        )
        .ok();
    }
    let totals = &breakdown.totals;
    writeln!(
        out,
        "    {:<18} {:>10} {:>10} {:>10}",
        "Total",
        totals.interest_display(),
        totals.principal_display(),
        totals.due_amount_display()
    )
    .ok();
    out
}

pub fn loan_details(loan: &LoanSnapshot) -> String {
    let details = &loan.loan_details;
    let mut out = String::from("Loan details\n");
    writeln!(out, "  Loan No:       {}", loan.loan_no).ok();
    if let Some(nickname) = &loan.nickname {
        writeln!(out, "  Nickname:      {}", nickname).ok();
    }
    writeln!(out, "  Your role:     {}", loan.role.title()).ok();
    writeln!(out, "  Status:        {}", details.status.as_str()).ok();
    writeln!(out, "  Loan amount:   ${}", format_amount(details.loan_amount)).ok();
    writeln!(out, "  Interest rate: {}%", details.interest_rate.normalize()).ok();
    writeln!(out, "  Contract date: {}", display_date_or_blank(details.contract_date)).ok();
    writeln!(out, "  End date:      {}", display_date_or_blank(details.end_date)).ok();
    writeln!(out, "  Score:         {}", details.score.normalize()).ok();
    out
}

pub fn recent_payments(loan: &LoanSnapshot) -> String {
    let mut out = String::from("Recent payments\n");
    if loan.recent_payments.is_empty() {
        writeln!(out, "  No payments yet.").ok();
        return out;
    }
    writeln!(
        out,
        "  {:<18} {:<18} {:>12} {:>12}  {}",
        "Scheduled", "Paid on", "Scheduled $", "Paid $", "Status"
    )
    .ok();
    for p in &loan.recent_payments {
        writeln!(
            out,
            "  {:<18} {:<18} {:>12} {:>12}  {}",
            display_date_or_blank(p.scheduled_date),
            display_date_or_blank(p.actual_date),
            format_amount(p.scheduled_paid_amount),
            format_amount(p.paid_amount),
            p.status
        )
        .ok();
    }
    out
}

pub fn loan_view(view: &LoanView) -> String {
    [
        coming_up(&view.panel),
        loan_details(&view.snapshot),
        recent_payments(&view.snapshot),
    ]
    .join("\n")
}

/// Confirmation history; `viewer` marks the rows they can still review.
pub fn history(view: &HistoryView, viewer: Option<Role>) -> String {
    let mut out = format!("Payment confirmations for {}\n", view.loan_no);
    if view.pending_verification {
        writeln!(out, "  ! Some payments are waiting for verification").ok();
    }
    if view.records.is_empty() {
        writeln!(out, "  No confirmations uploaded.").ok();
        return out;
    }
    for record in &view.records {
        let reviewable = viewer.is_some_and(|v| can_review(v, record));
        writeln!(
            out,
            "  #{:<6} {:<18} ${:>10}  {:<9} {:<22}{}",
            record.cfid,
            display_date_or_blank(record.payment_date),
            format_amount(record.amount),
            record.payer_role.map(|r| r.title()).unwrap_or("-"),
            record.verification_status.label(),
            if reviewable { "  (you can review)" } else { "" }
        )
        .ok();
        if !record.payment_method.is_empty() {
            writeln!(out, "          Method:  {}", record.payment_method).ok();
        }
        if !record.comment.is_empty() {
            writeln!(out, "          Comment: {}", record.comment).ok();
        }
        if let Some(reply) = record.comment_lender.as_deref().filter(|c| !c.is_empty()) {
            writeln!(out, "          Receiver: {}", reply).ok();
        }
        if let Some(url) = &record.receipt_url {
            writeln!(out, "          Receipt: {}", url).ok();
        }
    }
    out
}

pub fn notifications(loan_no: &str, form: &NotificationForm) -> String {
    let mut out = format!("Email reminders for {}\n", loan_no);
    let email = if form.email.is_empty() { "(not set)" } else { form.email.as_str() };
    writeln!(out, "  Email: {}", email).ok();
    for kind in ReminderKind::ALL {
        let setting = form.setting(kind);
        writeln!(
            out,
            "  {:<28} {:<8} every {} day(s)",
            kind.label(),
            if setting.enabled { "on" } else { "off" },
            setting.interval_days
        )
        .ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fimguide_logic::types::{AmountPaid, DueHistoryRow, LoanStatus};
    use rust_decimal::Decimal;

    fn past_due_loan() -> LoanSnapshot {
        let mut loan = LoanSnapshot::new("FA0001", Role::Borrower);
        loan.loan_details.status = LoanStatus::Active;
        loan.loan_state.loan_amount_paid = AmountPaid::Yes;
        loan.loan_state.total_due = Decimal::new(125050, 2);
        loan.loan_state.due_history.push(DueHistoryRow {
            schedule_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            interest: Decimal::new(5050, 2),
            principal: Decimal::from(1200),
            due_amount: Decimal::new(125050, 2),
        });
        loan.coming_up.amount_due = Decimal::from(300);
        loan.coming_up.due_date = NaiveDate::from_ymd_opt(2025, 2, 1);
        loan
    }

    #[test]
    fn test_coming_up_past_due() {
        let panel = ComingUpPanel::build(&past_due_loan(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let text = coming_up(&panel);
        assert!(text.contains("Amount Due: $300.00"));
        assert!(text.contains("Due Date: February 1, 2025"));
        assert!(text.contains("Your payment is past due!"));
        assert!(text.contains("$1,250.50"));
        assert!(text.contains("Please pay now or contact FiMguide."));
        assert!(text.contains("Past Due Breakdown"));
        assert!(text.contains("1250.50"));
        assert!(text.contains("Current Balance: $0.00"));
    }

    #[test]
    fn test_zero_amount_not_printed() {
        let mut loan = past_due_loan();
        loan.role = Role::Lender;
        loan.loan_state.loan_amount_paid = AmountPaid::No;
        let panel = ComingUpPanel::build(&loan, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let text = coming_up(&panel);
        assert!(!text.contains("  $0.00"));
        assert!(!text.contains("Past Due Breakdown"));
    }

    #[test]
    fn test_completed_panel() {
        let text = coming_up(&ComingUpPanel::Completed {
            balance: Decimal::ZERO,
        });
        assert!(text.contains("fully repaid"));
        assert!(text.contains("$ 0.00"));
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(loan_list(&[]), "No loans found.\n");
        let text = recent_payments(&LoanSnapshot::new("FA0001", Role::Lender));
        assert!(text.contains("No payments yet."));
    }

    #[test]
    fn test_notifications_defaults() {
        let text = notifications("FA0001", &NotificationForm::default());
        assert!(text.contains("(not set)"));
        assert!(text.contains("every 7 day(s)"));
    }
}
