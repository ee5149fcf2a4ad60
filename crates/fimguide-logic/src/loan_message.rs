//! Loan status message derivation
//!
//! Picks the one message shown in the "Coming up" panel from a loan snapshot,
//! the viewer's role and today's date. Rules are checked in order and the
//! first match wins:
//!
//! 1. Loan complete → fully repaid, balance zero
//! 2. Lender has not funded (`loan_amount_paid == "N"`) → one of four
//!    funding messages depending on role and whether the schedule date passed
//! 3. `total_due > 0` → past-due message for the role
//! 4. Otherwise → empty message
//!
//! Dates are compared as calendar dates. A loan without a schedule date is
//! never considered late.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{AmountPaid, LoanSnapshot, LoanStateStatus, Role};

pub const BORROWER_PAST_DUE_INSTRUCTIONS: &str = "Please pay now or contact FiMguide.";
pub const LENDER_PAST_DUE_INSTRUCTIONS: &str =
    "FimGuide will contact the borrower and keep you updated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    FullyRepaid,
    FundingMissed,
    ScheduledToReceive,
    FundingOverdue,
    PleasePay,
    PastDueBalance,
    BorrowerPastDue,
    LenderPastDue,
    None,
}

impl MessageKind {
    pub fn text(self) -> &'static str {
        match self {
            MessageKind::FullyRepaid => "Your Loan has been fully repaid",
            MessageKind::FundingMissed => {
                "This loan has not started because the lender has not made the required payment when it was due"
            }
            MessageKind::ScheduledToReceive => "You are scheduled to receive",
            MessageKind::FundingOverdue => {
                "Please Pay to start the loan. The borrower is scheduled to receive"
            }
            MessageKind::PleasePay => "Please pay",
            MessageKind::PastDueBalance => "You have a past due balance!",
            MessageKind::BorrowerPastDue => "Your payment is past due!",
            MessageKind::LenderPastDue => "Borrower has a past due balance!",
            MessageKind::None => "",
        }
    }
}

/// Derived status message. Optional parts are present only for the rules
/// that produce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanMessage {
    pub kind: MessageKind,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub instructions: Option<&'static str>,
    pub balance: Option<Decimal>,
}

impl LoanMessage {
    fn of(kind: MessageKind) -> Self {
        Self {
            kind,
            amount: None,
            date: None,
            instructions: None,
            balance: None,
        }
    }

    pub fn message(&self) -> &'static str {
        self.kind.text()
    }

    pub fn is_empty(&self) -> bool {
        self.kind == MessageKind::None
    }

    /// Amount to print under the message; a zero amount is not shown
    pub fn shown_amount(&self) -> Option<Decimal> {
        self.amount.filter(|a| !a.is_zero())
    }
}

pub fn derive_loan_message(loan: &LoanSnapshot, today: NaiveDate) -> LoanMessage {
    if loan.loan_details.status.is_complete() {
        return LoanMessage {
            balance: Some(Decimal::ZERO),
            ..LoanMessage::of(MessageKind::FullyRepaid)
        };
    }

    let state = &loan.loan_state;
    if state.loan_amount_paid == AmountPaid::No {
        let passed = state.loan_schedule_date.is_some_and(|d| today > d);
        let kind = match (loan.role, passed) {
            (Role::Borrower, true) => MessageKind::FundingMissed,
            (Role::Borrower, false) => MessageKind::ScheduledToReceive,
            (Role::Lender, true) => MessageKind::FundingOverdue,
            (Role::Lender, false) => MessageKind::PleasePay,
        };
        return LoanMessage {
            amount: Some(loan.loan_details.loan_amount),
            date: state.loan_schedule_date,
            ..LoanMessage::of(kind)
        };
    }

    if state.total_due > Decimal::ZERO {
        let (kind, instructions) = match (loan.role, &state.status) {
            (Role::Borrower, LoanStateStatus::OnTime) => (MessageKind::PastDueBalance, None),
            (Role::Borrower, _) => (
                MessageKind::BorrowerPastDue,
                Some(BORROWER_PAST_DUE_INSTRUCTIONS),
            ),
            (Role::Lender, _) => (MessageKind::LenderPastDue, Some(LENDER_PAST_DUE_INSTRUCTIONS)),
        };
        return LoanMessage {
            amount: Some(state.total_due),
            instructions,
            ..LoanMessage::of(kind)
        };
    }

    LoanMessage::of(MessageKind::None)
}

/// Today's calendar date in local time
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DueHistoryRow, LoanStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn unfunded(role: Role) -> LoanSnapshot {
        let mut loan = LoanSnapshot::new("FA0001", role);
        loan.loan_details.status = LoanStatus::Active;
        loan.loan_details.loan_amount = Decimal::from(5000);
        loan.loan_state.loan_amount_paid = AmountPaid::No;
        loan.loan_state.loan_schedule_date = Some(date(2025, 1, 1));
        loan
    }

    fn past_due(role: Role, status: &str) -> LoanSnapshot {
        let mut loan = LoanSnapshot::new("FA0001", role);
        loan.loan_details.status = LoanStatus::Active;
        loan.loan_state.loan_amount_paid = AmountPaid::Yes;
        loan.loan_state.total_due = Decimal::from(250);
        loan.loan_state.status = LoanStateStatus::from(status.to_string());
        loan
    }

    #[test]
    fn test_complete_wins_over_everything() {
        let mut loan = past_due(Role::Borrower, "Past due");
        loan.loan_state.loan_amount_paid = AmountPaid::No;
        loan.loan_details.status = LoanStatus::Complete;
        let msg = derive_loan_message(&loan, date(2030, 1, 1));
        assert_eq!(msg.message(), "Your Loan has been fully repaid");
        assert_eq!(msg.balance, Some(Decimal::ZERO));
        assert_eq!(msg.amount, None);
    }

    #[test]
    fn test_borrower_before_schedule_date() {
        let msg = derive_loan_message(&unfunded(Role::Borrower), date(2024, 12, 1));
        assert_eq!(msg.message(), "You are scheduled to receive");
        assert_eq!(msg.amount, Some(Decimal::from(5000)));
        assert_eq!(msg.date, Some(date(2025, 1, 1)));
        assert_eq!(msg.instructions, None);
    }

    #[test]
    fn test_borrower_after_schedule_date() {
        let msg = derive_loan_message(&unfunded(Role::Borrower), date(2025, 2, 1));
        assert_eq!(msg.kind, MessageKind::FundingMissed);
        assert_eq!(msg.amount, Some(Decimal::from(5000)));
        assert_eq!(msg.date, Some(date(2025, 1, 1)));
    }

    #[test]
    fn test_lender_funding_messages() {
        let loan = unfunded(Role::Lender);
        assert_eq!(derive_loan_message(&loan, date(2024, 12, 31)).kind, MessageKind::PleasePay);
        assert_eq!(
            derive_loan_message(&loan, date(2025, 1, 2)).message(),
            "Please Pay to start the loan. The borrower is scheduled to receive"
        );
    }

    #[test]
    fn test_schedule_date_itself_is_not_late() {
        let msg = derive_loan_message(&unfunded(Role::Borrower), date(2025, 1, 1));
        assert_eq!(msg.kind, MessageKind::ScheduledToReceive);
    }

    #[test]
    fn test_comparison_is_chronological_across_years() {
        // "12/01/2024" > "01/01/2025" as text; not as dates
        let msg = derive_loan_message(&unfunded(Role::Lender), date(2024, 12, 1));
        assert_eq!(msg.kind, MessageKind::PleasePay);
    }

    #[test]
    fn test_missing_schedule_date_never_passed() {
        let mut loan = unfunded(Role::Borrower);
        loan.loan_state.loan_schedule_date = None;
        let msg = derive_loan_message(&loan, date(2099, 1, 1));
        assert_eq!(msg.kind, MessageKind::ScheduledToReceive);
        assert_eq!(msg.date, None);
    }

    #[test]
    fn test_unfunded_checked_before_total_due() {
        let mut loan = unfunded(Role::Lender);
        loan.loan_state.total_due = Decimal::from(999);
        let msg = derive_loan_message(&loan, date(2024, 12, 1));
        assert_eq!(msg.kind, MessageKind::PleasePay);
        assert_eq!(msg.amount, Some(Decimal::from(5000)));
    }

    #[test]
    fn test_exactly_one_of_four_funding_messages() {
        let mut seen = Vec::new();
        for role in [Role::Borrower, Role::Lender] {
            for today in [date(2024, 12, 1), date(2025, 2, 1)] {
                seen.push(derive_loan_message(&unfunded(role), today).kind);
            }
        }
        seen.sort_by_key(|k| k.text());
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_borrower_past_due_on_time() {
        let msg = derive_loan_message(&past_due(Role::Borrower, "On time"), date(2025, 1, 1));
        assert_eq!(msg.message(), "You have a past due balance!");
        assert_eq!(msg.amount, Some(Decimal::from(250)));
        assert_eq!(msg.instructions, None);
    }

    #[test]
    fn test_borrower_past_due_late() {
        let msg = derive_loan_message(&past_due(Role::Borrower, "Past due"), date(2025, 1, 1));
        assert_eq!(msg.message(), "Your payment is past due!");
        assert_eq!(msg.instructions, Some("Please pay now or contact FiMguide."));
    }

    #[test]
    fn test_lender_sees_borrower_past_due() {
        let mut loan = past_due(Role::Lender, "Past due");
        loan.loan_state.due_history.push(DueHistoryRow::default());
        let msg = derive_loan_message(&loan, date(2025, 1, 1));
        assert_eq!(msg.message(), "Borrower has a past due balance!");
        assert_eq!(msg.amount, Some(Decimal::from(250)));
        assert_eq!(
            msg.instructions,
            Some("FimGuide will contact the borrower and keep you updated.")
        );

        let on_time = derive_loan_message(&past_due(Role::Lender, "On time"), date(2025, 1, 1));
        assert_eq!(on_time.kind, MessageKind::LenderPastDue);
    }

    #[test]
    fn test_paid_and_nothing_due_is_empty() {
        let mut loan = past_due(Role::Borrower, "On time");
        loan.loan_state.total_due = Decimal::ZERO;
        let msg = derive_loan_message(&loan, date(2025, 1, 1));
        assert!(msg.is_empty());
        assert_eq!(msg.message(), "");
        assert_eq!(msg.amount, None);

        // unknown funding flag behaves like paid
        let blank = LoanSnapshot::new("FA0009", Role::Lender);
        assert!(derive_loan_message(&blank, date(2025, 1, 1)).is_empty());
    }
}
