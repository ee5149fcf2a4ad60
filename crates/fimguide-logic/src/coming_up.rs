//! "Coming up" panel view-model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::due_history::DueBreakdown;
use crate::loan_message::{derive_loan_message, LoanMessage};
use crate::types::{LoanSnapshot, Role};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum ComingUpPanel {
    /// Replaces the whole panel once a loan is repaid
    Completed { balance: Decimal },
    Active {
        amount_label: &'static str,
        amount_due: Decimal,
        due_date: Option<NaiveDate>,
        message: LoanMessage,
        /// Present only when the message shows an amount and there are
        /// due-history rows to explain it
        due_breakdown: Option<DueBreakdown>,
        current_balance: Decimal,
    },
}

impl ComingUpPanel {
    pub fn build(loan: &LoanSnapshot, today: NaiveDate) -> Self {
        if loan.loan_details.status.is_complete() {
            return ComingUpPanel::Completed {
                balance: Decimal::ZERO,
            };
        }

        let message = derive_loan_message(loan, today);
        let due_breakdown = message
            .shown_amount()
            .and_then(|_| DueBreakdown::from_state(&loan.loan_state));

        ComingUpPanel::Active {
            amount_label: amount_label(loan.role),
            amount_due: loan.coming_up.amount_due,
            due_date: loan.coming_up.due_date,
            message,
            due_breakdown,
            current_balance: loan.coming_up.balance,
        }
    }
}

pub fn amount_label(role: Role) -> &'static str {
    match role {
        Role::Borrower => "Amount Due",
        Role::Lender => "Amount to be Received",
    }
}
