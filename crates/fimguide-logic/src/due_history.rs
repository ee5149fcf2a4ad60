//! Past-due breakdown totals

use rust_decimal::Decimal;
use serde::Serialize;
use std::iter::Sum;
use std::ops::Add;

use crate::format::format_fixed;
use crate::types::{DueHistoryRow, LoanState};

/// Column sums of a loan's due history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DueTotals {
    pub interest: Decimal,
    pub principal: Decimal,
    pub due_amount: Decimal,
}

impl DueTotals {
    pub fn interest_display(&self) -> String {
        format_fixed(self.interest)
    }

    pub fn principal_display(&self) -> String {
        format_fixed(self.principal)
    }

    pub fn due_amount_display(&self) -> String {
        format_fixed(self.due_amount)
    }
}

impl Add for DueTotals {
    type Output = DueTotals;

    fn add(self, rhs: DueTotals) -> DueTotals {
        DueTotals {
            interest: self.interest + rhs.interest,
            principal: self.principal + rhs.principal,
            due_amount: self.due_amount + rhs.due_amount,
        }
    }
}

impl Sum for DueTotals {
    fn sum<I: Iterator<Item = DueTotals>>(iter: I) -> DueTotals {
        iter.fold(DueTotals::default(), Add::add)
    }
}

impl From<&DueHistoryRow> for DueTotals {
    fn from(row: &DueHistoryRow) -> Self {
        DueTotals {
            interest: row.interest,
            principal: row.principal,
            due_amount: row.due_amount,
        }
    }
}

pub fn sum_due_history(rows: &[DueHistoryRow]) -> DueTotals {
    rows.iter().map(DueTotals::from).sum()
}

/// Rows plus totals, as rendered under a past-due amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueBreakdown {
    pub rows: Vec<DueHistoryRow>,
    pub totals: DueTotals,
}

impl DueBreakdown {
    /// `None` when there is nothing to break down.
    pub fn from_state(state: &LoanState) -> Option<Self> {
        if state.due_history.is_empty() {
            return None;
        }
        Some(Self {
            totals: sum_due_history(&state.due_history),
            rows: state.due_history.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn row(interest: &str, principal: &str, due: &str) -> DueHistoryRow {
        DueHistoryRow {
            schedule_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            interest: Decimal::from_str(interest).unwrap(),
            principal: Decimal::from_str(principal).unwrap(),
            due_amount: Decimal::from_str(due).unwrap(),
        }
    }

    #[test]
    fn test_empty_history_sums_to_zero() {
        let totals = sum_due_history(&[]);
        assert_eq!(totals, DueTotals::default());
        assert_eq!(totals.interest_display(), "0.00");
        assert_eq!(totals.principal_display(), "0.00");
        assert_eq!(totals.due_amount_display(), "0.00");
    }

    #[test]
    fn test_columns_sum_independently() {
        let totals = sum_due_history(&[row("10.5", "200", "210.5"), row("9.25", "200", "209.25")]);
        assert_eq!(totals.interest_display(), "19.75");
        assert_eq!(totals.principal_display(), "400.00");
        assert_eq!(totals.due_amount_display(), "419.75");
    }

    #[test]
    fn test_sum_is_additive_over_concatenation() {
        let a = vec![row("1.1", "2.2", "3.3"), row("0.01", "0", "0.01")];
        let b = vec![row("4", "5", "9")];
        let joined: Vec<DueHistoryRow> = a.iter().chain(b.iter()).cloned().collect();
        assert_eq!(sum_due_history(&joined), sum_due_history(&a) + sum_due_history(&b));
    }

    #[test]
    fn test_breakdown_absent_without_rows() {
        let mut state = LoanState::default();
        assert!(DueBreakdown::from_state(&state).is_none());
        state.due_history.push(row("1", "2", "3"));
        let breakdown = DueBreakdown::from_state(&state).unwrap();
        assert_eq!(breakdown.totals.due_amount, Decimal::from(3));
        assert_eq!(breakdown.rows.len(), 1);
    }
}
