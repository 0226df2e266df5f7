use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::whole_days_between;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::models::{Installment, Loan};
use crate::types::InstallmentId;

/// amount paid covers the amount due (overpayment included)
pub fn is_fully_paid(installment: &Installment) -> bool {
    installment.amount_paid >= installment.amount_due
}

/// what is still owed, never negative
pub fn remaining_balance(installment: &Installment) -> Money {
    installment.amount_due.saturating_sub(installment.amount_paid)
}

/// some money received, but less than due
pub fn is_partially_paid(installment: &Installment) -> bool {
    installment.amount_paid.is_positive() && installment.amount_paid < installment.amount_due
}

/// any payment recorded at all
pub fn is_paid(installment: &Installment) -> bool {
    installment.amount_paid.is_positive()
}

/// past its due date and not fully paid
pub fn is_overdue(installment: &Installment, now: DateTime<Utc>) -> bool {
    now > installment.due_date && !is_fully_paid(installment)
}

/// whole days past due, 0 when not overdue
pub fn days_overdue(installment: &Installment, now: DateTime<Utc>) -> u32 {
    if !is_overdue(installment, now) {
        return 0;
    }
    whole_days_between(installment.due_date, now)
}

/// settled after the due date; paying on the due date is on time
pub fn was_paid_late(installment: &Installment) -> bool {
    matches!(installment.paid_date, Some(paid) if paid > installment.due_date)
}

/// whole days between due date and paid date, 0 when unpaid or on time
pub fn days_late(installment: &Installment) -> u32 {
    match installment.paid_date {
        Some(paid) if paid > installment.due_date => whole_days_between(installment.due_date, paid),
        _ => 0,
    }
}

/// every derived state of one installment at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentStatus {
    pub installment_id: InstallmentId,
    pub number: u32,
    pub evaluated_at: DateTime<Utc>,
    pub fully_paid: bool,
    pub partially_paid: bool,
    pub paid: bool,
    pub remaining_balance: Money,
    pub overdue: bool,
    pub days_overdue: u32,
    pub paid_late: bool,
    pub days_late: u32,
}

impl InstallmentStatus {
    pub fn evaluate(installment: &Installment, now: DateTime<Utc>) -> Self {
        Self {
            installment_id: installment.id,
            number: installment.number,
            evaluated_at: now,
            fully_paid: is_fully_paid(installment),
            partially_paid: is_partially_paid(installment),
            paid: is_paid(installment),
            remaining_balance: remaining_balance(installment),
            overdue: is_overdue(installment, now),
            days_overdue: days_overdue(installment, now),
            paid_late: was_paid_late(installment),
            days_late: days_late(installment),
        }
    }
}

/// loan-level roll-up of installment states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStanding {
    pub evaluated_at: DateTime<Utc>,
    pub installment_count: usize,
    pub fully_paid_count: usize,
    pub overdue_count: usize,
    pub paid_late_count: usize,
    pub max_days_overdue: u32,
    pub outstanding_balance: Money,
    pub overdue_balance: Money,
    /// lowest-numbered installment not yet fully paid
    pub next_due: Option<InstallmentStatus>,
}

impl LoanStanding {
    /// evaluate every installment attached to the loan
    pub fn evaluate(loan: &Loan, now: DateTime<Utc>) -> Result<Self> {
        let statuses: Vec<InstallmentStatus> = loan
            .installments
            .iter()
            .map(|i| InstallmentStatus::evaluate(i, now))
            .collect();

        let next_due = statuses
            .iter()
            .filter(|s| !s.fully_paid)
            .min_by_key(|s| s.number)
            .cloned();

        let balance = |overdue_only: bool| {
            Money::checked_sum(
                statuses
                    .iter()
                    .filter(|s| !overdue_only || s.overdue)
                    .map(|s| s.remaining_balance),
            )
            .ok_or_else(|| LoanError::CalculationError {
                message: format!("balance of loan {} overflows", loan.id),
            })
        };

        Ok(Self {
            evaluated_at: now,
            installment_count: statuses.len(),
            fully_paid_count: statuses.iter().filter(|s| s.fully_paid).count(),
            overdue_count: statuses.iter().filter(|s| s.overdue).count(),
            paid_late_count: statuses.iter().filter(|s| s.paid_late).count(),
            max_days_overdue: statuses.iter().map(|s| s.days_overdue).max().unwrap_or(0),
            outstanding_balance: balance(false)?,
            overdue_balance: balance(true)?,
            next_due,
        })
    }

    /// every installment fully paid
    pub fn is_settled(&self) -> bool {
        self.fully_paid_count == self.installment_count
    }

    pub fn is_delinquent(&self) -> bool {
        self.overdue_count > 0
    }
}
