use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{BorrowerId, InstallmentId, LoanId, LoanStatus};

/// borrower identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: BorrowerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    /// populated only by aggregate reads and origination
    #[serde(default)]
    pub loans: Vec<Loan>,
}

impl Borrower {
    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.iter().find(|l| l.id == id)
    }
}

/// borrowing agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub day_due: u32,
    pub status: LoanStatus,
    pub date_taken: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// ordered by installment number, populated only by aggregate reads and origination
    #[serde(default)]
    pub installments: Vec<Installment>,
}

impl Loan {
    /// installment by its 1-based number
    pub fn installment(&self, number: u32) -> Option<&Installment> {
        self.installments.iter().find(|i| i.number == number)
    }

    /// sum of every scheduled amount due
    pub fn total_scheduled(&self) -> Result<Money> {
        self.total_of(self.installments.iter().map(|i| i.amount_due), "scheduled")
    }

    /// sum of every amount paid so far
    pub fn total_paid(&self) -> Result<Money> {
        self.total_of(self.installments.iter().map(|i| i.amount_paid), "paid")
    }

    fn total_of(&self, amounts: impl Iterator<Item = Money>, what: &str) -> Result<Money> {
        Money::checked_sum(amounts).ok_or_else(|| LoanError::CalculationError {
            message: format!("total {what} overflows for loan {}", self.id),
        })
    }
}

/// one scheduled obligation within a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub number: u32,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub due_date: DateTime<Utc>,
    /// `None` is the only representation of "not yet settled"
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// borrower identity fields supplied at origination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBorrower {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl NewBorrower {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }
}

/// loan parameters shared by every origination entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub day_due: u32,
    /// falls back to the tracker's configured default status
    #[serde(default)]
    pub status: Option<LoanStatus>,
}

impl LoanTerms {
    pub fn new(principal: Money, annual_rate: Rate, term_months: u32, day_due: u32) -> Self {
        Self {
            principal,
            annual_rate,
            term_months,
            day_due,
            status: None,
        }
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// loan creation request handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub borrower_id: BorrowerId,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub day_due: u32,
    pub status: LoanStatus,
    pub date_taken: DateTime<Utc>,
}

/// installment creation request produced by the schedule builder
#[derive(Debug, Clone, PartialEq)]
pub struct NewInstallment {
    pub loan_id: LoanId,
    pub number: u32,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
}
