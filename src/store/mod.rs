pub mod memory;

use chrono::{DateTime, Utc};

use crate::decimal::Money;
use crate::errors::StoreError;
use crate::models::{Borrower, Installment, Loan, NewBorrower, NewInstallment, NewLoan};
use crate::types::{BorrowerId, InstallmentId, LoanId, LoanStatus};

pub use memory::{FailPoint, InMemoryStore};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for borrowers, loans and installments.
///
/// Records come back with their identifiers and `created_at` assigned. Records returned
/// by this trait never carry nested aggregates; `Borrower::loans` and
/// `Loan::installments` are left empty and filled in by the tracker.
pub trait LoanStore: Send + Sync {
    // borrowers
    fn create_borrower(&self, borrower: &NewBorrower) -> StoreResult<Borrower>;
    fn get_borrower(&self, id: BorrowerId) -> StoreResult<Borrower>;
    fn find_borrower_by_email(&self, email: &str) -> StoreResult<Option<Borrower>>;
    fn find_borrower_by_phone(&self, phone: &str) -> StoreResult<Option<Borrower>>;
    /// every borrower, ordered by name
    fn list_borrowers(&self) -> StoreResult<Vec<Borrower>>;
    fn count_borrowers(&self) -> StoreResult<usize>;
    fn update_borrower(&self, id: BorrowerId, contact: &NewBorrower) -> StoreResult<Borrower>;
    /// removes the borrower together with its loans and their installments
    fn delete_borrower(&self, id: BorrowerId) -> StoreResult<()>;

    // loans
    fn create_loan(&self, loan: &NewLoan) -> StoreResult<Loan>;
    fn get_loan(&self, id: LoanId) -> StoreResult<Loan>;
    /// loans of one borrower in creation order
    fn loans_by_borrower(&self, borrower_id: BorrowerId) -> StoreResult<Vec<Loan>>;
    fn list_loans(&self) -> StoreResult<Vec<Loan>>;
    fn loans_by_status(&self, status: &LoanStatus) -> StoreResult<Vec<Loan>>;
    fn count_loans_by_status(&self, status: &LoanStatus) -> StoreResult<usize>;
    fn update_loan_status(&self, id: LoanId, status: LoanStatus) -> StoreResult<Loan>;
    /// removes the loan together with its installments
    fn delete_loan(&self, id: LoanId) -> StoreResult<()>;

    // installments
    fn create_installment(&self, installment: &NewInstallment) -> StoreResult<Installment>;
    fn get_installment(&self, id: InstallmentId) -> StoreResult<Installment>;
    /// installments of one loan, ascending by number
    fn installments_by_loan(&self, loan_id: LoanId) -> StoreResult<Vec<Installment>>;
    /// installments with `amount_paid < amount_due`, ascending by number
    fn unpaid_installments_by_loan(&self, loan_id: LoanId) -> StoreResult<Vec<Installment>>;
    fn list_installments(&self) -> StoreResult<Vec<Installment>>;
    fn record_settlement(
        &self,
        id: InstallmentId,
        amount_paid: Money,
        paid_date: Option<DateTime<Utc>>,
    ) -> StoreResult<Installment>;
    fn delete_installment(&self, id: InstallmentId) -> StoreResult<()>;
}
