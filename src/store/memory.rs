use chrono::{DateTime, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::{LoanStore, StoreResult};
use crate::decimal::Money;
use crate::errors::StoreError;
use crate::models::{Borrower, Installment, Loan, NewBorrower, NewInstallment, NewLoan};
use crate::types::{BorrowerId, InstallmentId, LoanId, LoanStatus};

/// storage call that an `InMemoryStore` can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateBorrower,
    CreateLoan,
    /// fail when creating the installment with this number
    CreateInstallment(u32),
    GetBorrower,
    GetLoan,
    InstallmentsByLoan,
}

#[derive(Default)]
struct Tables {
    borrowers: Vec<Borrower>,
    loans: Vec<Loan>,
    installments: Vec<Installment>,
}

/// Process-local store with the same constraints as the relational schema: unique
/// borrower email, unique installment number per loan, cascading deletes.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    time: SafeTimeProvider,
    fail_point: Mutex<Option<FailPoint>>,
}

impl InMemoryStore {
    /// store stamping records with system time
    pub fn new() -> Self {
        Self::with_time(SafeTimeProvider::new(TimeSource::System))
    }

    /// store stamping `created_at` from the given time provider
    pub fn with_time(time: SafeTimeProvider) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            time,
            fail_point: Mutex::new(None),
        }
    }

    /// make the next matching call fail with a backend error (fault injection)
    pub fn fail_on(&self, point: FailPoint) {
        *self.fail_point.lock() = Some(point);
    }

    pub fn clear_failure(&self) {
        *self.fail_point.lock() = None;
    }

    /// remove every record
    pub fn clear(&self) {
        *self.tables.write() = Tables::default();
    }

    fn check(&self, point: FailPoint) -> StoreResult<()> {
        let mut armed = self.fail_point.lock();
        if *armed == Some(point) {
            *armed = None;
            return Err(StoreError::Backend {
                message: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(entity: &'static str, id: Uuid) -> StoreError {
    StoreError::NotFound { entity, id }
}

fn sorted_by_number(mut installments: Vec<Installment>) -> Vec<Installment> {
    installments.sort_by_key(|i| i.number);
    installments
}

impl LoanStore for InMemoryStore {
    fn create_borrower(&self, borrower: &NewBorrower) -> StoreResult<Borrower> {
        self.check(FailPoint::CreateBorrower)?;
        let mut tables = self.tables.write();

        if tables.borrowers.iter().any(|b| b.email == borrower.email) {
            return Err(StoreError::Duplicate {
                field: "email",
                value: borrower.email.clone(),
            });
        }

        let record = Borrower {
            id: Uuid::new_v4(),
            name: borrower.name.clone(),
            email: borrower.email.clone(),
            phone: borrower.phone.clone(),
            created_at: self.time.now(),
            loans: Vec::new(),
        };
        tables.borrowers.push(record.clone());
        Ok(record)
    }

    fn get_borrower(&self, id: BorrowerId) -> StoreResult<Borrower> {
        self.check(FailPoint::GetBorrower)?;
        self.tables
            .read()
            .borrowers
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| not_found("borrower", id))
    }

    fn find_borrower_by_email(&self, email: &str) -> StoreResult<Option<Borrower>> {
        Ok(self.tables.read().borrowers.iter().find(|b| b.email == email).cloned())
    }

    fn find_borrower_by_phone(&self, phone: &str) -> StoreResult<Option<Borrower>> {
        Ok(self.tables.read().borrowers.iter().find(|b| b.phone == phone).cloned())
    }

    fn list_borrowers(&self) -> StoreResult<Vec<Borrower>> {
        let mut borrowers = self.tables.read().borrowers.clone();
        borrowers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(borrowers)
    }

    fn count_borrowers(&self) -> StoreResult<usize> {
        Ok(self.tables.read().borrowers.len())
    }

    fn update_borrower(&self, id: BorrowerId, contact: &NewBorrower) -> StoreResult<Borrower> {
        let mut tables = self.tables.write();

        if tables.borrowers.iter().any(|b| b.id != id && b.email == contact.email) {
            return Err(StoreError::Duplicate {
                field: "email",
                value: contact.email.clone(),
            });
        }

        let borrower = tables
            .borrowers
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("borrower", id))?;
        borrower.name = contact.name.clone();
        borrower.email = contact.email.clone();
        borrower.phone = contact.phone.clone();
        Ok(borrower.clone())
    }

    fn delete_borrower(&self, id: BorrowerId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let before = tables.borrowers.len();
        tables.borrowers.retain(|b| b.id != id);
        if tables.borrowers.len() == before {
            return Err(not_found("borrower", id));
        }

        let loan_ids: Vec<LoanId> = tables
            .loans
            .iter()
            .filter(|l| l.borrower_id == id)
            .map(|l| l.id)
            .collect();
        tables.loans.retain(|l| l.borrower_id != id);
        tables.installments.retain(|i| !loan_ids.contains(&i.loan_id));
        Ok(())
    }

    fn create_loan(&self, loan: &NewLoan) -> StoreResult<Loan> {
        self.check(FailPoint::CreateLoan)?;
        let mut tables = self.tables.write();

        if !tables.borrowers.iter().any(|b| b.id == loan.borrower_id) {
            return Err(not_found("borrower", loan.borrower_id));
        }

        let record = Loan {
            id: Uuid::new_v4(),
            borrower_id: loan.borrower_id,
            principal: loan.principal,
            annual_rate: loan.annual_rate,
            term_months: loan.term_months,
            day_due: loan.day_due,
            status: loan.status.clone(),
            date_taken: loan.date_taken,
            created_at: self.time.now(),
            installments: Vec::new(),
        };
        tables.loans.push(record.clone());
        Ok(record)
    }

    fn get_loan(&self, id: LoanId) -> StoreResult<Loan> {
        self.check(FailPoint::GetLoan)?;
        self.tables
            .read()
            .loans
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found("loan", id))
    }

    fn loans_by_borrower(&self, borrower_id: BorrowerId) -> StoreResult<Vec<Loan>> {
        Ok(self
            .tables
            .read()
            .loans
            .iter()
            .filter(|l| l.borrower_id == borrower_id)
            .cloned()
            .collect())
    }

    fn list_loans(&self) -> StoreResult<Vec<Loan>> {
        Ok(self.tables.read().loans.clone())
    }

    fn loans_by_status(&self, status: &LoanStatus) -> StoreResult<Vec<Loan>> {
        Ok(self
            .tables
            .read()
            .loans
            .iter()
            .filter(|l| &l.status == status)
            .cloned()
            .collect())
    }

    fn count_loans_by_status(&self, status: &LoanStatus) -> StoreResult<usize> {
        Ok(self.tables.read().loans.iter().filter(|l| &l.status == status).count())
    }

    fn update_loan_status(&self, id: LoanId, status: LoanStatus) -> StoreResult<Loan> {
        let mut tables = self.tables.write();
        let loan = tables
            .loans
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found("loan", id))?;
        loan.status = status;
        Ok(loan.clone())
    }

    fn delete_loan(&self, id: LoanId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let before = tables.loans.len();
        tables.loans.retain(|l| l.id != id);
        if tables.loans.len() == before {
            return Err(not_found("loan", id));
        }
        tables.installments.retain(|i| i.loan_id != id);
        Ok(())
    }

    fn create_installment(&self, installment: &NewInstallment) -> StoreResult<Installment> {
        self.check(FailPoint::CreateInstallment(installment.number))?;
        let mut tables = self.tables.write();

        if !tables.loans.iter().any(|l| l.id == installment.loan_id) {
            return Err(not_found("loan", installment.loan_id));
        }
        if tables
            .installments
            .iter()
            .any(|i| i.loan_id == installment.loan_id && i.number == installment.number)
        {
            return Err(StoreError::Duplicate {
                field: "installment number",
                value: format!("{} for loan {}", installment.number, installment.loan_id),
            });
        }

        let record = Installment {
            id: Uuid::new_v4(),
            loan_id: installment.loan_id,
            number: installment.number,
            amount_due: installment.amount_due,
            amount_paid: installment.amount_paid,
            due_date: installment.due_date,
            paid_date: installment.paid_date,
            created_at: self.time.now(),
        };
        tables.installments.push(record.clone());
        Ok(record)
    }

    fn get_installment(&self, id: InstallmentId) -> StoreResult<Installment> {
        self.tables
            .read()
            .installments
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| not_found("installment", id))
    }

    fn installments_by_loan(&self, loan_id: LoanId) -> StoreResult<Vec<Installment>> {
        self.check(FailPoint::InstallmentsByLoan)?;
        Ok(sorted_by_number(
            self.tables
                .read()
                .installments
                .iter()
                .filter(|i| i.loan_id == loan_id)
                .cloned()
                .collect(),
        ))
    }

    fn unpaid_installments_by_loan(&self, loan_id: LoanId) -> StoreResult<Vec<Installment>> {
        let tables = self.tables.read();
        if !tables.loans.iter().any(|l| l.id == loan_id) {
            return Err(not_found("loan", loan_id));
        }
        Ok(sorted_by_number(
            tables
                .installments
                .iter()
                .filter(|i| i.loan_id == loan_id && i.amount_paid < i.amount_due)
                .cloned()
                .collect(),
        ))
    }

    fn list_installments(&self) -> StoreResult<Vec<Installment>> {
        Ok(self.tables.read().installments.clone())
    }

    fn record_settlement(
        &self,
        id: InstallmentId,
        amount_paid: Money,
        paid_date: Option<DateTime<Utc>>,
    ) -> StoreResult<Installment> {
        let mut tables = self.tables.write();
        let installment = tables
            .installments
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("installment", id))?;
        installment.amount_paid = amount_paid;
        installment.paid_date = paid_date;
        Ok(installment.clone())
    }

    fn delete_installment(&self, id: InstallmentId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let before = tables.installments.len();
        tables.installments.retain(|i| i.id != id);
        if tables.installments.len() == before {
            return Err(not_found("installment", id));
        }
        Ok(())
    }
}
