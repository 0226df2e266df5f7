use chrono::{DateTime, TimeZone, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use tracing::{info, instrument, warn};

use crate::config::{OriginationLimits, TrackerConfig};
use crate::decimal::Money;
use crate::errors::{LoanError, PartialWrite, Result, Stage};
use crate::models::{Borrower, Installment, Loan, LoanTerms, NewBorrower, NewLoan};
use crate::payments::schedule::{ScheduleParams, SchedulePlan};
use crate::payments::status::LoanStanding;
use crate::store::LoanStore;
use crate::types::{BorrowerId, InstallmentId, LoanId, LoanStatus};
use uuid::Uuid;

/// Check loan parameters before anything is written.
///
/// `date_taken` may lie anywhere in the past or the future; only a missing one is rejected.
pub fn validate_loan_terms(
    terms: &LoanTerms,
    date_taken: Option<DateTime<Utc>>,
    limits: &OriginationLimits,
) -> Result<()> {
    if !terms.principal.is_positive() {
        return Err(LoanError::validation(
            "principal",
            format!("must be positive, got {}", terms.principal),
        ));
    }

    if terms.annual_rate.is_negative() {
        return Err(LoanError::validation(
            "annual_rate",
            format!("cannot be negative, got {}", terms.annual_rate.as_decimal()),
        ));
    }

    if terms.term_months == 0 {
        return Err(LoanError::validation("term_months", "must be positive, got 0"));
    }

    if !(1..=31).contains(&terms.day_due) {
        return Err(LoanError::validation(
            "day_due",
            format!("must be between 1 and 31, got {}", terms.day_due),
        ));
    }

    require_date_taken(date_taken)?;

    if let Some(max) = limits.max_principal {
        if terms.principal > max {
            return Err(LoanError::validation(
                "principal",
                format!("exceeds limit {max}, got {}", terms.principal),
            ));
        }
    }

    if let Some(max) = limits.max_term_months {
        if terms.term_months > max {
            return Err(LoanError::validation(
                "term_months",
                format!("exceeds limit {max}, got {}", terms.term_months),
            ));
        }
    }

    Ok(())
}

fn require_date_taken(date_taken: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    date_taken.ok_or_else(|| LoanError::validation("date_taken", "is required"))
}

/// One origination run, executed stage by stage.
///
/// Construction validates the terms and plans the whole schedule, so every calculation
/// failure surfaces before the first write. Each stage persists one step and extends the
/// running `PartialWrite`; a failing stage reports everything written before it and
/// nothing is rolled back.
pub struct Origination<'a> {
    store: &'a dyn LoanStore,
    terms: LoanTerms,
    status: LoanStatus,
    date_taken: DateTime<Utc>,
    plan: SchedulePlan,
    partial: PartialWrite,
}

impl<'a> Origination<'a> {
    pub fn new(
        store: &'a dyn LoanStore,
        config: &TrackerConfig,
        terms: LoanTerms,
        date_taken: Option<DateTime<Utc>>,
        auto_settle_past_due: bool,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_loan_terms(&terms, date_taken, &config.limits)?;
        let date_taken = require_date_taken(date_taken)?;

        // loan id is assigned once the loan record exists
        let params = ScheduleParams {
            loan_id: Uuid::nil(),
            principal: terms.principal,
            annual_rate: terms.annual_rate,
            term_months: terms.term_months,
            day_due: terms.day_due,
            date_taken,
            auto_settle_past_due,
        };
        let plan = SchedulePlan::build(&params, now)?;

        let status = terms
            .status
            .clone()
            .unwrap_or_else(|| config.default_status.clone());

        Ok(Self {
            store,
            terms,
            status,
            date_taken,
            plan,
            partial: PartialWrite::default(),
        })
    }

    /// the schedule this run will persist
    pub fn plan(&self) -> &SchedulePlan {
        &self.plan
    }

    /// records persisted so far
    pub fn partial(&self) -> PartialWrite {
        self.partial
    }

    /// stage: create a new borrower
    pub fn create_borrower(&mut self, borrower: &NewBorrower) -> Result<Borrower> {
        let created = self
            .store
            .create_borrower(borrower)
            .map_err(|e| LoanError::from_store(e, Stage::CreateBorrower, self.partial))?;
        self.partial.borrower_id = Some(created.id);
        Ok(created)
    }

    /// stage: confirm an existing borrower
    pub fn verify_borrower(&mut self, borrower_id: BorrowerId) -> Result<Borrower> {
        self.store
            .get_borrower(borrower_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchBorrower, self.partial))
    }

    /// stage: create the loan record
    pub fn create_loan(&mut self, borrower_id: BorrowerId) -> Result<Loan> {
        let request = NewLoan {
            borrower_id,
            principal: self.terms.principal,
            annual_rate: self.terms.annual_rate,
            term_months: self.terms.term_months,
            day_due: self.terms.day_due,
            status: self.status.clone(),
            date_taken: self.date_taken,
        };
        let loan = self
            .store
            .create_loan(&request)
            .map_err(|e| LoanError::from_store(e, Stage::CreateLoan { borrower_id }, self.partial))?;
        self.partial.loan_id = Some(loan.id);
        Ok(loan)
    }

    /// stage: persist the planned payment schedule under `loan`
    pub fn create_schedule(&mut self, loan: &Loan) -> Result<Vec<Installment>> {
        self.plan.assign_to(loan.id);

        let result = self.plan.persist(self.store, self.partial);
        match &result {
            Ok(created) => self.partial.installments_created = created.len() as u32,
            Err(LoanError::Storage { partial, .. }) => self.partial = *partial,
            Err(_) => {}
        }
        result
    }
}

/// Loan origination and query facade over a persistence collaborator.
///
/// "Now" comes from the owned time provider, so backdating, auto-settlement and
/// overdue evaluation are deterministic under a test clock.
pub struct LoanTracker<S: LoanStore> {
    store: S,
    time: SafeTimeProvider,
    config: TrackerConfig,
}

impl<S: LoanStore> LoanTracker<S> {
    /// tracker on system time with default configuration
    pub fn new(store: S) -> Self {
        Self::with_time(store, SafeTimeProvider::new(TimeSource::System))
    }

    pub fn with_time(store: S, time: SafeTimeProvider) -> Self {
        Self {
            store,
            time,
            config: TrackerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    fn begin<Tz: TimeZone>(
        &self,
        terms: LoanTerms,
        date_taken: DateTime<Tz>,
        auto_settle_past_due: bool,
    ) -> Result<Origination<'_>> {
        Origination::new(
            &self.store,
            &self.config,
            terms,
            Some(date_taken.with_timezone(&Utc)),
            auto_settle_past_due,
            self.time.now(),
        )
    }

    /// Create a borrower, their loan and the loan's full schedule.
    ///
    /// Returns the borrower carrying that one loan with its installments attached.
    #[instrument(
        name = "loan_tracker.originate_for_new_borrower",
        skip(self, borrower, terms, date_taken),
        fields(email = %borrower.email, principal = %terms.principal, term_months = terms.term_months),
        err
    )]
    pub fn originate_loan_for_new_borrower<Tz: TimeZone>(
        &self,
        borrower: &NewBorrower,
        terms: LoanTerms,
        date_taken: DateTime<Tz>,
        auto_settle_past_due: bool,
    ) -> Result<Borrower> {
        let mut run = self.begin(terms, date_taken, auto_settle_past_due)?;

        let result = (|| -> Result<Borrower> {
            let mut created = run.create_borrower(borrower)?;
            let mut loan = run.create_loan(created.id)?;
            loan.installments = run.create_schedule(&loan)?;
            created.loans = vec![loan];
            Ok(created)
        })();

        log_outcome(&result, run.partial());
        result
    }

    /// `originate_loan_for_new_borrower` taken today, without auto-settlement
    pub fn originate_loan_for_new_borrower_now(
        &self,
        borrower: &NewBorrower,
        terms: LoanTerms,
    ) -> Result<Borrower> {
        self.originate_loan_for_new_borrower(borrower, terms, self.time.now(), false)
    }

    /// Add a loan with its full schedule to a borrower that already exists.
    #[instrument(
        name = "loan_tracker.add_loan_to_borrower",
        skip(self, terms, date_taken),
        fields(principal = %terms.principal, term_months = terms.term_months),
        err
    )]
    pub fn add_loan_to_borrower<Tz: TimeZone>(
        &self,
        borrower_id: BorrowerId,
        terms: LoanTerms,
        date_taken: DateTime<Tz>,
        auto_settle_past_due: bool,
    ) -> Result<Loan> {
        let mut run = self.begin(terms, date_taken, auto_settle_past_due)?;

        let result = (|| -> Result<Loan> {
            run.verify_borrower(borrower_id)?;
            let mut loan = run.create_loan(borrower_id)?;
            loan.installments = run.create_schedule(&loan)?;
            Ok(loan)
        })();

        log_outcome(&result, run.partial());
        result
    }

    /// `add_loan_to_borrower` taken today, without auto-settlement
    pub fn add_loan_to_borrower_now(&self, borrower_id: BorrowerId, terms: LoanTerms) -> Result<Loan> {
        self.add_loan_to_borrower(borrower_id, terms, self.time.now(), false)
    }

    /// origination using the configured auto-settlement default
    pub fn originate_with_defaults<Tz: TimeZone>(
        &self,
        borrower: &NewBorrower,
        terms: LoanTerms,
        date_taken: DateTime<Tz>,
    ) -> Result<Borrower> {
        self.originate_loan_for_new_borrower(borrower, terms, date_taken, self.config.auto_settle_past_due)
    }

    /// Borrower with every loan, each with every installment.
    #[instrument(name = "loan_tracker.get_full_borrower", skip(self), err)]
    pub fn get_full_borrower(&self, borrower_id: BorrowerId) -> Result<Borrower> {
        let mut borrower = self
            .store
            .get_borrower(borrower_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchBorrower, PartialWrite::default()))?;

        let mut loans = self
            .store
            .loans_by_borrower(borrower_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchLoans, PartialWrite::default()))?;

        for loan in &mut loans {
            loan.installments = self.fetch_installments(loan.id)?;
        }

        borrower.loans = loans;
        Ok(borrower)
    }

    /// Loan with every installment in number order.
    #[instrument(name = "loan_tracker.get_full_loan", skip(self), err)]
    pub fn get_full_loan(&self, loan_id: LoanId) -> Result<Loan> {
        let mut loan = self
            .store
            .get_loan(loan_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchLoans, PartialWrite::default()))?;
        loan.installments = self.fetch_installments(loan_id)?;
        Ok(loan)
    }

    /// derived standing of a loan as of the tracker's current time
    pub fn loan_standing(&self, loan_id: LoanId) -> Result<LoanStanding> {
        let loan = self.get_full_loan(loan_id)?;
        LoanStanding::evaluate(&loan, self.time.now())
    }

    /// Apply money received against one installment.
    ///
    /// Adds `amount` to what was already paid and stamps `paid_on` as the paid date.
    #[instrument(name = "loan_tracker.record_payment", skip(self, amount, paid_on), fields(amount = %amount), err)]
    pub fn record_payment<Tz: TimeZone>(
        &self,
        installment_id: InstallmentId,
        amount: Money,
        paid_on: DateTime<Tz>,
    ) -> Result<Installment> {
        if !amount.is_positive() {
            return Err(LoanError::validation(
                "amount",
                format!("must be positive, got {amount}"),
            ));
        }

        let current = self
            .store
            .get_installment(installment_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchInstallments, PartialWrite::default()))?;

        let total = current
            .amount_paid
            .checked_add(amount)
            .ok_or_else(|| LoanError::CalculationError {
                message: format!("amount paid overflows for installment {installment_id}"),
            })?;

        let updated = self
            .store
            .record_settlement(installment_id, total, Some(paid_on.with_timezone(&Utc)))
            .map_err(|e| LoanError::from_store(e, Stage::Update, PartialWrite::default()))?;

        info!(
            loan_id = %updated.loan_id,
            number = updated.number,
            amount_paid = %updated.amount_paid,
            "payment recorded"
        );
        Ok(updated)
    }

    /// change a loan's lifecycle status
    #[instrument(name = "loan_tracker.set_loan_status", skip(self), err)]
    pub fn set_loan_status(&self, loan_id: LoanId, status: LoanStatus) -> Result<Loan> {
        self.store
            .update_loan_status(loan_id, status)
            .map_err(|e| LoanError::from_store(e, Stage::Update, PartialWrite::default()))
    }

    fn fetch_installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        self.store
            .installments_by_loan(loan_id)
            .map_err(|e| LoanError::from_store(e, Stage::FetchInstallments, PartialWrite::default()))
    }
}

fn log_outcome<T>(result: &Result<T>, partial: PartialWrite) {
    match result {
        Ok(_) => info!(
            borrower_id = ?partial.borrower_id,
            loan_id = ?partial.loan_id,
            installments = partial.installments_created,
            "loan originated"
        ),
        Err(err) if !partial.is_empty() => warn!(
            borrower_id = ?partial.borrower_id,
            loan_id = ?partial.loan_id,
            installments = partial.installments_created,
            error = %err,
            "origination halted with records left in storage"
        ),
        Err(_) => {}
    }
}
