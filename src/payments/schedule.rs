use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::compute_due_date;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, PartialWrite, Result, Stage};
use crate::models::{Installment, Loan, NewInstallment};
use crate::payments::amortization::compute_monthly_payment;
use crate::store::LoanStore;
use crate::types::LoanId;

/// inputs of a loan's payment schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleParams {
    pub loan_id: LoanId,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub day_due: u32,
    pub date_taken: DateTime<Utc>,
    /// mark installments already due before `now` as paid on their due date
    pub auto_settle_past_due: bool,
}

impl ScheduleParams {
    pub fn for_loan(loan: &Loan, auto_settle_past_due: bool) -> Self {
        Self {
            loan_id: loan.id,
            principal: loan.principal,
            annual_rate: loan.annual_rate,
            term_months: loan.term_months,
            day_due: loan.day_due,
            date_taken: loan.date_taken,
            auto_settle_past_due,
        }
    }
}

/// full ordered list of installment creation requests for one loan
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePlan {
    pub loan_id: LoanId,
    pub monthly_payment: Money,
    pub installments: Vec<NewInstallment>,
}

impl SchedulePlan {
    /// Plan installments `1..=term_months`, every one carrying the same unrounded amount.
    ///
    /// With auto-settlement, an installment whose due date is strictly before `now` is
    /// recorded as paid in full on its due date; everything else starts unpaid.
    pub fn build(params: &ScheduleParams, now: DateTime<Utc>) -> Result<Self> {
        let monthly_payment =
            compute_monthly_payment(params.principal, params.annual_rate, params.term_months)?;

        let installments = (1..=params.term_months)
            .map(|number| {
                let due_date = compute_due_date(params.date_taken, number, params.day_due)?;
                let settled = params.auto_settle_past_due && due_date < now;

                Ok(NewInstallment {
                    loan_id: params.loan_id,
                    number,
                    amount_due: monthly_payment,
                    amount_paid: if settled { monthly_payment } else { Money::ZERO },
                    due_date,
                    paid_date: settled.then_some(due_date),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            loan_id: params.loan_id,
            monthly_payment,
            installments,
        })
    }

    /// Point the plan, and every request in it, at `loan_id`.
    ///
    /// Lets a schedule be planned before its loan record exists.
    pub fn assign_to(&mut self, loan_id: LoanId) {
        self.loan_id = loan_id;
        for request in &mut self.installments {
            request.loan_id = loan_id;
        }
    }

    /// how many installments the plan marks as already settled
    pub fn settled_count(&self) -> usize {
        self.installments.iter().filter(|i| i.paid_date.is_some()).count()
    }

    /// Persist the plan in ascending installment order.
    ///
    /// Stops at the first failed creation. Installments created before it stay in the
    /// store and are reported through the error's `PartialWrite`.
    pub fn persist(&self, store: &dyn LoanStore, mut partial: PartialWrite) -> Result<Vec<Installment>> {
        let mut created = Vec::with_capacity(self.installments.len());

        for request in &self.installments {
            let installment = store.create_installment(request).map_err(|e| {
                LoanError::from_store(
                    e,
                    Stage::CreateInstallment {
                        loan_id: self.loan_id,
                        number: request.number,
                    },
                    partial,
                )
            })?;

            debug!(
                loan_id = %self.loan_id,
                number = installment.number,
                due_date = %installment.due_date.date_naive(),
                settled = installment.paid_date.is_some(),
                "installment scheduled"
            );

            partial.installments_created += 1;
            created.push(installment);
        }

        Ok(created)
    }
}

/// Plan and persist a loan's schedule in one call.
pub fn build_schedule(
    store: &dyn LoanStore,
    params: &ScheduleParams,
    now: DateTime<Utc>,
    partial: PartialWrite,
) -> Result<Vec<Installment>> {
    SchedulePlan::build(params, now)?.persist(store, partial)
}
