use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// Fixed monthly installment for a fully amortizing loan.
///
/// `P * r * (1 + r)^n / ((1 + r)^n - 1)` with `r = annual_rate / 12`. A zero rate is
/// `P / n` exactly, since the formula degenerates to 0/0 there. The result is not rounded.
pub fn compute_monthly_payment(principal: Money, annual_rate: Rate, term_months: u32) -> Result<Money> {
    if term_months == 0 {
        return Err(LoanError::validation("term_months", "must be positive, got 0"));
    }

    if annual_rate.is_zero() {
        return Ok(principal / Decimal::from(term_months));
    }

    let r = annual_rate.monthly_rate().as_decimal();
    let compound = compound_factor(Decimal::ONE + r, term_months)?;

    let numerator = principal
        .as_decimal()
        .checked_mul(r)
        .and_then(|x| x.checked_mul(compound))
        .ok_or_else(|| overflow(principal, annual_rate, term_months))?;
    let denominator = compound - Decimal::ONE;

    numerator
        .checked_div(denominator)
        .map(Money::from_decimal)
        .ok_or_else(|| overflow(principal, annual_rate, term_months))
}

/// what the borrower pays over the whole term (principal plus interest)
pub fn total_repayment(monthly_payment: Money, term_months: u32) -> Result<Money> {
    monthly_payment
        .checked_mul(Decimal::from(term_months))
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("total repayment overflows for {term_months} payments of {monthly_payment}"),
        })
}

/// interest portion of the total repayment
pub fn total_interest(principal: Money, monthly_payment: Money, term_months: u32) -> Result<Money> {
    total_repayment(monthly_payment, term_months)?
        .checked_sub(principal)
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("total interest out of range for principal {principal}"),
        })
}

fn compound_factor(base: Decimal, periods: u32) -> Result<Decimal> {
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(base).ok_or_else(|| LoanError::CalculationError {
            message: format!("compound factor overflows after {periods} periods"),
        })?;
    }
    Ok(factor)
}

fn overflow(principal: Money, annual_rate: Rate, term_months: u32) -> LoanError {
    LoanError::CalculationError {
        message: format!(
            "monthly payment out of range for principal {principal}, rate {annual_rate}, term {term_months}"
        ),
    }
}
