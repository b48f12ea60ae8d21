use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// derived payment schedule for a loan's terms
///
/// computed once at creation (or on an explicit term edit) and frozen:
/// `daily_payment` is never revised from the live recovered amount, so
/// recorded day-slots keep their meaning for the life of the loan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub principal: Money,
    pub monthly_rate: Rate,
    pub term_days: u32,
    pub total_interest: Money,
    pub final_amount: Money,
    pub daily_payment: Money,
}

/// compute the fixed schedule for the given terms
///
/// interest accrues linearly at `monthly_rate / 30` per day regardless of
/// actual month length; a deliberate simplification, not calendar-accurate
pub fn compute_schedule(principal: Money, monthly_rate: Rate, term_days: u32) -> Result<LoanSchedule> {
    if term_days == 0 {
        return Err(LedgerError::InvalidTerm { term_days });
    }
    if !principal.is_positive() {
        return Err(LedgerError::InvalidPrincipal { amount: principal });
    }
    if monthly_rate.is_negative() {
        return Err(LedgerError::InvalidInterestRate { rate: monthly_rate });
    }

    let months = Decimal::from(term_days) / dec!(30);
    let total_interest = principal * monthly_rate.as_decimal() * months;
    let final_amount = principal + total_interest;
    let daily_payment = final_amount / Decimal::from(term_days);

    Ok(LoanSchedule {
        principal,
        monthly_rate,
        term_days,
        total_interest,
        final_amount,
        daily_payment,
    })
}
