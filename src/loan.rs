use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::schedule::{compute_schedule, LoanSchedule};
use crate::status;
use crate::types::{ClientId, LoanId, LoanStatus, PaymentEntry};

/// a short-term daily-payment loan
///
/// `final_amount` and `daily_payment` are frozen at creation; edits go
/// through the ledger's `edit_terms`, which recomputes them explicitly.
/// Active/Terminated is never stored on the record, see [`Loan::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub client_id: ClientId,

    // terms
    pub principal: Money,
    pub monthly_interest_rate: Rate,
    pub start_date: NaiveDate,
    pub term_days: u32,

    // derived, frozen at creation / explicit edit
    pub final_amount: Money,
    pub daily_payment: Money,

    // ledger state
    pub recovered_amount: Money,
    /// slot `i` is calendar day `start_date + i`; `None` means unpaid
    pub payment_history: Vec<Option<PaymentEntry>>,

    // bookkeeping
    pub created_at: DateTime<Utc>,
    /// optimistic-concurrency token, bumped by the repository on update
    pub version: u64,
}

impl Loan {
    /// create a loan with a freshly computed schedule and an empty ledger
    pub fn new(
        client_id: ClientId,
        principal: Money,
        monthly_interest_rate: Rate,
        start_date: NaiveDate,
        term_days: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let schedule = compute_schedule(principal, monthly_interest_rate, term_days)?;

        Ok(Self {
            id: Uuid::new_v4(),
            client_id,
            principal,
            monthly_interest_rate,
            start_date,
            term_days,
            final_amount: schedule.final_amount,
            daily_payment: schedule.daily_payment,
            recovered_amount: Money::ZERO,
            payment_history: vec![None; term_days as usize],
            created_at,
            version: 0,
        })
    }

    /// the loan's frozen schedule, reassembled from the record
    pub fn schedule(&self) -> LoanSchedule {
        LoanSchedule {
            principal: self.principal,
            monthly_rate: self.monthly_interest_rate,
            term_days: self.term_days,
            total_interest: self.final_amount - self.principal,
            final_amount: self.final_amount,
            daily_payment: self.daily_payment,
        }
    }

    /// derived Active/Terminated state for the given day
    pub fn status(&self, today: NaiveDate) -> LoanStatus {
        status::classify(self.start_date, self.term_days, today)
    }

    /// first calendar day past the term
    pub fn end_date(&self) -> NaiveDate {
        status::end_date(self.start_date, self.term_days)
    }

    /// balance still to recover
    pub fn outstanding(&self) -> Money {
        (self.final_amount - self.recovered_amount).max(Money::ZERO)
    }

    /// whether the full final amount has been recovered
    pub fn is_fully_recovered(&self) -> bool {
        self.recovered_amount >= self.final_amount
    }

    /// number of day-slots holding a recorded payment
    pub fn paid_day_count(&self) -> usize {
        self.payment_history.iter().filter(|s| s.is_some()).count()
    }

    /// sum of recorded entries; must always equal `recovered_amount`
    pub fn history_total(&self) -> Money {
        self.payment_history
            .iter()
            .flatten()
            .map(|entry| entry.amount)
            .sum()
    }
}
