/// serialization support for presenting loans to callers
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::loan::Loan;
use crate::types::{ClientId, LoanId, LoanStatus};

/// presentation snapshot of a loan
///
/// the classification is computed at build time, never read from storage,
/// and monetary fields carry two-decimal display rounding; this view is
/// the only place that rounding happens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub client_id: ClientId,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub term_days: u32,
    pub monthly_interest_rate: Decimal,
    pub principal: Money,
    pub final_amount: Money,
    pub daily_payment: Money,
    pub recovered_amount: Money,
    pub outstanding: Money,
    pub days_paid: usize,
    pub fully_recovered: bool,
    pub created_at: DateTime<Utc>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, today: NaiveDate) -> Self {
        LoanView {
            id: loan.id,
            client_id: loan.client_id.clone(),
            status: loan.status(today),
            start_date: loan.start_date,
            end_date: loan.end_date(),
            term_days: loan.term_days,
            monthly_interest_rate: loan.monthly_interest_rate.as_percentage(),
            principal: loan.principal.round_dp(2),
            final_amount: loan.final_amount.round_dp(2),
            daily_payment: loan.daily_payment.round_dp(2),
            recovered_amount: loan.recovered_amount.round_dp(2),
            outstanding: loan.outstanding().round_dp(2),
            days_paid: loan.paid_day_count(),
            fully_recovered: loan.is_fully_recovered(),
            created_at: loan.created_at,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
