use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// opaque reference to the owning client; the engine only does foreign lookups
pub type ClientId = String;

/// derived loan state, recomputed on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// term has not yet elapsed relative to today
    Active,
    /// term fully elapsed, whether or not the balance was recovered
    Terminated,
}

/// a recorded payment against one day-slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub amount: Money,
    pub applied_at: DateTime<Utc>,
}

/// policy for abonos exceeding the remaining balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OvercapPolicy {
    /// cap at final_amount, silently dropping the excess
    #[default]
    Clip,
    /// fail the abono before any mutation
    Reject,
}

/// how an abono was distributed over the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AbonoApplication {
    pub requested: Money,
    pub applied: Money,
    pub clipped: Money,
    pub slots_touched: u32,
}

impl AbonoApplication {
    pub fn was_clipped(&self) -> bool {
        !self.clipped.is_zero()
    }
}
