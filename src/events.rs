use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ClientId, LoanId};

/// all events emitted by ledger operations; the crate's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanCreated {
        loan_id: LoanId,
        client_id: ClientId,
        principal: Money,
        final_amount: Money,
        daily_payment: Money,
        start_date: NaiveDate,
        term_days: u32,
    },
    AbonoApplied {
        loan_id: LoanId,
        requested: Money,
        applied: Money,
        new_recovered: Money,
        slots_touched: u32,
        timestamp: DateTime<Utc>,
    },
    AbonoClipped {
        loan_id: LoanId,
        requested: Money,
        clipped: Money,
        final_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanFullyRecovered {
        loan_id: LoanId,
        final_amount: Money,
        timestamp: DateTime<Utc>,
    },
    DayMarked {
        loan_id: LoanId,
        day_index: usize,
        paid: bool,
        new_recovered: Money,
        timestamp: DateTime<Utc>,
    },
    TermsEdited {
        loan_id: LoanId,
        old_final_amount: Money,
        new_final_amount: Money,
        old_term_days: u32,
        new_term_days: u32,
        new_recovered: Money,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LoanEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LoanEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LoanEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
