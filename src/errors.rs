use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid term: {term_days} days")]
    InvalidTerm {
        term_days: u32,
    },

    #[error("invalid abono amount: {amount}")]
    InvalidAbono {
        amount: Money,
    },

    #[error("abono exceeds remaining balance: remaining {remaining}, requested {requested}")]
    AbonoExceedsBalance {
        remaining: Money,
        requested: Money,
    },

    #[error("day index out of range: index {index}, term {term_days} days")]
    IndexOutOfRange {
        index: usize,
        term_days: u32,
    },

    #[error("loan not found: {id}")]
    NotFound {
        id: LoanId,
    },

    #[error("concurrent modification of loan {id}: expected version {expected}, found {found}")]
    ConcurrentModification {
        id: LoanId,
        expected: u64,
        found: u64,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
