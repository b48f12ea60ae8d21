use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::LoanId;

/// persistence boundary for loans
///
/// the engine never persists directly: ledger operations compute a next
/// state and hand it to this trait. Implementations must provide
/// read-after-write consistency and serialize writes per loan id; `update`
/// is a compare-and-swap on the loan's version, so two callers working
/// from the same stale read cannot silently overwrite each other.
pub trait LoanRepository {
    fn create(&self, loan: Loan) -> Result<Loan>;
    fn get(&self, id: LoanId) -> Result<Loan>;
    fn update(&self, loan: Loan) -> Result<Loan>;
    fn delete(&self, id: LoanId) -> Result<()>;
    fn list_by_client(&self, client_id: &str) -> Result<Vec<Loan>>;
}

/// in-memory reference implementation backing the service and tests
#[derive(Debug, Default)]
pub struct InMemoryLoanRepository {
    loans: Mutex<HashMap<LoanId, Loan>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn create(&self, mut loan: Loan) -> Result<Loan> {
        let mut loans = self.loans.lock().unwrap();
        loan.version = 1;
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn get(&self, id: LoanId) -> Result<Loan> {
        let loans = self.loans.lock().unwrap();
        loans.get(&id).cloned().ok_or(LedgerError::NotFound { id })
    }

    fn update(&self, mut loan: Loan) -> Result<Loan> {
        let mut loans = self.loans.lock().unwrap();
        let stored = loans
            .get(&loan.id)
            .ok_or(LedgerError::NotFound { id: loan.id })?;

        if stored.version != loan.version {
            return Err(LedgerError::ConcurrentModification {
                id: loan.id,
                expected: loan.version,
                found: stored.version,
            });
        }

        loan.version += 1;
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn delete(&self, id: LoanId) -> Result<()> {
        let mut loans = self.loans.lock().unwrap();
        loans
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::NotFound { id })
    }

    fn list_by_client(&self, client_id: &str) -> Result<Vec<Loan>> {
        let loans = self.loans.lock().unwrap();
        let mut matching: Vec<Loan> = loans
            .values()
            .filter(|loan| loan.client_id == client_id)
            .cloned()
            .collect();
        matching.sort_by_key(|loan| loan.created_at);
        Ok(matching)
    }
}
