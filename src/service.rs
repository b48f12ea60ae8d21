use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{EventStore, LoanEvent};
use crate::ledger::{self, TermsPatch};
use crate::loan::Loan;
use crate::repository::LoanRepository;
use crate::serialization::LoanView;
use crate::types::{ClientId, LoanId};

/// request shape for loan creation
#[derive(Debug, Clone)]
pub struct NewLoanRequest {
    pub client_id: ClientId,
    pub principal: Money,
    pub monthly_interest_rate: Rate,
    pub start_date: NaiveDate,
    pub term_days: u32,
}

/// engine boundary wiring the pure components to the repository
///
/// every mutation follows the same cycle: fetch the current record,
/// compute the next state, attempt to persist it, and only then publish
/// the audit events. When persistence fails the computed state and its
/// events are discarded; the caller retries against a fresh read.
pub struct LoanService<R: LoanRepository> {
    repository: R,
    config: LedgerConfig,
    events: EventStore,
}

impl<R: LoanRepository> LoanService<R> {
    pub fn new(repository: R, config: LedgerConfig) -> Self {
        Self {
            repository,
            config,
            events: EventStore::new(),
        }
    }

    /// create a loan with a freshly computed schedule
    pub fn create_loan(
        &mut self,
        request: NewLoanRequest,
        time: &SafeTimeProvider,
    ) -> Result<LoanView> {
        let loan = Loan::new(
            request.client_id,
            request.principal,
            request.monthly_interest_rate,
            request.start_date,
            request.term_days,
            time.now(),
        )?;

        let stored = self.repository.create(loan)?;

        self.events.emit(LoanEvent::LoanCreated {
            loan_id: stored.id,
            client_id: stored.client_id.clone(),
            principal: stored.principal,
            final_amount: stored.final_amount,
            daily_payment: stored.daily_payment,
            start_date: stored.start_date,
            term_days: stored.term_days,
        });

        Ok(LoanView::from_loan(&stored, time.now().date_naive()))
    }

    /// apply a partial repayment against a loan
    pub fn apply_abono(
        &mut self,
        loan_id: LoanId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<LoanView> {
        let current = self.repository.get(loan_id)?;

        let mut staged = EventStore::new();
        let result = ledger::apply_abono(
            &current,
            amount,
            self.config.overcap_policy,
            time.now(),
            &mut staged,
        )?;

        let stored = self.repository.update(result.loan)?;
        self.publish(staged);

        Ok(LoanView::from_loan(&stored, time.now().date_naive()))
    }

    /// toggle one day-slot paid or unpaid
    pub fn mark_day(
        &mut self,
        loan_id: LoanId,
        day_index: usize,
        paid: bool,
        time: &SafeTimeProvider,
    ) -> Result<LoanView> {
        let current = self.repository.get(loan_id)?;

        let mut staged = EventStore::new();
        let next = ledger::mark_day_paid(&current, day_index, paid, time.now(), &mut staged)?;

        let stored = self.repository.update(next)?;
        self.publish(staged);

        Ok(LoanView::from_loan(&stored, time.now().date_naive()))
    }

    /// revise a loan's terms
    pub fn edit_terms(
        &mut self,
        loan_id: LoanId,
        patch: TermsPatch,
        time: &SafeTimeProvider,
    ) -> Result<LoanView> {
        let current = self.repository.get(loan_id)?;

        let mut staged = EventStore::new();
        let next = ledger::edit_terms(&current, patch, time.now(), &mut staged)?;

        let stored = self.repository.update(next)?;
        self.publish(staged);

        Ok(LoanView::from_loan(&stored, time.now().date_naive()))
    }

    /// delete a loan; unconditional, cascades nothing
    pub fn delete_loan(&mut self, loan_id: LoanId, time: &SafeTimeProvider) -> Result<()> {
        self.repository.delete(loan_id)?;
        self.events.emit(LoanEvent::LoanDeleted {
            loan_id,
            timestamp: time.now(),
        });
        Ok(())
    }

    /// list a client's loans, each classified at response time
    pub fn list_by_client(
        &self,
        client_id: &str,
        time: &SafeTimeProvider,
    ) -> Result<Vec<LoanView>> {
        let today = time.now().date_naive();
        let loans = self.repository.list_by_client(client_id)?;
        Ok(loans
            .iter()
            .map(|loan| LoanView::from_loan(loan, today))
            .collect())
    }

    /// drain the published audit events
    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        self.events.take_events()
    }

    fn publish(&mut self, mut staged: EventStore) {
        for event in staged.take_events() {
            self.events.emit(event);
        }
    }
}
