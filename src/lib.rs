pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod repository;
pub mod schedule;
pub mod serialization;
pub mod service;
pub mod status;
pub mod types;

// re-export key types
pub use config::LedgerConfig;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{EventStore, LoanEvent};
pub use ledger::{apply_abono, edit_terms, mark_day_paid, AbonoResult, TermsPatch};
pub use loan::Loan;
pub use repository::{InMemoryLoanRepository, LoanRepository};
pub use schedule::{compute_schedule, LoanSchedule};
pub use serialization::LoanView;
pub use service::{LoanService, NewLoanRequest};
pub use status::{classify, classify_now, end_date};
pub use types::{
    AbonoApplication, ClientId, LoanId, LoanStatus, OvercapPolicy, PaymentEntry,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
