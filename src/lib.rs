pub mod amortization;
pub mod book;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod materializer;
pub mod money;
pub mod records;
pub mod reports;
pub mod status;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use amortization::{compute_schedule, AmortizationEngine, AmortizationSchedule, LoanTerms, ScheduleEntry};
pub use book::LoanBook;
pub use config::{LedgerConfig, RateBounds};
pub use context::{Caller, Role};
pub use errors::{LedgerError, Result};
pub use events::{EventStore, LedgerEvent};
pub use materializer::{MaterializeRequest, MaterializedLoan, ScheduleMaterializer};
pub use money::{Money, Rate};
pub use records::{Customer, CustomerDetails, Installment, Loan};
pub use reports::CollectionItem;
pub use status::{transition_status, LoanSummary};
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
pub use types::{CustomerId, InstallmentId, InstallmentStatus, LoanId, RemainderPolicy};
pub use views::{LoanView, ScheduleView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
