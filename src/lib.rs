pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod models;
pub mod origination;
pub mod payments;
pub mod seed;
pub mod store;
pub mod types;

// re-export key types
pub use config::{OriginationLimits, TrackerConfig};
pub use decimal::{Money, Rate};
pub use errors::{LoanError, PartialWrite, Result, Stage, StoreError};
pub use models::{Borrower, Installment, Loan, LoanTerms, NewBorrower, NewInstallment, NewLoan};
pub use origination::{validate_loan_terms, LoanTracker, Origination};
pub use payments::{
    compute_monthly_payment, InstallmentStatus, LoanStanding, ScheduleParams, SchedulePlan,
};
pub use seed::{SeedSummary, Seeder};
pub use store::{FailPoint, InMemoryStore, LoanStore, StoreResult};
pub use types::{BorrowerId, InstallmentId, LoanId, LoanStatus};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
