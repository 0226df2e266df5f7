use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a borrower
pub type BorrowerId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a scheduled installment
pub type InstallmentId = Uuid;

/// loan lifecycle status
///
/// Stored as a plain string so caller-defined statuses survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LoanStatus {
    Active,
    PaidOff,
    Defaulted,
    Refinanced,
    Other(String),
}

impl LoanStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::PaidOff => "paid_off",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Refinanced => "refinanced",
            LoanStatus::Other(s) => s.as_str(),
        }
    }
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Active
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LoanStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => LoanStatus::Active,
            "paid_off" => LoanStatus::PaidOff,
            "defaulted" => LoanStatus::Defaulted,
            "refinanced" => LoanStatus::Refinanced,
            other => LoanStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for LoanStatus {
    fn from(s: String) -> Self {
        LoanStatus::from(s.as_str())
    }
}

impl From<LoanStatus> for String {
    fn from(status: LoanStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for LoanStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LoanStatus::from(s))
    }
}
