use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::types::{BorrowerId, LoanId};

/// failure reported by a persistence collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("duplicate {field}: {value}")]
    Duplicate {
        field: &'static str,
        value: String,
    },

    #[error("storage backend error: {message}")]
    Backend {
        message: String,
    },
}

/// step of a multi-step workflow at which a storage call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateBorrower,
    CreateLoan { borrower_id: BorrowerId },
    CreateInstallment { loan_id: LoanId, number: u32 },
    FetchBorrower,
    FetchLoans,
    FetchInstallments,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CreateBorrower => write!(f, "borrower creation"),
            Stage::CreateLoan { borrower_id } => {
                write!(f, "loan creation for borrower {borrower_id}")
            }
            Stage::CreateInstallment { loan_id, number } => {
                write!(f, "installment {number} creation for loan {loan_id}")
            }
            Stage::FetchBorrower => write!(f, "borrower lookup"),
            Stage::FetchLoans => write!(f, "loan lookup"),
            Stage::FetchInstallments => write!(f, "installment lookup"),
            Stage::Update => write!(f, "update"),
        }
    }
}

/// records persisted by a workflow before it stopped
///
/// Nothing listed here is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartialWrite {
    pub borrower_id: Option<BorrowerId>,
    pub loan_id: Option<LoanId>,
    pub installments_created: u32,
}

impl PartialWrite {
    pub fn is_empty(&self) -> bool {
        self.borrower_id.is_none() && self.loan_id.is_none() && self.installments_created == 0
    }
}

impl fmt::Display for PartialWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing persisted");
        }
        let mut parts = Vec::new();
        if let Some(id) = self.borrower_id {
            parts.push(format!("borrower {id}"));
        }
        if let Some(id) = self.loan_id {
            parts.push(format!("loan {id}"));
        }
        if self.installments_created > 0 {
            parts.push(format!("{} installment(s)", self.installments_created));
        }
        write!(f, "left persisted: {}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{entity} {id} not found")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("duplicate {field}: {value}")]
    Duplicate {
        field: &'static str,
        value: String,
    },

    #[error("storage failure during {stage} ({partial}): {source}")]
    Storage {
        stage: Stage,
        partial: PartialWrite,
        #[source]
        source: StoreError,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LoanError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LoanError::Validation {
            field,
            message: message.into(),
        }
    }

    /// lift a collaborator failure, keeping not-found and duplicate as their own classes
    pub fn from_store(err: StoreError, stage: Stage, partial: PartialWrite) -> Self {
        match err {
            StoreError::NotFound { entity, id } if partial.is_empty() => {
                LoanError::NotFound { entity, id }
            }
            StoreError::Duplicate { field, value } if partial.is_empty() => {
                LoanError::Duplicate { field, value }
            }
            source => LoanError::Storage {
                stage,
                partial,
                source,
            },
        }
    }

    /// what the failed workflow left behind, if anything
    pub fn partial_write(&self) -> Option<&PartialWrite> {
        match self {
            LoanError::Storage { partial, .. } if !partial.is_empty() => Some(partial),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoanError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_field() {
        let err = LoanError::validation("day_due", "must be between 1 and 31, got 32");
        assert_eq!(err.to_string(), "invalid day_due: must be between 1 and 31, got 32");
    }

    #[test]
    fn test_store_not_found_is_lifted_when_nothing_written() {
        let id = Uuid::new_v4();
        let err = LoanError::from_store(
            StoreError::NotFound { entity: "borrower", id },
            Stage::FetchBorrower,
            PartialWrite::default(),
        );
        assert!(err.is_not_found());
        assert!(err.partial_write().is_none());
    }

    #[test]
    fn test_storage_error_names_installment_and_loan() {
        let loan_id = Uuid::new_v4();
        let partial = PartialWrite {
            borrower_id: None,
            loan_id: Some(loan_id),
            installments_created: 4,
        };
        let err = LoanError::from_store(
            StoreError::Backend { message: "connection reset".to_string() },
            Stage::CreateInstallment { loan_id, number: 5 },
            partial,
        );

        let text = err.to_string();
        assert!(text.contains("installment 5 creation"));
        assert!(text.contains(&loan_id.to_string()));
        assert!(text.contains("4 installment(s)"));
        assert!(text.contains("connection reset"));
        assert_eq!(err.partial_write(), Some(&partial));
    }
}
