use std::error::Error as StdError;

use thiserror::Error;

use crate::model::EmployeeId;

pub type HrResult<T> = Result<T, HrError>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by [`crate::EmployeeService`].
#[derive(Debug, Error)]
pub enum HrError {
    /// Malformed input; raised before the store is touched.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("Employee Not Found For The Id {0}")]
    NotFound(EmployeeId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HrError {
    pub(crate) fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }

    /// Field named by a validation failure.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Opaque failure reported by an [`crate::EmployeeStore`] backend.
#[derive(Debug, Error)]
#[error("employee store failure: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StoreError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
