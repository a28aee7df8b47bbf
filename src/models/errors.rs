use crate::storage::StoreError;
use thiserror::Error;

/// Failure taxonomy for the top-up service and the read paths behind it.
///
/// Broker failures are deliberately absent: publishes are best-effort and
/// are logged at the broker boundary instead of surfacing here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{reason}")]
    Validation {
        reason: String
    },
    #[error("Card [{uid}] was not found")]
    NotFound {
        uid: String
    },
    #[error(transparent)]
    Storage(#[from] StoreError)
}

impl ServiceError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn not_found(uid: impl Into<String>) -> Self {
        Self::NotFound { uid: uid.into() }
    }
}
