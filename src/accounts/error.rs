use super::{codec::CodecError, hasher::HashError};
use crate::sparql::StoreError;
use thiserror::Error;

/// Failure of an account operation.
///
/// `Validation`, `NotFound` and `Authentication` carry a reason that is safe
/// to show to the caller; the remaining kinds are server-side faults.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authentication(String),
    /// The account exists but its hash or salt is absent, e.g. between the
    /// delete and insert halves of a rotation.
    #[error("credentials temporarily unavailable for {0}")]
    CredentialsUnavailable(String),
    /// The account exists but its nickname or status is absent, e.g. after
    /// an interrupted rewrite of that field.
    #[error("account fields temporarily unavailable for {0}")]
    FieldsUnavailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl AccountError {
    pub(crate) fn validation(reason: &str) -> Self {
        Self::Validation(reason.to_string())
    }

    pub(crate) fn authentication(reason: &str) -> Self {
        Self::Authentication(reason.to_string())
    }
}
