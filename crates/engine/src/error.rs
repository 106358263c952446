//! The module contains the error the engine can throw.
//!
//! Each variant maps to one failure kind callers can react to:
//!
//! - [`InvalidInput`] / [`InvalidSplit`] / [`InvalidAmount`] / [`InvalidRole`] for
//!   malformed input.
//! - [`Credential`] when a password cannot be hashed.
//! - [`ExistingKey`] when a uniqueness rule would be violated.
//! - [`Forbidden`] when the caller's role is below the required threshold.
//! - [`InvalidOperation`] for owner, guest and self restrictions.
//! - [`KeyNotFound`] when an item is absent or belongs to another group.
//! - [`Unauthenticated`] when the caller identity cannot be established.
//!
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`Credential`]: EngineError::Credential
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidRole`]: EngineError::InvalidRole
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InvalidOperation`]: EngineError::InvalidOperation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Unauthenticated`]: EngineError::Unauthenticated
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for failures caused by the caller's input rather than by
    /// permissions, lookups or the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidAmount(_)
                | Self::InvalidSplit(_)
                | Self::InvalidRole(_)
                | Self::InvalidId(_)
                | Self::InvalidCursor(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidOperation(a), Self::InvalidOperation(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Unauthenticated(a), Self::Unauthenticated(b)) => a == b,
            (Self::Credential(a), Self::Credential(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
