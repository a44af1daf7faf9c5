//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps them onto status codes in `api::error`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// The addressed resource does not exist in this library
    #[error("{0}")]
    NotFound(String),
    /// Structural validation failure (dates, enumerations, ranges)
    #[error("{0}")]
    Validation(String),
    /// Cross-entity circulation rule rejected the operation
    #[error("{0}")]
    Rule(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn rule(msg: impl Into<String>) -> Self {
        DomainError::Rule(msg.into())
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}
