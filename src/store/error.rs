//! Store error types
//!
//! Defines all errors that can occur in the state container.

use thiserror::Error;

/// Errors that can occur in the fitness store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record failed field validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No record with the given id exists in the collection
    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Export/import format error
    #[error("Export error: {0}")]
    Export(String),
}

impl StoreError {
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Export(err.to_string())
    }
}

/// A single field that failed validation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Check that a name-like field is not blank
pub(crate) fn require_name(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if value.len() > 200 {
        return Err(ValidationError::new(
            field,
            "exceeds maximum length of 200 characters",
        ));
    }
    Ok(())
}

/// Check that an optional numeric field is finite and not negative
pub(crate) fn require_non_negative(field: &str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::new(field, "must be a finite number")),
        Some(v) if v < 0.0 => Err(ValidationError::new(field, "must not be negative")),
        _ => Ok(()),
    }
}

/// Check that an optional 1-10 rating is in range
pub(crate) fn require_rating(field: &str, value: Option<u8>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(1..=10).contains(&v) => {
            Err(ValidationError::new(field, "must be between 1 and 10"))
        }
        _ => Ok(()),
    }
}
