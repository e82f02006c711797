//! Domain error model.
//!
//! - [`ValidationError`]: untrusted input rejected at construction, per field.
//! - [`ConstructionError`]: validated values still broke an entity invariant.
//! - [`DomainError`]: a behaviour method was rejected (broken invariant or
//!   missing authority) and the entity kept its previous state.
//!
//! Resolution failures (not found, scope expired) live with the resolver in
//! `steward-infra`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single field that failed validation, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Construction-time rejection of raw input.
///
/// Carries every failing field, not just the first, so a caller can fix the
/// whole input in one go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Error)]
#[error("validation failed: {}", render_failures(.failures))]
pub struct ValidationError {
    failures: Vec<FieldError>,
}

fn render_failures(failures: &[FieldError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push(field, reason);
        err
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Name of the first failing field.
    pub fn field(&self) -> Option<&str> {
        self.failures.first().map(|f| f.field.as_str())
    }

    pub fn failed(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }

    pub fn failures(&self) -> &[FieldError] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when nothing failed, otherwise the collected failures.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ConstructionError> for ValidationError {
    fn from(err: ConstructionError) -> Self {
        let mut out = ValidationError::new();
        for violation in err.violations {
            out.push(err.entity, violation);
        }
        out
    }
}

/// An entity could not be constructed because invariants failed.
///
/// No partially built entity is ever returned alongside this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot construct {entity}: {}", .violations.join("; "))]
pub struct ConstructionError {
    pub entity: &'static str,
    pub violations: Vec<String>,
}

/// Rejection of a behaviour method or identifier parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A behaviour method would have broken an invariant; state is unchanged.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The acting party lacks the capability required for the behaviour.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl DomainError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
