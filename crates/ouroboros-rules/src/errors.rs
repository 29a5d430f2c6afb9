//! Validation error types
//!
//! Validation failures are plain data collected per field; configuration
//! mistakes in a schema are reported through [`SchemaError`].

use crate::types::{RuleType, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Validation Result
// ============================================================================

/// Result of a validation run: the (possibly transformed) source on success
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Errors grouped by fully-qualified field path
pub type ValidateFieldsError = HashMap<String, Vec<ValidateError>>;

// ============================================================================
// Single Validation Error
// ============================================================================

/// A single failed check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateError {
    /// Human-readable error message
    pub message: String,

    /// Fully-qualified field path (e.g., "address.city", "tags.0")
    pub field: String,

    /// The value that was checked, if the field was present
    pub field_value: Option<Value>,

    /// Where the error came from
    pub kind: ErrorKind,
}

impl ValidateError {
    /// Create a new rule error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
            field_value: None,
            kind: ErrorKind::Rule,
        }
    }

    /// Attach the offending value
    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.field_value = value;
        self
    }

    /// Override the error kind
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.field, self.message, self.kind)
    }
}

// ============================================================================
// Error Kind Classification
// ============================================================================

/// Classification of a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    /// A rule rejected the data (built-in checker or custom validator)
    #[default]
    Rule,

    /// A custom validator broke its calling convention or panicked
    Validator,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Validator => write!(f, "validator"),
        }
    }
}

// ============================================================================
// Validation Errors Collection
// ============================================================================

/// Ordered error list plus the same errors grouped by field
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    /// Errors in schema field order (or completion order under `first`)
    pub errors: Vec<ValidateError>,

    /// Errors keyed by field path, each list in rule order
    pub fields: ValidateFieldsError,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build both views from a flat, ordered list
    pub fn from_errors(errors: Vec<ValidateError>) -> Self {
        let mut fields = ValidateFieldsError::new();
        for error in &errors {
            fields
                .entry(error.field.clone())
                .or_default()
                .push(error.clone());
        }
        Self { errors, fields }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add a validation error to both views
    pub fn add(&mut self, error: ValidateError) {
        self.fields
            .entry(error.field.clone())
            .or_default()
            .push(error.clone());
        self.errors.push(error);
    }

    /// Errors recorded for one field path
    pub fn field(&self, field: &str) -> &[ValidateError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages in order, convenient for assertions and logging
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Convert to Result - Ok if no errors, Err if there are errors
    pub fn into_result<T>(self, ok: T) -> ValidationResult<T> {
        if self.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }

    /// Get errors as a slice
    pub fn as_slice(&self) -> &[ValidateError] {
        &self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Schema (configuration) errors
// ============================================================================

/// A mistake in the schema itself, reported before any data is checked
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unknown rule type {rule_type} on field {field}")]
    UnknownType { field: String, rule_type: RuleType },

    #[error("Field {0} has an empty rule list")]
    EmptyRules(String),

    #[error("Invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid rule definition for {field}: {reason}")]
    InvalidDefinition { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_empty() {
        let errors = ValidationErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.len(), 0);
        assert_eq!(errors.into_result(1).unwrap(), 1);
    }

    #[test]
    fn test_validation_errors_add_keeps_views_in_sync() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidateError::new("age", "age is required"));
        errors.add(ValidateError::new("name", "name is not a string"));
        errors.add(ValidateError::new("age", "age cannot be less than 3"));

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.field("age").len(), 2);
        assert_eq!(errors.field("age")[1].message, "age cannot be less than 3");
        assert!(errors.field("missing").is_empty());
    }

    #[test]
    fn test_from_errors_groups_by_field() {
        let errors = ValidationErrors::from_errors(vec![
            ValidateError::new("addr.city", "addr.city is required"),
            ValidateError::new("tags.0", "tags.0 is not a string"),
        ]);
        assert_eq!(errors.fields.len(), 2);
        assert_eq!(
            errors.messages(),
            vec!["addr.city is required", "tags.0 is not a string"]
        );
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Rule.to_string(), "rule");
        assert_eq!(ErrorKind::Validator.to_string(), "validator");
        let e = ValidateError::new("f", "boom").with_kind(ErrorKind::Validator);
        assert_eq!(e.to_string(), "f: boom [validator]");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::UnknownType {
            field: "price".into(),
            rule_type: RuleType::Custom("money".into()),
        };
        assert_eq!(err.to_string(), "Unknown rule type money on field price");
    }
}
