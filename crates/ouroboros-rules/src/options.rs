//! Per-call options controlling a validation run
//!
//! Builder-style configuration for early stopping, key filtering, message
//! overrides, diagnostics and error shaping.

use crate::errors::ValidateError;
use crate::messages::{Messages, RangeStyle};
use crate::normalize::InternalRule;
use std::fmt;
use std::sync::Arc;

/// Builds the public error for a failed rule from its resolved message
pub type ErrorFactory = Arc<dyn Fn(&InternalRule, String) -> ValidateError + Send + Sync>;

// ============================================================================
// First-fields policy
// ============================================================================

/// Which fields stop at their first error
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FirstFields {
    /// Every rule of every field runs
    #[default]
    None,
    /// Every field stops at its first error
    All,
    /// Only the named fields stop at their first error
    Only(Vec<String>),
}

impl FirstFields {
    /// Whether `field` stops at its first error
    pub fn applies(&self, field: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == field),
        }
    }
}

// ============================================================================
// Validate Options
// ============================================================================

/// Options for one validation run
#[derive(Clone, Default)]
pub struct ValidateOptions {
    /// Complete the whole run at the first error from any field
    pub first: bool,

    /// Stop a field's remaining rules once it has an error
    pub first_fields: FirstFields,

    /// Only validate these top-level fields
    pub keys: Option<Vec<String>>,

    /// Message overrides layered over the schema's catalog
    pub messages: Option<Messages>,

    /// Silence advisory warnings
    pub suppress_warning: bool,

    /// Silence error logs for misbehaving custom validators
    pub suppress_validator_error: bool,

    /// Reshape errors before they are collected
    pub error: Option<ErrorFactory>,

    /// Message variant when both range bounds are set
    pub range_style: RangeStyle,
}

impl ValidateOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run at the first error
    pub fn first(mut self, first: bool) -> Self {
        self.first = first;
        self
    }

    /// Stop each field at its first error
    pub fn first_fields_all(mut self) -> Self {
        self.first_fields = FirstFields::All;
        self
    }

    /// Stop the named fields at their first error
    pub fn first_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.first_fields = FirstFields::Only(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict validation to these fields
    pub fn keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Override message templates for this run
    pub fn messages(mut self, messages: Messages) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Silence advisory warnings
    pub fn suppress_warning(mut self, suppress: bool) -> Self {
        self.suppress_warning = suppress;
        self
    }

    /// Silence validator misuse logs
    pub fn suppress_validator_error(mut self, suppress: bool) -> Self {
        self.suppress_validator_error = suppress;
        self
    }

    /// Reshape errors with a factory
    pub fn error<F>(mut self, factory: F) -> Self
    where
        F: Fn(&InternalRule, String) -> ValidateError + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(factory));
        self
    }

    /// Choose the range message variant
    pub fn range_style(mut self, style: RangeStyle) -> Self {
        self.range_style = style;
        self
    }

    /// Options for a nested run: `keys` never carries over, and a rule's own
    /// options replace the early-stop policy while inheriting messages and the
    /// error factory.
    pub(crate) fn for_nested(&self, rule_options: Option<&ValidateOptions>) -> Self {
        let mut nested = match rule_options {
            Some(own) => own.clone(),
            None => self.clone(),
        };
        nested.keys = None;
        nested.messages = self.messages.clone();
        nested.error = self.error.clone();
        nested
    }
}

impl fmt::Debug for ValidateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateOptions")
            .field("first", &self.first)
            .field("first_fields", &self.first_fields)
            .field("keys", &self.keys)
            .field("messages", &self.messages)
            .field("suppress_warning", &self.suppress_warning)
            .field("suppress_validator_error", &self.suppress_validator_error)
            .field("error", &self.error.as_ref().map(|_| ".."))
            .field("range_style", &self.range_style)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ValidateOptions::default();
        assert!(!options.first);
        assert_eq!(options.first_fields, FirstFields::None);
        assert!(options.keys.is_none());
        assert_eq!(options.range_style, RangeStyle::Combined);
    }

    #[test]
    fn test_options_builder() {
        let options = ValidateOptions::new()
            .first(true)
            .first_fields(["name"])
            .keys(["name", "age"])
            .suppress_warning(true);

        assert!(options.first);
        assert!(options.first_fields.applies("name"));
        assert!(!options.first_fields.applies("age"));
        assert_eq!(options.keys.as_deref().unwrap().len(), 2);
        assert!(options.suppress_warning);
    }

    #[test]
    fn test_first_fields_all() {
        let options = ValidateOptions::new().first_fields_all();
        assert!(options.first_fields.applies("anything"));
    }

    #[test]
    fn test_for_nested_inherits_messages_not_keys() {
        let parent = ValidateOptions::new()
            .keys(["a"])
            .first(true)
            .messages(Messages::new().required("x"));

        let nested = parent.for_nested(None);
        assert!(nested.keys.is_none());
        assert!(nested.first);
        assert!(nested.messages.is_some());

        let own = ValidateOptions::new().first_fields_all();
        let nested = parent.for_nested(Some(&own));
        assert!(!nested.first);
        assert_eq!(nested.first_fields, FirstFields::All);
        assert!(nested.messages.is_some());
    }
}
