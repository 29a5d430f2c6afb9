//! Rule descriptors and schemas
//!
//! A [`Rule`] is one validation instruction for a field. [`Rules`] maps field
//! names to one or more rules, in declaration order.

use crate::errors::SchemaError;
use crate::messages::Message;
use crate::options::ValidateOptions;
use crate::types::{RuleType, Value};
use crate::validator::Validator;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Pattern
// ============================================================================

/// A compiled pattern, remembering whether it was given as a literal string
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    literal: bool,
}

impl Pattern {
    /// Compile a literal pattern string
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        Regex::new(pattern)
            .map(|regex| Self {
                regex,
                literal: true,
            })
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Check a string against the pattern (unanchored unless the pattern anchors itself)
    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    /// Pattern source text
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self {
            regex,
            literal: false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literal {
            f.write_str(self.regex.as_str())
        } else {
            write!(f, "/{}/", self.regex.as_str())
        }
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Pure function applied to a field value before it is checked
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl Transform {
    /// Apply the transform
    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A single validation rule for a field
///
/// Without an explicit type the rule checks a `string`, or a `pattern` when
/// only a pattern is given.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    /// Type tag selecting the checker
    pub rule_type: Option<RuleType>,
    /// Whether the field must be present and non-empty
    pub required: bool,
    /// Pattern the string form of the value must match
    pub pattern: Option<Pattern>,
    /// Lower bound on length (strings, arrays) or magnitude (numbers, dates)
    pub min: Option<f64>,
    /// Upper bound on length or magnitude
    pub max: Option<f64>,
    /// Exact length or magnitude
    pub len: Option<f64>,
    /// Allowed values for the `enum` type
    pub enum_values: Option<Vec<Value>>,
    /// Reject strings made only of whitespace
    pub whitespace: bool,
    /// Rules for the keys of a nested object or array
    pub fields: Option<Arc<Rules>>,
    /// Rules applied to every key or element not covered by `fields`
    pub default_field: Option<Arc<RuleSet>>,
    /// Options for the nested validation run
    pub options: Option<Arc<ValidateOptions>>,
    /// Value transform applied before checking
    pub transform: Option<Transform>,
    /// Human-facing field name used in messages
    pub label: Option<String>,
    /// Replaces every message this rule produces
    pub message: Option<Message>,
    /// Custom check replacing the type checker
    pub validator: Option<Validator>,
}

impl Rule {
    /// Create an empty rule (type `string`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule with an explicit type
    pub fn typed(rule_type: RuleType) -> Self {
        Self {
            rule_type: Some(rule_type),
            ..Default::default()
        }
    }

    /// Rule with only a custom validator
    pub fn validator(validator: Validator) -> Self {
        Self {
            validator: Some(validator),
            ..Default::default()
        }
    }

    /// Set the type
    pub fn with_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = Some(rule_type);
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Require a pattern match
    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set minimum length / value
    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Set maximum length / value
    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Set exact length / value
    pub fn len(mut self, len: impl Into<f64>) -> Self {
        self.len = Some(len.into());
        self
    }

    /// Allowed values (`enum` type)
    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Reject whitespace-only strings
    pub fn whitespace(mut self) -> Self {
        self.whitespace = true;
        self
    }

    /// Rules for nested keys
    pub fn fields(mut self, fields: Rules) -> Self {
        self.fields = Some(Arc::new(fields));
        self
    }

    /// Rules for every nested key or element
    pub fn default_field(mut self, rules: impl Into<RuleSet>) -> Self {
        self.default_field = Some(Arc::new(rules.into()));
        self
    }

    /// Options for the nested validation run
    pub fn options(mut self, options: ValidateOptions) -> Self {
        self.options = Some(Arc::new(options));
        self
    }

    /// Transform the value before checking it
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Transform(Arc::new(f)));
        self
    }

    /// Field name shown in messages instead of the path
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace produced messages with this one
    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a custom validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Type the rule dispatches on
    pub fn resolved_type(&self) -> RuleType {
        match (&self.rule_type, &self.pattern) {
            (Some(t), _) => t.clone(),
            (None, Some(_)) => RuleType::Pattern,
            (None, None) => RuleType::String,
        }
    }

    /// True when the rule carries nothing beyond `required` (and presentation)
    pub fn is_required_only(&self) -> bool {
        self.rule_type.is_none()
            && self.pattern.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.len.is_none()
            && self.enum_values.is_none()
            && !self.whitespace
            && self.fields.is_none()
            && self.default_field.is_none()
            && self.transform.is_none()
            && self.validator.is_none()
    }

    /// True when the rule descends into nested values
    pub fn has_nested(&self) -> bool {
        self.resolved_type().is_container()
            && (self.fields.is_some() || self.default_field.is_some())
    }
}

// ============================================================================
// Rule sets and schemas
// ============================================================================

/// One or more rules for a single field, in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleSet(pub Vec<Rule>);

impl RuleSet {
    /// Iterate rules in order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    /// Check if the set has no rules
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Rule> for RuleSet {
    fn from(rule: Rule) -> Self {
        Self(vec![rule])
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self(rules)
    }
}

/// Ordered mapping from field name to its rules
#[derive(Debug, Clone, Default)]
pub struct Rules {
    entries: Vec<(String, RuleSet)>,
}

impl Rules {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field's rules (builder form)
    pub fn field(mut self, name: impl Into<String>, rules: impl Into<RuleSet>) -> Self {
        self.insert(name, rules);
        self
    }

    /// Add or replace a field's rules; a replaced field keeps its position
    pub fn insert(&mut self, name: impl Into<String>, rules: impl Into<RuleSet>) {
        let name = name.into();
        let rules = rules.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = rules,
            None => self.entries.push((name, rules)),
        }
    }

    /// Rules for one field
    pub fn get(&self, name: &str) -> Option<&RuleSet> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Iterate fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleSet)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Field names in order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Child schema for a nested value: `default_field` for every key or index of
/// `value`, then explicit `fields` replacing or extending those entries.
pub fn nested_rules(rule: &Rule, value: Option<&Value>) -> Rules {
    let mut rules = Rules::new();
    if let (Some(default_field), Some(value)) = (&rule.default_field, value) {
        for key in value.keys() {
            rules.insert(key, default_field.as_ref().clone());
        }
    }
    if let Some(fields) = &rule.fields {
        for (name, set) in fields.iter() {
            rules.insert(name, set.clone());
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_type_defaults() {
        assert_eq!(Rule::new().resolved_type(), RuleType::String);
        let p = Rule::new().pattern(Pattern::new("^a").unwrap());
        assert_eq!(p.resolved_type(), RuleType::Pattern);
        let typed = Rule::typed(RuleType::Email).pattern(Pattern::new("x").unwrap());
        assert_eq!(typed.resolved_type(), RuleType::Email);
    }

    #[test]
    fn test_required_only() {
        assert!(Rule::new().required().is_required_only());
        assert!(Rule::new().required().message("needed").is_required_only());
        assert!(!Rule::new().required().min(2).is_required_only());
        assert!(!Rule::typed(RuleType::String).required().is_required_only());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn test_pattern_display() {
        assert_eq!(Pattern::new("^a+$").unwrap().to_string(), "^a+$");
        let re: Pattern = Regex::new("b").unwrap().into();
        assert_eq!(re.to_string(), "/b/");
    }

    #[test]
    fn test_rules_replace_keeps_position() {
        let rules = Rules::new()
            .field("a", Rule::new())
            .field("b", Rule::new())
            .field("a", vec![Rule::new(), Rule::new().required()]);
        assert_eq!(rules.names(), vec!["a", "b"]);
        assert_eq!(rules.get("a").unwrap().len(), 2);
    }

    #[test]
    fn test_nested_rules_merge() {
        let rule = Rule::typed(RuleType::Array)
            .default_field(Rule::typed(RuleType::String))
            .fields(Rules::new().field("1", Rule::typed(RuleType::Number)).field("9", Rule::new().required()));
        let value = Value::from(vec!["a", "b", "c"]);

        let child = nested_rules(&rule, Some(&value));
        assert_eq!(child.names(), vec!["0", "1", "2", "9"]);
        assert_eq!(
            child.get("1").unwrap().0[0].resolved_type(),
            RuleType::Number
        );
        assert_eq!(
            child.get("2").unwrap().0[0].resolved_type(),
            RuleType::String
        );
    }

    #[test]
    fn test_has_nested() {
        let r = Rule::typed(RuleType::Object).fields(Rules::new());
        assert!(r.has_nested());
        assert!(!Rule::new().fields(Rules::new()).has_nested());
    }
}
