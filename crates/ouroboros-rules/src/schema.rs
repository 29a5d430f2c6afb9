//! Public validation facade
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::{Rule, RuleType, Rules, Schema, ValidateOptions, Value};
//!
//! let schema = Schema::new(
//!     Rules::new()
//!         .field("name", Rule::new().required())
//!         .field("age", Rule::typed(RuleType::Integer).min(0).max(150)),
//! )
//! .unwrap();
//!
//! let source = Value::object([("name", Value::from("Ada")), ("age", Value::Int(200))]);
//! let errors = schema
//!     .validate_blocking(source, ValidateOptions::default())
//!     .unwrap_err();
//! assert_eq!(errors.messages(), vec!["age must be between 0 and 150"]);
//! ```

use crate::checkers::{Checkers, TypeChecker};
use crate::engine::{execute, Scope};
use crate::errors::{SchemaError, ValidationErrors, ValidationResult};
use crate::messages::{MessageCatalog, Messages};
use crate::normalize::check_rules;
use crate::options::{FirstFields, ValidateOptions};
use crate::rule::Rules;
use crate::types::{RuleType, Value};
use std::sync::Arc;

/// A checked schema ready to validate sources
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Rules,
    checkers: Arc<Checkers>,
    messages: Messages,
}

impl Schema {
    /// Build a schema using the built-in checkers
    pub fn new(rules: Rules) -> Result<Self, SchemaError> {
        Self::with_checkers(rules, Checkers::builtin())
    }

    /// Build a schema with a caller-supplied checker table
    pub fn with_checkers(rules: Rules, checkers: Checkers) -> Result<Self, SchemaError> {
        check_rules(&rules, &checkers, "")?;
        Ok(Self {
            rules,
            checkers: Arc::new(checkers),
            messages: Messages::new(),
        })
    }

    /// Replace the rules, checking them against the current checkers
    pub fn define(&mut self, rules: Rules) -> Result<(), SchemaError> {
        check_rules(&rules, &self.checkers, "")?;
        self.rules = rules;
        Ok(())
    }

    /// The schema's rules
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Add or replace the checker for a rule type
    pub fn register(&mut self, rule_type: RuleType, checker: impl TypeChecker + 'static) {
        Arc::make_mut(&mut self.checkers).register(rule_type, checker);
    }

    /// Set schema-wide message overrides, replacing earlier ones
    pub fn messages(&mut self, messages: Messages) {
        self.messages = messages;
    }

    /// Drop schema-wide message overrides
    pub fn reset_messages(&mut self) {
        self.messages = Messages::new();
    }

    /// Catalog for one run: defaults, then schema overrides, then call overrides
    fn catalog(&self, options: &ValidateOptions) -> MessageCatalog {
        let overrides = match &options.messages {
            Some(call) => self.messages.clone().merged(call),
            None => self.messages.clone(),
        };
        MessageCatalog::defaults().with_overrides(&overrides)
    }

    /// Validate `source`, resolving with the transformed source or every error
    pub async fn validate(&self, source: Value, options: ValidateOptions) -> ValidationResult<Value> {
        if self.rules.is_empty() {
            return Ok(source);
        }
        if options.first && options.first_fields != FirstFields::None && !options.suppress_warning {
            tracing::warn!("`first` is set, `first_fields` has no effect");
        }

        let catalog = Arc::new(self.catalog(&options));
        let scope = Scope::new(self.checkers.clone(), catalog, options);
        let (transformed, errors) = execute(&self.rules, source, scope).await;
        ValidationErrors::from_errors(errors).into_result(transformed)
    }

    /// Validate and report the outcome to `callback` before resolving
    pub async fn validate_with_callback<F>(
        &self,
        source: Value,
        options: ValidateOptions,
        callback: F,
    ) -> ValidationResult<Value>
    where
        F: FnOnce(&ValidationResult<Value>),
    {
        let result = self.validate(source, options).await;
        callback(&result);
        result
    }

    /// Validate on the current thread.
    ///
    /// Validators that need a tokio runtime (timers, spawned tasks) must use
    /// [`Schema::validate`] from inside one.
    pub fn validate_blocking(&self, source: Value, options: ValidateOptions) -> ValidationResult<Value> {
        futures::executor::block_on(self.validate(source, options))
    }
}

// ============================================================================
// JSON rule definitions
// ============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use crate::rule::{Pattern, Rule, RuleSet};
    use serde_json::Value as Json;
    use std::str::FromStr;

    fn invalid(field: &str, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidDefinition {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn number(field: &str, key: &str, json: &Json) -> Result<f64, SchemaError> {
        json.as_f64()
            .ok_or_else(|| invalid(field, format!("`{}` must be a number", key)))
    }

    fn flag(field: &str, key: &str, json: &Json) -> Result<bool, SchemaError> {
        json.as_bool()
            .ok_or_else(|| invalid(field, format!("`{}` must be a boolean", key)))
    }

    fn text<'a>(field: &str, key: &str, json: &'a Json) -> Result<&'a str, SchemaError> {
        json.as_str()
            .ok_or_else(|| invalid(field, format!("`{}` must be a string", key)))
    }

    fn rule_set(field: &str, json: &Json) -> Result<RuleSet, SchemaError> {
        match json {
            Json::Array(items) => items
                .iter()
                .map(|item| rule(field, item))
                .collect::<Result<Vec<_>, _>>()
                .map(RuleSet),
            Json::Object(_) => rule(field, json).map(RuleSet::from),
            _ => Err(invalid(field, "expected a rule object or an array of rules")),
        }
    }

    fn rule(field: &str, json: &Json) -> Result<Rule, SchemaError> {
        let Json::Object(map) = json else {
            return Err(invalid(field, "expected a rule object"));
        };
        let mut rule = Rule::new();
        for (key, value) in map {
            match key.as_str() {
                "type" => {
                    let name = text(field, key, value)?;
                    rule.rule_type = Some(RuleType::from_str(name).unwrap_or_else(|never| match never {}));
                }
                "required" => rule.required = flag(field, key, value)?,
                "whitespace" => rule.whitespace = flag(field, key, value)?,
                "pattern" => rule.pattern = Some(Pattern::new(text(field, key, value)?)?),
                "min" => rule.min = Some(number(field, key, value)?),
                "max" => rule.max = Some(number(field, key, value)?),
                "len" => rule.len = Some(number(field, key, value)?),
                "enum" => {
                    let Json::Array(items) = value else {
                        return Err(invalid(field, "`enum` must be an array"));
                    };
                    rule.enum_values = Some(items.iter().cloned().map(Value::from).collect());
                }
                "message" => rule.message = Some(text(field, key, value)?.into()),
                "label" => rule.label = Some(text(field, key, value)?.to_string()),
                "fields" => rule.fields = Some(Arc::new(Rules::from_json_at(value, field)?)),
                "defaultField" => {
                    rule.default_field = Some(Arc::new(rule_set(&format!("{}.*", field), value)?))
                }
                other => return Err(invalid(field, format!("unknown rule key `{}`", other))),
            }
        }
        Ok(rule)
    }

    impl Rules {
        /// Load declarative rules from JSON.
        ///
        /// Each field maps to a rule object or an array of them. Supported
        /// keys: `type`, `required`, `pattern`, `min`, `max`, `len`, `enum`,
        /// `whitespace`, `fields`, `defaultField`, `message`, `label`.
        pub fn from_json(json: &Json) -> Result<Rules, SchemaError> {
            Self::from_json_at(json, "")
        }

        fn from_json_at(json: &Json, prefix: &str) -> Result<Rules, SchemaError> {
            let Json::Object(map) = json else {
                return Err(invalid(prefix, "expected an object of field rules"));
            };
            let mut rules = Rules::new();
            for (name, value) in map {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                rules.insert(name.clone(), rule_set(&path, value)?);
            }
            Ok(rules)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    fn person() -> Schema {
        Schema::new(
            Rules::new()
                .field("name", Rule::new().required())
                .field("age", Rule::typed(RuleType::Number).min(18)),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_type_rejected_at_construction() {
        let rules = Rules::new().field("x", Rule::typed(RuleType::Custom("money".into())));
        assert!(matches!(
            Schema::new(rules),
            Err(SchemaError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_with_checkers_accepts_registered_type() {
        let mut checkers = Checkers::builtin();
        checkers.register(
            RuleType::Custom("money".into()),
            |_: Option<&Value>, _: &crate::checkers::CheckContext<'_>, _: &mut Vec<String>| {},
        );
        let rules = Rules::new().field("x", Rule::typed(RuleType::Custom("money".into())));
        assert!(Schema::with_checkers(rules, checkers).is_ok());
    }

    #[test]
    fn test_empty_schema_passes_source_through() {
        let schema = Schema::new(Rules::new()).unwrap();
        let source = Value::object([("anything", Value::Int(1))]);
        assert_eq!(
            schema.validate_blocking(source.clone(), ValidateOptions::default()).unwrap(),
            source
        );
    }

    #[test]
    fn test_blocking_success_returns_source() {
        let source = Value::object([("name", Value::from("Ada")), ("age", Value::Int(36))]);
        let result = person().validate_blocking(source.clone(), ValidateOptions::default());
        assert_eq!(result.unwrap(), source);
    }

    #[test]
    fn test_schema_and_call_messages_layer() {
        let mut schema = person();
        schema.messages(Messages::new().required("%s is mandatory").set("number.min", "%s too young"));

        let source = Value::object([("age", Value::Int(3))]);
        let errors = schema
            .validate_blocking(source.clone(), ValidateOptions::default())
            .unwrap_err();
        assert_eq!(errors.messages(), vec!["name is mandatory", "age too young"]);

        let call = ValidateOptions::new().messages(Messages::new().required("need %s"));
        let errors = schema.validate_blocking(source.clone(), call).unwrap_err();
        assert_eq!(errors.messages(), vec!["need name", "age too young"]);

        schema.reset_messages();
        let errors = schema
            .validate_blocking(source, ValidateOptions::default())
            .unwrap_err();
        assert_eq!(
            errors.messages(),
            vec!["name is required", "age cannot be less than 18"]
        );
    }

    #[tokio::test]
    async fn test_callback_invoked_once() {
        let mut calls = 0;
        let result = person()
            .validate_with_callback(Value::Object(vec![]), ValidateOptions::default(), |r| {
                calls += 1;
                assert!(r.is_err());
            })
            .await;
        assert_eq!(calls, 1);
        assert_eq!(result.unwrap_err().field("name").len(), 1);
    }

    #[test]
    fn test_define_replaces_rules() {
        let mut schema = person();
        schema
            .define(Rules::new().field("email", Rule::typed(RuleType::Email)))
            .unwrap();
        assert_eq!(schema.rules().names(), vec!["email"]);
        assert!(schema
            .define(Rules::new().field("x", Rule::typed(RuleType::Custom("nope".into()))))
            .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rules_from_json() {
        let json = serde_json::json!({
            "name": { "type": "string", "required": true, "min": 2 },
            "role": { "type": "enum", "enum": ["admin", "user"] },
            "address": {
                "type": "object",
                "fields": { "zip": { "pattern": "^\\d{5}$" } }
            },
            "tags": [{ "type": "array", "defaultField": { "type": "string" } }]
        });
        let rules = Rules::from_json(&json).unwrap();
        assert_eq!(rules.names(), vec!["name", "role", "address", "tags"]);
        let schema = Schema::new(rules).unwrap();

        let source = Value::object([
            ("name", Value::from("A")),
            ("role", Value::from("root")),
            ("address", Value::object([("zip", Value::from("12a"))])),
            ("tags", Value::from(vec![Value::from("ok"), Value::Int(1)])),
        ]);
        let errors = schema
            .validate_blocking(source, ValidateOptions::default())
            .unwrap_err();
        let fields: Vec<&str> = errors.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "role", "address.zip", "tags.1"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rules_from_json_rejects_bad_shapes() {
        let err = Rules::from_json(&serde_json::json!({ "x": { "min": "three" } })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { field, .. } if field == "x"));

        let err = Rules::from_json(&serde_json::json!({ "x": { "colour": 1 } })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }
}
