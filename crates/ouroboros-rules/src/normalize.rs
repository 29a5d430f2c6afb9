//! Rule normalization
//!
//! Expands a schema into per-field lists of [`InternalRule`]s annotated with
//! their paths, and decides how each rule is executed.

use crate::checkers::{Checkers, TypeChecker};
use crate::errors::SchemaError;
use crate::rule::{Rule, Rules};
use crate::types::{RuleType, Value};
use crate::validator::Validator;
use std::sync::Arc;

// ============================================================================
// Internal rule
// ============================================================================

/// A rule enriched with its location for one validation pass
#[derive(Debug, Clone)]
pub struct InternalRule {
    /// The declared rule
    pub rule: Rule,
    /// Type the rule dispatches on
    pub rule_type: RuleType,
    /// Field name at this nesting level
    pub field: String,
    /// Dotted path from the root (e.g. "address.city", "tags.0")
    pub full_field: String,
    /// Path segments from the root
    pub full_fields: Vec<String>,
    /// Display name from the rule's label
    pub localized_field: Option<String>,
}

impl InternalRule {
    /// Build the internal form of `rule` for `field` below `prefix`
    pub fn new(rule: &Rule, field: &str, prefix: &[String]) -> Self {
        let mut full_fields = prefix.to_vec();
        full_fields.push(field.to_string());
        Self {
            rule: rule.clone(),
            rule_type: rule.resolved_type(),
            field: field.to_string(),
            full_field: full_fields.join("."),
            full_fields,
            localized_field: rule.label.clone(),
        }
    }

    /// Name used as the first message argument
    pub fn label(&self) -> &str {
        self.localized_field.as_deref().unwrap_or(&self.full_field)
    }
}

// ============================================================================
// Schema checks
// ============================================================================

/// Reject unknown types and empty rule lists, recursing into nested rules
pub fn check_rules(rules: &Rules, checkers: &Checkers, prefix: &str) -> Result<(), SchemaError> {
    for (name, set) in rules.iter() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        if set.is_empty() {
            return Err(SchemaError::EmptyRules(path));
        }
        for rule in set.iter() {
            check_rule(rule, checkers, &path)?;
        }
    }
    Ok(())
}

fn check_rule(rule: &Rule, checkers: &Checkers, path: &str) -> Result<(), SchemaError> {
    let rule_type = rule.resolved_type();
    if rule.validator.is_none() && !checkers.contains(&rule_type) {
        return Err(SchemaError::UnknownType {
            field: path.to_string(),
            rule_type,
        });
    }
    if rule.rule_type == Some(RuleType::Enum) && rule.enum_values.is_none() {
        tracing::debug!(field = %path, "enum rule without values rejects every value");
    }
    if let Some(fields) = &rule.fields {
        check_rules(fields, checkers, path)?;
    }
    if let Some(default_field) = &rule.default_field {
        if default_field.is_empty() {
            return Err(SchemaError::EmptyRules(format!("{}.*", path)));
        }
        let wildcard = format!("{}.*", path);
        for nested in default_field.iter() {
            check_rule(nested, checkers, &wildcard)?;
        }
    }
    Ok(())
}

// ============================================================================
// Planning
// ============================================================================

/// How a rule is executed
#[derive(Clone)]
pub(crate) enum Dispatch {
    Checker(Arc<dyn TypeChecker>),
    Validator(Validator),
}

/// One rule bound to the value it checks
#[derive(Clone)]
pub(crate) struct RuleTask {
    pub rule: Arc<InternalRule>,
    pub dispatch: Dispatch,
    pub value: Option<Value>,
}

/// All rule tasks of one field, in declaration order
pub(crate) struct FieldPlan {
    pub field: String,
    pub tasks: Vec<RuleTask>,
}

/// A planned run: the transformed source plus per-field tasks
pub(crate) struct Plan {
    pub source: Value,
    pub fields: Vec<FieldPlan>,
}

/// Plan a run over `source`.
///
/// Transforms are applied in rule order, each rule seeing the output of the
/// previous one; the returned source holds the final transformed values.
pub(crate) fn plan(
    rules: &Rules,
    mut source: Value,
    keys: Option<&[String]>,
    checkers: &Checkers,
    prefix: &[String],
    warn: bool,
) -> Result<Plan, SchemaError> {
    let names: Vec<String> = match keys {
        Some(keys) => keys
            .iter()
            .filter(|key| {
                let known = rules.get(key).is_some();
                if !known && warn {
                    tracing::warn!(field = %key, "key is not part of the schema, skipping");
                }
                known
            })
            .cloned()
            .collect(),
        None => rules.names().into_iter().map(String::from).collect(),
    };

    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let Some(set) = rules.get(&name) else {
            continue;
        };
        let mut value = source.get(&name).cloned();
        let mut tasks = Vec::with_capacity(set.len());

        for rule in set.iter() {
            if let Some(transform) = &rule.transform {
                if let Some(current) = value.take() {
                    let next = transform.apply(current);
                    source.set(&name, next.clone());
                    value = Some(next);
                }
            }
            let internal = InternalRule::new(rule, &name, prefix);
            let dispatch = dispatch_for(&internal, checkers)?;
            tasks.push(RuleTask {
                rule: Arc::new(internal),
                dispatch,
                value: value.clone(),
            });
        }
        fields.push(FieldPlan { field: name, tasks });
    }

    Ok(Plan { source, fields })
}

fn dispatch_for(rule: &InternalRule, checkers: &Checkers) -> Result<Dispatch, SchemaError> {
    if let Some(validator) = &rule.rule.validator {
        return Ok(Dispatch::Validator(validator.clone()));
    }
    if rule.rule.is_required_only() {
        return Ok(Dispatch::Checker(checkers.required()));
    }
    checkers
        .get(&rule.rule_type)
        .map(Dispatch::Checker)
        .ok_or_else(|| SchemaError::UnknownType {
            field: rule.full_field.clone(),
            rule_type: rule.rule_type.clone(),
        })
}
