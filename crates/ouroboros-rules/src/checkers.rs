//! Built-in type checkers
//!
//! Each rule type maps to a [`TypeChecker`] that appends messages to an error
//! list. Checkers never fail on bad data; they record a message and return.
//! The per-type checkers are assembled from the primitive checks in the
//! second half of this module (required, type, range, enum, pattern,
//! whitespace).

use crate::formats;
use crate::messages::{MessageCatalog, RangeStyle};
use crate::normalize::InternalRule;
use crate::types::{format_number, RuleType, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Checker trait and context
// ============================================================================

/// What a checker can see besides the value
pub struct CheckContext<'a> {
    /// The rule being applied
    pub rule: &'a InternalRule,
    /// The object holding the field
    pub source: &'a Value,
    /// Templates for this run
    pub messages: &'a MessageCatalog,
    /// Range message variant
    pub range_style: RangeStyle,
}

impl CheckContext<'_> {
    /// Render `path` with the field label followed by `extra` arguments
    pub fn message(&self, path: &str, extra: &[String]) -> String {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(self.rule.label().to_string());
        args.extend_from_slice(extra);
        self.messages.resolve(path, &args)
    }
}

/// A synchronous check for one rule type
///
/// `value` is `None` when the field is absent from its parent object.
pub trait TypeChecker: Send + Sync {
    fn check(&self, value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>);
}

impl<F> TypeChecker for F
where
    F: Fn(Option<&Value>, &CheckContext<'_>, &mut Vec<String>) + Send + Sync,
{
    fn check(&self, value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
        self(value, cx, errors)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Table from rule type to checker
#[derive(Clone)]
pub struct Checkers {
    table: HashMap<RuleType, Arc<dyn TypeChecker>>,
    required: Arc<dyn TypeChecker>,
}

impl Checkers {
    /// Registry holding every built-in checker
    pub fn builtin() -> Self {
        let mut table: HashMap<RuleType, Arc<dyn TypeChecker>> = HashMap::new();
        table.insert(RuleType::String, Arc::new(check_string));
        table.insert(RuleType::Number, Arc::new(check_number));
        table.insert(RuleType::Boolean, Arc::new(check_plain));
        table.insert(RuleType::Method, Arc::new(check_plain));
        table.insert(RuleType::Regexp, Arc::new(check_plain));
        table.insert(RuleType::Integer, Arc::new(check_ranged));
        table.insert(RuleType::Float, Arc::new(check_ranged));
        table.insert(RuleType::Array, Arc::new(check_array));
        table.insert(RuleType::Object, Arc::new(check_plain));
        table.insert(RuleType::Enum, Arc::new(check_enum));
        table.insert(RuleType::Date, Arc::new(check_date));
        table.insert(RuleType::Url, Arc::new(check_format));
        table.insert(RuleType::Hex, Arc::new(check_format));
        table.insert(RuleType::Email, Arc::new(check_format));
        table.insert(RuleType::Pattern, Arc::new(check_pattern));
        table.insert(RuleType::Any, Arc::new(check_any));
        Self {
            table,
            required: Arc::new(check_required_only),
        }
    }

    /// Add or replace the checker for a type
    pub fn register(&mut self, rule_type: RuleType, checker: impl TypeChecker + 'static) {
        self.table.insert(rule_type, Arc::new(checker));
    }

    /// Checker for a type
    pub fn get(&self, rule_type: &RuleType) -> Option<Arc<dyn TypeChecker>> {
        self.table.get(rule_type).cloned()
    }

    /// Whether a checker exists for the type
    pub fn contains(&self, rule_type: &RuleType) -> bool {
        self.table.contains_key(rule_type)
    }

    /// Checker for rules that only carry `required`
    pub fn required(&self) -> Arc<dyn TypeChecker> {
        self.required.clone()
    }
}

impl Default for Checkers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Checkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.table.keys().map(RuleType::name).collect();
        types.sort_unstable();
        f.debug_struct("Checkers").field("types", &types).finish()
    }
}

// ============================================================================
// Per-type checkers
// ============================================================================

/// Optional field that is missing or empty: nothing to check
fn skip_optional(value: Option<&Value>, rule: &InternalRule, ty: &RuleType) -> bool {
    !rule.rule.required && is_empty_value(value, ty)
}

fn check_string(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = RuleType::String;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !is_empty_value(Some(v), &ty)) {
        type_check(v, cx, errors);
        range(v, cx, errors);
        pattern(v, cx, errors);
        if cx.rule.rule.whitespace {
            whitespace(v, cx, errors);
        }
    }
}

fn check_number(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    // an empty string counts as no value for numbers
    let value = value.filter(|v| v.as_str() != Some(""));
    let ty = RuleType::Number;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !v.is_null()) {
        type_check(v, cx, errors);
        range(v, cx, errors);
    }
}

/// boolean, method, regexp, object: type check only
fn check_plain(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = cx.rule.rule_type.clone();
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !v.is_null()) {
        type_check(v, cx, errors);
    }
}

/// integer, float: type and range
fn check_ranged(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = cx.rule.rule_type.clone();
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !v.is_null()) {
        type_check(v, cx, errors);
        range(v, cx, errors);
    }
}

fn check_array(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let present = value.filter(|v| !v.is_null());
    if present.is_none() && !cx.rule.rule.required {
        return;
    }
    required(value, cx, errors, &RuleType::Array);
    if let Some(v) = present {
        type_check(v, cx, errors);
        range(v, cx, errors);
    }
}

fn check_enum(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = RuleType::Enum;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value {
        enumerable(v, cx, errors);
    }
}

fn check_date(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = RuleType::Date;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !is_empty_value(Some(v), &ty)) {
        match formats::parse_date(v) {
            Some(date) => range(&Value::Int(date.timestamp_millis()), cx, errors),
            None => errors.push(cx.message("types.date", &["date".to_string()])),
        }
    }
}

/// email, url, hex: string format check
fn check_format(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = cx.rule.rule_type.clone();
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !is_empty_value(Some(v), &ty)) {
        type_check(v, cx, errors);
    }
}

fn check_pattern(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = RuleType::String;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
    if let Some(v) = value.filter(|v| !is_empty_value(Some(v), &ty)) {
        pattern(v, cx, errors);
    }
}

fn check_any(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = RuleType::Any;
    if skip_optional(value, cx.rule, &ty) {
        return;
    }
    required(value, cx, errors, &ty);
}

/// Rules that only say `required`: emptiness judged by the value's own type
fn check_required_only(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = match value {
        Some(Value::List(_)) => RuleType::Array,
        Some(Value::String(_)) => RuleType::String,
        _ => RuleType::Any,
    };
    required(value, cx, errors, &ty);
}

// ============================================================================
// Primitive checks
// ============================================================================

/// Missing, null, an empty array (array rules) or an empty string (string-like rules)
pub fn is_empty_value(value: Option<&Value>, ty: &RuleType) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::List(items)) => *ty == RuleType::Array && items.is_empty(),
        Some(Value::String(s)) => ty.is_string_like() && s.is_empty(),
        Some(_) => false,
    }
}

/// Record `required` when a required field is missing or empty
pub fn required(value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>, ty: &RuleType) {
    if cx.rule.rule.required && is_empty_value(value, ty) {
        errors.push(cx.message("required", &[]));
    }
}

static WHITESPACE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+$").unwrap());

/// Record `whitespace` for empty or whitespace-only strings
pub fn whitespace(value: &Value, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    if let Value::String(s) = value {
        if s.is_empty() || WHITESPACE_ONLY.is_match(s) {
            errors.push(cx.message("whitespace", &[]));
        }
    }
}

/// Whether `value` has the runtime shape of `ty`.
///
/// `None` for types without a shape test (enum, pattern, any, custom types).
pub fn matches_type(value: &Value, ty: &RuleType) -> Option<bool> {
    let is_number = matches!(value, Value::Int(_))
        || matches!(value, Value::Float(f) if !f.is_nan());
    let is_integer = match value {
        Value::Int(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        _ => false,
    };
    let ok = match ty {
        RuleType::String => matches!(value, Value::String(_)),
        RuleType::Number => is_number,
        RuleType::Boolean => matches!(value, Value::Bool(_)),
        RuleType::Method => matches!(value, Value::Method(_)),
        RuleType::Regexp => match value {
            Value::Regex(_) => true,
            Value::String(s) => Regex::new(s).is_ok(),
            _ => false,
        },
        RuleType::Integer => is_integer,
        RuleType::Float => is_number && !is_integer,
        RuleType::Array => matches!(value, Value::List(_)),
        RuleType::Object => matches!(value, Value::Object(_)),
        RuleType::Date => matches!(value, Value::Date(_)),
        RuleType::Email => value.as_str().is_some_and(formats::validate_email),
        RuleType::Url => value.as_str().is_some_and(formats::validate_url),
        RuleType::Hex => value.as_str().is_some_and(formats::validate_hex),
        RuleType::Enum | RuleType::Pattern | RuleType::Any | RuleType::Custom(_) => return None,
    };
    Some(ok)
}

/// Record `types.<type>` when the value has the wrong shape
pub fn type_check(value: &Value, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let ty = &cx.rule.rule_type;
    if matches_type(value, ty) == Some(false) {
        errors.push(cx.message(&format!("types.{}", ty.name()), &[ty.name().to_string()]));
    }
}

/// Size of a value for range checks: magnitude, character count or length
fn measure(value: &Value) -> Option<(&'static str, f64)> {
    match value {
        Value::Int(i) => Some(("number", *i as f64)),
        Value::Float(f) => Some(("number", *f)),
        Value::String(s) => Some(("string", s.chars().count() as f64)),
        Value::List(items) => Some(("array", items.len() as f64)),
        _ => None,
    }
}

/// Record `len` / `min` / `max` / `range` violations
pub fn range(value: &Value, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let rule = &cx.rule.rule;
    let Some((key, val)) = measure(value) else {
        return;
    };
    let path = |bound: &str| format!("{}.{}", key, bound);

    if let Some(len) = rule.len {
        if val != len {
            errors.push(cx.message(&path("len"), &[format_number(len)]));
        }
        return;
    }

    match (rule.min, rule.max, cx.range_style) {
        (Some(min), Some(max), RangeStyle::Combined) => {
            if val < min || val > max {
                errors.push(cx.message(&path("range"), &[format_number(min), format_number(max)]));
            }
        }
        (min, max, _) => {
            if let Some(min) = min.filter(|m| val < *m) {
                errors.push(cx.message(&path("min"), &[format_number(min)]));
            }
            if let Some(max) = max.filter(|m| val > *m) {
                errors.push(cx.message(&path("max"), &[format_number(max)]));
            }
        }
    }
}

/// Strict equality, treating `Int` and `Float` of the same magnitude as equal
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Record `enum` when the value is not one of the allowed values
pub fn enumerable(value: &Value, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    let allowed = cx.rule.rule.enum_values.as_deref().unwrap_or(&[]);
    if !allowed.iter().any(|a| strict_eq(a, value)) {
        let list: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        errors.push(cx.message("enum", &[list.join(", ")]));
    }
}

/// Record `pattern.mismatch` when the string form does not match
pub fn pattern(value: &Value, cx: &CheckContext<'_>, errors: &mut Vec<String>) {
    if let Some(p) = &cx.rule.rule.pattern {
        let text = value.to_string();
        if !p.is_match(&text) {
            errors.push(cx.message("pattern.mismatch", &[text, p.to_string()]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Pattern, Rule};

    fn run(rule: Rule, value: Option<Value>) -> Vec<String> {
        run_with(rule, value, RangeStyle::Combined)
    }

    fn run_with(rule: Rule, value: Option<Value>, range_style: RangeStyle) -> Vec<String> {
        let internal = InternalRule::new(&rule, "f", &[]);
        let messages = MessageCatalog::defaults();
        let source = Value::Object(vec![]);
        let cx = CheckContext {
            rule: &internal,
            source: &source,
            messages: &messages,
            range_style,
        };
        let checkers = Checkers::builtin();
        let checker = if rule.is_required_only() {
            checkers.required()
        } else {
            checkers.get(&internal.rule_type).unwrap()
        };
        let mut errors = Vec::new();
        checker.check(value.as_ref(), &cx, &mut errors);
        errors
    }

    #[test]
    fn test_required_missing_single_error_for_every_type() {
        for ty in RuleType::BUILTIN {
            let errors = run(Rule::typed(ty.clone()).required(), None);
            assert_eq!(errors, vec!["f is required"], "type {}", ty);
        }
    }

    #[test]
    fn test_optional_missing_is_skipped() {
        for ty in RuleType::BUILTIN {
            assert!(run(Rule::typed(ty.clone()).min(3), None).is_empty(), "type {}", ty);
        }
    }

    #[test]
    fn test_required_only_rule() {
        assert_eq!(run(Rule::new().required(), Some(Value::from(""))), vec!["f is required"]);
        assert_eq!(run(Rule::new().required(), Some(Value::List(vec![]))), vec!["f is required"]);
        assert!(run(Rule::new().required(), Some(Value::Int(0))).is_empty());
    }

    #[test]
    fn test_string_type_and_length() {
        assert_eq!(run(Rule::new(), Some(Value::Int(1))), vec!["f is not a string"]);
        assert_eq!(
            run(Rule::new().min(3), Some(Value::from("ab"))),
            vec!["f must be at least 3 characters"]
        );
        assert_eq!(
            run(Rule::new().len(2), Some(Value::from("abc"))),
            vec!["f must be exactly 2 characters"]
        );
        // counted in characters, not bytes
        assert!(run(Rule::new().max(2), Some(Value::from("éé"))).is_empty());
    }

    #[test]
    fn test_range_combined_and_separate() {
        let rule = Rule::typed(RuleType::Number).min(1).max(5);
        assert_eq!(
            run(rule.clone(), Some(Value::Int(9))),
            vec!["f must be between 1 and 5"]
        );
        assert_eq!(
            run_with(rule, Some(Value::Int(9)), RangeStyle::Separate),
            vec!["f cannot be greater than 5"]
        );
    }

    #[test]
    fn test_whitespace() {
        let rule = Rule::new().required().whitespace();
        assert_eq!(run(rule.clone(), Some(Value::from("   "))), vec!["f cannot be empty"]);
        assert_eq!(run(rule.clone(), Some(Value::from(""))), vec!["f is required"]);
        assert!(run(rule, Some(Value::from(" a "))).is_empty());
    }

    #[test]
    fn test_number_family() {
        assert!(run(Rule::typed(RuleType::Number), Some(Value::Float(1.5))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Number), Some(Value::Float(f64::NAN))),
            vec!["f is not a number"]
        );
        // empty string is treated as no value
        assert!(run(Rule::typed(RuleType::Number), Some(Value::from(""))).is_empty());
        assert!(run(Rule::typed(RuleType::Integer), Some(Value::Float(3.0))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Integer), Some(Value::Float(3.5))),
            vec!["f is not an integer"]
        );
        assert!(run(Rule::typed(RuleType::Float), Some(Value::Float(3.5))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Float), Some(Value::Int(3))),
            vec!["f is not a float"]
        );
    }

    #[test]
    fn test_array_range_and_empty() {
        assert_eq!(
            run(Rule::typed(RuleType::Array).min(2), Some(Value::from(vec![1]))),
            vec!["f cannot be less than 2 in length"]
        );
        assert_eq!(
            run(Rule::typed(RuleType::Array).required(), Some(Value::List(vec![]))),
            vec!["f is required"]
        );
        assert_eq!(
            run(Rule::typed(RuleType::Array), Some(Value::from("x"))),
            vec!["f is not an array"]
        );
    }

    #[test]
    fn test_enum() {
        let rule = Rule::typed(RuleType::Enum).one_of(["a", "b"]);
        assert_eq!(run(rule.clone(), Some(Value::from("c"))), vec!["f must be one of a, b"]);
        assert!(run(rule, Some(Value::from("a"))).is_empty());

        let numeric = Rule::typed(RuleType::Enum).one_of([1, 2]);
        assert!(run(numeric, Some(Value::Float(2.0))).is_empty());
    }

    #[test]
    fn test_required_null_enum_is_also_checked() {
        let rule = Rule::typed(RuleType::Enum).required().one_of(["a"]);
        assert_eq!(
            run(rule, Some(Value::Null)),
            vec!["f is required", "f must be one of a"]
        );

        let string = Rule::typed(RuleType::String).required();
        assert_eq!(run(string, Some(Value::Null)), vec!["f is required"]);
    }

    #[test]
    fn test_pattern() {
        let rule = Rule::new().pattern(Pattern::new(r"^\d+$").unwrap());
        assert_eq!(
            run(rule.clone(), Some(Value::from("12a"))),
            vec![r"f value 12a does not match pattern ^\d+$"]
        );
        assert!(run(rule, Some(Value::from("12"))).is_empty());

        let typed_string = Rule::new().min(1).pattern(Pattern::new("^a").unwrap());
        assert_eq!(run(typed_string, Some(Value::from("b"))).len(), 1);
    }

    #[test]
    fn test_formats() {
        assert!(run(Rule::typed(RuleType::Email), Some(Value::from("a@b.io"))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Email), Some(Value::from("nope"))),
            vec!["f is not a valid email"]
        );
        assert_eq!(
            run(Rule::typed(RuleType::Url), Some(Value::Int(3))),
            vec!["f is not a valid url"]
        );
        assert!(run(Rule::typed(RuleType::Hex), Some(Value::from("#abc"))).is_empty());
    }

    #[test]
    fn test_date() {
        assert!(run(Rule::typed(RuleType::Date), Some(Value::from("2024-01-19"))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Date), Some(Value::from("not a date"))),
            vec!["f is not a date"]
        );
        let bounded = Rule::typed(RuleType::Date).min(1_000.0);
        assert_eq!(
            run(bounded, Some(Value::Int(10))),
            vec!["f cannot be less than 1000"]
        );
    }

    #[test]
    fn test_plain_types() {
        assert!(run(Rule::typed(RuleType::Boolean), Some(Value::Bool(false))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Object), Some(Value::List(vec![]))),
            vec!["f is not an object"]
        );
        assert!(run(Rule::typed(RuleType::Regexp), Some(Value::from("^a+$"))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Regexp), Some(Value::from("(a"))),
            vec!["f is not a valid regexp"]
        );
        assert_eq!(
            run(Rule::typed(RuleType::Method), Some(Value::Int(1))),
            vec!["f is not a method (function)"]
        );
    }

    #[test]
    fn test_any_only_checks_presence() {
        assert!(run(Rule::typed(RuleType::Any), Some(Value::Int(1))).is_empty());
        assert_eq!(
            run(Rule::typed(RuleType::Any).required(), Some(Value::Null)),
            vec!["f is required"]
        );
    }

    #[test]
    fn test_register_custom_checker() {
        let mut checkers = Checkers::builtin();
        let money = RuleType::Custom("money".into());
        assert!(!checkers.contains(&money));
        checkers.register(
            money.clone(),
            |value: Option<&Value>, cx: &CheckContext<'_>, errors: &mut Vec<String>| {
                if value.and_then(Value::as_f64).is_some_and(|v| v < 0.0) {
                    errors.push(cx.message("types.money", &["money".into()]));
                }
            },
        );
        assert!(checkers.contains(&money));
    }
}
