//! Basic Validation Example
//!
//! This example demonstrates a flat form schema, nested objects and arrays,
//! and message overrides using ouroboros-rules.
//!
//! Run with:
//! ```bash
//! cargo run -p ouroboros-rules --example basic_validation
//! ```

use ouroboros_rules::{
    Messages, Pattern, Rule, RuleType, Rules, Schema, ValidateOptions, ValidationResult, Value,
};

// ============================================================================
// Flat schema
// ============================================================================

fn signup_schema() -> Schema {
    Schema::new(
        Rules::new()
            .field("username", Rule::new().required().min(3).max(16).whitespace())
            .field("email", Rule::typed(RuleType::Email).required())
            .field("age", Rule::typed(RuleType::Integer).min(13))
            .field("plan", Rule::typed(RuleType::Enum).one_of(["free", "pro"]))
            .field(
                "zip",
                Rule::new()
                    .pattern(Pattern::new(r"^\d{5}$").expect("valid pattern"))
                    .label("Postal code"),
            ),
    )
    .expect("valid schema")
}

fn validate_flat() {
    println!("1. Flat Schema");
    println!("--------------");
    let schema = signup_schema();

    let good = Value::object([
        ("username", Value::from("ada")),
        ("email", Value::from("ada@example.com")),
        ("age", Value::Int(36)),
        ("plan", Value::from("pro")),
    ]);
    print_result("valid signup", &schema.validate_blocking(good, ValidateOptions::default()));

    let bad = Value::object([
        ("username", Value::from("   ")),
        ("email", Value::from("ada@")),
        ("age", Value::Float(12.5)),
        ("plan", Value::from("enterprise")),
        ("zip", Value::from("1234")),
    ]);
    print_result("invalid signup", &schema.validate_blocking(bad, ValidateOptions::default()));
    println!();
}

// ============================================================================
// Nested schema
// ============================================================================

fn validate_nested() {
    println!("2. Nested Objects and Arrays");
    println!("----------------------------");
    let line = Rule::typed(RuleType::Object).fields(
        Rules::new()
            .field("sku", Rule::new().required())
            .field("qty", Rule::typed(RuleType::Integer).required().min(1)),
    );
    let schema = Schema::new(
        Rules::new()
            .field(
                "address",
                Rule::typed(RuleType::Object)
                    .required()
                    .fields(Rules::new().field("city", Rule::new().required())),
            )
            .field(
                "lines",
                Rule::typed(RuleType::Array).required().min(1).default_field(line),
            ),
    )
    .expect("valid schema");

    let order = Value::object([
        ("address", Value::Object(vec![])),
        (
            "lines",
            Value::from(vec![
                Value::object([("sku", Value::from("A-1")), ("qty", Value::Int(0))]),
                Value::object([("qty", Value::Int(2))]),
            ]),
        ),
    ]);
    print_result("order", &schema.validate_blocking(order, ValidateOptions::default()));
    println!();
}

// ============================================================================
// Options
// ============================================================================

fn validate_with_options() {
    println!("3. Options");
    println!("----------");
    let schema = signup_schema();
    let empty = Value::Object(vec![]);

    let first = ValidateOptions::new().first(true);
    print_result("first", &schema.validate_blocking(empty.clone(), first));

    let localized = ValidateOptions::new().messages(
        Messages::new()
            .required("%s ist erforderlich")
            .set("types.email", "%s ist keine gueltige E-Mail"),
    );
    print_result("localized", &schema.validate_blocking(empty, localized));
    println!();
}

fn print_result(label: &str, result: &ValidationResult<Value>) {
    match result {
        Ok(_) => println!("  {}: ok", label),
        Err(errors) => {
            println!("  {}: {} error(s)", label, errors.len());
            for error in &errors.errors {
                println!("    - {}: {}", error.field, error.message);
            }
        }
    }
}

fn main() {
    println!("=== ouroboros-rules: Basic Validation ===\n");
    validate_flat();
    validate_nested();
    validate_with_options();
}
