//! Custom Validators Example
//!
//! This example demonstrates the custom validator styles available in
//! ouroboros-rules: verdict-returning checks, completion callbacks and
//! future-backed async checks.
//!
//! Run with:
//! ```bash
//! cargo run -p ouroboros-rules --example custom_validators
//! ```

use ouroboros_rules::{
    Rule, RuleType, Rules, Schema, ValidateOptions, Validator, ValidatorError, Value, Verdict,
};
use std::time::Duration;

const TAKEN: &[&str] = &["admin", "root"];

#[tokio::main]
async fn main() {
    println!("Custom Validators Example");
    println!("=========================\n");

    // Cross-field check through the rule context
    let matches_password = Validator::check(|cx, value| {
        if value == cx.source().get("password") {
            Verdict::Valid
        } else {
            Verdict::message(format!("{} must match password", cx.full_field()))
        }
    });

    // Callback style, answering from a background task
    let not_reserved = Validator::asynchronous(|_, value, done| {
        let name = value.and_then(Value::as_str).unwrap_or_default().to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if TAKEN.contains(&name.as_str()) {
                done.fail(format!("{} is reserved", name));
            } else {
                done.pass();
            }
        });
        Verdict::Pending
    });

    // Future style
    let domain_allowed = Validator::future(|_, value| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        match value {
            Some(Value::String(email)) if email.ends_with("@example.com") => Ok(()),
            _ => Err(ValidatorError::from("only example.com addresses may sign up")),
        }
    });

    let schema = Schema::new(
        Rules::new()
            .field("username", vec![Rule::new().required(), Rule::validator(not_reserved)])
            .field(
                "email",
                vec![
                    Rule::typed(RuleType::Email).required(),
                    Rule::validator(domain_allowed),
                ],
            )
            .field("password", Rule::new().required().min(8))
            .field("confirm", Rule::validator(matches_password)),
    )
    .expect("valid schema");

    let source = Value::object([
        ("username", Value::from("root")),
        ("email", Value::from("root@elsewhere.org")),
        ("password", Value::from("correct horse")),
        ("confirm", Value::from("correct hose")),
    ]);

    println!("1. All errors");
    match schema.validate(source.clone(), ValidateOptions::default()).await {
        Ok(_) => println!("  ok"),
        Err(errors) => {
            for error in &errors.errors {
                println!("  - {}: {}", error.field, error.message);
            }
        }
    }

    println!("\n2. First error only");
    let options = ValidateOptions::new().first(true);
    if let Err(errors) = schema.validate(source, options).await {
        println!("  - {}", errors.messages().join(", "));
    }
}
