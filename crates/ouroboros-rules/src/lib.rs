//! Ouroboros Rules
//!
//! Declarative, rule-driven validation for the Ouroboros framework.
//!
//! A schema maps field names to one or more rules. Each rule selects a type
//! checker (string, number, email, enum, ...) or a custom validator, which may
//! be synchronous or asynchronous. A run walks the fields, recurses into
//! nested objects and arrays, honors early-stop options and collects errors
//! both as an ordered list and grouped by field path.
//!
//! # Features
//!
//! - **Default**: Core validation
//! - **serde**: `serde_json` conversions and JSON-defined rules
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::{Rule, RuleType, Rules, Schema, ValidateOptions, Validator, Value, Verdict};
//!
//! let schema = Schema::new(
//!     Rules::new()
//!         .field("email", Rule::typed(RuleType::Email).required())
//!         .field(
//!             "password",
//!             vec![
//!                 Rule::new().required().min(8),
//!                 Rule::validator(Validator::check(|cx, value| {
//!                     let confirm = cx.source().get("confirm");
//!                     if value == confirm {
//!                         Verdict::Valid
//!                     } else {
//!                         Verdict::message("passwords do not match")
//!                     }
//!                 })),
//!             ],
//!         ),
//! )
//! .unwrap();
//!
//! let source = Value::object([
//!     ("email", Value::from("ada@example.com")),
//!     ("password", Value::from("hunter22")),
//!     ("confirm", Value::from("hunter23")),
//! ]);
//! let errors = schema
//!     .validate_blocking(source, ValidateOptions::default())
//!     .unwrap_err();
//! assert_eq!(errors.messages(), vec!["passwords do not match"]);
//! ```

// Public modules
pub mod checkers;
pub mod errors;
pub mod formats;
pub mod messages;
pub mod normalize;
pub mod options;
pub mod rule;
pub mod schema;
pub mod types;
pub mod validator;

mod engine;

// Re-export commonly used types
pub use checkers::{CheckContext, Checkers, TypeChecker};
pub use errors::{
    ErrorKind, SchemaError, ValidateError, ValidateFieldsError, ValidationErrors, ValidationResult,
};
pub use messages::{Message, MessageCatalog, Messages, RangeStyle};
pub use normalize::InternalRule;
pub use options::{ErrorFactory, FirstFields, ValidateOptions};
pub use rule::{Pattern, Rule, RuleSet, Rules, Transform};
pub use schema::Schema;
pub use types::{MethodRef, RegexValue, RuleType, Value};
pub use validator::{Completion, RuleContext, Validator, ValidatorError, ValidatorMode, Verdict};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
