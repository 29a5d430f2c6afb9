//! Message catalog for error text
//!
//! Templates are addressed by dotted paths (`required`, `types.string`,
//! `string.min`, `pattern.mismatch`, ...). A catalog is a flat map of those
//! paths, so layering overrides on top of the defaults is a per-leaf merge.
//!
//! Placeholders follow the printf-like convention used by the templates:
//! `%s` (text), `%d` (number), `%j` (quoted) and `%%` (literal percent).

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type FormatFn = dyn Fn(&[String]) -> String + Send + Sync;

// ============================================================================
// Message
// ============================================================================

/// A message template: literal text or a formatter over positional arguments
#[derive(Clone)]
pub enum Message {
    /// Template text, placeholders filled from the arguments
    Text(String),
    /// Closure receiving the arguments (field label first)
    Format(Arc<FormatFn>),
}

impl Message {
    /// Formatter message from a closure
    pub fn format<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        Self::Format(Arc::new(f))
    }

    /// Produce the final string
    pub fn render(&self, args: &[String]) -> String {
        match self {
            Self::Text(template) => format_template(template, args),
            Self::Format(f) => f(args),
        }
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Format(_) => f.write_str("Format(..)"),
        }
    }
}

/// Fill `%s`, `%d`, `%j` placeholders from `args`; `%%` becomes `%`.
///
/// Placeholders beyond the supplied arguments are left as written.
pub fn format_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd' | 'j')) => {
                chars.next();
                match next.next() {
                    Some(arg) => match spec {
                        's' => out.push_str(arg),
                        'd' => match arg.trim().parse::<f64>() {
                            Ok(n) => out.push_str(&crate::types::format_number(n)),
                            Err(_) => out.push_str("NaN"),
                        },
                        _ => out.push_str(&format!("{:?}", arg)),
                    },
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

// ============================================================================
// Partial overrides
// ============================================================================

/// A partial set of templates, merged leaf by leaf over a catalog
#[derive(Debug, Clone, Default)]
pub struct Messages {
    entries: BTreeMap<String, Message>,
}

impl Messages {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one template by its dotted path
    pub fn set(mut self, path: impl Into<String>, message: impl Into<Message>) -> Self {
        self.entries.insert(path.into(), message.into());
        self
    }

    /// Shorthand for the `required` template
    pub fn required(self, message: impl Into<Message>) -> Self {
        self.set("required", message)
    }

    /// Check if no template is overridden
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `other` over `self`; `other` wins per leaf
    pub fn merged(mut self, other: &Messages) -> Self {
        for (path, message) in &other.entries {
            self.entries.insert(path.clone(), message.clone());
        }
        self
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Message)> {
        self.entries.iter()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Range check message variant when both `min` and `max` are set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStyle {
    /// One `range` message naming both bounds
    #[default]
    Combined,
    /// Independent `min` / `max` messages for whichever bound is violated
    Separate,
}

/// Resolved template store: built-in defaults with overrides applied
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    entries: BTreeMap<String, Message>,
}

static DEFAULT_CATALOG: Lazy<MessageCatalog> = Lazy::new(|| {
    let table: &[(&str, &str)] = &[
        ("default", "Validation error on field %s"),
        ("required", "%s is required"),
        ("enum", "%s must be one of %s"),
        ("whitespace", "%s cannot be empty"),
        ("date.format", "%s date %s is invalid for format %s"),
        ("date.parse", "%s date could not be parsed, %s is invalid "),
        ("date.invalid", "%s date %s is invalid"),
        ("types.string", "%s is not a %s"),
        ("types.method", "%s is not a %s (function)"),
        ("types.array", "%s is not an %s"),
        ("types.object", "%s is not an %s"),
        ("types.number", "%s is not a %s"),
        ("types.date", "%s is not a %s"),
        ("types.boolean", "%s is not a %s"),
        ("types.integer", "%s is not an %s"),
        ("types.float", "%s is not a %s"),
        ("types.regexp", "%s is not a valid %s"),
        ("types.email", "%s is not a valid %s"),
        ("types.url", "%s is not a valid %s"),
        ("types.hex", "%s is not a valid %s"),
        ("string.len", "%s must be exactly %s characters"),
        ("string.min", "%s must be at least %s characters"),
        ("string.max", "%s cannot be longer than %s characters"),
        ("string.range", "%s must be between %s and %s characters"),
        ("number.len", "%s must equal %s"),
        ("number.min", "%s cannot be less than %s"),
        ("number.max", "%s cannot be greater than %s"),
        ("number.range", "%s must be between %s and %s"),
        ("array.len", "%s must be exactly %s in length"),
        ("array.min", "%s cannot be less than %s in length"),
        ("array.max", "%s cannot be greater than %s in length"),
        ("array.range", "%s must be between %s and %s in length"),
        ("pattern.mismatch", "%s value %s does not match pattern %s"),
    ];
    MessageCatalog {
        entries: table
            .iter()
            .map(|(path, text)| (path.to_string(), Message::from(*text)))
            .collect(),
    }
});

impl MessageCatalog {
    /// The built-in English catalog
    pub fn defaults() -> Self {
        DEFAULT_CATALOG.clone()
    }

    /// New catalog with `overrides` merged over this one
    pub fn with_overrides(&self, overrides: &Messages) -> Self {
        let mut entries = self.entries.clone();
        for (path, message) in overrides.iter() {
            entries.insert(path.clone(), message.clone());
        }
        Self { entries }
    }

    /// Template stored at `path`, if any
    pub fn get(&self, path: &str) -> Option<&Message> {
        self.entries.get(path)
    }

    /// Render the template at `path`, falling back to `default`
    pub fn resolve(&self, path: &str, args: &[String]) -> String {
        match self.entries.get(path).or_else(|| self.entries.get("default")) {
            Some(message) => message.render(args),
            None => format_template("Validation error on field %s", args),
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}
