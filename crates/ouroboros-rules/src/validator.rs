//! Custom validators
//!
//! A [`Validator`] replaces the type checker of a rule. Every calling style
//! (plain verdicts, a completion handle, or a future) is adapted into one
//! deferred result at the call boundary.
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::{Validator, ValidatorError, Verdict, Value};
//!
//! // Verdict-returning check
//! let even = Validator::check(|_, value| match value.and_then(Value::as_f64) {
//!     Some(n) if n % 2.0 == 0.0 => Verdict::Valid,
//!     _ => Verdict::message("must be even"),
//! });
//!
//! // Future-returning check
//! let remote = Validator::future(|_, value| async move {
//!     match value {
//!         Some(Value::String(name)) if name != "taken" => Ok(()),
//!         _ => Err(ValidatorError::from("name is not available")),
//!     }
//! });
//! # let _ = (even, remote);
//! ```

use crate::errors::ErrorKind;
use crate::normalize::InternalRule;
use crate::options::ValidateOptions;
use crate::types::Value;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Validator Mode
// ============================================================================

/// Calling convention of a custom validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidatorMode {
    /// Answers with a verdict, or finishes through its completion handle
    #[default]
    Sync,
    /// Always finishes through its completion handle or a deferred future
    Async,
}

// ============================================================================
// Errors and verdicts
// ============================================================================

/// Failure reported by a custom validator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidatorError(pub String);

impl From<&str> for ValidatorError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ValidatorError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a custom validator answers with
pub enum Verdict {
    /// The value passes
    Valid,
    /// The value fails with the generic "<field> fails" message
    Invalid,
    /// The value fails with this message
    Message(String),
    /// The value fails with each of these messages (none means pass)
    Messages(Vec<String>),
    /// The value fails with the error's display text
    Error(Box<dyn std::error::Error + Send + Sync>),
    /// The result will be delivered through the [`Completion`] handle
    Pending,
    /// The result is the output of this future
    Deferred(BoxFuture<'static, Result<(), ValidatorError>>),
}

impl Verdict {
    /// Fail with a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Fail with an error value
    pub fn error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Error(Box::new(error))
    }

    /// Wait for a future
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), ValidatorError>> + Send + 'static,
    {
        Self::Deferred(fut.boxed())
    }

    fn is_decisive(&self) -> bool {
        !matches!(self, Self::Pending | Self::Deferred(_))
    }
}

impl From<bool> for Verdict {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

impl From<&str> for Verdict {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for Verdict {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Vec<String>> for Verdict {
    fn from(messages: Vec<String>) -> Self {
        Self::Messages(messages)
    }
}

impl<E: Into<ValidatorError>> From<Result<(), E>> for Verdict {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Valid,
            Err(e) => Self::Message(e.into().0),
        }
    }
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("Valid"),
            Self::Invalid => f.write_str("Invalid"),
            Self::Message(m) => f.debug_tuple("Message").field(m).finish(),
            Self::Messages(m) => f.debug_tuple("Messages").field(m).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Self::Pending => f.write_str("Pending"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

// ============================================================================
// Completion handle
// ============================================================================

type Outcome = Result<(), Vec<String>>;

/// One-shot handle a validator uses to report its result later
///
/// Every method consumes the handle, so a result is reported at most once.
/// Dropping it without reporting while the validator answered
/// [`Verdict::Pending`] is a misuse.
pub struct Completion {
    tx: oneshot::Sender<Outcome>,
}

impl Completion {
    /// Report a pass
    pub fn pass(self) {
        self.send(Ok(()));
    }

    /// Report a failure
    pub fn fail(self, message: impl Into<String>) {
        self.send(Err(vec![message.into()]));
    }

    /// Report several failures; an empty list is a pass
    pub fn fail_many<S: Into<String>>(self, messages: impl IntoIterator<Item = S>) {
        let messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        if messages.is_empty() {
            self.send(Ok(()));
        } else {
            self.send(Err(messages));
        }
    }

    /// Report a `Result`
    pub fn finish(self, result: Result<(), ValidatorError>) {
        self.send(result.map_err(|e| vec![e.0]));
    }

    fn send(self, outcome: Outcome) {
        // the run may already be over; a late result is dropped
        let _ = self.tx.send(outcome);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("canceled", &self.tx.is_canceled())
            .finish()
    }
}

// ============================================================================
// Rule context
// ============================================================================

/// Early-stop signal of a run, linked to the runs enclosing it
#[derive(Clone, Default)]
pub(crate) struct Settled {
    own: Arc<AtomicBool>,
    parent: Option<Arc<Settled>>,
}

impl Settled {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Signal for a nested run that may stop early on its own. Settling the
    /// child leaves the parent untouched; settling the parent reaches the child.
    pub(crate) fn child(&self) -> Self {
        Self {
            own: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub(crate) fn settle(&self) {
        self.own.store(true, Ordering::Release);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.own.load(Ordering::Acquire) || self.parent.as_deref().is_some_and(Settled::is_set)
    }
}

/// What a custom validator can see besides the value
#[derive(Clone)]
pub struct RuleContext {
    rule: Arc<InternalRule>,
    source: Arc<Value>,
    settled: Settled,
    options: Arc<ValidateOptions>,
}

impl RuleContext {
    pub(crate) fn new(
        rule: Arc<InternalRule>,
        source: Arc<Value>,
        settled: Settled,
        options: Arc<ValidateOptions>,
    ) -> Self {
        Self {
            rule,
            source,
            settled,
            options,
        }
    }

    /// The rule being applied
    pub fn rule(&self) -> &InternalRule {
        &self.rule
    }

    /// The object holding the field
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Field name at this nesting level
    pub fn field(&self) -> &str {
        &self.rule.field
    }

    /// Dotted path from the root
    pub fn full_field(&self) -> &str {
        &self.rule.full_field
    }

    /// Options of the current run
    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// True once this run, or any run enclosing it, has completed without
    /// waiting for this validator. Long-running validators may poll this to
    /// give up early.
    pub fn is_settled(&self) -> bool {
        self.settled.is_set()
    }
}

impl fmt::Debug for RuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("full_field", &self.rule.full_field)
            .field("settled", &self.is_settled())
            .finish()
    }
}

// ============================================================================
// Validator
// ============================================================================

type ValidatorFn = dyn Fn(&RuleContext, Option<&Value>, Completion) -> Verdict + Send + Sync;

/// A message produced by running one rule
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleFailure {
    pub message: String,
    pub kind: ErrorKind,
}

impl RuleFailure {
    pub(crate) fn rule(message: String) -> Self {
        Self {
            message,
            kind: ErrorKind::Rule,
        }
    }
}

/// A user-supplied check replacing a rule's type checker
#[derive(Clone)]
pub struct Validator {
    mode: ValidatorMode,
    func: Arc<ValidatorFn>,
}

impl Validator {
    /// Synchronous validator with access to a completion handle
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>, Completion) -> Verdict + Send + Sync + 'static,
    {
        Self {
            mode: ValidatorMode::Sync,
            func: Arc::new(f),
        }
    }

    /// Asynchronous validator finishing through its completion handle or a
    /// [`Verdict::Deferred`] future
    pub fn asynchronous<F>(f: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>, Completion) -> Verdict + Send + Sync + 'static,
    {
        Self {
            mode: ValidatorMode::Async,
            func: Arc::new(f),
        }
    }

    /// Synchronous validator answering with a verdict
    pub fn check<F, V>(f: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::sync(move |cx, value, _done| f(cx, value).into())
    }

    /// Synchronous validator that always reports through its completion handle
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&RuleContext, Option<&Value>, Completion) + Send + Sync + 'static,
    {
        Self::sync(move |cx, value, done| {
            f(cx, value, done);
            Verdict::Pending
        })
    }

    /// Asynchronous validator backed by an async closure
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(RuleContext, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ValidatorError>> + Send + 'static,
    {
        Self::asynchronous(move |cx, value, _done| Verdict::Deferred(f(cx.clone(), value.cloned()).boxed()))
    }

    /// Calling convention
    pub fn mode(&self) -> ValidatorMode {
        self.mode
    }

    /// Run the validator and adapt its answer into one future
    pub(crate) fn invoke(&self, cx: RuleContext, value: Option<Value>) -> BoxFuture<'static, Vec<RuleFailure>> {
        let field = cx.full_field().to_string();
        let warn = !cx.options().suppress_warning;
        let report = !cx.options().suppress_validator_error;
        let misuse = move |reason: String| -> Vec<RuleFailure> {
            if report {
                tracing::error!(field = %field, %reason, "custom validator misuse");
            }
            vec![RuleFailure {
                message: reason,
                kind: ErrorKind::Validator,
            }]
        };

        let (tx, mut rx) = oneshot::channel();
        let call = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.func)(&cx, value.as_ref(), Completion { tx })
        }));
        let verdict = match call {
            Ok(verdict) => verdict,
            Err(payload) => {
                return future::ready(misuse(format!("validator panicked: {}", panic_message(&*payload))))
                    .boxed()
            }
        };

        // a decisive verdict plus a used completion: a reported failure is kept
        // over a returned pass, otherwise the returned result wins
        let reported = if verdict.is_decisive() {
            rx.try_recv().ok().flatten()
        } else {
            None
        };
        if reported.is_some() && warn {
            tracing::warn!(
                field = %cx.full_field(),
                "validator returned a result and also used its completion"
            );
        }

        let full_field = cx.full_field().to_string();
        match verdict {
            Verdict::Valid => match reported {
                Some(Err(messages)) => future::ready(messages.into_iter().map(RuleFailure::rule).collect()).boxed(),
                _ => future::ready(Vec::new()).boxed(),
            },
            Verdict::Invalid => future::ready(vec![RuleFailure::rule(format!("{} fails", full_field))]).boxed(),
            Verdict::Message(m) => future::ready(vec![RuleFailure::rule(m)]).boxed(),
            Verdict::Messages(ms) => future::ready(ms.into_iter().map(RuleFailure::rule).collect()).boxed(),
            Verdict::Error(e) => future::ready(vec![RuleFailure::rule(e.to_string())]).boxed(),
            Verdict::Pending => async move {
                match rx.await {
                    Ok(Ok(())) => Vec::new(),
                    Ok(Err(messages)) => messages.into_iter().map(RuleFailure::rule).collect(),
                    Err(oneshot::Canceled) => misuse("validator dropped its completion without reporting".into()),
                }
            }
            .boxed(),
            Verdict::Deferred(_) if self.mode == ValidatorMode::Sync => {
                future::ready(misuse("synchronous validator returned a deferred result".into())).boxed()
            }
            Verdict::Deferred(fut) => async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => Vec::new(),
                    Ok(Err(e)) => vec![RuleFailure::rule(e.0)],
                    Err(payload) => misuse(format!("validator panicked: {}", panic_message(&*payload))),
                }
            }
            .boxed(),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("mode", &self.mode).finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
