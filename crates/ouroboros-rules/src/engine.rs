//! Execution orchestrator
//!
//! Runs a planned schema against a source object. Every rule becomes a
//! `'static` boxed future, so fields and rules can run concurrently, early
//! stops can leave stragglers running, and nested schemas recurse through
//! the same machinery.
//!
//! Policies:
//! - default: all fields concurrently, all rules of a field concurrently
//! - `first_fields`: the rules of a matching field run in order and the
//!   field stops at its first failing rule
//! - `first`: every rule of every field races; the first error completes
//!   the run and late results are discarded

use crate::checkers::{CheckContext, Checkers};
use crate::errors::{ErrorKind, SchemaError, ValidateError};
use crate::messages::MessageCatalog;
use crate::normalize::{plan, Dispatch, FieldPlan, InternalRule, Plan, RuleTask};
use crate::options::ValidateOptions;
use crate::rule::{nested_rules, Rules};
use crate::types::Value;
use crate::validator::{RuleContext, RuleFailure, Settled};
use futures::future::{self, join_all, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Shared state of one (possibly nested) run
#[derive(Clone)]
pub(crate) struct Scope {
    pub checkers: Arc<Checkers>,
    pub catalog: Arc<MessageCatalog>,
    pub options: Arc<ValidateOptions>,
    /// Set once this run, or a run enclosing it, has completed early
    pub settled: Settled,
}

impl Scope {
    pub fn new(checkers: Arc<Checkers>, catalog: Arc<MessageCatalog>, options: ValidateOptions) -> Self {
        Self {
            checkers,
            catalog,
            options: Arc::new(options),
            settled: Settled::new(),
        }
    }

    /// Scope for the nested run below `rule`
    fn nested(&self, rule: &InternalRule) -> Self {
        let options = self.options.for_nested(rule.rule.options.as_deref());
        // a nested early stop must not mark the parent run as settled
        let settled = if options.first {
            self.settled.child()
        } else {
            self.settled.clone()
        };
        Self {
            checkers: self.checkers.clone(),
            catalog: self.catalog.clone(),
            options: Arc::new(options),
            settled,
        }
    }
}

/// Validate `source` against `rules`.
///
/// Returns the transformed source together with every error, in schema order
/// (or completion order under `first`).
pub(crate) async fn execute(rules: &Rules, source: Value, scope: Scope) -> (Value, Vec<ValidateError>) {
    let warn = !scope.options.suppress_warning;
    let planned = match plan(
        rules,
        source.clone(),
        scope.options.keys.as_deref(),
        &scope.checkers,
        &[],
        warn,
    ) {
        Ok(planned) => planned,
        Err(err) => {
            let error = schema_failure("", err, &scope.options);
            return (source, vec![error]);
        }
    };

    tracing::debug!(
        fields = planned.fields.len(),
        first = scope.options.first,
        "validation run started"
    );
    let transformed = planned.source.clone();
    let errors = run_plan(planned, scope).await;
    tracing::debug!(errors = errors.len(), "validation run finished");
    (transformed, errors)
}

fn run_plan(planned: Plan, scope: Scope) -> BoxFuture<'static, Vec<ValidateError>> {
    let source = Arc::new(planned.source);
    if scope.options.first {
        let tasks: FuturesUnordered<_> = planned
            .fields
            .into_iter()
            .flat_map(|field| field.tasks)
            .map(|task| run_rule(task, source.clone(), scope.clone()))
            .collect();
        first_error(tasks, scope.settled).boxed()
    } else {
        let fields = planned
            .fields
            .into_iter()
            .map(|field| run_field(field, source.clone(), scope.clone()));
        join_all(fields)
            .map(|per_field| per_field.into_iter().flatten().collect())
            .boxed()
    }
}

async fn run_field(field: FieldPlan, source: Arc<Value>, scope: Scope) -> Vec<ValidateError> {
    if scope.options.first_fields.applies(&field.field) {
        for task in field.tasks {
            let errors = run_rule(task, source.clone(), scope.clone()).await;
            if !errors.is_empty() {
                return errors;
            }
        }
        return Vec::new();
    }

    let rules = field
        .tasks
        .into_iter()
        .map(|task| run_rule(task, source.clone(), scope.clone()));
    join_all(rules).await.into_iter().flatten().collect()
}

/// Resolve with the first non-empty error list, truncated to one error.
async fn first_error(
    mut tasks: FuturesUnordered<BoxFuture<'static, Vec<ValidateError>>>,
    settled: Settled,
) -> Vec<ValidateError> {
    while let Some(mut errors) = tasks.next().await {
        if !errors.is_empty() {
            settled.settle();
            errors.truncate(1);
            drain(tasks);
            return errors;
        }
    }
    Vec::new()
}

/// Let outstanding rule futures finish in the background, ignoring results
fn drain(tasks: FuturesUnordered<BoxFuture<'static, Vec<ValidateError>>>) {
    if tasks.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::trace!(pending = tasks.len(), "draining late validators");
            handle.spawn(tasks.for_each(|_| future::ready(())));
        }
        Err(_) => {
            tracing::trace!(pending = tasks.len(), "no runtime, dropping late validators");
        }
    }
}

fn run_rule(task: RuleTask, source: Arc<Value>, scope: Scope) -> BoxFuture<'static, Vec<ValidateError>> {
    let RuleTask { rule, dispatch, value } = task;

    let failures: BoxFuture<'static, Vec<RuleFailure>> = match dispatch {
        Dispatch::Checker(checker) => {
            let cx = CheckContext {
                rule: &rule,
                source: &source,
                messages: &scope.catalog,
                range_style: scope.options.range_style,
            };
            let mut messages = Vec::new();
            checker.check(value.as_ref(), &cx, &mut messages);
            future::ready(messages.into_iter().map(RuleFailure::rule).collect()).boxed()
        }
        Dispatch::Validator(validator) => {
            let cx = RuleContext::new(rule.clone(), source, scope.settled.clone(), scope.options.clone());
            validator.invoke(cx, value.clone())
        }
    };

    async move {
        let failures = failures.await;
        let mut errors = complete_errors(&rule, failures, value.as_ref(), &scope);
        if !errors.is_empty() && !scope.options.suppress_warning {
            tracing::debug!(field = %rule.full_field, errors = errors.len(), "rule failed");
        }

        if scope.options.first && !errors.is_empty() {
            return errors;
        }
        let descend = rule.rule.has_nested() && value.as_ref().is_some_and(Value::is_truthy);
        if !descend {
            return errors;
        }

        let child_rules = nested_rules(&rule.rule, value.as_ref());
        let child_scope = scope.nested(&rule);
        let warn = !child_scope.options.suppress_warning;
        let child_source = value.unwrap_or(Value::Null);
        match plan(&child_rules, child_source, None, &scope.checkers, &rule.full_fields, warn) {
            Ok(child) => errors.extend(run_plan(child, child_scope).await),
            Err(err) => errors.push(schema_failure(&rule.full_field, err, &scope.options)),
        }
        errors
    }
    .boxed()
}

/// Apply the rule's message override and shape failures into public errors
fn complete_errors(
    rule: &InternalRule,
    failures: Vec<RuleFailure>,
    value: Option<&Value>,
    scope: &Scope,
) -> Vec<ValidateError> {
    let failures = match (&rule.rule.message, failures.first().map(|f| f.kind)) {
        (Some(message), Some(kind)) => vec![RuleFailure {
            message: message.render(&[rule.label().to_string()]),
            kind,
        }],
        _ => failures,
    };

    failures
        .into_iter()
        .map(|failure| {
            let error = match &scope.options.error {
                Some(factory) => factory(rule, failure.message),
                None => ValidateError::new(&rule.full_field, failure.message).with_value(value.cloned()),
            };
            if failure.kind == ErrorKind::Validator {
                error.with_kind(ErrorKind::Validator)
            } else {
                error
            }
        })
        .collect()
}

/// A schema problem found mid-run, reported against the field that hit it
fn schema_failure(field: &str, err: SchemaError, options: &ValidateOptions) -> ValidateError {
    if !options.suppress_validator_error {
        tracing::error!(field = %field, error = %err, "invalid nested schema");
    }
    ValidateError::new(field, err.to_string()).with_kind(ErrorKind::Validator)
}
