//! Ordered "first success wins" driver.
//!
//! Both the price waterfall and the wallet account-recovery sequence are an
//! ordered list of named steps tried one at a time until one produces a value.
//! [`run_ordered`] is that loop; callers supply the per-step attempt and map
//! their own failures onto [`Step`].
//!
//! Steps run strictly sequentially. A later step is never started once an
//! earlier one returned [`Step::Found`] or [`Step::Stop`].

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

/// Result of a single attempt.
#[derive(Debug)]
pub enum Step<T, E> {
    /// The step produced a value; stop here.
    Found(T),
    /// The step ran and failed; try the next one.
    Next(String),
    /// The step was not run (circuit open, not applicable); try the next one.
    Skip(String),
    /// The step failed in a way that must end the whole sequence.
    Stop(E),
}

/// Anything with a stable name for logs and diagnostics.
pub trait Labeled {
    fn label(&self) -> &str;
}

impl Labeled for str {
    fn label(&self) -> &str {
        self
    }
}

impl Labeled for String {
    fn label(&self) -> &str {
        self
    }
}

impl<T: Labeled + ?Sized> Labeled for &T {
    fn label(&self) -> &str {
        (**self).label()
    }
}

impl<T: Labeled + ?Sized> Labeled for Box<T> {
    fn label(&self) -> &str {
        (**self).label()
    }
}

impl<T: Labeled + ?Sized> Labeled for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }
}

/// What happened to one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum AttemptOutcome {
    Success,
    Failed(String),
    Skipped(String),
    Stopped(String),
}

/// One entry of an [`AttemptLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub label: String,
    pub outcome: AttemptOutcome,
}

/// Ordered record of every step considered during one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AttemptLog {
    attempts: Vec<Attempt>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, label: &str) {
        self.push(label, AttemptOutcome::Success);
    }

    pub fn record_failure(&mut self, label: &str, reason: impl Into<String>) {
        self.push(label, AttemptOutcome::Failed(reason.into()));
    }

    pub fn record_skip(&mut self, label: &str, reason: impl Into<String>) {
        self.push(label, AttemptOutcome::Skipped(reason.into()));
    }

    pub fn record_stop(&mut self, label: &str, reason: impl Into<String>) {
        self.push(label, AttemptOutcome::Stopped(reason.into()));
    }

    fn push(&mut self, label: &str, outcome: AttemptOutcome) {
        self.attempts.push(Attempt {
            label: label.to_string(),
            outcome,
        });
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn has_success(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.outcome == AttemptOutcome::Success)
    }

    /// Labels of the steps that actually ran (skips excluded).
    pub fn attempted(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
            .map(|a| a.label.as_str())
            .collect()
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Success => format!("{}: SUCCESS", a.label),
                AttemptOutcome::Failed(reason) => format!("{}: ERROR ({})", a.label, reason),
                AttemptOutcome::Skipped(reason) => format!("{}: SKIPPED ({})", a.label, reason),
                AttemptOutcome::Stopped(reason) => format!("{}: STOPPED ({})", a.label, reason),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Run `attempt` over `steps` in order until one yields a value.
///
/// Returns `Ok(Some(value))` for the first [`Step::Found`], `Ok(None)` when
/// every step failed or was skipped, and `Err(e)` as soon as a step returns
/// [`Step::Stop`]. Every step considered is recorded in `log`.
pub async fn run_ordered<'a, S, T, E, F, Fut>(
    steps: &'a [S],
    log: &mut AttemptLog,
    mut attempt: F,
) -> Result<Option<T>, E>
where
    S: Labeled + 'a,
    F: FnMut(&'a S) -> Fut,
    Fut: Future<Output = Step<T, E>>,
    E: Display,
{
    for step in steps {
        let label = step.label();
        match attempt(step).await {
            Step::Found(value) => {
                debug!("'{}' succeeded", label);
                log.record_success(label);
                return Ok(Some(value));
            }
            Step::Next(reason) => {
                debug!("'{}' failed: {}", label, reason);
                log.record_failure(label, reason);
            }
            Step::Skip(reason) => {
                debug!("'{}' skipped: {}", label, reason);
                log.record_skip(label, reason);
            }
            Step::Stop(error) => {
                debug!("'{}' stopped the sequence: {}", label, error);
                log.record_stop(label, error.to_string());
                return Err(error);
            }
        }
    }
    Ok(None)
}
