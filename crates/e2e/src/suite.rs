//! Test units and the ordered result set produced by a run

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Future returned by a unit's operation, borrowing the run context
pub type UnitFuture<'a> = BoxFuture<'a, E2eResult<bool>>;

type Operation<C> = Box<dyn for<'a> Fn(&'a mut C) -> UnitFuture<'a> + Send + Sync>;

/// A named test operation over a run-scoped context `C`.
///
/// The operation reports `Ok(true)` for a pass. `Ok(false)`, an `Err` or a
/// panic all count as a failure.
pub struct TestUnit<C> {
    name: String,
    blocking: bool,
    handles_cancellation: bool,
    hint: Option<String>,
    operation: Operation<C>,
}

impl<C> TestUnit<C> {
    /// Create a unit from an async operation.
    ///
    /// ```ignore
    /// TestUnit::new("Users API", |session| users_api(session).boxed())
    /// ```
    pub fn new<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> UnitFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            blocking: false,
            handles_cancellation: false,
            hint: None,
            operation: Box::new(operation),
        }
    }

    /// Mark this unit as a prerequisite: if it does not pass, the remaining
    /// units of the run are skipped.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// The operation watches the run's cancellation token itself and winds
    /// down on its own. The runner lets it finish instead of interrupting it,
    /// and only stops scheduling later units.
    pub fn handles_cancellation(mut self) -> Self {
        self.handles_cancellation = true;
        self
    }

    /// Remediation advice shown in the report when this unit does not pass
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn is_cancellation_aware(&self) -> bool {
        self.handles_cancellation
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub(crate) fn invoke<'a>(&self, ctx: &'a mut C) -> UnitFuture<'a> {
        (self.operation)(ctx)
    }
}

impl<C> std::fmt::Debug for TestUnit<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestUnit")
            .field("name", &self.name)
            .field("blocking", &self.blocking)
            .field("handles_cancellation", &self.handles_cancellation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    /// Not executed: a blocking unit failed earlier or the run was cancelled
    Skipped,
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
            Outcome::Skipped => "SKIPPED",
        }
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }
}

/// Result of running a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl UnitRecord {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            duration_ms: 0,
            error: None,
            hint: None,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(name, Outcome::Skipped)
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }

    /// One-line diagnostic naming the unit and what went wrong
    pub fn diagnostic(&self) -> String {
        match (&self.outcome, &self.error) {
            (Outcome::Passed, _) => format!("{} passed", self.name),
            (outcome, Some(detail)) => {
                format!("{} {}: {}", self.name, outcome.label().to_lowercase(), detail)
            }
            (outcome, None) => format!("{} {}", self.name, outcome.label().to_lowercase()),
        }
    }
}

/// Outcomes of a run, in execution order. One entry per input unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: Vec<UnitRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Build a finalized set from `(name, passed)` pairs
    pub fn from_outcomes<I, S>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            entries: outcomes
                .into_iter()
                .map(|(name, passed)| UnitRecord::new(name, Outcome::from(passed)))
                .collect(),
        }
    }

    pub(crate) fn push(&mut self, record: UnitRecord) {
        self.entries.push(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitRecord> {
        self.entries.iter()
    }

    /// First record with this name
    pub fn get(&self, name: &str) -> Option<&UnitRecord> {
        self.entries.iter().find(|r| r.name == name)
    }

    /// Boolean view of a unit's outcome
    pub fn outcome(&self, name: &str) -> Option<bool> {
        self.get(name).map(UnitRecord::passed)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|r| r.name.as_str())
    }

    pub fn not_passed(&self) -> impl Iterator<Item = &UnitRecord> {
        self.entries.iter().filter(|r| !r.passed())
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|r| r.outcome == outcome).count()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a UnitRecord;
    type IntoIter = std::slice::Iter<'a, UnitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
