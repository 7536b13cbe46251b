//! Sequential suite runner: executes test units in order and collects outcomes

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::suite::{Outcome, ResultSet, TestUnit, UnitRecord};

/// Configuration for the suite runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between consecutive units (rate limit against the system under test)
    pub inter_unit_delay: Duration,

    /// Upper bound for a single unit; `None` lets a unit run forever
    pub unit_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            inter_unit_delay: Duration::from_secs(1),
            unit_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl RunnerConfig {
    /// No pauses and no timeout
    pub fn immediate() -> Self {
        Self {
            inter_unit_delay: Duration::ZERO,
            unit_timeout: None,
        }
    }
}

/// Runs units one at a time against a shared, exclusively borrowed context.
///
/// The runner never fails: unit errors, panics, timeouts and cancellation are
/// all converted into entries of the returned [`ResultSet`].
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    config: RunnerConfig,
    cancel: CancellationToken,
}

impl SuiteRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned cancellation token (e.g. a Ctrl-C handler)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run all units in order.
    ///
    /// Returns one record per input unit, in input order. Once a blocking
    /// unit fails or the run is cancelled, the remaining units are recorded
    /// as skipped.
    pub async fn run<C: Send>(&self, units: &[TestUnit<C>], ctx: &mut C) -> ResultSet {
        let start = Instant::now();
        let mut results = ResultSet::with_capacity(units.len());
        let mut halted: Option<String> = None;

        info!("Running {} test unit(s)...", units.len());

        for (index, unit) in units.iter().enumerate() {
            if halted.is_none() && self.cancel.is_cancelled() {
                warn!("Run cancelled before '{}'", unit.name());
                halted = Some("run cancelled".to_string());
            }

            if let Some(reason) = &halted {
                debug!("⏭ {} skipped ({})", unit.name(), reason);
                let mut record = UnitRecord::skipped(unit.name(), reason.clone());
                record.hint = unit.hint().map(String::from);
                results.push(record);
                continue;
            }

            let record = self.run_unit(unit, ctx).await;

            if unit.is_blocking() && !record.passed() {
                error!("Blocking unit '{}' did not pass; skipping the rest of the run", unit.name());
                halted = Some(format!("blocking unit '{}' did not pass", unit.name()));
            }
            results.push(record);

            let more_to_run = index + 1 < units.len() && halted.is_none();
            if more_to_run && !self.config.inter_unit_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.config.inter_unit_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        info!(
            "Completed {} unit(s): {} passed, {} failed, {} skipped ({} ms)",
            results.len(),
            results.count(Outcome::Passed),
            results.count(Outcome::Failed),
            results.count(Outcome::Skipped),
            start.elapsed().as_millis()
        );

        results
    }

    /// Run a single unit, isolating every way it can go wrong
    async fn run_unit<C: Send>(&self, unit: &TestUnit<C>, ctx: &mut C) -> UnitRecord {
        let start = Instant::now();
        info!("▶ {}", unit.name());

        let guarded = AssertUnwindSafe(unit.invoke(ctx)).catch_unwind();
        let bounded = async {
            let caught = match self.config.unit_timeout {
                Some(limit) => match timeout(limit, guarded).await {
                    Ok(caught) => caught,
                    Err(_) => Ok(Err(E2eError::Timeout(format!(
                        "'{}' after {} ms",
                        unit.name(),
                        limit.as_millis()
                    )))),
                },
                None => guarded.await,
            };
            caught.unwrap_or_else(|panic| Err(E2eError::Panicked(panic_message(panic))))
        };

        let result: E2eResult<bool> = if unit.is_cancellation_aware() {
            bounded.await
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(E2eError::Cancelled),
                result = bounded => result,
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let (outcome, error) = match result {
            Ok(true) => {
                info!("✓ {} ({} ms)", unit.name(), duration_ms);
                (Outcome::Passed, None)
            }
            Ok(false) => {
                error!("✗ {} ({} ms)", unit.name(), duration_ms);
                (Outcome::Failed, None)
            }
            Err(e) => {
                error!("✗ {} - {}", unit.name(), e);
                (Outcome::Failed, Some(e.to_string()))
            }
        };

        UnitRecord {
            name: unit.name().to_string(),
            outcome,
            duration_ms,
            error,
            hint: unit.hint().map(String::from),
        }
    }
}

impl Default for SuiteRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls(Vec<String>);

    fn recording(name: &'static str, pass: bool) -> TestUnit<Calls> {
        TestUnit::new(name, move |calls: &mut Calls| {
            async move {
                calls.0.push(name.to_string());
                Ok(pass)
            }
            .boxed()
        })
    }

    fn explode() -> E2eResult<bool> {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_runs_units_in_order() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![recording("a", true), recording("b", false), recording("c", true)];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        assert_eq!(calls.0, vec!["a", "b", "c"]);
        assert_eq!(results.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(results.outcome("b"), Some(false));
    }

    #[tokio::test]
    async fn test_error_is_recorded_not_propagated() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![
            TestUnit::new("x", |_: &mut Calls| async { Err(E2eError::failure("boom")) }.boxed()),
            recording("y", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        let x = results.get("x").unwrap();
        assert_eq!(x.outcome, Outcome::Failed);
        assert_eq!(x.error.as_deref(), Some("boom"));
        assert!(x.diagnostic().contains('x') && x.diagnostic().contains("boom"));
        assert_eq!(calls.0, vec!["y"]);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![
            TestUnit::new("explodes", |_: &mut Calls| async { explode() }.boxed()),
            recording("after", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        let record = results.get("explodes").unwrap();
        assert_eq!(record.outcome, Outcome::Failed);
        assert!(record.error.as_deref().unwrap().contains("kaboom"));
        assert_eq!(results.outcome("after"), Some(true));
    }

    #[tokio::test]
    async fn test_timeout_fails_unit() {
        let runner = SuiteRunner::new(RunnerConfig {
            inter_unit_delay: Duration::ZERO,
            unit_timeout: Some(Duration::from_millis(20)),
        });
        let units = vec![
            TestUnit::new("hangs", |_: &mut Calls| {
                async {
                    sleep(Duration::from_secs(30)).await;
                    Ok(true)
                }
                .boxed()
            }),
            recording("next", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        let record = results.get("hangs").unwrap();
        assert_eq!(record.outcome, Outcome::Failed);
        assert!(record.error.as_deref().unwrap().contains("Timeout"));
        assert_eq!(results.outcome("next"), Some(true));
    }

    #[tokio::test]
    async fn test_blocking_failure_skips_remaining() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![
            recording("setup", false).blocking(),
            recording("a", true),
            recording("b", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        assert_eq!(calls.0, vec!["setup"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results.get("setup").unwrap().outcome, Outcome::Failed);
        assert_eq!(results.get("a").unwrap().outcome, Outcome::Skipped);
        assert_eq!(results.get("b").unwrap().outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_blocking_pass_continues() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![recording("setup", true).blocking(), recording("a", true)];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        assert_eq!(calls.0, vec!["setup", "a"]);
        assert_eq!(results.count(Outcome::Passed), 2);
    }

    #[tokio::test]
    async fn test_cancel_from_inside_unit_skips_rest() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let token = runner.cancellation_token();
        let units = vec![
            recording("first", true),
            TestUnit::new("cancels", move |_: &mut Calls| {
                let token = token.clone();
                async move {
                    token.cancel();
                    Ok(true)
                }
                .boxed()
            }),
            recording("never", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.outcome("first"), Some(true));
        assert_eq!(results.get("never").unwrap().outcome, Outcome::Skipped);
        assert!(!calls.0.contains(&"never".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_running_unit() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let token = runner.cancellation_token();
        let units = vec![TestUnit::new("slow", |_: &mut Calls| {
            async {
                sleep(Duration::from_secs(30)).await;
                Ok(true)
            }
            .boxed()
        })];
        let mut calls = Calls::default();

        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let results = runner.run(&units, &mut calls).await;

        let record = results.get("slow").unwrap();
        assert_eq!(record.outcome, Outcome::Failed);
        assert_eq!(record.error.as_deref(), Some("Run cancelled"));
    }

    #[tokio::test]
    async fn test_cancellation_aware_unit_runs_to_completion() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let token = runner.cancellation_token();
        let units = vec![
            TestUnit::new("winds down", move |calls: &mut Calls| {
                let token = token.clone();
                async move {
                    token.cancel();
                    sleep(Duration::from_millis(20)).await;
                    calls.0.push("winds down".to_string());
                    Ok(false)
                }
                .boxed()
            })
            .handles_cancellation(),
            recording("never", true),
        ];
        let mut calls = Calls::default();

        let results = runner.run(&units, &mut calls).await;

        let record = results.get("winds down").unwrap();
        assert_eq!(record.outcome, Outcome::Failed);
        assert_eq!(record.error, None);
        assert_eq!(calls.0, vec!["winds down"]);
        assert_eq!(results.get("never").unwrap().outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_inter_unit_delay_is_applied_between_units() {
        let runner = SuiteRunner::new(RunnerConfig {
            inter_unit_delay: Duration::from_millis(30),
            unit_timeout: None,
        });
        let units = vec![recording("a", true), recording("b", true), recording("c", true)];
        let mut calls = Calls::default();

        let start = Instant::now();
        runner.run(&units, &mut calls).await;

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let runner = SuiteRunner::default();
        let units: Vec<TestUnit<Calls>> = Vec::new();
        let results = runner.run(&units, &mut Calls::default()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_hint_is_carried_into_record() {
        let runner = SuiteRunner::new(RunnerConfig::immediate());
        let units = vec![recording("a", false).with_hint("check the backend")];
        let results = runner.run(&units, &mut Calls::default()).await;
        assert_eq!(results.get("a").unwrap().hint.as_deref(), Some("check the backend"));
    }
}
