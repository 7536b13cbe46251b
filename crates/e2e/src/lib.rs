//! Platform E2E Test Harness
//!
//! This crate runs ordered suites of end-to-end checks against a deployed
//! microservices platform and grades the outcome for CI:
//! - Runs units strictly in order with a pause between them
//! - Isolates unit failures, panics and timeouts into per-unit results
//! - Skips the rest of a suite when a blocking setup unit fails
//! - Grades a finished run as ALL_PASS, MOSTLY_PASS, MIXED or MANY_FAIL
//! - Drives the backend over HTTP and the frontend through Playwright
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  platform-e2e (binary)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  run_plan(kinds) ── SuiteRunner (outer, suite delay)        │
//! │    └── run_suite(kind) ── SuiteRunner (inner, unit delay)   │
//! │          ├── TestUnit<Session> { name, blocking, hint }     │
//! │          │     ├── ApiClient (reqwest)                      │
//! │          │     └── BrowserDriver (node + Playwright)        │
//! │          └── ResultSet -> summarize() -> Verdict            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteReport                                                │
//! │    ├── overall_success(verdict, threshold)                  │
//! │    ├── render(Table | Json | Jsonl | Yaml)                  │
//! │    └── write_results(dir)                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod suite;
pub mod suites;
pub mod verdict;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use report::{ReportFormat, SuiteReport};
pub use runner::{RunnerConfig, SuiteRunner};
pub use suite::{Outcome, ResultSet, TestUnit, UnitFuture, UnitRecord};
pub use suites::{run_plan, run_suite, SuiteKind};
pub use verdict::{exit_code, overall_success, summarize, Grade, SuccessThreshold, Verdict};
