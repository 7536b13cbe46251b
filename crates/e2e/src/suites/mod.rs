//! The platform's test suites and the plan that runs them
//!
//! A suite is an ordered list of [`TestUnit`]s over a [`Session`]. The plan
//! runs several suites as units of an outer run, so the same runner and
//! verdict rules apply at both levels.

pub mod api;
pub mod audit;
pub mod ui;
pub mod websocket;

use std::time::Instant;

use clap::ValueEnum;
use futures::FutureExt;
use tracing::{info, warn};

use crate::browser::BrowserDriver;
use crate::client::ApiClient;
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::report::{ReportFormat, SuiteReport};
use crate::runner::{RunnerConfig, SuiteRunner};
use crate::suite::TestUnit;
use crate::verdict::SuccessThreshold;

/// Run-scoped context handed to each unit of a suite in turn
pub struct Session {
    pub config: HarnessConfig,
    pub api: ApiClient,
    pub browser: Option<BrowserDriver>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl Session {
    pub fn new(config: &HarnessConfig) -> E2eResult<Self> {
        let api = ApiClient::new(
            &config.base_url,
            config.request_timeout,
            config.use_system_proxy,
        )?;
        Ok(Self {
            config: config.clone(),
            api,
            browser: None,
            user_id: None,
            user_name: None,
        })
    }

    /// A client that shares nothing with this session's login
    pub fn fresh_client(&self) -> E2eResult<ApiClient> {
        ApiClient::new(
            &self.config.base_url,
            self.config.request_timeout,
            self.config.use_system_proxy,
        )
    }

    /// Log in with the configured credentials and remember who we are
    pub async fn authenticate(&mut self) -> E2eResult<bool> {
        let login = self.api.login(&self.config.credentials).await?;
        let user_ref = login.user_ref();
        info!(
            "✅ Login successful - User: {} (ID: {})",
            login.name.as_deref().unwrap_or("Unknown"),
            user_ref
        );
        self.user_id = Some(user_ref);
        self.user_name = login.name;
        Ok(true)
    }

    pub async fn start_browser(&mut self) -> E2eResult<bool> {
        if self.browser.is_none() {
            let driver =
                BrowserDriver::launch(&self.config.base_url, self.config.browser.clone()).await?;
            info!("✅ Browser driver ready ({:?})", self.config.browser.browser);
            self.browser = Some(driver);
        }
        Ok(true)
    }

    pub fn browser(&mut self) -> E2eResult<&mut BrowserDriver> {
        self.browser.as_mut().ok_or(E2eError::BrowserNotStarted)
    }

    /// Release the browser session; also happens on drop
    pub fn teardown(&mut self) {
        if let Some(driver) = self.browser.take() {
            if let Err(e) = driver.close() {
                warn!("Browser cleanup failed: {}", e);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Shared unit: acquire the browser for the rest of the suite
pub(crate) fn browser_setup_unit() -> TestUnit<Session> {
    TestUnit::new("Browser Setup", |session: &mut Session| {
        async move { session.start_browser().await }.boxed()
    })
    .blocking()
    .with_hint("Verify Node.js and Playwright are installed (npx playwright install)")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuiteKind {
    Api,
    Ui,
    Audit,
    Websocket,
}

impl SuiteKind {
    pub fn all() -> [SuiteKind; 4] {
        [SuiteKind::Api, SuiteKind::Ui, SuiteKind::Audit, SuiteKind::Websocket]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SuiteKind::Api => "api",
            SuiteKind::Ui => "ui",
            SuiteKind::Audit => "audit",
            SuiteKind::Websocket => "websocket",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SuiteKind::Api => "API Tests - Backend API functionality",
            SuiteKind::Ui => "UI Tests - Web interface functionality",
            SuiteKind::Audit => "Audit Tests - Audit logging and display",
            SuiteKind::Websocket => "WebSocket Tests - Real-time connectivity",
        }
    }

    /// How strict each suite is about its own units
    pub fn default_threshold(&self) -> SuccessThreshold {
        match self {
            SuiteKind::Api => SuccessThreshold::AllPass,
            SuiteKind::Ui | SuiteKind::Audit => SuccessThreshold::Ratio(0.7),
            SuiteKind::Websocket => SuccessThreshold::Lenient,
        }
    }

    /// Advice printed when the whole suite fails
    pub fn recommendation(&self) -> &'static str {
        match self {
            SuiteKind::Api => {
                "Check backend services are running and accessible\nVerify database connections and authentication"
            }
            SuiteKind::Ui => {
                "Check frontend is properly built and deployed\nVerify Node.js and Playwright browsers are installed"
            }
            SuiteKind::Audit => {
                "Check audit service is running and configured\nVerify audit database tables exist"
            }
            SuiteKind::Websocket => {
                "WebSocket issues are common and often non-critical\nCheck notification service configuration if needed"
            }
        }
    }

    pub fn units(&self) -> Vec<TestUnit<Session>> {
        match self {
            SuiteKind::Api => api::units(),
            SuiteKind::Ui => ui::units(),
            SuiteKind::Audit => audit::units(),
            SuiteKind::Websocket => websocket::units(),
        }
    }
}

/// Run one suite with its own session and return its report
pub async fn run_suite(
    kind: SuiteKind,
    config: &HarnessConfig,
    runner: &SuiteRunner,
) -> E2eResult<SuiteReport> {
    info!("🚀 RUNNING: {}", kind.description());

    let threshold = config.threshold_override.unwrap_or_else(|| kind.default_threshold());
    let units = kind.units();
    let mut session = Session::new(config)?;

    let start = Instant::now();
    let results = runner.run(&units, &mut session).await;
    session.teardown();

    Ok(SuiteReport::new(
        kind.name(),
        results,
        threshold,
        start.elapsed().as_millis() as u64,
    ))
}

/// Outer context of a multi-suite run
pub struct Plan {
    pub config: HarnessConfig,
    pub format: ReportFormat,
    pub inner: SuiteRunner,
    pub reports: Vec<SuiteReport>,
}

impl Plan {
    pub fn new(config: HarnessConfig, format: ReportFormat, inner: SuiteRunner) -> Self {
        Self {
            config,
            format,
            inner,
            reports: Vec::new(),
        }
    }

    /// One outer unit per suite: passes when the suite meets its threshold.
    ///
    /// A cancelled suite still returns its partial results, which are
    /// reported like any finished suite.
    pub fn units(kinds: &[SuiteKind]) -> Vec<TestUnit<Plan>> {
        kinds
            .iter()
            .map(|&kind| {
                TestUnit::new(kind.description(), move |plan: &mut Plan| {
                    async move {
                        let report = run_suite(kind, &plan.config, &plan.inner).await?;
                        report.print(plan.format);
                        if let Some(dir) = &plan.config.output_dir {
                            report.write_results(dir)?;
                        }
                        let success = report.success;
                        plan.reports.push(report);
                        Ok(success)
                    }
                    .boxed()
                })
                .with_hint(kind.recommendation())
                .handles_cancellation()
            })
            .collect()
    }
}

/// Run several suites in order and summarize them as one run.
///
/// The inner runner shares `outer`'s cancellation token. A cancel ends the
/// current suite early (its report is still emitted) and skips the rest.
pub async fn run_plan(
    kinds: &[SuiteKind],
    config: HarnessConfig,
    format: ReportFormat,
    outer: &SuiteRunner,
) -> SuiteReport {
    info!("📋 Test Plan: {} test suites", kinds.len());
    for (i, kind) in kinds.iter().enumerate() {
        info!("   {}. {}", i + 1, kind.description());
    }

    let inner = SuiteRunner::new(config.runner.clone()).with_cancellation(outer.cancellation_token());
    let threshold = config.threshold_override.unwrap_or_default();
    let units = Plan::units(kinds);
    let mut plan = Plan::new(config, format, inner);

    let start = Instant::now();
    let results = outer.run(&units, &mut plan).await;

    SuiteReport::new("all", results, threshold, start.elapsed().as_millis() as u64)
}

/// Outer runner settings for a plan: pause between suites, no per-suite timeout
pub fn plan_runner_config(config: &HarnessConfig) -> RunnerConfig {
    RunnerConfig {
        inter_unit_delay: config.suite_delay,
        unit_timeout: None,
    }
}
