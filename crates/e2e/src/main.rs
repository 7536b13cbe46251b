//! Platform E2E harness - Main Entry Point
//!
//! Runs the selected test suites against a deployed platform and exits with
//! a CI-friendly status: 0 on success, 1 on failure, 2 on bad configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use platform_e2e::browser::Browser;
use platform_e2e::config::{Credentials, HarnessConfig, DEFAULT_BASE_URL};
use platform_e2e::suites::{plan_runner_config, run_plan, run_suite, SuiteKind};
use platform_e2e::{E2eResult, ReportFormat, RunnerConfig, SuccessThreshold, SuiteRunner};

/// Exit status for configuration and usage errors
const EXIT_CONFIG_ERROR: i32 = 2;

/// End-to-end tests for the microservices platform
#[derive(Parser)]
#[command(name = "platform-e2e")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Suites to run, in order (default: all)
    #[arg(value_enum)]
    suites: Vec<SuiteKind>,

    /// Base URL of the frontend and API gateway
    #[arg(long, env = "E2E_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Login email
    #[arg(long, env = "E2E_EMAIL", default_value = "admin@example.com")]
    email: String,

    /// Login password
    #[arg(long, env = "E2E_PASSWORD", default_value = "admin123", hide_env_values = true)]
    password: String,

    /// Pause between units of a suite, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Pause between suites, in milliseconds
    #[arg(long, default_value_t = 2000)]
    suite_delay_ms: u64,

    /// Per-unit timeout in seconds (0 disables it)
    #[arg(long, default_value_t = 120)]
    unit_timeout_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Success threshold: all-pass, mostly-pass, lenient or ratio:<0..1>
    /// (default: each suite's own, mostly-pass for several suites)
    #[arg(long)]
    threshold: Option<SuccessThreshold>,

    /// Report format
    #[arg(long, value_enum, default_value = "table")]
    format: ReportFormat,

    /// Directory for JSON result files
    #[arg(long)]
    output: Option<PathBuf>,

    /// Browser engine for UI suites
    #[arg(long, value_enum, default_value = "chromium")]
    browser: Browser,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Module path where Playwright is installed
    #[arg(long, env = "NODE_PATH")]
    node_path: Option<PathBuf>,

    /// Ignore HTTP(S)_PROXY from the environment
    #[arg(long)]
    no_proxy: bool,
}

impl Cli {
    fn harness_config(&self) -> E2eResult<HarnessConfig> {
        let mut config = HarnessConfig {
            base_url: self.base_url.clone(),
            credentials: Credentials {
                email: self.email.clone(),
                password: self.password.clone(),
            },
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            use_system_proxy: !self.no_proxy,
            runner: RunnerConfig {
                inter_unit_delay: Duration::from_millis(self.delay_ms),
                unit_timeout: (self.unit_timeout_secs > 0)
                    .then(|| Duration::from_secs(self.unit_timeout_secs)),
            },
            suite_delay: Duration::from_millis(self.suite_delay_ms),
            threshold_override: self.threshold,
            output_dir: self.output.clone(),
            ..Default::default()
        };
        config.browser.browser = self.browser;
        config.browser.headless = !self.headed;
        config.browser.node_path = self.node_path.clone();
        config.validate()
    }

    fn suite_kinds(&self) -> Vec<SuiteKind> {
        if self.suites.is_empty() {
            SuiteKind::all().to_vec()
        } else {
            self.suites.clone()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {}", e);
            EXIT_CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> E2eResult<i32> {
    let config = cli.harness_config()?;
    let kinds = cli.suite_kinds();

    info!("🧪 Platform E2E tests against {}", config.base_url);

    let runner = SuiteRunner::new(config.runner.clone());
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹ Interrupted, skipping remaining tests");
            cancel.cancel();
        }
    });

    let report = match kinds.as_slice() {
        [kind] => {
            let report = run_suite(*kind, &config, &runner).await?;
            report.print(cli.format);
            if let Some(dir) = &config.output_dir {
                report.write_results(dir)?;
            }
            report
        }
        _ => {
            let outer =
                SuiteRunner::new(plan_runner_config(&config)).with_cancellation(runner.cancellation_token());
            let output_dir = config.output_dir.clone();
            let report = run_plan(&kinds, config, cli.format, &outer).await;
            report.print(cli.format);
            if let Some(dir) = &output_dir {
                report.write_results(dir)?;
            }
            report
        }
    };

    Ok(report.exit_code())
}
