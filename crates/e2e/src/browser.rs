//! Playwright browser automation
//!
//! Every call to [`BrowserDriver::run`] generates a small Node script, runs it
//! and parses a [`PageSnapshot`] from its output. Cookies, local storage and
//! the last visited URL survive between scripts through a Playwright
//! storage-state file kept in a temporary directory owned by the driver, so a
//! login performed by one unit is still in effect for the next one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Marker prefixing the snapshot line on the script's stdout
const SNAPSHOT_MARKER: &str = "__E2E_SNAPSHOT__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// `node` executable
    pub node_binary: PathBuf,
    /// `npx` executable used to check the Playwright install
    pub npx_binary: PathBuf,
    /// Extra module search path so `require('playwright')` resolves
    pub node_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            node_binary: PathBuf::from("node"),
            npx_binary: PathBuf::from("npx"),
            node_path: None,
        }
    }
}

/// One interaction with the page
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    /// Go to a URL relative to the base URL
    Navigate { url: String },
    Fill { selector: String, value: String },
    Click { selector: String },
    /// Click the first link or button whose text contains `text`; records a
    /// miss instead of failing when there is none
    ClickText { text: String },
    PressKey { key: String },
    WaitForSelector { selector: String, timeout_ms: u64 },
    Sleep { ms: u64 },
    /// Count elements matching `selector` into [`PageSnapshot::counts`]
    Count { selector: String },
}

impl PageAction {
    pub fn navigate(url: impl Into<String>) -> Self {
        PageAction::Navigate { url: url.into() }
    }

    pub fn fill(selector: impl Into<String>, value: impl Into<String>) -> Self {
        PageAction::Fill {
            selector: selector.into(),
            value: value.into(),
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        PageAction::Click {
            selector: selector.into(),
        }
    }

    pub fn click_text(text: impl Into<String>) -> Self {
        PageAction::ClickText { text: text.into() }
    }

    pub fn press(key: impl Into<String>) -> Self {
        PageAction::PressKey { key: key.into() }
    }

    pub fn wait_for(selector: impl Into<String>, timeout_ms: u64) -> Self {
        PageAction::WaitForSelector {
            selector: selector.into(),
            timeout_ms,
        }
    }

    pub fn sleep(ms: u64) -> Self {
        PageAction::Sleep { ms }
    }

    pub fn count(selector: impl Into<String>) -> Self {
        PageAction::Count {
            selector: selector.into(),
        }
    }

    fn name(&self) -> String {
        match self {
            PageAction::Navigate { url } => format!("navigate:{}", url),
            PageAction::Fill { selector, .. } => format!("fill:{}", selector),
            PageAction::Click { selector } => format!("click:{}", selector),
            PageAction::ClickText { text } => format!("click-text:{}", text),
            PageAction::PressKey { key } => format!("press:{}", key),
            PageAction::WaitForSelector { selector, .. } => format!("wait:{}", selector),
            PageAction::Sleep { ms } => format!("sleep:{}ms", ms),
            PageAction::Count { selector } => format!("count:{}", selector),
        }
    }

    /// JavaScript for this action. String arguments are emitted as JSON
    /// literals so quotes in selectors cannot break the script.
    fn to_js(&self) -> String {
        match self {
            PageAction::Navigate { url } => {
                format!("    await page.goto(new URL({}, baseUrl).toString());", js(url))
            }
            PageAction::Fill { selector, value } => {
                format!("    await page.fill({}, {});", js(selector), js(value))
            }
            PageAction::Click { selector } => format!("    await page.click({});", js(selector)),
            PageAction::ClickText { text } => format!(
                r#"    {{
      const target = page.locator('a, button, [role="button"]', {{ hasText: {text} }}).first();
      if (await target.count() > 0) {{ await target.click(); }} else {{ missed.push({text}); }}
    }}"#,
                text = js(text)
            ),
            PageAction::PressKey { key } => format!("    await page.keyboard.press({});", js(key)),
            PageAction::WaitForSelector {
                selector,
                timeout_ms,
            } => format!(
                "    await page.waitForSelector({}, {{ timeout: {} }});",
                js(selector),
                timeout_ms
            ),
            PageAction::Sleep { ms } => format!("    await page.waitForTimeout({});", ms),
            PageAction::Count { selector } => format!(
                "    counts[{sel}] = await page.locator({sel}).count();",
                sel = js(selector)
            ),
        }
    }
}

fn js(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub url: String,
    pub failure: String,
}

/// State of the page after a script ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub console: Vec<ConsoleEntry>,
    #[serde(default)]
    pub failed_requests: Vec<FailedRequest>,
    /// `ClickText` targets that were not found
    #[serde(default)]
    pub missed: Vec<String>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

impl PageSnapshot {
    /// Extract the snapshot from a script's stdout
    pub fn parse(stdout: &str) -> E2eResult<Self> {
        let line = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(SNAPSHOT_MARKER))
            .ok_or_else(|| E2eError::Playwright("script produced no page snapshot".to_string()))?;
        Ok(serde_json::from_str(line)?)
    }

    /// How many of `keywords` occur in the page markup (case-insensitive)
    pub fn count_indicators(&self, keywords: &[&str]) -> usize {
        let content = self.content.to_lowercase();
        keywords
            .iter()
            .filter(|keyword| content.contains(&keyword.to_lowercase()))
            .count()
    }

    pub fn contains_any(&self, keywords: &[&str]) -> bool {
        self.count_indicators(keywords) > 0
    }

    pub fn count_of(&self, selector: &str) -> usize {
        self.counts.get(selector).copied().unwrap_or(0)
    }

    pub fn was_missed(&self, text: &str) -> bool {
        self.missed.iter().any(|m| m == text)
    }
}

/// Playwright browser handle, scoped to one suite run
pub struct BrowserDriver {
    base_url: String,
    config: BrowserConfig,
    /// Holds the storage-state file; removed when the driver is dropped
    state_dir: TempDir,
    current_url: Option<String>,
}

impl BrowserDriver {
    /// Verify Playwright is available and prepare session storage
    pub async fn launch(base_url: &str, config: BrowserConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.npx_binary).await?;
        Self::with_state_dir(base_url, config)
    }

    fn with_state_dir(base_url: &str, config: BrowserConfig) -> E2eResult<Self> {
        let state_dir = tempfile::Builder::new().prefix("platform-e2e-").tempdir()?;
        debug!("Browser session state in {}", state_dir.path().display());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            state_dir,
            current_url: None,
        })
    }

    /// Check if Playwright is installed. `npx` may prompt to download the
    /// package, so stdin is closed and the child dies with the future.
    pub async fn check_playwright_installed(npx: &Path) -> E2eResult<()> {
        let status = Command::new(npx)
            .args(["playwright", "--version"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir.path().join("storage-state.json")
    }

    /// Build the Node script for a list of actions
    pub fn build_script(&self, actions: &[PageAction]) -> String {
        let state_path = self.state_path();
        let resume = match (actions.first(), &self.current_url) {
            (Some(PageAction::Navigate { .. }), _) | (_, None) => String::new(),
            (_, Some(url)) => format!("    await page.goto({});\n", js(url)),
        };

        let mut script = format!(
            r#"
const fs = require('fs');
const {{ {browser} }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const statePath = {state_path};
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }},
    storageState: fs.existsSync(statePath) ? statePath : undefined,
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const consoleEntries = [];
  const failedRequests = [];
  const missed = [];
  const counts = {{}};
  page.on('console', (msg) => consoleEntries.push({{ level: msg.type(), text: msg.text() }}));
  page.on('pageerror', (err) => consoleEntries.push({{ level: 'error', text: String(err) }}));
  page.on('requestfailed', (req) => failedRequests.push({{
    url: req.url(),
    failure: req.failure() ? req.failure().errorText : 'unknown',
  }}));

  try {{
{resume}"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            state_path = js(&state_path.to_string_lossy()),
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            base_url = js(&self.base_url),
            resume = resume,
        );

        for (i, action) in actions.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, action.name()));
            script.push_str(&action.to_js());
            script.push('\n');
        }

        script.push_str(&format!(
            r#"
    await context.storageState({{ path: statePath }});
    const snapshot = {{
      title: await page.title(),
      url: page.url(),
      content: await page.content(),
      console: consoleEntries,
      failedRequests,
      missed,
      counts,
    }};
    console.log('{marker}' + JSON.stringify(snapshot));
  }} catch (error) {{
    console.error(JSON.stringify({{ success: false, error: error.message, stack: error.stack }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            marker = SNAPSHOT_MARKER
        ));

        script
    }

    /// Run actions in the browser and return the resulting page state
    pub async fn run(&mut self, actions: &[PageAction]) -> E2eResult<PageSnapshot> {
        let script = self.build_script(actions);
        let script_path = self.state_dir.path().join("step.js");
        tokio::fs::write(&script_path, script).await?;

        debug!(
            "Running Playwright script ({} action(s)): {}",
            actions.len(),
            script_path.display()
        );

        let mut command = Command::new(&self.config.node_binary);
        command
            .arg(&script_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(node_path) = &self.config.node_path {
            command.env("NODE_PATH", node_path);
        }

        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        let snapshot = PageSnapshot::parse(&stdout)?;
        self.current_url = Some(snapshot.url.clone());
        Ok(snapshot)
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    /// Drop the browser session, removing stored cookies and scripts
    pub fn close(self) -> E2eResult<()> {
        info!("🧹 Browser session cleanup complete");
        self.state_dir.close()?;
        Ok(())
    }
}
