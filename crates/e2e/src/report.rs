//! Rendering and persisting suite results

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::E2eResult;
use crate::suite::{Outcome, ResultSet};
use crate::verdict::{overall_success, summarize, Grade, SuccessThreshold, Verdict};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ReportFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON document
    Json,
    /// One JSON object per unit, then a summary line
    Jsonl,
    /// YAML document
    Yaml,
}

/// Finalized results of one run together with its verdict
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub threshold: SuccessThreshold,
    pub verdict: Verdict,
    pub success: bool,
    pub duration_ms: u64,
    pub results: ResultSet,
}

impl SuiteReport {
    pub fn new(
        suite: impl Into<String>,
        results: ResultSet,
        threshold: SuccessThreshold,
        duration_ms: u64,
    ) -> Self {
        let verdict = summarize(&results);
        Self {
            suite: suite.into(),
            threshold,
            success: overall_success(&verdict, threshold),
            verdict,
            duration_ms,
            results,
        }
    }

    pub fn exit_code(&self) -> i32 {
        crate::verdict::exit_code(self.success)
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Table => self.render_table(),
            ReportFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            ReportFormat::Jsonl => self.render_jsonl(),
            ReportFormat::Yaml => serde_yaml::to_string(self).unwrap_or_default(),
        }
    }

    pub fn print(&self, format: ReportFormat) {
        println!("{}", self.render(format));
    }

    /// Write the JSON document to `<dir>/<suite>-results.json`
    pub fn write_results(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}-results.json", slug(&self.suite)));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Hints of every unit that did not pass, one line each
    pub fn recommendations(&self) -> Vec<&str> {
        self.results
            .not_passed()
            .filter_map(|record| record.hint.as_deref())
            .flat_map(str::lines)
            .filter(|line| !line.trim().is_empty())
            .fold(Vec::new(), |mut acc, line| {
                if !acc.contains(&line) {
                    acc.push(line);
                }
                acc
            })
    }

    fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Test", "Status", "Duration", "Detail"]);

        for record in &self.results {
            let status = match record.outcome {
                Outcome::Passed => Cell::new("✅ PASSED").fg(Color::Green),
                Outcome::Failed => Cell::new("❌ FAILED").fg(Color::Red),
                Outcome::Skipped => Cell::new("⏭ SKIPPED").fg(Color::Yellow),
            };
            table.add_row(vec![
                Cell::new(&record.name),
                status,
                Cell::new(format!("{} ms", record.duration_ms)),
                Cell::new(record.error.as_deref().unwrap_or("")),
            ]);
        }

        let verdict = &self.verdict;
        let mut out = format!("{}\n\n", format!(" {} TEST SUMMARY", self.suite.to_uppercase()).bold());
        out.push_str(&format!("{table}\n"));
        out.push_str(&format!(
            "\nOVERALL: {}/{} tests passed ({:.1}%)\n",
            verdict.passed,
            verdict.total,
            verdict.ratio * 100.0
        ));
        out.push_str(&format!("{}\n", grade_message(verdict.grade)));

        let recommendations = self.recommendations();
        if !recommendations.is_empty() {
            out.push_str("\n🔧 RECOMMENDATIONS:\n");
            for line in recommendations {
                out.push_str(&format!("   • {}\n", line.trim()));
            }
        }
        out
    }

    fn render_jsonl(&self) -> String {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .map(|record| {
                json!({
                    "type": "unit",
                    "suite": self.suite,
                    "name": record.name,
                    "outcome": record.outcome,
                    "duration_ms": record.duration_ms,
                    "error": record.error,
                })
                .to_string()
            })
            .collect();
        lines.push(
            json!({
                "type": "summary",
                "suite": self.suite,
                "verdict": self.verdict,
                "threshold": self.threshold,
                "success": self.success,
                "duration_ms": self.duration_ms,
            })
            .to_string(),
        );
        lines.join("\n")
    }
}

fn grade_message(grade: Grade) -> String {
    match grade {
        Grade::AllPass => "🎉 ALL TESTS PASSED!".green().bold().to_string(),
        Grade::MostlyPass => "✅ MOST TESTS PASSED!".green().to_string(),
        Grade::Mixed => "⚠️ MIXED RESULTS!".yellow().to_string(),
        Grade::ManyFail => "❌ MANY TESTS FAILED!".red().bold().to_string(),
    }
}

fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
