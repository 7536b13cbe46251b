//! Aggregate statistics and graded verdicts over a finalized result set

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::suite::{Outcome, ResultSet};

/// Pass ratio at or above which a run is graded MOSTLY_PASS
pub const MOSTLY_PASS_RATIO: f64 = 0.75;

/// Pass ratio at or above which a run is graded MIXED
pub const MIXED_RATIO: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    AllPass,
    MostlyPass,
    Mixed,
    ManyFail,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::AllPass => "ALL_PASS",
            Grade::MostlyPass => "MOSTLY_PASS",
            Grade::Mixed => "MIXED",
            Grade::ManyFail => "MANY_FAIL",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub ratio: f64,
    pub grade: Grade,
}

impl Verdict {
    pub fn is_success(&self, threshold: SuccessThreshold) -> bool {
        overall_success(self, threshold)
    }
}

/// Summarize a result set. Pure: the same set always yields the same verdict.
///
/// An empty set is a vacuous pass (`ratio == 1.0`, `ALL_PASS`).
pub fn summarize(results: &ResultSet) -> Verdict {
    let passed = results.count(Outcome::Passed);
    let skipped = results.count(Outcome::Skipped);
    let total = results.len();
    let failed = total - passed - skipped;

    let ratio = if total > 0 {
        passed as f64 / total as f64
    } else {
        1.0
    };

    let grade = if passed == total {
        Grade::AllPass
    } else if ratio >= MOSTLY_PASS_RATIO {
        Grade::MostlyPass
    } else if ratio >= MIXED_RATIO {
        Grade::Mixed
    } else {
        Grade::ManyFail
    };

    Verdict {
        passed,
        failed,
        skipped,
        total,
        ratio,
        grade,
    }
}

/// What counts as a successful run for exit-code purposes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SuccessThreshold {
    /// Every unit passed
    AllPass,
    /// Graded ALL_PASS or MOSTLY_PASS
    #[default]
    MostlyPass,
    /// Pass ratio at or above the given fraction
    Ratio(f64),
    /// The run completed (nothing skipped); individual failures are tolerated
    Lenient,
}

impl fmt::Display for SuccessThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessThreshold::AllPass => f.write_str("all-pass"),
            SuccessThreshold::MostlyPass => f.write_str("mostly-pass"),
            SuccessThreshold::Ratio(ratio) => write!(f, "ratio:{}", ratio),
            SuccessThreshold::Lenient => f.write_str("lenient"),
        }
    }
}

impl FromStr for SuccessThreshold {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-pass" | "all" => Ok(SuccessThreshold::AllPass),
            "mostly-pass" | "mostly" => Ok(SuccessThreshold::MostlyPass),
            "lenient" => Ok(SuccessThreshold::Lenient),
            other => {
                let value = other.strip_prefix("ratio:").ok_or_else(|| {
                    E2eError::InvalidConfig(format!(
                        "unknown threshold '{}' (expected all-pass, mostly-pass, lenient or ratio:<0..1>)",
                        s
                    ))
                })?;
                let ratio: f64 = value.parse().map_err(|_| {
                    E2eError::InvalidConfig(format!("invalid ratio '{}'", value))
                })?;
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(E2eError::InvalidConfig(format!(
                        "ratio must be between 0 and 1, got {}",
                        ratio
                    )));
                }
                Ok(SuccessThreshold::Ratio(ratio))
            }
        }
    }
}

impl Serialize for SuccessThreshold {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decide whether a verdict counts as a successful run
pub fn overall_success(verdict: &Verdict, threshold: SuccessThreshold) -> bool {
    match threshold {
        SuccessThreshold::AllPass => verdict.grade == Grade::AllPass,
        SuccessThreshold::MostlyPass => {
            matches!(verdict.grade, Grade::AllPass | Grade::MostlyPass)
        }
        SuccessThreshold::Ratio(min) => verdict.ratio >= min,
        SuccessThreshold::Lenient => verdict.skipped == 0,
    }
}

/// Process exit status for CI: `0` on success, `1` otherwise
pub fn exit_code(success: bool) -> i32 {
    if success {
        0
    } else {
        1
    }
}
