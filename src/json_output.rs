//! JSON report for `--json FILE`
//!
//! Wraps the full `AnalysisReport` with tool metadata. Undefined numbers are
//! `null`.

use crate::analysis::AnalysisReport;
use crate::runner::{RequestFailure, RunOutcome};
use serde::{Deserialize, Serialize};

/// Collection summary, present when the report follows a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunSummary {
    pub observations: usize,
    pub attempted: usize,
    pub failures: Vec<RequestFailure>,
}

impl From<&RunOutcome> for JsonRunSummary {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            observations: outcome.observations.len(),
            attempted: outcome.attempted(),
            failures: outcome.failures.clone(),
        }
    }
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Tool version
    pub version: String,
    /// Format name
    pub format: String,
    /// Local generation time, ISO-8601
    pub generated_at: String,
    /// Tests run without multiple-comparison correction
    pub uncorrected_tests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<JsonRunSummary>,
    pub analysis: AnalysisReport,
}

impl JsonOutput {
    pub fn new(analysis: AnalysisReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "apiduel-json-v1".to_string(),
            generated_at: crate::runner::local_timestamp(),
            uncorrected_tests: analysis.test_count(),
            run: None,
            analysis,
        }
    }

    pub fn with_run(mut self, outcome: &RunOutcome) -> Self {
        self.run = Some(JsonRunSummary::from(outcome));
        self
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
