//! Analysis pipeline: raw observations in, every result table out
//!
//! `analyze` is pure. It pairs each query, runs the normality gate over all
//! six conditions and both metrics, then compares REST and GraphQL per query
//! with the single test family the gate chose. Rendering lives in `report`.

use crate::error::AnalysisError;
use crate::observation::{ApiType, Metric, ObservationSet, PairedSample, QueryType};
use crate::stats::{
    assess_normality, compare_paired, summarize, GroupSummary, HypothesisTestResult,
    NormalityVerdict, TestDecision,
};
use serde::{Deserialize, Serialize};

/// Observation count of one condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub api: ApiType,
    pub query: QueryType,
    pub n: usize,
}

/// Everything the analyzer computes for one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub group_counts: Vec<GroupCount>,
    pub summary: Vec<GroupSummary>,
    /// One verdict per condition and metric, REST first
    pub normality: Vec<NormalityVerdict>,
    pub decision: TestDecision,
    /// RQ1: response time, one row per query
    pub rq1: Vec<HypothesisTestResult>,
    /// RQ2: payload size, one row per query
    pub rq2: Vec<HypothesisTestResult>,
}

impl AnalysisReport {
    /// Result table of one research question
    pub fn results(&self, metric: Metric) -> &[HypothesisTestResult] {
        match metric {
            Metric::ResponseTimeMs => &self.rq1,
            Metric::PayloadSizeBytes => &self.rq2,
        }
    }

    /// Verdicts that pushed the gate to the non-parametric test
    pub fn non_normal(&self) -> impl Iterator<Item = &NormalityVerdict> {
        self.normality.iter().filter(|v| !v.outcome.is_normal())
    }

    /// Number of hypothesis tests run without multiple-comparison correction
    pub fn test_count(&self) -> usize {
        self.rq1.len() + self.rq2.len()
    }
}

/// Run the full analysis over one experiment
///
/// Pairing is checked first so an incomplete run is reported as a missing
/// partner rather than as a normality failure.
pub fn analyze(set: &ObservationSet) -> Result<AnalysisReport, AnalysisError> {
    tracing::info!("Analyzing {} observations", set.len());

    let group_counts = set
        .group_counts()
        .into_iter()
        .map(|(api, query, n)| GroupCount { api, query, n })
        .collect();

    let mut pairs: Vec<PairedSample> = Vec::with_capacity(6);
    for metric in Metric::ALL {
        for query in QueryType::ALL {
            pairs.push(set.paired(query, metric)?);
        }
    }

    let summary = summarize(set);

    let mut normality = Vec::with_capacity(12);
    for api in ApiType::ALL {
        for query in QueryType::ALL {
            let group = set.group(api, query);
            for metric in Metric::ALL {
                normality.push(assess_normality(&group, metric)?);
            }
        }
    }

    let decision = TestDecision::from_verdicts(&normality);
    tracing::info!(
        "Normality gate: {} of {} samples normal, using {}",
        normality.iter().filter(|v| v.outcome.is_normal()).count(),
        normality.len(),
        decision
    );

    let mut rq1 = Vec::with_capacity(3);
    let mut rq2 = Vec::with_capacity(3);
    for sample in &pairs {
        let result = compare_paired(sample, decision)?;
        tracing::debug!(
            "{} {}: diff={:.2} p={:.4}",
            result.query,
            result.metric,
            result.diff_mean,
            result.pvalue
        );
        match sample.metric {
            Metric::ResponseTimeMs => rq1.push(result),
            Metric::PayloadSizeBytes => rq2.push(result),
        }
    }

    Ok(AnalysisReport {
        group_counts,
        summary,
        normality,
        decision,
        rq1,
        rq2,
    })
}
