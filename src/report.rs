//! Console rendering of runs and analyses
//!
//! Pure string builders; the binary decides where they go.

use crate::analysis::AnalysisReport;
use crate::observation::{ApiType, Metric, QueryType};
use crate::runner::RunOutcome;
use crate::stats::{
    mean, Descriptive, HypothesisTestResult, Normality, NormalityVerdict, SIGNIFICANCE_LEVEL,
};

const RULE: &str = "============================================================";

fn section(report: &mut String, title: &str) {
    report.push_str(&format!("\n{}\n{}\n{}\n", RULE, title, RULE));
}

/// Decimals used when printing values of `metric`
fn precision(metric: Metric) -> usize {
    match metric {
        Metric::ResponseTimeMs => 2,
        Metric::PayloadSizeBytes => 0,
    }
}

fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.*}", decimals, v))
}

/// Per-condition means after a run, plus the failure count
pub fn render_run_preview(outcome: &RunOutcome) -> String {
    let mut report = String::new();
    report.push_str(&format!(
        "✅ Experiment finished: {} measurements ({} failed requests)\n",
        outcome.observations.len(),
        outcome.failures.len()
    ));

    section(&mut report, "📊 RESULTS PREVIEW (means)");
    report.push_str(&format!(
        "{:<10} {:<10} {:>18} {:>20}\n",
        "api_type", "query_type", "response_time_ms", "payload_size_bytes"
    ));
    for api in ApiType::ALL {
        for query in QueryType::ALL {
            let group = outcome.observations.group(api, query);
            if group.is_empty() {
                continue;
            }
            report.push_str(&format!(
                "{:<10} {:<10} {:>18.2} {:>20.1}\n",
                api.as_str(),
                query.as_str(),
                mean(&group.response_time_ms),
                mean(&group.payload_size_bytes)
            ));
        }
    }

    if !outcome.failures.is_empty() {
        report.push_str(&format!("\n⚠️  Failed requests ({}):\n", outcome.failures.len()));
        for f in &outcome.failures {
            report.push_str(&format!(
                "  trial {:>3} {:<8} {:<8} {}\n",
                f.trial,
                f.api.as_str(),
                f.query.as_str(),
                f.cause
            ));
        }
    }

    report
}

fn render_descriptive_row(
    report: &mut String,
    api: ApiType,
    query: QueryType,
    d: &Descriptive,
    decimals: usize,
) {
    report.push_str(&format!(
        "{:<8} {:<8} {:>4} {:>12.*} {:>12} {:>12.*} {:>12.*} {:>12.*}\n",
        api.as_str(),
        query.as_str(),
        d.n,
        decimals,
        d.mean,
        format_optional(d.std, decimals),
        decimals,
        d.median,
        decimals,
        d.min,
        decimals,
        d.max
    ));
}

fn render_verdict(verdict: &NormalityVerdict) -> String {
    match (verdict.outcome, verdict.test) {
        (Normality::Degenerate, _) | (_, None) => "W=undefined p=undefined CONSTANTE".to_string(),
        (outcome, Some(t)) => format!("W={:.4} p={:.4} {}", t.statistic, t.pvalue, outcome),
    }
}

fn render_result(report: &mut String, r: &HypothesisTestResult) {
    let decimals = precision(r.metric);
    let unit = r.metric.unit();

    report.push_str(&format!("\n📌 Query: {}\n", r.query.as_str().to_uppercase()));
    report.push_str(&format!(
        "   REST mean:      {:.*} {} (±{})\n",
        decimals,
        r.rest_mean,
        unit,
        format_optional(r.rest_std, decimals)
    ));
    report.push_str(&format!(
        "   GraphQL mean:   {:.*} {} (±{})\n",
        decimals,
        r.graphql_mean,
        unit,
        format_optional(r.graphql_std, decimals)
    ));
    let percent = r
        .diff_percent
        .map_or_else(|| "undefined".to_string(), |p| format!("{:+.1}%", p));
    report.push_str(&format!(
        "   Difference:     {:+.*} {} ({})\n",
        decimals, r.diff_mean, unit, percent
    ));
    report.push_str(&format!("   Test:           {}\n", r.test.test_name()));
    report.push_str(&format!("   Statistic:      {:.4}\n", r.statistic));
    report.push_str(&format!("   P-value:        {:.6}\n", r.pvalue));
    let effect = match (r.cohens_d, r.effect_size) {
        (Some(d), Some(e)) => format!("{:.4} ({})", d, e),
        _ => "undefined (both samples constant)".to_string(),
    };
    report.push_str(&format!("   Cohen's d:      {}\n", effect));
    report.push_str(&format!(
        "   Result:         {}\n",
        if r.significant {
            "SIGNIFICANT"
        } else {
            "NOT SIGNIFICANT"
        }
    ));
}

/// Full analysis report, in pipeline order
pub fn render_analysis(analysis: &AnalysisReport) -> String {
    let mut report = String::new();

    section(&mut report, "📋 OBSERVATIONS PER CONDITION");
    for c in &analysis.group_counts {
        report.push_str(&format!("{:<8} {:<8} {:>5}\n", c.api.as_str(), c.query.as_str(), c.n));
    }

    section(&mut report, "📈 DESCRIPTIVE STATISTICS");
    for metric in Metric::ALL {
        let decimals = precision(metric);
        report.push_str(&format!("\n{} ({}):\n", metric, metric.unit()));
        report.push_str(&format!(
            "{:<8} {:<8} {:>4} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
            "api", "query", "n", "mean", "std", "median", "min", "max"
        ));
        for group in &analysis.summary {
            render_descriptive_row(
                &mut report,
                group.api,
                group.query,
                group.metric(metric),
                decimals,
            );
        }
    }

    section(&mut report, "🔍 NORMALITY (Shapiro-Wilk)");
    report.push_str(&format!(
        "H0: the sample is normally distributed; normal iff p > {}\n\n",
        SIGNIFICANCE_LEVEL
    ));
    for v in &analysis.normality {
        report.push_str(&format!(
            "{:<8} {:<8} {:<18} n={:<4} {}\n",
            v.api.as_str(),
            v.query.as_str(),
            v.metric.column(),
            v.n,
            render_verdict(v)
        ));
    }
    report.push_str(&format!("\n🎯 DECISION: use {}\n", analysis.decision.description()));
    let flagged: Vec<String> = analysis
        .non_normal()
        .map(|v| format!("{} {} {}", v.api, v.query, v.metric))
        .collect();
    if flagged.is_empty() {
        report.push_str("   Reason: every sample is normally distributed\n");
    } else {
        report.push_str(&format!(
            "   Reason: {} of {} samples not normal ({})\n",
            flagged.len(),
            analysis.normality.len(),
            flagged.join(", ")
        ));
    }

    for (metric, title) in [
        (Metric::ResponseTimeMs, "⏱️  RQ1: RESPONSE TIME"),
        (Metric::PayloadSizeBytes, "📦 RQ2: PAYLOAD SIZE"),
    ] {
        section(&mut report, title);
        report.push_str("H0: no difference between GraphQL and REST\n");
        report.push_str("H1: GraphQL and REST differ\n");
        for result in analysis.results(metric) {
            render_result(&mut report, result);
        }
    }

    report.push_str(&format!(
        "\n⚠️  {} tests at alpha = {} with no multiple-comparison correction; \
         adjust p-values before claiming family-wise significance.\n",
        analysis.test_count(),
        SIGNIFICANCE_LEVEL
    ));

    report
}
