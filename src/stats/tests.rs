// Scenario tests for the paired-comparison statistics
//
// Realistic latency and payload shapes from GitHub API runs: REST payloads
// are large and nearly constant, GraphQL payloads small, latencies noisy.

use super::*;
use crate::observation::{ApiType, ConditionSample, Metric, PairedSample, QueryType};

fn paired(metric: Metric, rest: Vec<f64>, graphql: Vec<f64>) -> PairedSample {
    PairedSample {
        query: QueryType::Complex,
        metric,
        trials: (1..=rest.len() as u32).collect(),
        rest,
        graphql,
    }
}

fn condition(api: ApiType, times: Vec<f64>, sizes: Vec<f64>) -> ConditionSample {
    ConditionSample {
        api,
        query: QueryType::Complex,
        trials: (1..=times.len() as u32).collect(),
        response_time_ms: times,
        payload_size_bytes: sizes,
    }
}

/// Scenario: complex REST query issues three sequential requests
/// Expected: GraphQL markedly faster, significant under Wilcoxon, large effect
#[test]
fn test_complex_query_graphql_faster() {
    let rest: Vec<f64> = (0..30).map(|i| 620.0 + ((i * 37) % 41) as f64).collect();
    let graphql: Vec<f64> = (0..30).map(|i| 410.0 + ((i * 23) % 29) as f64).collect();

    let result = compare_paired(
        &paired(Metric::ResponseTimeMs, rest, graphql),
        TestDecision::Wilcoxon,
    )
    .unwrap();

    assert!(result.diff_mean < -150.0);
    assert!(result.diff_percent.unwrap() < -20.0);
    assert!(result.significant);
    assert_eq!(result.effect_size, Some(EffectSize::Large));
    assert!(result.cohens_d.unwrap() < 0.0);
}

/// Scenario: payload sizes are constant per API (same JSON every trial)
/// Expected: normality degenerate → Wilcoxon; effect size undefined
#[test]
fn test_constant_payloads_force_wilcoxon() {
    let rest = condition(ApiType::Rest, vec![100.0, 104.0, 98.0, 101.0], vec![48_210.0; 4]);
    let verdict = assess_normality(&rest, Metric::PayloadSizeBytes).unwrap();
    assert_eq!(verdict.outcome, Normality::Degenerate);

    let decision = TestDecision::from_verdicts(&[verdict]);
    assert_eq!(decision, TestDecision::Wilcoxon);

    let result = compare_paired(
        &paired(Metric::PayloadSizeBytes, vec![48_210.0; 12], vec![1_893.0; 12]),
        decision,
    )
    .unwrap();
    assert!(result.significant);
    assert_eq!(result.cohens_d, None);
    assert!((result.diff_percent.unwrap() + 96.07).abs() < 0.01);
}

/// Scenario: same server, same payload, only jitter
/// Expected: not significant under either family
#[test]
fn test_jitter_only_not_significant_under_both_tests() {
    let rest = vec![210.0, 190.0, 205.0, 199.0, 220.0, 185.0, 201.0, 196.0, 208.0, 193.0];
    let graphql = vec![195.0, 207.0, 192.0, 214.0, 188.0, 203.0, 197.0, 209.0, 191.0, 206.0];

    for decision in [TestDecision::PairedT, TestDecision::Wilcoxon] {
        let result = compare_paired(
            &paired(Metric::ResponseTimeMs, rest.clone(), graphql.clone()),
            decision,
        )
        .unwrap();
        assert!(!result.significant, "{:?} p={}", decision, result.pvalue);
        assert_eq!(result.effect_size, Some(EffectSize::Trivial));
    }
}

/// Scenario: large effect but too few pairs to reach significance
/// Expected: significance is decided by p alone
#[test]
fn test_large_effect_can_be_not_significant() {
    let result = compare_paired(
        &paired(
            Metric::ResponseTimeMs,
            vec![100.0, 102.0, 98.0, 101.0, 99.0],
            vec![150.0, 148.0, 152.0, 149.0, 151.0],
        ),
        TestDecision::Wilcoxon,
    )
    .unwrap();

    assert_eq!(result.effect_size, Some(EffectSize::Large));
    assert!((result.pvalue - 0.0625).abs() < 1e-12);
    assert!(!result.significant);
}

/// Scenario: normality stage and hypothesis stage agree on one family
/// Expected: the decision value is carried into every result
#[test]
fn test_decision_is_recorded_in_results() {
    let sample = paired(
        Metric::ResponseTimeMs,
        vec![10.0, 12.0, 11.0, 13.0, 12.5],
        vec![11.0, 12.5, 11.2, 14.0, 13.9],
    );
    for decision in [TestDecision::PairedT, TestDecision::Wilcoxon] {
        assert_eq!(compare_paired(&sample, decision).unwrap().test, decision);
    }
}
