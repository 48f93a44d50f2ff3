// Paired hypothesis tests between REST (A) and GraphQL (B)
//
// Both tests are two-sided and operate on the per-trial differences, so a
// slow trial (network hiccup) affects both sides of its own pair only.
//
// - Paired t-test: t = mean(d) / (sd(d) / sqrt(n)) on d = A - B, two-sided
//   p-value from Student's t with n - 1 df. Used when every group passed the
//   normality gate.
// - Wilcoxon signed-rank: Wilcox zero handling (zero differences dropped),
//   statistic min(W+, W-), exact null distribution for small untied samples,
//   otherwise the tie-corrected normal approximation without continuity
//   correction.

use super::descriptive::{mean, sample_std, sample_variance};
use super::distribution::{normal_sf, students_t_two_sided};
use super::effect::{cohens_d, percent_difference, EffectSize};
use super::normality::TestDecision;
use super::SIGNIFICANCE_LEVEL;
use crate::error::AnalysisError;
use crate::observation::{Metric, PairedSample, QueryType};
use serde::{Deserialize, Serialize};

/// Largest non-zero pair count that still uses the exact distribution
pub const WILCOXON_EXACT_MAX: usize = 50;

/// Statistic and two-sided p-value of a paired test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairedTest {
    pub statistic: f64,
    pub pvalue: f64,
}

/// How the Wilcoxon p-value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WilcoxonMethod {
    Exact,
    NormalApprox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilcoxonResult {
    /// min(W+, W-)
    pub statistic: f64,
    pub pvalue: f64,
    /// Pairs with a non-zero difference
    pub n_used: usize,
    pub zeros_discarded: usize,
    pub method: WilcoxonMethod,
}

/// Why a paired t-test produced no result
#[derive(Debug, Clone, PartialEq)]
pub enum TTestFailure {
    /// The input makes t undefined (too few pairs, zero-variance differences)
    Undefined(String),
    /// The statistic or p-value came out non-finite
    Routine(String),
}

/// Paired t-test of `a` against `b`
///
/// The statistic is signed like `a - b`. Fails when the differences have zero
/// variance: t is then ±inf or 0/0 and no p-value is meaningful.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<PairedTest, TTestFailure> {
    if a.len() != b.len() {
        return Err(TTestFailure::Undefined(format!(
            "samples differ in length ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(TTestFailure::Undefined(format!(
            "need at least 2 pairs, got {}",
            a.len()
        )));
    }

    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let variance = match sample_variance(&diffs) {
        Some(v) if v > 0.0 => v,
        _ => {
            return Err(TTestFailure::Undefined(format!(
                "paired differences have zero variance (every difference is {})",
                diffs[0]
            )))
        }
    };

    let n = diffs.len() as f64;
    let statistic = mean(&diffs) / (variance / n).sqrt();
    let pvalue = students_t_two_sided(statistic, n - 1.0);
    if !statistic.is_finite() || !pvalue.is_finite() {
        return Err(TTestFailure::Routine(format!(
            "non-finite result (t={}, p={})",
            statistic, pvalue
        )));
    }

    Ok(PairedTest { statistic, pvalue })
}

/// Average ranks of `values` (1-based) plus the size of every tie group
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start+1 ..= end share their average
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }

    (ranks, ties)
}

/// P(W <= t) under H0 for n untied ranks, by counting subsets of 1..=n
fn exact_cdf(n: usize, t: usize) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max_sum).rev() {
            counts[s] += counts[s - k];
        }
    }
    let total = 2f64.powi(n as i32);
    counts[..=t.min(max_sum)].iter().sum::<f64>() / total
}

/// Wilcoxon signed-rank test on the pairs (a, b)
///
/// # Example
/// ```
/// use apiduel::stats::wilcoxon_signed_rank;
///
/// let a: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
/// let b: Vec<f64> = a.iter().map(|v| v + 25.0 + v * 0.01).collect();
/// let r = wilcoxon_signed_rank(&a, &b).unwrap();
/// assert_eq!(r.statistic, 0.0);
/// assert!(r.pvalue < 0.001);
/// ```
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<WilcoxonResult, String> {
    if a.len() != b.len() {
        return Err(format!("samples differ in length ({} vs {})", a.len(), b.len()));
    }
    if a.is_empty() {
        return Err("no pairs".to_string());
    }

    let all: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let diffs: Vec<f64> = all.iter().copied().filter(|d| *d != 0.0).collect();
    let zeros_discarded = all.len() - diffs.len();

    if diffs.is_empty() {
        return Err(format!(
            "all {} paired differences are zero; the signed-rank statistic is undefined",
            all.len()
        ));
    }

    let n = diffs.len();
    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = rank_with_ties(&magnitudes);

    let r_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let r_minus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d < 0.0)
        .map(|(_, r)| r)
        .sum();
    let statistic = r_plus.min(r_minus);

    let exact = n <= WILCOXON_EXACT_MAX && ties.is_empty() && zeros_discarded == 0;

    let (pvalue, method) = if exact {
        // Without ties every rank is an integer, so the statistic is too
        let p = 2.0 * exact_cdf(n, statistic.round() as usize);
        (p.min(1.0), WilcoxonMethod::Exact)
    } else {
        let nf = n as f64;
        let mn = nf * (nf + 1.0) / 4.0;
        let tie_term: f64 = ties
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum::<f64>()
            / 48.0;
        let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
        if var <= 0.0 {
            return Err("signed-rank variance is zero".to_string());
        }
        let z = (statistic - mn) / var.sqrt();
        let p = 2.0 * normal_sf(z.abs());
        (p.min(1.0), WilcoxonMethod::NormalApprox)
    };

    Ok(WilcoxonResult {
        statistic,
        pvalue,
        n_used: n,
        zeros_discarded,
        method,
    })
}

/// Full comparison of one query for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTestResult {
    pub query: QueryType,
    pub metric: Metric,
    pub n_pairs: usize,
    pub rest_mean: f64,
    pub rest_std: Option<f64>,
    pub graphql_mean: f64,
    pub graphql_std: Option<f64>,
    /// mean(GraphQL) - mean(REST)
    pub diff_mean: f64,
    /// None when the REST mean is zero
    pub diff_percent: Option<f64>,
    pub test: TestDecision,
    pub statistic: f64,
    pub pvalue: f64,
    /// None when the pooled standard deviation is zero
    pub cohens_d: Option<f64>,
    pub effect_size: Option<EffectSize>,
    /// pvalue < 0.05
    pub significant: bool,
}

/// Compare both APIs on one paired sample with the test family `decision`
///
/// `decision` comes from the normality gate; it is a parameter so the same
/// family is applied to every query and metric.
pub fn compare_paired(
    sample: &PairedSample,
    decision: TestDecision,
) -> Result<HypothesisTestResult, AnalysisError> {
    if sample.is_empty() {
        return Err(AnalysisError::EmptyCondition {
            query: sample.query,
        });
    }

    let precondition = |reason: String| AnalysisError::Precondition {
        query: sample.query,
        metric: sample.metric,
        reason,
    };

    let rest_mean = mean(&sample.rest);
    let graphql_mean = mean(&sample.graphql);
    let diff_mean = graphql_mean - rest_mean;

    let test = match decision {
        TestDecision::PairedT => match paired_t_test(&sample.rest, &sample.graphql) {
            Ok(test) => test,
            Err(TTestFailure::Undefined(reason)) => return Err(precondition(reason)),
            Err(TTestFailure::Routine(message)) => {
                return Err(AnalysisError::TTest {
                    query: sample.query,
                    metric: sample.metric,
                    message,
                })
            }
        },
        TestDecision::Wilcoxon => {
            let w = wilcoxon_signed_rank(&sample.rest, &sample.graphql).map_err(precondition)?;
            if w.zeros_discarded > 0 {
                tracing::debug!(
                    "{} {}: discarded {} zero differences",
                    sample.query,
                    sample.metric,
                    w.zeros_discarded
                );
            }
            PairedTest {
                statistic: w.statistic,
                pvalue: w.pvalue,
            }
        }
    };

    let cohens_d = cohens_d(&sample.rest, &sample.graphql);

    Ok(HypothesisTestResult {
        query: sample.query,
        metric: sample.metric,
        n_pairs: sample.len(),
        rest_mean,
        rest_std: sample_std(&sample.rest),
        graphql_mean,
        graphql_std: sample_std(&sample.graphql),
        diff_mean,
        diff_percent: percent_difference(diff_mean, rest_mean),
        test: decision,
        statistic: test.statistic,
        pvalue: test.pvalue,
        cohens_d,
        effect_size: cohens_d.map(EffectSize::classify),
        significant: test.pvalue < SIGNIFICANCE_LEVEL,
    })
}
