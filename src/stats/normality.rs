// Shapiro-Wilk normality testing and the parametric/non-parametric gate
//
// The W statistic uses Royston's (1992, 1995) approximation of the optimal
// coefficients (Algorithm AS R94); the p-value uses his normalizing
// transformations of ln(1 - W), with the exact distribution for n = 3.
//
// The gate is all-or-nothing: one non-normal group anywhere switches every
// comparison to Wilcoxon, so RQ1 and RQ2 are always tested with the same
// family.

use super::distribution::{normal_ppf, normal_sf};
use super::SIGNIFICANCE_LEVEL;
use crate::error::AnalysisError;
use crate::observation::{ApiType, ConditionSample, Metric, QueryType};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

/// Smallest sample the test is defined for
pub const MIN_SAMPLES: usize = 3;

/// Largest sample the coefficient approximation is validated for
pub const MAX_SAMPLES: usize = 5000;

const SMALL: f64 = 1e-19;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// 6 / pi
const PI6: f64 = 1.909_859_317_102_744;
/// asin(sqrt(3/4)) = pi / 3
const STQR: f64 = std::f64::consts::FRAC_PI_3;

/// Shapiro-Wilk result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapiroWilk {
    /// W statistic in (0, 1]
    pub statistic: f64,
    pub pvalue: f64,
}

/// Why a sample could not be tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapiroError {
    /// n outside `MIN_SAMPLES..=MAX_SAMPLES`
    SampleSize(usize),
    /// All values identical
    ZeroRange,
}

/// cc[0] + cc[1]·x + cc[2]·x² + ...
fn poly(cc: &[f64], x: f64) -> f64 {
    cc.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Upper-half coefficients a_1 >= a_2 >= ... (length n / 2)
fn coefficients(n: usize) -> Vec<f64> {
    let nn2 = n / 2;
    if n == 3 {
        return vec![FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let an25 = an + 0.25;
    let m: Vec<f64> = (1..=nn2)
        .map(|i| normal_ppf((i as f64 - 0.375) / an25))
        .collect();

    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let mut a = vec![0.0; nn2];
    a[0] = a1;

    let (start, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };

    for i in start..nn2 {
        a[i] = -m[i] / fac;
    }
    a
}

/// Shapiro-Wilk test of the null hypothesis that `sample` is normal
///
/// # Example
/// ```
/// use apiduel::stats::shapiro_wilk;
///
/// let result = shapiro_wilk(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert!(result.statistic > 0.98);
/// assert!(result.pvalue > 0.05); // evenly spaced values look normal
/// ```
pub fn shapiro_wilk(sample: &[f64]) -> Result<ShapiroWilk, ShapiroError> {
    let n = sample.len();
    if !(MIN_SAMPLES..=MAX_SAMPLES).contains(&n) {
        return Err(ShapiroError::SampleSize(n));
    }

    let mut x = sample.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let range = x[n - 1] - x[0];
    if range < SMALL {
        return Err(ShapiroError::ZeroRange);
    }

    // Scale by the range so large payload sizes do not lose precision
    let x: Vec<f64> = x.iter().map(|v| v / range).collect();
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean) * (v - mean)).sum();

    let a = coefficients(n);
    let b: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();

    let w = (b * b / ssq).min(1.0);

    Ok(ShapiroWilk {
        statistic: w,
        pvalue: pvalue(w, n),
    })
}

fn pvalue(w: f64, n: usize) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }

    if n == 3 {
        return (PI6 * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
    }

    let an = n as f64;
    let y = (1.0 - w).ln();

    let (y, m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return 1e-99;
        }
        (-(gamma - y).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (y, poly(&C5, xx), poly(&C6, xx).exp())
    };

    normal_sf((y - m) / s)
}

/// Outcome of one normality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normality {
    /// p > 0.05: normality not rejected
    Normal,
    /// p <= 0.05
    NotNormal,
    /// Zero-range sample; W is undefined. Counts as not normal.
    Degenerate,
}

impl Normality {
    pub fn is_normal(&self) -> bool {
        matches!(self, Normality::Normal)
    }
}

impl fmt::Display for Normality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normality::Normal => write!(f, "SIM"),
            Normality::NotNormal => write!(f, "NÃO"),
            Normality::Degenerate => write!(f, "CONSTANTE"),
        }
    }
}

/// Normality of one (api, query, metric) sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityVerdict {
    pub api: ApiType,
    pub query: QueryType,
    pub metric: Metric,
    pub n: usize,
    /// None when the sample is degenerate
    pub test: Option<ShapiroWilk>,
    pub outcome: Normality,
}

/// Run Shapiro-Wilk on one metric of one condition
///
/// Too few samples is an error, never a default verdict.
pub fn assess_normality(
    sample: &ConditionSample,
    metric: Metric,
) -> Result<NormalityVerdict, AnalysisError> {
    let values = sample.values(metric);

    let (test, outcome) = match shapiro_wilk(values) {
        Ok(test) => {
            let outcome = if test.pvalue > SIGNIFICANCE_LEVEL {
                Normality::Normal
            } else {
                Normality::NotNormal
            };
            (Some(test), outcome)
        }
        Err(ShapiroError::ZeroRange) => {
            tracing::warn!(
                "{} {} {}: all {} values identical, treating as not normal",
                sample.api,
                sample.query,
                metric,
                values.len()
            );
            (None, Normality::Degenerate)
        }
        Err(ShapiroError::SampleSize(n)) => {
            return Err(AnalysisError::InsufficientSamples {
                api: sample.api,
                query: sample.query,
                metric,
                n,
            });
        }
    };

    Ok(NormalityVerdict {
        api: sample.api,
        query: sample.query,
        metric,
        n: values.len(),
        test,
        outcome,
    })
}

/// Which paired test family every comparison uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestDecision {
    /// Paired t-test (every group normal)
    PairedT,
    /// Wilcoxon signed-rank (at least one group not normal)
    Wilcoxon,
}

impl TestDecision {
    /// Parametric only if every verdict is `Normal`
    pub fn from_verdicts(verdicts: &[NormalityVerdict]) -> Self {
        if verdicts.iter().all(|v| v.outcome.is_normal()) {
            TestDecision::PairedT
        } else {
            TestDecision::Wilcoxon
        }
    }

    pub fn use_parametric(&self) -> bool {
        matches!(self, TestDecision::PairedT)
    }

    /// Long name for reports
    pub fn description(&self) -> &'static str {
        match self {
            TestDecision::PairedT => "paired t-test",
            TestDecision::Wilcoxon => "Wilcoxon signed-rank",
        }
    }

    /// Short name stored with each result
    pub fn test_name(&self) -> &'static str {
        match self {
            TestDecision::PairedT => "t-test",
            TestDecision::Wilcoxon => "Wilcoxon",
        }
    }
}

impl fmt::Display for TestDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
