// Paired-comparison statistics for the REST vs GraphQL experiment
//
// Pipeline per research question:
// 1. Descriptive summary per condition (api × query)
// 2. Shapiro-Wilk on every condition and metric → one global TestDecision
// 3. Paired t-test or Wilcoxon signed-rank per query, chosen by (2)
// 4. Cohen's d and its magnitude bucket
//
// Six tests are run (3 queries × 2 metrics) with no multiple-comparison
// correction. Reports flag this; callers that need family-wise control must
// adjust the p-values themselves.
//
// Implementation:
// - Every test and distribution function is implemented here in f64,
//   including the Student t tail used by the paired t-test

mod descriptive;
mod distribution;
mod effect;
mod normality;
mod paired;

pub use descriptive::{mean, sample_std, sample_variance, summarize, Descriptive, GroupSummary};
pub use distribution::{normal_cdf, normal_ppf, normal_sf};
pub use effect::{cohens_d, percent_difference, EffectSize};
pub use normality::{
    assess_normality, shapiro_wilk, Normality, NormalityVerdict, ShapiroError, ShapiroWilk,
    TestDecision,
};
pub use paired::{
    compare_paired, paired_t_test, wilcoxon_signed_rank, HypothesisTestResult, PairedTest,
    TTestFailure, WilcoxonMethod, WilcoxonResult,
};

/// Alpha for both the normality gate and the paired tests
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Lower bound of a "small" effect
pub const EFFECT_SMALL: f64 = 0.2;

/// Lower bound of a "medium" effect
pub const EFFECT_MEDIUM: f64 = 0.5;

/// Lower bound of a "large" effect
pub const EFFECT_LARGE: f64 = 0.8;

#[cfg(test)]
mod tests;
