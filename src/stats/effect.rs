// Standardized effect size (Cohen's d with the average-variance pooled SD)
//
// d = (mean(B) - mean(A)) / sqrt((sd(A)² + sd(B)²) / 2)
//
// Signed: positive means GraphQL (B) is larger. Independent of n, so it
// reports practical relevance alongside the p-value.

use super::descriptive::{mean, sample_variance};
use super::{EFFECT_LARGE, EFFECT_MEDIUM, EFFECT_SMALL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnitude bucket for |d|
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectSize {
    /// |d| < 0.2
    Trivial,
    /// 0.2 <= |d| < 0.5
    Small,
    /// 0.5 <= |d| < 0.8
    Medium,
    /// |d| >= 0.8
    Large,
}

impl EffectSize {
    pub fn classify(d: f64) -> Self {
        let magnitude = d.abs();
        if magnitude < EFFECT_SMALL {
            EffectSize::Trivial
        } else if magnitude < EFFECT_MEDIUM {
            EffectSize::Small
        } else if magnitude < EFFECT_LARGE {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectSize::Trivial => "Trivial",
            EffectSize::Small => "Small",
            EffectSize::Medium => "Medium",
            EffectSize::Large => "Large",
        }
    }
}

impl fmt::Display for EffectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffectSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Trivial" => Ok(EffectSize::Trivial),
            "Small" => Ok(EffectSize::Small),
            "Medium" => Ok(EffectSize::Medium),
            "Large" => Ok(EffectSize::Large),
            other => Err(format!("unknown effect size '{}'", other)),
        }
    }
}

/// Cohen's d of B relative to A
///
/// None when either side has fewer than 2 values or both are constant
/// (pooled SD of zero).
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let var_a = sample_variance(a)?;
    let var_b = sample_variance(b)?;
    let pooled = ((var_a + var_b) / 2.0).sqrt();
    if pooled == 0.0 || !pooled.is_finite() {
        return None;
    }
    Some((mean(b) - mean(a)) / pooled)
}

/// `diff / baseline * 100`, None when the baseline mean is zero
pub fn percent_difference(diff: f64, baseline_mean: f64) -> Option<f64> {
    if baseline_mean == 0.0 {
        return None;
    }
    let pct = diff / baseline_mean * 100.0;
    pct.is_finite().then_some(pct)
}
