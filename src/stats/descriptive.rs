// Descriptive statistics per condition
//
// Standard deviation is the sample estimate (n - 1 denominator), matching
// what the effect-size formula expects. A single observation has no sample
// deviation, so `std` is None rather than 0 or NaN.

use crate::observation::{ApiType, Metric, ObservationSet, QueryType};
use serde::{Deserialize, Serialize};

/// Summary of one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; None when n < 2
    pub std: Option<f64>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Descriptive {
    /// Describe a non-empty sample
    pub fn from_sample(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(Self {
            n: values.len(),
            mean: mean(values),
            std: sample_std(values),
            median: median_sorted(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Arithmetic mean (NaN for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with n - 1 denominator
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Median of already-sorted data; even lengths average the middle pair
fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Both metrics of one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub api: ApiType,
    pub query: QueryType,
    pub response_time_ms: Descriptive,
    pub payload_size_bytes: Descriptive,
}

impl GroupSummary {
    pub fn metric(&self, metric: Metric) -> &Descriptive {
        match metric {
            Metric::ResponseTimeMs => &self.response_time_ms,
            Metric::PayloadSizeBytes => &self.payload_size_bytes,
        }
    }
}

/// Summarize every non-empty condition, REST first, simplest query first
pub fn summarize(set: &ObservationSet) -> Vec<GroupSummary> {
    let mut summaries = Vec::with_capacity(6);

    for api in ApiType::ALL {
        for query in QueryType::ALL {
            let group = set.group(api, query);
            let (Some(time), Some(size)) = (
                Descriptive::from_sample(&group.response_time_ms),
                Descriptive::from_sample(&group.payload_size_bytes),
            ) else {
                tracing::debug!("No observations for {} {}, skipping summary", api, query);
                continue;
            };

            summaries.push(GroupSummary {
                api,
                query,
                response_time_ms: time,
                payload_size_bytes: size,
            });
        }
    }

    summaries
}
