//! Raw experiment observations and the grouping/pairing views over them
//!
//! One `Observation` is one measured request of one trial. The analyzer never
//! looks at observations directly: it asks the `ObservationSet` for a
//! `ConditionSample` (one api × query group) or a `PairedSample` (both APIs of
//! one query, aligned by trial).

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Query complexity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Simple,
    Medium,
    Complex,
}

impl QueryType {
    /// All tiers, simplest first
    pub const ALL: [QueryType; 3] = [QueryType::Simple, QueryType::Medium, QueryType::Complex];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Simple => "simple",
            QueryType::Medium => "medium",
            QueryType::Complex => "complex",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(QueryType::Simple),
            "medium" => Ok(QueryType::Medium),
            "complex" => Ok(QueryType::Complex),
            other => Err(format!("unknown query type '{}'", other)),
        }
    }
}

/// API access style under test
///
/// `Rest` is condition A (the baseline), `Graphql` is condition B. Every
/// difference reported by the analyzer is `B - A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApiType {
    #[serde(rename = "REST")]
    Rest,
    #[serde(rename = "GraphQL")]
    Graphql,
}

impl ApiType {
    pub const ALL: [ApiType; 2] = [ApiType::Rest, ApiType::Graphql];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::Rest => "REST",
            ApiType::Graphql => "GraphQL",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REST" => Ok(ApiType::Rest),
            "GraphQL" => Ok(ApiType::Graphql),
            other => Err(format!("unknown api type '{}'", other)),
        }
    }
}

/// Measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ResponseTimeMs,
    PayloadSizeBytes,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::ResponseTimeMs, Metric::PayloadSizeBytes];

    /// Column name in the raw observation table
    pub fn column(&self) -> &'static str {
        match self {
            Metric::ResponseTimeMs => "response_time_ms",
            Metric::PayloadSizeBytes => "payload_size_bytes",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::ResponseTimeMs => "ms",
            Metric::PayloadSizeBytes => "bytes",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Result of one successful request execution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed_ms: f64,
    pub size_bytes: u64,
}

/// One measured trial cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub query_type: QueryType,
    pub api_type: ApiType,
    pub response_time_ms: f64,
    pub payload_size_bytes: u64,
    /// 1-based trial number
    pub trial: u32,
    pub timestamp: String,
}

impl Observation {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ResponseTimeMs => self.response_time_ms,
            Metric::PayloadSizeBytes => self.payload_size_bytes as f64,
        }
    }
}

/// All samples of one condition (api × query), ordered by trial
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSample {
    pub api: ApiType,
    pub query: QueryType,
    pub trials: Vec<u32>,
    pub response_time_ms: Vec<f64>,
    pub payload_size_bytes: Vec<f64>,
}

impl ConditionSample {
    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::ResponseTimeMs => &self.response_time_ms,
            Metric::PayloadSizeBytes => &self.payload_size_bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// REST and GraphQL samples of one query, aligned index-by-index on trial
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSample {
    pub query: QueryType,
    pub metric: Metric,
    pub trials: Vec<u32>,
    /// Condition A
    pub rest: Vec<f64>,
    /// Condition B
    pub graphql: Vec<f64>,
}

impl PairedSample {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Every observation of one experiment run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of observations per (api, query), in api-then-query order
    pub fn group_counts(&self) -> Vec<(ApiType, QueryType, usize)> {
        let mut counts = Vec::with_capacity(6);
        for api in ApiType::ALL {
            for query in QueryType::ALL {
                let n = self
                    .observations
                    .iter()
                    .filter(|o| o.api_type == api && o.query_type == query)
                    .count();
                counts.push((api, query, n));
            }
        }
        counts
    }

    /// Collect one condition's samples, sorted by trial
    pub fn group(&self, api: ApiType, query: QueryType) -> ConditionSample {
        let mut rows: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|o| o.api_type == api && o.query_type == query)
            .collect();
        rows.sort_by_key(|o| o.trial);

        ConditionSample {
            api,
            query,
            trials: rows.iter().map(|o| o.trial).collect(),
            response_time_ms: rows.iter().map(|o| o.response_time_ms).collect(),
            payload_size_bytes: rows.iter().map(|o| o.payload_size_bytes as f64).collect(),
        }
    }

    /// Align both APIs of `query` by trial for a paired test
    ///
    /// Fails instead of truncating when the two sides do not cover the same
    /// trials: a failed request on one side leaves that trial without a
    /// partner, and pairing by position would compare different trials.
    pub fn paired(&self, query: QueryType, metric: Metric) -> Result<PairedSample, AnalysisError> {
        let rest = self.indexed(ApiType::Rest, query, metric)?;
        let graphql = self.indexed(ApiType::Graphql, query, metric)?;

        if rest.is_empty() && graphql.is_empty() {
            return Err(AnalysisError::EmptyCondition { query });
        }

        let missing_trials: Vec<u32> = rest
            .keys()
            .filter(|t| !graphql.contains_key(t))
            .chain(graphql.keys().filter(|t| !rest.contains_key(t)))
            .copied()
            .collect();

        if !missing_trials.is_empty() {
            let mut missing_trials = missing_trials;
            missing_trials.sort_unstable();
            return Err(AnalysisError::UnpairedSamples {
                query,
                rest: rest.len(),
                graphql: graphql.len(),
                missing_trials,
            });
        }

        Ok(PairedSample {
            query,
            metric,
            trials: rest.keys().copied().collect(),
            rest: rest.values().copied().collect(),
            graphql: graphql.values().copied().collect(),
        })
    }

    fn indexed(
        &self,
        api: ApiType,
        query: QueryType,
        metric: Metric,
    ) -> Result<BTreeMap<u32, f64>, AnalysisError> {
        let mut by_trial = BTreeMap::new();
        for obs in self
            .observations
            .iter()
            .filter(|o| o.api_type == api && o.query_type == query)
        {
            if by_trial.insert(obs.trial, obs.value(metric)).is_some() {
                return Err(AnalysisError::DuplicateObservation {
                    api,
                    query,
                    trial: obs.trial,
                });
            }
        }
        Ok(by_trial)
    }
}

impl From<Vec<Observation>> for ObservationSet {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(api: ApiType, query: QueryType, trial: u32, ms: f64, bytes: u64) -> Observation {
        Observation {
            query_type: query,
            api_type: api,
            response_time_ms: ms,
            payload_size_bytes: bytes,
            trial,
            timestamp: "2025-01-01T00:00:00".to_string(),
        }
    }

    #[test]
    fn test_labels_parse_back() {
        for q in QueryType::ALL {
            assert_eq!(q.as_str().parse::<QueryType>().unwrap(), q);
        }
        for a in ApiType::ALL {
            assert_eq!(a.as_str().parse::<ApiType>().unwrap(), a);
        }
        assert!("rest".parse::<ApiType>().is_err());
        assert!("hard".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_group_sorts_by_trial() {
        let set = ObservationSet::new(vec![
            obs(ApiType::Rest, QueryType::Simple, 2, 20.0, 200),
            obs(ApiType::Rest, QueryType::Simple, 1, 10.0, 100),
            obs(ApiType::Graphql, QueryType::Simple, 1, 99.0, 999),
        ]);

        let group = set.group(ApiType::Rest, QueryType::Simple);
        assert_eq!(group.trials, vec![1, 2]);
        assert_eq!(group.response_time_ms, vec![10.0, 20.0]);
        assert_eq!(group.payload_size_bytes, vec![100.0, 200.0]);
    }

    #[test]
    fn test_group_counts_cover_all_conditions() {
        let set = ObservationSet::new(vec![obs(ApiType::Graphql, QueryType::Complex, 1, 1.0, 1)]);
        let counts = set.group_counts();
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[0], (ApiType::Rest, QueryType::Simple, 0));
        assert_eq!(counts[5], (ApiType::Graphql, QueryType::Complex, 1));
    }

    #[test]
    fn test_paired_aligns_by_trial() {
        let set = ObservationSet::new(vec![
            obs(ApiType::Graphql, QueryType::Medium, 2, 22.0, 2),
            obs(ApiType::Rest, QueryType::Medium, 1, 10.0, 1),
            obs(ApiType::Graphql, QueryType::Medium, 1, 21.0, 2),
            obs(ApiType::Rest, QueryType::Medium, 2, 11.0, 1),
        ]);

        let paired = set.paired(QueryType::Medium, Metric::ResponseTimeMs).unwrap();
        assert_eq!(paired.trials, vec![1, 2]);
        assert_eq!(paired.rest, vec![10.0, 11.0]);
        assert_eq!(paired.graphql, vec![21.0, 22.0]);
    }

    #[test]
    fn test_paired_rejects_missing_partner() {
        let set = ObservationSet::new(vec![
            obs(ApiType::Rest, QueryType::Simple, 1, 10.0, 1),
            obs(ApiType::Rest, QueryType::Simple, 2, 11.0, 1),
            obs(ApiType::Graphql, QueryType::Simple, 1, 21.0, 2),
        ]);

        match set.paired(QueryType::Simple, Metric::PayloadSizeBytes) {
            Err(AnalysisError::UnpairedSamples {
                rest,
                graphql,
                missing_trials,
                ..
            }) => {
                assert_eq!(rest, 2);
                assert_eq!(graphql, 1);
                assert_eq!(missing_trials, vec![2]);
            }
            other => panic!("Expected UnpairedSamples, got {:?}", other),
        }
    }

    #[test]
    fn test_paired_rejects_same_length_different_trials() {
        let set = ObservationSet::new(vec![
            obs(ApiType::Rest, QueryType::Simple, 1, 10.0, 1),
            obs(ApiType::Graphql, QueryType::Simple, 2, 21.0, 2),
        ]);

        assert!(matches!(
            set.paired(QueryType::Simple, Metric::ResponseTimeMs),
            Err(AnalysisError::UnpairedSamples { .. })
        ));
    }

    #[test]
    fn test_paired_empty_query_is_error() {
        let set = ObservationSet::new(vec![obs(ApiType::Rest, QueryType::Simple, 1, 10.0, 1)]);
        assert!(matches!(
            set.paired(QueryType::Complex, Metric::ResponseTimeMs),
            Err(AnalysisError::EmptyCondition {
                query: QueryType::Complex
            })
        ));
    }

    #[test]
    fn test_paired_rejects_duplicate_cell() {
        let set = ObservationSet::new(vec![
            obs(ApiType::Rest, QueryType::Simple, 1, 10.0, 1),
            obs(ApiType::Rest, QueryType::Simple, 1, 12.0, 1),
            obs(ApiType::Graphql, QueryType::Simple, 1, 21.0, 2),
        ]);
        assert!(matches!(
            set.paired(QueryType::Simple, Metric::ResponseTimeMs),
            Err(AnalysisError::DuplicateObservation { trial: 1, .. })
        ));
    }
}
