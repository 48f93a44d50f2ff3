//! Trial runner: randomized, paced collection of paired observations
//!
//! Each trial runs the full api × query cross product once. API order and
//! query order are reshuffled independently every trial so neither style
//! systematically benefits from a warm connection or a quiet rate-limit
//! window. Failed cells are skipped, never retried.

use crate::config::ExperimentConfig;
use crate::error::RequestError;
use crate::executor::RequestExecutor;
use crate::observation::{ApiType, Observation, ObservationSet, QueryType};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One cell that produced no observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub trial: u32,
    pub api: ApiType,
    pub query: QueryType,
    pub cause: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub observations: ObservationSet,
    pub failures: Vec<RequestFailure>,
}

impl RunOutcome {
    /// Cells attempted, successful or not
    pub fn attempted(&self) -> usize {
        self.observations.len() + self.failures.len()
    }
}

/// Local time in ISO-8601 without offset, microsecond precision
pub fn local_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub struct TrialRunner<'a, R: Rng> {
    config: &'a ExperimentConfig,
    rng: R,
}

impl<'a, R: Rng> TrialRunner<'a, R> {
    pub fn new(config: &'a ExperimentConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Unmeasured `simple` requests on both APIs; failures only warn
    pub fn warm_up(&mut self, rest: &mut dyn RequestExecutor, graphql: &mut dyn RequestExecutor) {
        if self.config.warmup_runs == 0 {
            return;
        }
        tracing::info!("Warming up ({} runs per API)", self.config.warmup_runs);

        for run in 1..=self.config.warmup_runs {
            warm_up_once(rest, run);
            warm_up_once(graphql, run);
        }
    }

    /// Warm up, then run every trial
    pub fn run(
        &mut self,
        rest: &mut dyn RequestExecutor,
        graphql: &mut dyn RequestExecutor,
    ) -> RunOutcome {
        self.warm_up(rest, graphql);

        let num_trials = self.config.num_trials;
        let delay = self.config.request_delay();
        let mut observations = Vec::with_capacity(num_trials as usize * 6);
        let mut failures = Vec::new();

        let mut apis = ApiType::ALL;
        let mut queries = QueryType::ALL;

        for trial in 1..=num_trials {
            tracing::info!("Trial {}/{}", trial, num_trials);
            apis.shuffle(&mut self.rng);
            queries.shuffle(&mut self.rng);

            for api in apis {
                let executor: &mut dyn RequestExecutor = match api {
                    ApiType::Rest => &mut *rest,
                    ApiType::Graphql => &mut *graphql,
                };

                for query in queries {
                    match executor.execute(query) {
                        Ok(m) => {
                            tracing::info!(
                                "  {:8} {:8} {:8.2}ms {:7} bytes",
                                api.as_str(),
                                query.as_str(),
                                m.elapsed_ms,
                                m.size_bytes
                            );
                            observations.push(Observation {
                                query_type: query,
                                api_type: api,
                                response_time_ms: m.elapsed_ms,
                                payload_size_bytes: m.size_bytes,
                                trial,
                                timestamp: local_timestamp(),
                            });
                        }
                        Err(e) => {
                            tracing::warn!("Trial {} {} {} failed: {}", trial, api, query, e);
                            failures.push(failure(trial, api, query, &e));
                        }
                    }
                    pause(delay);
                }
            }
        }

        tracing::info!(
            "Collected {} observations ({} failed requests)",
            observations.len(),
            failures.len()
        );

        RunOutcome {
            observations: ObservationSet::new(observations),
            failures,
        }
    }
}

fn warm_up_once(executor: &mut dyn RequestExecutor, run: u32) {
    if let Err(e) = executor.execute(QueryType::Simple) {
        tracing::warn!("Warm-up {} {} failed: {}", run, executor.api(), e);
    }
}

fn failure(trial: u32, api: ApiType, query: QueryType, error: &RequestError) -> RequestFailure {
    RequestFailure {
        trial,
        api,
        query,
        cause: error.to_string(),
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
