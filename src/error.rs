//! Error taxonomy
//!
//! Request errors are recovered by the runner (the cell is skipped).
//! Configuration errors stop the binary before the first request.
//! Analysis errors abort the analysis with the group and metric that failed.

use crate::observation::{ApiType, Metric, QueryType};
use std::path::PathBuf;
use thiserror::Error;

/// A single measured request failed
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no query defined for tier '{0}'")]
    UnknownQuery(QueryType),
}

/// Missing or invalid configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set (export it or add it to .env)")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// The analyzer cannot produce a defensible result
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("query '{query}' has no completed pairs (every request failed?)")]
    EmptyCondition { query: QueryType },

    #[error(
        "query '{query}' is not paired: REST has {rest} observations, GraphQL has {graphql} \
         (trials without a partner: {missing_trials:?})"
    )]
    UnpairedSamples {
        query: QueryType,
        rest: usize,
        graphql: usize,
        missing_trials: Vec<u32>,
    },

    #[error("duplicate observation for {api} {query} trial {trial}")]
    DuplicateObservation {
        api: ApiType,
        query: QueryType,
        trial: u32,
    },

    #[error("normality test for {api} {query} {metric} needs 3..=5000 samples, got {n}")]
    InsufficientSamples {
        api: ApiType,
        query: QueryType,
        metric: Metric,
        n: usize,
    },

    #[error("{metric} test for query '{query}' is undefined: {reason}")]
    Precondition {
        query: QueryType,
        metric: Metric,
        reason: String,
    },

    #[error("t-test failed for query '{query}' {metric}: {message}")]
    TTest {
        query: QueryType,
        metric: Metric,
        message: String,
    },
}

/// A persisted table could not be parsed
#[derive(Error, Debug)]
pub enum TableError {
    #[error("table is empty (missing header row)")]
    MissingHeader,

    #[error("unexpected header: expected '{expected}', found '{found}'")]
    Header { expected: String, found: String },

    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },
}
