//! Request executors: one measured query against one API style
//!
//! Elapsed time covers every round trip of the query (connection reuse
//! included) and payload size is the sum of response body lengths. No
//! retries: a failed request fails the cell.

use crate::catalog::{GraphqlCatalog, RestCatalog};
use crate::error::{ConfigError, RequestError};
use crate::observation::{ApiType, Measurement, QueryType};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Instant;

/// GitHub rejects requests without a User-Agent
pub const USER_AGENT: &str = concat!("apiduel/", env!("CARGO_PKG_VERSION"));

/// Executes one query of one API style and measures it
pub trait RequestExecutor {
    fn api(&self) -> ApiType;

    fn execute(&mut self, query: QueryType) -> Result<Measurement, RequestError>;
}

/// Blocking client sending `Authorization: Bearer <token>` on every request
pub fn build_client(token: &str) -> Result<Client, ConfigError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ConfigError::Invalid("token contains invalid header characters".into()))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(ConfigError::Client)
}

/// Body length of a successful response
fn body_len(method: &'static str, url: &str, response: Response) -> Result<u64, RequestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RequestError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.bytes().map_err(|source| RequestError::Transport {
        method,
        url: url.to_string(),
        source,
    })?;
    Ok(body.len() as u64)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

pub struct RestExecutor {
    client: Client,
    catalog: RestCatalog,
}

impl RestExecutor {
    pub fn new(client: Client, catalog: RestCatalog) -> Self {
        Self { client, catalog }
    }
}

impl RequestExecutor for RestExecutor {
    fn api(&self) -> ApiType {
        ApiType::Rest
    }

    fn execute(&mut self, query: QueryType) -> Result<Measurement, RequestError> {
        let definition = &self
            .catalog
            .get(query)
            .ok_or(RequestError::UnknownQuery(query))?
            .definition;

        let start = Instant::now();
        let mut size_bytes = 0;
        for url in definition.urls() {
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|source| RequestError::Transport {
                    method: "GET",
                    url: url.clone(),
                    source,
                })?;
            size_bytes += body_len("GET", url, response)?;
        }
        let elapsed_ms = elapsed_ms(start);

        tracing::debug!(
            "REST {} ({} requests): {:.2}ms, {} bytes",
            query,
            definition.request_count(),
            elapsed_ms,
            size_bytes
        );

        Ok(Measurement {
            elapsed_ms,
            size_bytes,
        })
    }
}

pub struct GraphqlExecutor {
    client: Client,
    catalog: GraphqlCatalog,
}

impl GraphqlExecutor {
    pub fn new(client: Client, catalog: GraphqlCatalog) -> Self {
        Self { client, catalog }
    }
}

impl RequestExecutor for GraphqlExecutor {
    fn api(&self) -> ApiType {
        ApiType::Graphql
    }

    fn execute(&mut self, query: QueryType) -> Result<Measurement, RequestError> {
        let document = self
            .catalog
            .get(query)
            .ok_or(RequestError::UnknownQuery(query))?;
        let endpoint = self.catalog.endpoint();
        let body = serde_json::json!({ "query": document });

        let start = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .map_err(|source| RequestError::Transport {
                method: "POST",
                url: endpoint.to_string(),
                source,
            })?;
        let size_bytes = body_len("POST", endpoint, response)?;
        let elapsed_ms = elapsed_ms(start);

        tracing::debug!("GraphQL {}: {:.2}ms, {} bytes", query, elapsed_ms, size_bytes);

        Ok(Measurement {
            elapsed_ms,
            size_bytes,
        })
    }
}
