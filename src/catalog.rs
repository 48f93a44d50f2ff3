//! Query catalog: what each complexity tier requests from each API
//!
//! The REST and GraphQL entries of a tier select the same information. REST
//! needs several round trips for the complex tier, GraphQL always one.

use crate::observation::QueryType;
use std::collections::BTreeMap;

pub const DEFAULT_REST_URL: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// URLs a REST query fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDefinition {
    /// One GET
    Single(String),
    /// Sequential GETs, timed and sized as one query
    Composite(Vec<String>),
}

impl QueryDefinition {
    pub fn urls(&self) -> &[String] {
        match self {
            QueryDefinition::Single(url) => std::slice::from_ref(url),
            QueryDefinition::Composite(urls) => urls,
        }
    }

    /// Number of HTTP round trips
    pub fn request_count(&self) -> usize {
        self.urls().len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestQuery {
    pub definition: QueryDefinition,
    pub description: String,
}

/// REST endpoints per tier
#[derive(Debug, Clone, Default)]
pub struct RestCatalog {
    queries: BTreeMap<QueryType, RestQuery>,
}

impl RestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// GitHub queries against `base_url` (no trailing slash needed)
    pub fn github(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = |path: &str| format!("{}{}", base, path);

        let mut catalog = Self::new();
        catalog.insert(
            QueryType::Simple,
            QueryDefinition::Single(url("/users/gaearon")),
            "User profile",
        );
        catalog.insert(
            QueryType::Medium,
            QueryDefinition::Single(url("/repos/facebook/react/issues?per_page=5&state=open")),
            "5 open issues of the repository",
        );
        catalog.insert(
            QueryType::Complex,
            QueryDefinition::Composite(vec![
                url("/repos/facebook/react"),
                url("/repos/facebook/react/pulls?per_page=3"),
                url("/repos/facebook/react/commits?per_page=3"),
            ]),
            "Repo + PRs + commits (3 requests)",
        );
        catalog
    }

    pub fn insert(&mut self, query: QueryType, definition: QueryDefinition, description: &str) {
        self.queries.insert(
            query,
            RestQuery {
                definition,
                description: description.to_string(),
            },
        );
    }

    pub fn get(&self, query: QueryType) -> Option<&RestQuery> {
        self.queries.get(&query)
    }
}

const SIMPLE_DOCUMENT: &str = r#"
query {
  user(login: "gaearon") {
    login
    name
    bio
    followers { totalCount }
    following { totalCount }
  }
}
"#;

const MEDIUM_DOCUMENT: &str = r#"
query {
  repository(owner: "facebook", name: "react") {
    name
    description
    stargazerCount
    issues(first: 5, states: OPEN) {
      nodes {
        title
        number
        createdAt
      }
    }
  }
}
"#;

const COMPLEX_DOCUMENT: &str = r#"
query {
  repository(owner: "facebook", name: "react") {
    name
    stargazerCount
    pullRequests(first: 3, states: OPEN) {
      nodes { title number }
    }
    defaultBranchRef {
      target {
        ... on Commit {
          history(first: 3) {
            nodes { messageHeadline oid }
          }
        }
      }
    }
  }
}
"#;

/// GraphQL documents per tier, all sent to one endpoint
#[derive(Debug, Clone)]
pub struct GraphqlCatalog {
    endpoint: String,
    documents: BTreeMap<QueryType, String>,
}

impl GraphqlCatalog {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            documents: BTreeMap::new(),
        }
    }

    pub fn github(endpoint: &str) -> Self {
        let mut catalog = Self::new(endpoint);
        catalog.insert(QueryType::Simple, SIMPLE_DOCUMENT);
        catalog.insert(QueryType::Medium, MEDIUM_DOCUMENT);
        catalog.insert(QueryType::Complex, COMPLEX_DOCUMENT);
        catalog
    }

    pub fn insert(&mut self, query: QueryType, document: &str) {
        self.documents.insert(query, document.to_string());
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn get(&self, query: QueryType) -> Option<&str> {
        self.documents.get(&query).map(String::as_str)
    }
}
