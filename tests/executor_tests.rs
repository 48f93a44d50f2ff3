//! Executor tests against a loopback HTTP stub
//!
//! Verifies what goes over the wire (method, path, headers, GraphQL body) and
//! how sizes and failures come back.

mod utils;

use apiduel::catalog::{GraphqlCatalog, QueryDefinition, RestCatalog};
use apiduel::error::RequestError;
use apiduel::executor::{build_client, GraphqlExecutor, RequestExecutor, RestExecutor, USER_AGENT};
use apiduel::observation::QueryType;
use utils::{json_body, Routes, StubServer};

#[test]
fn test_rest_single_request() {
    let server = StubServer::start(Routes::github());
    let mut rest = RestExecutor::new(
        build_client("ghp_test").unwrap(),
        RestCatalog::github(&server.base_url),
    );

    let m = rest.execute(QueryType::Simple).unwrap();
    assert_eq!(m.size_bytes, 300);
    assert!(m.elapsed_ms > 0.0);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/users/gaearon");
    assert_eq!(requests[0].headers["authorization"], "Bearer ghp_test");
    assert_eq!(requests[0].headers["user-agent"], USER_AGENT);
}

#[test]
fn test_rest_composite_sums_payloads_in_order() {
    let server = StubServer::start(Routes::github());
    let mut rest = RestExecutor::new(
        build_client("t").unwrap(),
        RestCatalog::github(&server.base_url),
    );

    let m = rest.execute(QueryType::Complex).unwrap();
    assert_eq!(m.size_bytes, 6_000 + 20_000 + 9_000);

    let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/repos/facebook/react",
            "/repos/facebook/react/pulls?per_page=3",
            "/repos/facebook/react/commits?per_page=3",
        ]
    );
}

#[test]
fn test_rest_medium_keeps_query_string() {
    let server = StubServer::start(Routes::github());
    let mut rest = RestExecutor::new(
        build_client("t").unwrap(),
        RestCatalog::github(&server.base_url),
    );

    assert_eq!(rest.execute(QueryType::Medium).unwrap().size_bytes, 4_000);
    assert_eq!(
        server.requests()[0].path,
        "/repos/facebook/react/issues?per_page=5&state=open"
    );
}

#[test]
fn test_rest_non_success_status_fails_cell() {
    let server =
        StubServer::start(Routes::new().get("/limited", 403, r#"{"message":"rate limit"}"#));
    let mut catalog = RestCatalog::new();
    catalog.insert(
        QueryType::Simple,
        QueryDefinition::Single(server.url("/limited")),
        "rate limited",
    );
    let mut rest = RestExecutor::new(build_client("t").unwrap(), catalog);

    match rest.execute(QueryType::Simple) {
        Err(RequestError::Status { method, url, status }) => {
            assert_eq!(method, "GET");
            assert_eq!(status, 403);
            assert!(url.ends_with("/limited"));
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[test]
fn test_composite_stops_at_first_failure() {
    let server = StubServer::start(Routes::new().get("/a", 200, &json_body(50)));
    let mut catalog = RestCatalog::new();
    catalog.insert(
        QueryType::Complex,
        QueryDefinition::Composite(vec![
            server.url("/a"),
            server.url("/missing"),
            server.url("/a"),
        ]),
        "second request 404s",
    );
    let mut rest = RestExecutor::new(build_client("t").unwrap(), catalog);

    assert!(matches!(
        rest.execute(QueryType::Complex),
        Err(RequestError::Status { status: 404, .. })
    ));
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn test_graphql_posts_query_document() {
    let server = StubServer::start(Routes::github());
    let mut graphql = GraphqlExecutor::new(
        build_client("ghp_test").unwrap(),
        GraphqlCatalog::github(&server.url("/graphql")),
    );

    let m = graphql.execute(QueryType::Medium).unwrap();
    assert_eq!(m.size_bytes, 700);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/graphql");
    assert_eq!(request.headers["authorization"], "Bearer ghp_test");
    assert!(request.headers["content-type"].starts_with("application/json"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    let document = body["query"].as_str().unwrap();
    assert!(document.contains("issues(first: 5, states: OPEN)"));
}

#[test]
fn test_graphql_error_status() {
    let server = StubServer::start(Routes::new().post("/graphql", 502, "bad gateway"));
    let mut graphql = GraphqlExecutor::new(
        build_client("t").unwrap(),
        GraphqlCatalog::github(&server.url("/graphql")),
    );

    let err = graphql.execute(QueryType::Simple).unwrap_err();
    assert!(err.to_string().contains("POST"));
    assert!(err.to_string().contains("HTTP 502"));
}

#[test]
fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut rest = RestExecutor::new(
        build_client("t").unwrap(),
        RestCatalog::github(&format!("http://127.0.0.1:{}", port)),
    );

    assert!(matches!(
        rest.execute(QueryType::Simple),
        Err(RequestError::Transport { method: "GET", .. })
    ));
}
