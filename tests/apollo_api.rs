/// Integration tests for the people-search client
/// Uses wiremock to simulate the remote API, including throttling
use msp_leadgen::apollo::ApolloClient;
use msp_leadgen::config::Config;
use msp_leadgen::errors::AppError;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str) -> Config {
    Config {
        apollo_api_key: "test_key".to_string(),
        apollo_base_url: base_url.to_string(),
        database_path: ":memory:".to_string(),
        ranking_url: "http://unused.invalid/ranking.htm".to_string(),
        detail_base_url: "http://unused.invalid/detail-handler.php".to_string(),
        scrape_delay_ms: 0,
        retry_floor_ms: 25,
    }
}

fn test_client(server: &MockServer) -> ApolloClient {
    ApolloClient::new(&create_test_config(&server.uri()), CancellationToken::new()).unwrap()
}

#[tokio::test]
async fn test_people_search_parses_records_and_quota_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(body_partial_json(json!({
            "api_key": "test_key",
            "q_organization_domains": "acme.com\nglobex.com",
            "page": 1,
            "person_titles": ["CEO", "CTO"],
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("x-24-hour-requests-left", "9954")
                .append_header("x-hourly-requests-left", "198")
                .append_header("x-minute-requests-left", "48")
                .set_body_json(json!({
                    "people": [
                        {
                            "id": "p1",
                            "first_name": "Ada",
                            "last_name": "Lovelace",
                            "title": "CEO",
                            "email": "ada@acme.com",
                            "organization_id": "org_acme",
                            "phone_numbers": [{"sanitized_number": "+16502530000"}],
                            "city": "San Francisco"
                        },
                        {
                            "id": "p2",
                            "first_name": "Grace",
                            "organization_id": "org_globex"
                        }
                    ]
                })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let people = client
        .find_people(
            &["acme.com".to_string(), "globex.com".to_string()],
            &["CEO".to_string(), "CTO".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(people.len(), 2);
    assert_eq!(people[0].id.as_deref(), Some("p1"));
    assert_eq!(people[0].email.as_deref(), Some("ada@acme.com"));
    assert_eq!(
        people[0].phone_numbers[0].sanitized_number.as_deref(),
        Some("+16502530000")
    );
    // Unmodeled fields ride along instead of being dropped
    assert_eq!(
        people[0].extra.get("city").and_then(|v| v.as_str()),
        Some("San Francisco")
    );
    assert_eq!(people[1].last_name, None);

    // The response headers refreshed the cached request budget
    assert_eq!(client.quota().day(), 9954);
    assert_eq!(client.quota().hour(), 198);
    assert_eq!(client.quota().minute(), 48);
}

#[tokio::test]
async fn test_people_search_defaults_to_ceo_title() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(body_partial_json(json!({
            "person_titles": ["Chief Executive Officer"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "people": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let people = client
        .find_people(&["acme.com".to_string()], &[])
        .await
        .unwrap();

    assert!(people.is_empty());
}

#[tokio::test]
async fn test_resolve_unknown_domain_yields_empty_map() {
    let mock_server = MockServer::start().await;

    // The service answers unknown domains with an empty object
    Mock::given(method("POST"))
        .and(path("/organizations/enrich"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let resolved = client
        .resolve_organization_ids(&["nosuchcompany.invalid".to_string()])
        .await
        .unwrap();

    assert!(resolved.is_empty());
}

#[tokio::test]
async fn test_resolve_single_domain_uses_enrich_and_keys_by_canonical_domain() {
    let mock_server = MockServer::start().await;

    // Only the single-domain endpoint is mounted; hitting bulk would 404
    Mock::given(method("POST"))
        .and(path("/organizations/enrich"))
        .and(body_partial_json(json!({
            "api_key": "test_key",
            "domain": "shop.acme.com",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organization": {
                "id": "org_acme",
                "primary_domain": "acme.com",
                "name": "Acme Corp"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let resolved = client
        .resolve_organization_ids(&["shop.acme.com".to_string()])
        .await
        .unwrap();

    // Keyed by the canonical domain the service reports, not the query
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved.get("acme.com").map(String::as_str), Some("org_acme"));
}

#[tokio::test]
async fn test_resolve_many_domains_uses_bulk_and_skips_nulls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations/bulk_enrich"))
        .and(body_partial_json(json!({
            "domains": ["acme.com", "unknown.invalid", "globex.com"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organizations": [
                {"id": "org_acme", "primary_domain": "acme.com"},
                null,
                {"id": "org_globex", "primary_domain": "globex.com"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let resolved = client
        .resolve_organization_ids(&[
            "acme.com".to_string(),
            "unknown.invalid".to_string(),
            "globex.com".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved.get("acme.com").map(String::as_str), Some("org_acme"));
    assert_eq!(
        resolved.get("globex.com").map(String::as_str),
        Some("org_globex")
    );
}

#[tokio::test]
async fn test_currently_employed_filters_stale_people_and_dedupes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations/bulk_enrich"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organizations": [
                {"id": "org_acme", "primary_domain": "acme.com"},
                {"id": "org_globex", "primary_domain": "globex.com"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The search index returns stale employment, repeats and unknowns
    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                {"id": "p1", "first_name": "Ada", "organization_id": "org_acme"},
                {"id": "p2", "first_name": "Bob", "organization_id": "org_defunct"},
                {"id": "p1", "first_name": "Ada", "organization_id": "org_acme"},
                {"id": "p4", "first_name": "Eve"},
                {"id": "p5", "first_name": "Gus", "organization_id": "org_globex"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let people = client
        .find_people_currently_employed(
            &["acme.com".to_string(), "globex.com".to_string()],
            &["CEO".to_string()],
        )
        .await
        .unwrap();

    let ids: Vec<_> = people.iter().filter_map(|p| p.id.as_deref()).collect();
    assert_eq!(ids, vec!["p1", "p5"]);
}

#[tokio::test]
async fn test_throttled_request_retries_until_success() {
    let mock_server = MockServer::start().await;
    let payload = json!({
        "api_key": "test_key",
        "q_organization_domains": "acme.com",
        "page": 1,
        "person_titles": ["CEO"],
    });

    // Two throttled answers, then the real one. Mount order matters:
    // once the 429 mock is spent, requests fall through to the next.
    // Exact body matchers on both mocks prove the retried request is
    // identical to the throttled one.
    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(body_json(payload.clone()))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(body_json(payload))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [{"id": "p1", "first_name": "Ada"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let start = Instant::now();
    let people = client
        .find_people(&["acme.com".to_string()], &["CEO".to_string()])
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(people.len(), 1);
    assert_eq!(people[0].id.as_deref(), Some("p1"));
    // Two retries, each waiting at least the 25ms floor
    assert!(
        elapsed >= Duration::from_millis(50),
        "retries returned too quickly: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_secs(5),
        "retries waited far longer than the floor: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_server_error_fails_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations/enrich"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database exploded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client(&mock_server);
    let err = client
        .resolve_organization_ids(&["acme.com".to_string()])
        .await
        .unwrap_err();

    match err {
        AppError::ApiCallFailed {
            endpoint,
            status,
            body,
        } => {
            assert_eq!(endpoint, "organizations/enrich");
            assert_eq!(status, 500);
            assert!(body.contains("database exploded"));
        }
        other => panic!("Expected ApiCallFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_aborts_throttle_wait() {
    let mock_server = MockServer::start().await;

    // Permanently throttled, with a retry floor far longer than the test
    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.retry_floor_ms = 60_000;

    let cancel = CancellationToken::new();
    let mut client = ApolloClient::new(&config, cancel.clone()).unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let start = Instant::now();
    let err = client
        .find_people(&["acme.com".to_string()], &["CEO".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Cancelled));
    assert!(
        start.elapsed() < Duration::from_secs(10),
        "cancellation should interrupt the wait immediately"
    );
}
