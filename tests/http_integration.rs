//! Integration tests for the provider clients using wiremock
//!
//! These tests run whole collections against mocked GCP and Azure endpoints,
//! covering pagination, throttling retries and fatal statuses.

use cloudinv::engine::{BackoffConfig, Mode, Scope, ScopeSource};
use cloudinv::error::{ApiError, CollectError};
use cloudinv::http::{HttpClient, StaticToken};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{bearer_token, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names(records: &[Value]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|r| r.get("name").and_then(|v| v.as_str()))
        .collect()
}

/// GCP collection against a mocked Compute Engine API
mod gcp_tests {
    use super::*;
    use cloudinv::gcp::client::GcpClient;
    use cloudinv::gcp::regions::{RegionClient, RegionSource};
    use cloudinv::gcp::resources::collect_kind;

    const PROJECT_PATH: &str = "/compute/v1/projects/test-project";

    fn client(server: &MockServer) -> GcpClient {
        GcpClient::with_token(
            "test-project",
            Arc::new(StaticToken("test-token".to_string())),
            HttpClient::new().unwrap(),
            &server.uri(),
        )
    }

    fn zone_url(zone: &str) -> String {
        format!(
            "https://www.googleapis.com/compute/v1/projects/test-project/zones/{}",
            zone
        )
    }

    async fn mount_regions(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("{}/regions", PROJECT_PATH)))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "us-east1", "status": "UP",
                     "zones": [zone_url("us-east1-b"), zone_url("us-east1-c")]},
                    {"name": "europe-west1", "status": "UP",
                     "zones": [zone_url("europe-west1-b")]},
                    {"name": "me-west9", "status": "DOWN", "zones": []}
                ]
            })))
            .mount(server)
            .await;
    }

    async fn scopes(server: &MockServer) -> Vec<Scope<RegionClient>> {
        mount_regions(server).await;
        RegionSource::new(client(server)).enumerate().await.unwrap()
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig::new(Duration::from_millis(1), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_region_source_keeps_up_regions() {
        let server = MockServer::start().await;

        let scopes = scopes(&server).await;
        let ids: Vec<_> = scopes.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["us-east1", "europe-west1"]);
        assert_eq!(scopes[0].client.region.zones, vec!["us-east1-b", "us-east1-c"]);
    }

    #[tokio::test]
    async fn test_unknown_region_is_rejected() {
        let server = MockServer::start().await;
        mount_regions(&server).await;

        let source = RegionSource::with_regions(client(&server), vec!["mars-north1".to_string()]);
        let err = source.enumerate().await.err().unwrap();

        assert!(err.to_string().contains("Invalid region selected"));
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/addresses", PROJECT_PATH)))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "addr-3"}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/addresses", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "addr-1"}, {"name": "addr-2"}],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;

        // No addresses in europe-west1: the region must not appear at all
        Mock::given(method("GET"))
            .and(path(format!("{}/regions/europe-west1/addresses", PROJECT_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"kind": "compute#addressList"})),
            )
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("address", scopes, 2, Mode::Records, fast_backoff()).await);

        assert_eq!(collection.len(), 1);
        assert!(!collection.contains_scope("europe-west1"));
        let records = collection.get("us-east1").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["addr-1", "addr-2", "addr-3"]);
    }

    #[tokio::test]
    async fn test_zonal_kind_lists_every_zone() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        for (zone, instances) in [
            ("us-east1-b", json!([{"name": "vm-b"}])),
            ("us-east1-c", json!([{"name": "vm-c1"}, {"name": "vm-c2"}])),
            ("europe-west1-b", json!([])),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("{}/zones/{}/instances", PROJECT_PATH, zone)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": instances})))
                .mount(&server)
                .await;
        }

        let collection =
            assert_ok!(collect_kind("instances", scopes, 0, Mode::Records, fast_backoff()).await);

        assert_eq!(collection.scopes().collect::<Vec<_>>(), vec!["us-east1"]);
        let records = collection.get("us-east1").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["vm-b", "vm-c1", "vm-c2"]);
    }

    #[tokio::test]
    async fn test_counts_mode() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/subnetworks", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "a"}, {"name": "b"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/regions/europe-west1/subnetworks", PROJECT_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "c"}]})),
            )
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("subnet", scopes, 1, Mode::Counts, fast_backoff()).await);

        assert_eq!(
            serde_json::to_value(&collection).unwrap(),
            json!({"europe-west1": 1, "us-east1": 2})
        );
    }

    #[tokio::test]
    async fn test_throttled_page_is_retried() {
        let server = MockServer::start().await;
        let scopes: Vec<_> = scopes(&server)
            .await
            .into_iter()
            .filter(|s| s.id == "us-east1")
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/forwardingRules", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Rate Limit Exceeded"}
            })))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/forwardingRules", PROJECT_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "fr-1"}]})),
            )
            .mount(&server)
            .await;

        let collection = assert_ok!(
            collect_kind("loadbalancer", scopes, 4, Mode::Records, fast_backoff()).await
        );

        assert_eq!(collection.total(), 1);
        let calls = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().ends_with("forwardingRules"))
            .count();
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_reason_on_403_is_retried() {
        let server = MockServer::start().await;
        let scopes: Vec<_> = scopes(&server)
            .await
            .into_iter()
            .filter(|s| s.id == "europe-west1")
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/europe-west1/addresses", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Quota exceeded",
                    "errors": [{"reason": "rateLimitExceeded"}]
                }
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/europe-west1/addresses", PROJECT_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "ip"}]})),
            )
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("address", scopes, 1, Mode::Records, fast_backoff()).await);
        assert_eq!(collection.total(), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_fails_the_run() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/addresses", PROJECT_PATH)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "ok"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/regions/europe-west1/addresses", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Permission denied",
                    "errors": [{"reason": "forbidden"}]
                }
            })))
            .mount(&server)
            .await;

        let err =
            assert_err!(collect_kind("address", scopes, 0, Mode::Records, fast_backoff()).await);

        assert_eq!(err.scope(), Some("europe-west1"));
        assert_eq!(err.api_error().and_then(ApiError::status), Some(403));
        assert!(err.to_string().contains("error while gathering europe-west1"));
    }

    #[tokio::test]
    async fn test_throttle_budget_ends_the_run() {
        let server = MockServer::start().await;
        let scopes: Vec<_> = scopes(&server)
            .await
            .into_iter()
            .filter(|s| s.id == "us-east1")
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("{}/regions/us-east1/addresses", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backoff = BackoffConfig::new(Duration::from_millis(10), Duration::from_secs(1))
            .max_wait(Some(Duration::from_millis(25)));
        let err = assert_err!(collect_kind("address", scopes, 1, Mode::Records, backoff).await);

        assert!(matches!(
            err,
            CollectError::Scope {
                source: ApiError::DeadlineExceeded(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_repeated_regions_are_listed_once() {
        let server = MockServer::start().await;
        mount_regions(&server).await;

        let wanted = ["europe-west1", "us-east1", "europe-west1"]
            .map(str::to_string)
            .to_vec();
        let source = RegionSource::with_regions(client(&server), wanted);
        let scopes = source.enumerate().await.unwrap();
        let ids: Vec<_> = scopes.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["europe-west1", "us-east1"]);
    }

    #[tokio::test]
    async fn test_sql_instances_filed_under_their_region() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/instances"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "orders-db", "region": "us-east1"},
                    {"name": "audit-db", "region": "europe-west1"},
                    {"name": "reports-db", "region": "us-east1"}
                ]
            })))
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("sql", scopes, 0, Mode::Records, fast_backoff()).await);

        let us = collection.get("us-east1").and_then(|e| e.records()).unwrap();
        let eu = collection.get("europe-west1").and_then(|e| e.records()).unwrap();
        assert_eq!(names(us), vec!["orders-db", "reports-db"]);
        assert_eq!(names(eu), vec!["audit-db"]);
    }

    #[tokio::test]
    async fn test_dns_zones_listed_once_under_global() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path("/dns/v1/projects/test-project/managedZones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "managedZones": [{"name": "example-com"}, {"name": "internal"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("dnszone", scopes, 0, Mode::Records, fast_backoff()).await);

        assert_eq!(collection.len(), 1);
        let records = collection.get("global").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["example-com", "internal"]);
    }

    #[tokio::test]
    async fn test_cdn_keeps_enabled_backends() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("{}/global/backendServices", PROJECT_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "static-assets", "enableCDN": true},
                    {"name": "api-backend", "enableCDN": false}
                ]
            })))
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("cdn", scopes, 0, Mode::Records, fast_backoff()).await);

        let records = collection.get("global").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["static-assets"]);
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let err = collect_kind(
            "buckets",
            Vec::<Scope<RegionClient>>::new(),
            1,
            Mode::Records,
            BackoffConfig::default(),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, CollectError::UnknownKind(kind) if kind == "buckets"));
    }
}

/// Azure collection against a mocked Resource Manager API
mod azure_tests {
    use super::*;
    use cloudinv::azure::auth::AzureCredentials;
    use cloudinv::azure::client::{AzureClient, SubscriptionClient};
    use cloudinv::azure::resources::collect_kind;
    use cloudinv::azure::subscriptions::SubscriptionSource;
    use cloudinv::http::AccessToken;

    fn client(server: &MockServer) -> AzureClient {
        AzureClient::with_token(
            Arc::new(StaticToken("arm-token".to_string())),
            HttpClient::new().unwrap(),
            &server.uri(),
        )
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig::new(Duration::from_millis(1), Duration::from_millis(10))
    }

    async fn mount_subscriptions(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .and(query_param("api-version", "2020-01-01"))
            .and(bearer_token("arm-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"subscriptionId": "sub-a", "displayName": "Production", "state": "Enabled"},
                    {"subscriptionId": "sub-b", "displayName": "Staging", "state": "Enabled"}
                ]
            })))
            .mount(server)
            .await;
    }

    async fn scopes(server: &MockServer) -> Vec<Scope<SubscriptionClient>> {
        mount_subscriptions(server).await;
        SubscriptionSource::new(client(server)).enumerate().await.unwrap()
    }

    #[tokio::test]
    async fn test_subscriptions_keyed_by_display_name() {
        let server = MockServer::start().await;

        let scopes = scopes(&server).await;
        let ids: Vec<_> = scopes.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["Production", "Staging"]);
        assert_eq!(scopes[1].client.subscription_id, "sub-b");
    }

    #[tokio::test]
    async fn test_shared_display_names_stay_apart() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"subscriptionId": "sub-a", "displayName": "Dev", "state": "Enabled"},
                    {"subscriptionId": "sub-b", "displayName": "Dev", "state": "Enabled"}
                ]
            })))
            .mount(&server)
            .await;

        let scopes = SubscriptionSource::new(client(&server)).enumerate().await.unwrap();
        let ids: Vec<_> = scopes.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["Dev (sub-a)", "Dev (sub-b)"]);
    }

    #[tokio::test]
    async fn test_next_link_is_followed() {
        let server = MockServer::start().await;
        let scopes: Vec<_> = scopes(&server)
            .await
            .into_iter()
            .filter(|s| s.id == "Production")
            .collect();
        let vm_path = "/subscriptions/sub-a/providers/Microsoft.Compute/virtualMachines";

        Mock::given(method("GET"))
            .and(path(vm_path))
            .and(query_param("$skiptoken", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "vm-3"}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(vm_path))
            .and(query_param("api-version", "2019-03-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "vm-1"}, {"name": "vm-2"}],
                "nextLink": format!(
                    "{}{}?api-version=2019-03-01&$skiptoken=abc",
                    server.uri(),
                    vm_path
                )
            })))
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("vm", scopes, 2, Mode::Records, fast_backoff()).await);

        let records = collection.get("Production").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["vm-1", "vm-2", "vm-3"]);
    }

    #[tokio::test]
    async fn test_child_listing_under_each_parent() {
        let server = MockServer::start().await;
        let scopes = scopes(&server).await;
        let server_id =
            "/subscriptions/sub-a/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-1";

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-a/providers/Microsoft.Sql/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": server_id, "name": "sql-1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/databases", server_id)))
            .and(query_param("api-version", "2021-11-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "master"}, {"name": "orders"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/sub-b/providers/Microsoft.Sql/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .mount(&server)
            .await;

        let collection =
            assert_ok!(collect_kind("sqldb", scopes, 0, Mode::Records, fast_backoff()).await);

        assert_eq!(collection.scopes().collect::<Vec<_>>(), vec!["Production"]);
        let records = collection.get("Production").and_then(|e| e.records()).unwrap();
        assert_eq!(names(records), vec!["master", "orders"]);
    }

    #[tokio::test]
    async fn test_serial_tail_stops_at_first_failure() {
        let server = MockServer::start().await;
        let client = client(&server);
        let source = SubscriptionSource::with_ids(
            client,
            vec!["s0".to_string(), "s1".to_string(), "s2".to_string()],
        );
        let scopes = source.enumerate().await.unwrap();

        Mock::given(method("GET"))
            .and(path("/subscriptions/s0/providers/Microsoft.Network/dnszones"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": [{"name": "z"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/s1/providers/Microsoft.Network/dnszones"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "SubscriptionNotFound", "message": "not found"}
            })))
            .mount(&server)
            .await;

        let err =
            assert_err!(collect_kind("dnszone", scopes, 1, Mode::Records, fast_backoff()).await);

        assert_eq!(err.scope(), Some("SubscriptionID 1 : s1"));
        let s2_calls = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().starts_with("/subscriptions/s2"))
            .count();
        assert_eq!(s2_calls, 0);
    }

    #[tokio::test]
    async fn test_client_credentials_token_is_cached() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=app-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "fresh-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new().unwrap();
        let credentials = AzureCredentials::new("tenant-1", "app-id", "secret", http)
            .with_authority(&server.uri());

        assert_eq!(credentials.token().await.unwrap(), "fresh-token");
        assert_eq!(credentials.token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_auth_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let http = HttpClient::new().unwrap();
        let credentials = AzureCredentials::new("tenant-1", "app-id", "wrong", http)
            .with_authority(&server.uri());

        let err = credentials.token().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
