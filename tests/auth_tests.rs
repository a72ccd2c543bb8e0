//! Authentication Tests
//!
//! Credential strategies wired through the client: header attachment per auth
//! mode, the OAuth2 token endpoint, token caching under concurrency and
//! authenticator invalidation.
//!
//! Run: cargo nextest run --test auth_tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use petstore_client::auth::{ClientCredentialsFetcher, CredentialSource};
use petstore_client::{
    AuthMode, AuthStrategy, Client, ClientConfig, ClientConfigBuilder, Error, ErrorKind,
    OAuth2Settings, OAuth2Strategy, RequestContext, StrategyKind,
};
use reqwest::header::HeaderName;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(server: &MockServer) -> ClientConfigBuilder {
    init_tracing();
    ClientConfig::builder()
        .base_url(format!("{}/v2", server.uri()))
        .retry_interval(Duration::from_millis(5))
}

fn oauth2_settings(server: &MockServer) -> OAuth2Settings {
    OAuth2Settings::new("petstore-client", "petstore-secret")
        .with_token_url(format!("{}/oauth/token", server.uri()))
}

async fn mount_pet(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/pet/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=petstore-client"))
        .and(body_string_contains("client_secret=petstore-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn last_request_header(server: &MockServer, name: &str) -> Option<String> {
    let requests = server.received_requests().await.unwrap_or_default();
    requests
        .iter()
        .rev()
        .find(|r| r.url.path().starts_with("/v2/"))
        .and_then(|r| r.headers.get(name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// =============================================================================
// Auth modes
// =============================================================================

mod mode_tests {
    use super::*;

    #[tokio::test]
    async fn test_none_mode_sends_no_credentials() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let client = Client::new(config(&server).api_key("special-key").build().unwrap()).unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert_eq!(client.authenticator().unwrap().kind(), StrategyKind::None);
        assert_eq!(last_request_header(&server, "api_key").await, None);
        assert_eq!(last_request_header(&server, "authorization").await, None);
    }

    #[tokio::test]
    async fn test_api_key_mode_sends_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("api_key", "special-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server)
            .auth_mode(AuthMode::ApiKey)
            .api_key("special-key")
            .build()
            .unwrap();
        Client::new(config).unwrap().get("pet/1", &[]).await.unwrap();

        assert_eq!(last_request_header(&server, "authorization").await, None);
    }

    #[tokio::test]
    async fn test_api_key_mode_without_key_downgrades_to_none() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let client = Client::new(config(&server).auth_mode(AuthMode::ApiKey).build().unwrap())
            .unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert_eq!(client.authenticator().unwrap().kind(), StrategyKind::None);
        assert_eq!(last_request_header(&server, "api_key").await, None);
    }

    #[tokio::test]
    async fn test_both_mode_sends_both_credentials() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("api_key", "special-key"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server)
            .auth_mode(AuthMode::Both)
            .api_key("special-key")
            .oauth2(oauth2_settings(&server))
            .build()
            .unwrap();
        let client = Client::new(config).unwrap();
        client.get("pet/1", &[]).await.unwrap();

        let strategy = client.authenticator().unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Composite);
        assert!(strategy.describe().contains("token valid"));
        assert!(!strategy.describe().contains("special-key"));
        assert!(!strategy.describe().contains("petstore-secret"));
    }

    #[tokio::test]
    async fn test_both_mode_with_only_api_key() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;
        mount_pet(&server).await;

        let config = config(&server)
            .auth_mode(AuthMode::Both)
            .api_key("special-key")
            .build()
            .unwrap();
        Client::new(config).unwrap().get("pet/1", &[]).await.unwrap();

        assert_eq!(
            last_request_header(&server, "api_key").await.as_deref(),
            Some("special-key")
        );
        assert_eq!(last_request_header(&server, "authorization").await, None);
    }

    #[tokio::test]
    async fn test_both_mode_without_credentials_sends_nothing() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let client = Client::new(config(&server).auth_mode(AuthMode::Both).build().unwrap())
            .unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert!(!client.authenticator().unwrap().is_configured());
        assert_eq!(last_request_header(&server, "api_key").await, None);
        assert_eq!(last_request_header(&server, "authorization").await, None);
    }

    #[test]
    fn test_invalid_mode_is_configuration_error() {
        let err = ClientConfig::builder()
            .auth_mode_name("basic")
            .build()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.message(),
            "Invalid auth_mode: 'basic'. Must be one of: none, api_key, oauth2, both"
        );
    }

    #[test]
    fn test_malformed_api_key_fails_before_any_request() {
        let config = ClientConfig::builder()
            .auth_mode(AuthMode::ApiKey)
            .api_key(" special-key ")
            .build()
            .unwrap();

        let err = Client::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

// =============================================================================
// OAuth2
// =============================================================================

mod oauth2_tests {
    use super::*;

    fn oauth2_client(server: &MockServer) -> Client {
        let config = config(server)
            .auth_mode(AuthMode::OAuth2)
            .oauth2(oauth2_settings(server))
            .build()
            .unwrap();
        Client::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_fetched_once_and_reused() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = oauth2_client(&server);
        client.get("pet/1", &[]).await.unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert_eq!(last_request_header(&server, "api_key").await, None);
    }

    #[tokio::test]
    async fn test_scope_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("scope=read%3Apets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "scoped"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("authorization", "Bearer scoped"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server)
            .auth_mode(AuthMode::OAuth2)
            .oauth2(oauth2_settings(&server).with_scope("read:pets"))
            .build()
            .unwrap();
        Client::new(config).unwrap().get("pet/1", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_endpoint_rejection_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "Client authentication failed"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = oauth2_client(&server).get("pet/1", &[]).await.unwrap_err();

        assert!(matches!(err, Error::Authentication { .. }));
        assert_eq!(
            err.message(),
            "OAuth2 token fetch failed: invalid_client: Client authentication failed"
        );
    }

    #[tokio::test]
    async fn test_token_endpoint_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server)
            .await;

        let err = oauth2_client(&server).get("pet/1", &[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.message().starts_with("OAuth2 token fetch failed:"));
        assert!(err.message().contains("503"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_token_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok-123", "expires_in": 3600}))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(16)
            .mount(&server)
            .await;

        let client = oauth2_client(&server);
        let requests = (0..16).map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get("pet/1", &[]).await })
        });

        for result in futures::future::join_all(requests).await {
            result.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "forever"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/pet/1"))
            .and(header("authorization", "Bearer forever"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let client = oauth2_client(&server);
        for _ in 0..3 {
            client.get("pet/1", &[]).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_short_lived_token_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "brief", "expires_in": 30})),
            )
            .expect(2)
            .mount(&server)
            .await;
        mount_pet(&server).await;

        let client = oauth2_client(&server);
        client.get("pet/1", &[]).await.unwrap();
        client.get("pet/1", &[]).await.unwrap();
    }
    #[tokio::test]
    async fn test_hanging_token_endpoint_releases_refresh_lock() {
        let server = MockServer::start().await;
        mount_pet(&server).await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "late", "token_type": "bearer"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = ClientCredentialsFetcher::with_timeouts(
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .unwrap();
        let strategy = OAuth2Strategy::new(&oauth2_settings(&server))
            .unwrap()
            .with_fetcher(Arc::new(fetcher));
        let client = Client::builder()
            .config(config(&server).build().unwrap())
            .auth_strategy(Arc::new(strategy))
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        for _ in 0..2 {
            let err = client.get("pet/1", &[]).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication);
        }
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}

// =============================================================================
// Interceptor and cache invalidation
// =============================================================================

mod pipeline_tests {
    use super::*;

    /// Claims to be unconfigured but writes a header if applied anyway.
    #[derive(Debug, Default)]
    struct UnconfiguredButEager {
        applied: AtomicUsize,
    }

    #[async_trait]
    impl AuthStrategy for UnconfiguredButEager {
        async fn apply(&self, ctx: &mut RequestContext) -> petstore_client::Result<()> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            ctx.set_header(HeaderName::from_static("x-leaked"), "1")
        }

        fn is_configured(&self) -> bool {
            false
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::None
        }

        fn describe(&self) -> String {
            "UnconfiguredButEager".into()
        }
    }

    #[tokio::test]
    async fn test_interceptor_skips_unconfigured_strategy() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let strategy = Arc::new(UnconfiguredButEager::default());
        let client = Client::builder()
            .config(config(&server).build().unwrap())
            .auth_strategy(strategy.clone())
            .build()
            .unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert_eq!(strategy.applied.load(Ordering::SeqCst), 0);
        assert_eq!(last_request_header(&server, "x-leaked").await, None);
    }

    #[tokio::test]
    async fn test_reconfigure_switches_credentials() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let client = Client::new(config(&server).build().unwrap()).unwrap();
        client.get("pet/1", &[]).await.unwrap();
        assert_eq!(last_request_header(&server, "api_key").await, None);

        client
            .reconfigure(|config| {
                config.auth.mode = AuthMode::ApiKey;
                config.auth.api_key = Some(CredentialSource::value("special-key"));
            })
            .unwrap();
        client.get("pet/1", &[]).await.unwrap();

        assert_eq!(
            last_request_header(&server, "api_key").await.as_deref(),
            Some("special-key")
        );
    }

    #[tokio::test]
    async fn test_reconfigure_applies_timeout_to_token_requests() {
        let server = MockServer::start().await;
        mount_pet(&server).await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "slow-token", "token_type": "bearer"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = Client::new(
            config(&server)
                .auth_mode(AuthMode::OAuth2)
                .oauth2(oauth2_settings(&server))
                .build()
                .unwrap(),
        )
        .unwrap();
        client
            .reconfigure(|config| config.timeout = Duration::from_millis(300))
            .unwrap();

        let started = std::time::Instant::now();
        let err = client.get("pet/1", &[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.message().starts_with("OAuth2 token fetch failed: "));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_authenticator_memoized_until_reset() {
        let server = MockServer::start().await;
        mount_pet(&server).await;

        let client = Client::new(
            config(&server)
                .auth_mode(AuthMode::ApiKey)
                .api_key("special-key")
                .build()
                .unwrap(),
        )
        .unwrap();
        let before = client.authenticator().unwrap();
        client.get("pet/1", &[]).await.unwrap();
        assert!(Arc::ptr_eq(&before, &client.authenticator().unwrap()));

        client.reset_authenticator();
        client.reset_connection();
        client.get("pet/1", &[]).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &client.authenticator().unwrap()));
    }
}
