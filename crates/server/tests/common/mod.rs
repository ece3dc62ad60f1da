//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock upstreams injected, so the whole launch pipeline can be driven
//! through the HTTP API without external infrastructure.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use launchpro_core::{
    audit::{create_audit_system, AuditStore, SqliteAuditStore},
    campaign::{Platform, SqliteCampaignStore},
    config::{ApiKeyEntry, AuthConfig},
    create_authenticator, load_config_from_str,
    platform::PlatformRegistry,
    stoploss::SqliteViolationStore,
    testing::{
        MockAlertNotifier, MockArticleSubmitter, MockCreativeGenerator, MockPerformanceSource,
        MockPlatformLauncher, ScriptedTrackingSource,
    },
    AuthMethod, Authenticator,
};
use launchpro_server::state::{AppState, Collaborators, LaunchServices};

/// Tracking link handed out by the scripted tracking source.
pub const TRACKING_LINK: &str = "https://trk.example.com/c/abc";

/// Key of the admin operator when API key auth is enabled.
pub const ADMIN_KEY: &str = "admin-key";
/// Key of `manager-1` when API key auth is enabled.
pub const MANAGER_KEY: &str = "manager-1-key";
/// Key of `manager-2` when API key auth is enabled.
pub const OTHER_MANAGER_KEY: &str = "manager-2-key";

/// Test fixture for E2E testing with mock upstreams.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Article submission (MockArticleSubmitter)
/// - Tracking-link status (ScriptedTrackingSource)
/// - Creative generation (MockCreativeGenerator)
/// - Meta and TikTok launchers (MockPlatformLauncher)
/// - Spend/revenue reporting and alert delivery
pub struct TestFixture {
    pub router: Router,
    pub state: Arc<AppState>,
    pub campaigns: Arc<SqliteCampaignStore>,
    pub articles: Arc<MockArticleSubmitter>,
    pub tracking: Arc<ScriptedTrackingSource>,
    pub creatives: Arc<MockCreativeGenerator>,
    pub meta: Arc<MockPlatformLauncher>,
    pub tiktok: Arc<MockPlatformLauncher>,
    pub performance: Arc<MockPerformanceSource>,
    pub alerts: Arc<MockAlertNotifier>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with auth disabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = load_config_from_str(
            r#"
[auth]
method = "none"

[scheduler]
enabled = false
"#,
        )
        .expect("Failed to parse test config");
        config.database.path = db_path.clone();
        if test_config.api_keys {
            config.auth = AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(ADMIN_KEY.to_string()),
                keys: vec![
                    ApiKeyEntry {
                        key: MANAGER_KEY.to_string(),
                        user_id: "manager-1".to_string(),
                        admin: false,
                    },
                    ApiKeyEntry {
                        key: OTHER_MANAGER_KEY.to_string(),
                        user_id: "manager-2".to_string(),
                        admin: false,
                    },
                ],
            };
        }

        let articles = Arc::new(MockArticleSubmitter::new());
        let tracking = Arc::new(ScriptedTrackingSource::new());
        let creatives = Arc::new(MockCreativeGenerator::new());
        let meta = Arc::new(MockPlatformLauncher::new(Platform::Meta));
        let tiktok = Arc::new(MockPlatformLauncher::new(Platform::Tiktok));
        let performance = Arc::new(MockPerformanceSource::new());
        let alerts = Arc::new(MockAlertNotifier::new());

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );
        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let campaigns = Arc::new(
            SqliteCampaignStore::new(&db_path).expect("Failed to create campaign store"),
        );
        let violations = Arc::new(
            SqliteViolationStore::new(&db_path).expect("Failed to create violation store"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let services = LaunchServices::new(
            &config,
            campaigns.clone(),
            violations.clone(),
            Collaborators {
                articles: articles.clone(),
                tracking: tracking.clone(),
                creatives: creatives.clone(),
                platforms: PlatformRegistry::new()
                    .with(meta.clone())
                    .with(tiktok.clone()),
                performance: performance.clone(),
                notifier: alerts.clone(),
            },
            Some(audit_handle.clone()),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            audit_handle,
            audit_store,
            campaigns.clone(),
            violations,
            services,
        ));

        let router = launchpro_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            campaigns,
            articles,
            tracking,
            creatives,
            meta,
            tiktok,
            performance,
            alerts,
            temp_dir,
        }
    }

    /// Script the tracking source to hand out a link on the first query.
    pub async fn tracking_link_ready(&self) {
        self.tracking
            .push_status("active", Some(TRACKING_LINK))
            .await;
    }

    /// Create a campaign through the API and return its id.
    pub async fn create_campaign(&self, name: &str, queue_order: Option<i64>) -> String {
        let response = self.post("/api/v1/campaigns", campaign_body(name, queue_order)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"]
            .as_str()
            .expect("campaign id")
            .to_string()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, None).await
    }

    /// Send a GET request authenticated with `api_key`.
    pub async fn get_as(&self, path: &str, api_key: &str) -> TestResponse {
        self.request("GET", path, None, Some(api_key)).await
    }

    /// Send a POST request authenticated with `api_key`.
    pub async fn post_as(&self, path: &str, body: Option<Value>, api_key: &str) -> TestResponse {
        self.request("POST", path, body, Some(api_key)).await
    }

    /// Send a request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        api_key: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Use API key auth with an admin key and two manager keys.
    pub api_keys: bool,
}

impl TestConfig {
    pub fn with_api_keys() -> Self {
        Self { api_keys: true }
    }
}

/// JSON body for creating a campaign with a Meta and a TikTok target.
pub fn campaign_body(name: &str, queue_order: Option<i64>) -> Value {
    json!({
        "name": name,
        "queue_order": queue_order,
        "offer": {
            "offer_id": "offer-1",
            "name": "Summer Savings",
            "landing_url": "https://offers.example.com/summer",
            "country": "US"
        },
        "platforms": [
            { "platform": "meta", "account_id": "act_1", "daily_budget": 50.0 },
            { "platform": "tiktok", "account_id": "adv_1", "budget_mode": "abo", "daily_budget": 30.0 }
        ]
    })
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
