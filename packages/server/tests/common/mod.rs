// Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use automation_core::kernel::jobs::testing::{
    InMemoryAuditWriter, InMemoryJobStore, StubAdapter, StubOutcome,
};
use automation_core::kernel::{Channel, Dispatcher, ProviderRegistry, RetryPolicy};
use automation_core::server::auth::JwtService;
use automation_core::server::{build_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "trigger-secret";

/// Production router wired to in-memory dependencies.
pub struct TestHarness {
    pub router: Router,
    pub store: Arc<InMemoryJobStore>,
    pub audit: Arc<InMemoryAuditWriter>,
    pub jwt: Arc<JwtService>,
}

pub struct HarnessBuilder {
    automation_secret: Option<String>,
    providers: ProviderRegistry,
    policy: RetryPolicy,
    batch_limit: i64,
}

impl HarnessBuilder {
    pub fn with_secret(mut self) -> Self {
        self.automation_secret = Some(TEST_SECRET.to_string());
        self
    }

    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(InMemoryJobStore::new());
        let audit = Arc::new(InMemoryAuditWriter::new());
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            self.providers,
            audit.clone(),
            self.policy,
            Duration::from_secs(5),
        ));
        let jwt = Arc::new(JwtService::new("test_secret", "automation".to_string()));

        let router = build_router(AppState {
            store: store.clone(),
            dispatcher,
            jwt_service: jwt.clone(),
            automation_secret: self.automation_secret,
            batch_limit: self.batch_limit,
        });

        TestHarness {
            router,
            store,
            audit,
            jwt,
        }
    }
}

impl TestHarness {
    /// Builder with both channels backed by always-succeeding stubs and no
    /// shared secret configured.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            automation_secret: None,
            providers: ProviderRegistry::new()
                .with_email(Arc::new(StubAdapter::new(Channel::Email, StubOutcome::Success)))
                .with_whatsapp(Arc::new(StubAdapter::new(
                    Channel::WhatsApp,
                    StubOutcome::Success,
                ))),
            policy: RetryPolicy::default(),
            batch_limit: 10,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn admin_token(&self) -> String {
        self.jwt
            .create_token(Uuid::new_v4(), "admin@example.com".to_string(), true)
            .expect("token creation")
    }

    pub fn user_token(&self) -> String {
        self.jwt
            .create_token(Uuid::new_v4(), "user@example.com".to_string(), false)
            .expect("token creation")
    }

    /// POST a JSON body with optional extra headers; returns status and the
    /// parsed JSON response (Null for empty bodies).
    pub async fn post_json(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request construction");

        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("request construction");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collection")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
