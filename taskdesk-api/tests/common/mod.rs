//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory account store, so the tests
//! run without a database. Provides helpers for JSON requests and for
//! carrying the session cookie between requests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskdesk_api::analytics::{AnalyticsOptions, ClarityOptions};
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::{ApiConfig, Config, DatabaseConfig, SessionConfig};
use taskdesk_shared::identity::user_manager::{NewUser, UserManager};
use taskdesk_shared::models::user::User;
use taskdesk_shared::store::memory::{FaultPlan, MemoryIdentityStore};
use taskdesk_shared::store::{IdentityStore, StoreTransaction};
use tower::Service as _;

pub const COOKIE_NAME: &str = "taskdesk_session";
pub const PASSWORD: &str = "Str0ng!Pass";

/// Test context containing the router and its store
pub struct TestContext {
    pub store: MemoryIdentityStore,
    pub app: Router,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_store(MemoryIdentityStore::new(), test_config())
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self::with_store(MemoryIdentityStore::with_faults(faults), test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_store(MemoryIdentityStore::new(), config)
    }

    fn with_store(store: MemoryIdentityStore, config: Config) -> Self {
        let state = AppState::new(Arc::new(store.clone()), config.clone());
        let app = build_router(state);

        Self { store, app, config }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// POSTs a JSON body, optionally with a session cookie
    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// GETs a path, optionally with a session cookie
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Registers a company through the API and returns the session cookie
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .post_json("/account/register", registration_body(email), None)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        session_cookie(&response).expect("registration should sign the user in")
    }

    /// Inserts a user directly with its own username
    pub async fn seed_user(&self, username: &str, email: &str) -> User {
        let mut tx = self.store.begin().await.unwrap();
        let user = UserManager::default()
            .create(
                tx.as_mut(),
                NewUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    full_name: Some("Seeded User".to_string()),
                    company_id: None,
                    email_confirmed: true,
                },
                PASSWORD,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        user
    }
}

/// Configuration used by every test router
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec![],
            landing_path: "/".to_string(),
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        session: SessionConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            cookie_name: COOKIE_NAME.to_string(),
            lifetime_hours: 336,
            cookie_secure: false,
        },
        analytics: AnalyticsOptions {
            clarity: ClarityOptions {
                project_id: Some("abc123".to_string()),
                enabled: true,
            },
        },
    }
}

pub fn registration_body(email: &str) -> Value {
    serde_json::json!({
        "email": email,
        "password": PASSWORD,
        "confirm_password": PASSWORD,
        "company_name": "Acme",
        "description": "Widgets",
        "phone": "+1 555 0100",
        "full_name": "Olivia Owner"
    })
}

/// The full `Set-Cookie` header for the session cookie, if any
pub fn session_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", COOKIE_NAME)))
        .map(str::to_string)
}

/// The `name=value` pair of the session cookie, ready for a `Cookie` header
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    session_set_cookie(response)
        .and_then(|value| value.split(';').next().map(str::to_string))
        .filter(|pair| pair.len() > COOKIE_NAME.len() + 1)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}
