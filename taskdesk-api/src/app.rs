/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_api::{app::{build_router, AppState}, config::Config};
/// use taskdesk_shared::store::postgres::PgIdentityStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgIdentityStore::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskdesk_shared::{
    identity::user_manager::UserManager, registration::RegisterPipeline,
    store::IdentityStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Account store
    pub store: Arc<dyn IdentityStore>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Password policy and account operations
    pub users: UserManager,

    /// Company registration
    pub registration: RegisterPipeline,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn IdentityStore>, config: Config) -> Self {
        let users = UserManager::default();
        let registration = RegisterPipeline::with_user_manager(store.clone(), users.clone());

        Self {
            store,
            config: Arc::new(config),
            users,
            registration,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /account/
/// │   ├── POST /login
/// │   ├── POST /logout
/// │   ├── GET  /profile                  (session)
/// │   ├── POST /change-password          (session)
/// │   ├── POST /register
/// │   ├── GET  /check-email
/// │   └── POST /register/steps/{email,password,company}
/// └── /analytics/
///     ├── GET /clarity
///     └── GET /settings                  (session)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let session_layer = axum::middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::session::require_session,
    );

    let account_routes = Router::new()
        .route("/profile", get(routes::account::profile))
        .route("/change-password", post(routes::account::change_password))
        .route_layer(session_layer.clone())
        .route("/login", post(routes::account::login))
        .route("/logout", post(routes::account::logout))
        .route("/register", post(routes::registration::register))
        .route("/check-email", get(routes::registration::check_email))
        .route(
            "/register/steps/email",
            post(routes::registration::validate_email_step),
        )
        .route(
            "/register/steps/password",
            post(routes::registration::validate_password_step),
        )
        .route(
            "/register/steps/company",
            post(routes::registration::validate_company_step),
        );

    let analytics_routes = Router::new()
        .route("/settings", get(routes::analytics::settings))
        .route_layer(session_layer)
        .route("/clarity", get(routes::analytics::clarity_snippet));

    let cors = build_cors(&state.config);
    let security = SecurityHeadersLayer::new(
        state.config.api.production,
        state.config.analytics.clarity_active(),
    );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/account", account_routes)
        .nest("/analytics", analytics_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(security)
        .with_state(state)
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins = &config.api.cors_origins;

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Session cookies need credentialed requests
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
