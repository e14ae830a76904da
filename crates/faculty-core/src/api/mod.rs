//! REST API for faculty-core
//!
//! Every request passes two layers before reaching a handler: the identity
//! layer attaches a [`RequestContext`](crate::filter::RequestContext), then
//! the access gate checks it against the [`AccessPolicy`].

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::AuthenticationService;
use crate::config::{AppConfig, CorsSettings};
use crate::filter::IdentityFilter;
use crate::jwt::TokenCodec;
use crate::password::PasswordVerifier;
use crate::policy::AccessPolicy;
use crate::user_store::UserStore;
use crate::Result;

pub mod handlers;
pub mod middleware;
pub mod security_headers;

/// Shared state handed to every handler and middleware
#[derive(Clone)]
pub struct ApiState {
    pub auth_service: Arc<AuthenticationService>,
    pub identity_filter: Arc<IdentityFilter>,
    pub policy: Arc<AccessPolicy>,
    pub users: Arc<dyn UserStore>,
}

impl ApiState {
    /// Wire the services around one store
    pub fn new<S>(store: Arc<S>, config: &AppConfig) -> Result<Self>
    where
        S: UserStore + 'static,
    {
        let tokens = Arc::new(TokenCodec::new(&config.jwt)?);
        let passwords = PasswordVerifier::new(&config.password)?;

        let auth_service = AuthenticationService::new(store.clone(), tokens.clone(), passwords)?;
        let identity_filter = IdentityFilter::new(tokens, store.clone());

        Ok(Self {
            auth_service: Arc::new(auth_service),
            identity_filter: Arc::new(identity_filter),
            policy: Arc::new(AccessPolicy::new(&config.policy)),
            users: store,
        })
    }
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("auth_service", &self.auth_service)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Response envelope used by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

/// Create the REST API router without CORS
pub fn create_router(state: ApiState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/health", get(handlers::health));

    let admin_routes = Router::new()
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/:id/toggle-status", put(handlers::toggle_user_status))
        .route("/roles", get(handlers::list_roles));

    // layers run bottom-up: identity first, then the gate
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .layer(from_fn_with_state(state.clone(), middleware::access_gate))
        .layer(from_fn_with_state(state.clone(), middleware::attach_identity))
        .layer(from_fn(security_headers::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router with the CORS policy for the browser frontend applied
pub fn create_router_with_cors(state: ApiState, cors: &CorsSettings) -> Router {
    create_router(state).layer(cors_layer(cors))
}

pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(settings.max_age_seconds))
}
