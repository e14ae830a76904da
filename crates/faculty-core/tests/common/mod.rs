//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use faculty_core::api::create_router;
use faculty_core::config::PasswordConfig;
use faculty_core::{
    ApiState, AppConfig, Identity, MemoryUserStore, NewIdentity, PasswordVerifier, Role, TokenConfig,
    UserStore,
};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub const ADMIN_PASSWORD: &str = "Admin#Pass2024";
pub const HEAD_PASSWORD: &str = "Head#Pass2024";
pub const LECTURER_PASSWORD: &str = "Lecturer#Pass2024";

/// Config with a fixed secret and cheap Argon2 parameters
pub fn test_config() -> AppConfig {
    AppConfig {
        jwt: TokenConfig {
            secret: SECRET.to_string(),
            ttl_seconds: 3600,
        },
        password: fast_password_config(),
        ..Default::default()
    }
}

pub fn fast_password_config() -> PasswordConfig {
    PasswordConfig {
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    }
}

pub async fn seed_user(
    store: &dyn UserStore,
    username: &str,
    password: &str,
    role: Role,
) -> Identity {
    let passwords = PasswordVerifier::new(&fast_password_config()).unwrap();
    store
        .create_user(NewIdentity {
            username: username.to_string(),
            password_hash: passwords.hash(password).unwrap(),
            email: format!("{}@faculty.test", username),
            phone: None,
            full_name: format!("{} (test)", username),
            role,
            active: true,
        })
        .await
        .unwrap()
}

pub struct TestApp {
    pub state: ApiState,
    pub store: Arc<MemoryUserStore>,
    pub router: Router,
}

/// App over an in-memory store holding `admin`, `truongkhoa` and `giangvien`
pub async fn test_app() -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    seed_user(store.as_ref(), "admin", ADMIN_PASSWORD, Role::Admin).await;
    seed_user(store.as_ref(), "truongkhoa", HEAD_PASSWORD, Role::DepartmentHead).await;
    seed_user(store.as_ref(), "giangvien", LECTURER_PASSWORD, Role::Lecturer).await;

    let state = ApiState::new(store.clone(), &test_config()).unwrap();
    let router = create_router(state.clone());
    TestApp { state, store, router }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "username": username, "password": password });
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in and return the access token
    pub async fn token_for(&self, username: &str, password: &str) -> String {
        let (status, body) = self.login(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token).await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: impl Into<Body>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(body.into()).unwrap()).await
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}
