//! # Faculty-Core
//!
//! Authentication and authorization core of the faculty administration
//! backend.
//!
//! This crate provides:
//! - Password hashing with Argon2id
//! - Stateless HS256 access tokens
//! - A per-request identity filter that turns a bearer token into a principal
//! - A route policy gating admin paths by role
//! - A SQLite user store and the REST API built on top of it
//!
//! ## Architecture
//!
//! Identity attachment and access decisions are separate steps. The
//! [`IdentityFilter`] never fails a request; it only attaches (or does not
//! attach) a [`Principal`]. The [`AccessPolicy`] gate then decides, so public
//! routes need no special casing.

pub mod error;
pub mod types;
pub mod config;
pub mod password;
pub mod jwt;
pub mod user_store;
pub mod auth;
pub mod filter;
pub mod policy;
pub mod validation;
pub mod api;

use std::sync::Arc;

pub use error::{AccessDenied, Error, Result, TokenError};
pub use types::{
    CreateUserRequest, Identity, NewIdentity, Role, UpdateUserRequest, UserFilter, UserSummary,
};
pub use auth::{AuthenticationService, LoginResponse};
pub use filter::{IdentityFilter, Principal, RequestContext};
pub use policy::AccessPolicy;
pub use user_store::{CredentialStore, MemoryUserStore, SqliteUserStore, UserStore};
pub use jwt::{TokenClaims, TokenCodec, TokenConfig};
pub use password::PasswordVerifier;
pub use config::AppConfig;
pub use api::ApiState;

/// Initialize the services against the configured SQLite database
pub async fn init(config: &AppConfig) -> Result<ApiState> {
    let store = Arc::new(SqliteUserStore::new(&config.database_url).await?);
    ApiState::new(store, config)
}
