//! Authentication service
//!
//! Checks credentials against the store, issues access tokens and records
//! the last login. Every credential failure collapses into
//! [`Error::InvalidCredentials`] so callers cannot probe which usernames
//! exist.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::filter::{Principal, RequestContext};
use crate::jwt::TokenCodec;
use crate::password::PasswordVerifier;
use crate::types::Identity;
use crate::user_store::CredentialStore;
use crate::{Error, Result};

pub const TOKEN_TYPE: &str = "Bearer";

// Hashed once at start-up; unknown usernames are checked against it so that
// they cost the same Argon2 work as a wrong password.
const DECOY_PASSWORD: &str = "decoy-password-never-assigned";

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role_name: String,
    pub role_description: Option<String>,
}

impl LoginResponse {
    fn new(access_token: String, identity: &Identity) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            user_id: identity.id,
            username: identity.username.clone(),
            full_name: identity.full_name.clone(),
            email: identity.email.clone(),
            role_name: identity.role.name().to_string(),
            role_description: identity.role_description.clone(),
        }
    }
}

/// Authentication service
pub struct AuthenticationService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenCodec>,
    passwords: PasswordVerifier,
    decoy_hash: String,
}

impl AuthenticationService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenCodec>,
        passwords: PasswordVerifier,
    ) -> Result<Self> {
        let decoy_hash = passwords.hash(DECOY_PASSWORD)?;
        Ok(Self {
            store,
            tokens,
            passwords,
            decoy_hash,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    pub fn passwords(&self) -> &PasswordVerifier {
        &self.passwords
    }

    /// Verify credentials and issue an access token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let candidate = self.store.find_by_username(username).await?;

        let stored_hash = candidate
            .as_ref()
            .map(|identity| identity.password_hash.clone())
            .unwrap_or_else(|| self.decoy_hash.clone());
        let matched = self
            .passwords
            .verify_blocking(password.to_string(), stored_hash)
            .await;

        let identity = match candidate {
            Some(identity) if matched && identity.active => identity,
            Some(identity) if matched => {
                warn!(user_id = identity.id, "Login rejected for disabled account {}", username);
                return Err(Error::InvalidCredentials);
            }
            Some(_) | None => {
                warn!("Login failed for {}: bad username or password", username);
                return Err(Error::InvalidCredentials);
            }
        };

        let now = Utc::now();
        let token = self.tokens.issue_at(&identity.username, now)?;
        self.store.record_login(identity.id, now).await?;

        info!(user_id = identity.id, role = %identity.role, "Login successful for {}", identity.username);
        Ok(LoginResponse::new(token, &identity))
    }

    /// Drop the principal from the request context.
    ///
    /// Tokens are not tracked server side, so the token itself stays valid
    /// until it expires; the client is expected to discard it.
    pub fn logout(&self, context: &mut RequestContext) {
        match context.clear() {
            Some(principal) => info!("User {} logged out", principal.username),
            None => info!("Logout without an authenticated principal"),
        }
    }

    /// Fresh account data for the principal attached to a request
    pub async fn current_user(&self, principal: &Principal) -> Result<Identity> {
        match self.store.find_by_username(&principal.username).await? {
            Some(identity) if identity.active => Ok(identity),
            _ => Err(Error::IdentityInactiveOrMissing),
        }
    }
}

impl std::fmt::Debug for AuthenticationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
