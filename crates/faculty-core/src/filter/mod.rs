//! Per-request identity establishment
//!
//! [`IdentityFilter`] turns the `Authorization` header into a
//! [`RequestContext`]. It never rejects a request: a missing, broken,
//! expired or stale token just yields an anonymous context, and the
//! [`AccessPolicy`](crate::policy::AccessPolicy) gate decides what an
//! anonymous caller may reach.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::jwt::TokenCodec;
use crate::types::Role;
use crate::user_store::CredentialStore;
use crate::{Error, Result};

const BEARER_PREFIX: &str = "Bearer ";

/// Who is making the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn authority(&self) -> &'static str {
        self.role.authority()
    }
}

/// Request-scoped authentication state, created fresh for every request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Remove and return the principal
    pub fn clear(&mut self) -> Option<Principal> {
        self.principal.take()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the bearer token of a request into a principal
pub struct IdentityFilter {
    tokens: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
}

impl IdentityFilter {
    pub fn new(tokens: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Self {
        Self { tokens, store }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> RequestContext {
        self.authenticate_at(headers, Utc::now()).await
    }

    /// Build the context for a request as of `now`
    pub async fn authenticate_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> RequestContext {
        let Some(token) = extract_bearer_token(headers) else {
            return RequestContext::anonymous();
        };

        match self.resolve(token, now).await {
            Ok(principal) => {
                debug!("Authenticated {} as {}", principal.username, principal.authority());
                RequestContext::authenticated(principal)
            }
            Err(Error::Token(reason)) => {
                debug!("Ignoring bearer token: {}", reason);
                RequestContext::anonymous()
            }
            Err(Error::IdentityInactiveOrMissing) => {
                debug!("Ignoring bearer token: subject is inactive or gone");
                RequestContext::anonymous()
            }
            Err(e) => {
                error!("Could not resolve request identity: {}", e);
                RequestContext::anonymous()
            }
        }
    }

    async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Principal> {
        let claims = self.tokens.verify_at(token, now)?;

        match self.store.find_by_username(&claims.sub).await? {
            Some(identity) if identity.active => Ok(Principal {
                username: identity.username,
                role: identity.role,
            }),
            _ => Err(Error::IdentityInactiveOrMissing),
        }
    }
}

impl std::fmt::Debug for IdentityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityFilter")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
