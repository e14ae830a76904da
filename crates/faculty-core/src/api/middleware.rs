//! Identity and access-gate middleware

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error};

use super::{ApiResponse, ApiState};
use crate::error::AccessDenied;
use crate::filter::RequestContext;
use crate::Error;

/// Attach a [`RequestContext`] to the request; never rejects
pub async fn attach_identity(State(state): State<ApiState>, mut request: Request, next: Next) -> Response {
    let context = state.identity_filter.authenticate(request.headers()).await;
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Reject requests the access policy does not allow
pub async fn access_gate(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let context = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    match state
        .policy
        .evaluate(request.method(), request.uri().path(), &context)
    {
        Ok(()) => next.run(request).await,
        Err(denied) => {
            debug!(
                method = %request.method(),
                path = request.uri().path(),
                "Request denied: {}",
                denied
            );
            denied.into_response()
        }
    }
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let status = match self {
            AccessDenied::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessDenied::Forbidden => StatusCode::FORBIDDEN,
        };
        let message = match self {
            AccessDenied::Unauthenticated => "Authentication required",
            AccessDenied::Forbidden => "You do not have permission to access this resource",
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::Token(_) | Error::IdentityInactiveOrMissing => {
                return AccessDenied::Unauthenticated.into_response();
            }
            Error::Access(denied) => return denied.into_response(),
            Error::UserNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::UserAlreadyExists(_) => (StatusCode::CONFLICT, self.to_string()),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Config(_) | Error::Store(_) | Error::PasswordHash(_) | Error::Internal(_) => {
                error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}
