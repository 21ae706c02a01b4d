//! Bearer-token identity resolution.
//!
//! Tokens are opaque random strings handed out by `docsum-admin create-user`. Only their
//! SHA-256 digest is stored. Handlers receive the resolved [`CurrentUser`] as an explicit
//! extractor argument.

use crate::processing::DocumentApi;
use crate::store::User;
use axum::{
    Json, async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Hex-encoded SHA-256 digest of a bearer token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fresh random bearer token (256 bits, hex).
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Authenticated user resolved from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reasons a request could not be tied to a user.
#[derive(Debug)]
pub enum AuthError {
    /// No bearer token was supplied.
    MissingToken,
    /// Token did not match any user.
    InvalidToken,
    /// Identity lookup failed.
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication credentials were not provided.",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid token.",
            ),
            AuthError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Identity lookup failed.",
            ),
        };
        (
            status,
            Json(json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<Arc<S>> for CurrentUser
where
    S: DocumentApi + 'static,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<S>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        match state.authenticate(token).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(AuthError::InvalidToken),
            Err(error) => {
                tracing::error!(error = %error, "Token lookup failed");
                Err(AuthError::Unavailable)
            }
        }
    }
}
