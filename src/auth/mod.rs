//! Access control: session credentials, the verifier and role gate middleware, and
//! password hashing for the login flow.
//!
//! Request pipeline for protected routes:
//! `require_session` (verify cookie, attach `IdentityClaim`) → `require_admin`
//! (admin routes only) → handler (extracts the `IdentityClaim`).

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Utc};

use crate::error::AppError;

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_admin, require_role, require_session};
pub use token::{Claims, INVALID_TOKEN, SESSION_TTL_SECS, TokenIssuer};

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "access_token";

/// IdentityClaim
///
/// The trusted identity decoded from a valid credential. Rebuilt on every request by
/// the session verifier and handed to handlers as an immutable value; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityClaim {
    pub subject_id: i64,
    pub is_privileged: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// IdentityClaim Extractor
///
/// Reads the claim the session verifier stored in the request extensions. Handlers on
/// a route without the verifier layer get a 401 instead of an identity.
impl<S> FromRequestParts<S> for IdentityClaim
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityClaim>()
            .cloned()
            .ok_or(AppError::Unauthorized("authentication required"))
    }
}

/// session_token
///
/// Finds the session credential among the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// `Set-Cookie` value installing a freshly issued credential.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={SESSION_TTL_SECS}"
    )
}

/// `Set-Cookie` value that makes the browser drop the credential.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0")
}
