use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use super::IdentityClaim;
use crate::error::AppError;

/// Fixed validity window of every session credential.
pub const SESSION_TTL_SECS: i64 = 2 * 60 * 60;

/// The one message a rejected credential produces, whatever the cause.
pub const INVALID_TOKEN: &str = "invalid or expired token";

/// Claims
///
/// The payload signed into a session credential.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's numeric id.
    pub sub: i64,
    /// Privileged flag: true for administrators.
    pub adm: bool,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: i64,
    /// Expiration Time (exp), always `iat + SESSION_TTL_SECS`.
    pub exp: i64,
}

/// TokenIssuer
///
/// Mints and verifies HS256 session credentials with the process-wide secret.
/// Verification is pure CPU work and never consults the store, so a credential stays
/// valid until it expires; there is no revocation list.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// issue
    ///
    /// Signs a credential for `subject_id`, valid for two hours from now.
    pub fn issue(&self, subject_id: i64, is_privileged: bool) -> Result<String, AppError> {
        self.issue_at(subject_id, is_privileged, Utc::now())
    }

    /// issue_at
    ///
    /// Same as `issue` with an explicit clock. Output is deterministic for a given
    /// secret and `now`.
    pub fn issue_at(
        &self,
        subject_id: i64,
        is_privileged: bool,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: subject_id,
            adm: is_privileged,
            iat,
            exp: iat + SESSION_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
    }

    /// verify
    ///
    /// Checks the signature and expiry of `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, AppError> {
        self.verify_at(token, Utc::now())
    }

    /// verify_at
    ///
    /// Decodes `token` and rejects it once `now >= exp`. Every failure (bad signature,
    /// malformed payload, expiry) produces the same `Unauthorized`; only the debug log
    /// tells them apart.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, AppError> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::InvalidSignature => {
                        tracing::debug!("session token rejected: signature mismatch");
                    }
                    kind => tracing::debug!(?kind, "session token rejected: malformed"),
                }
                return Err(AppError::Unauthorized(INVALID_TOKEN));
            }
        };

        if claims.exp <= claims.iat {
            tracing::debug!(sub = claims.sub, "session token rejected: exp not after iat");
            return Err(AppError::Unauthorized(INVALID_TOKEN));
        }

        if now.timestamp() >= claims.exp {
            tracing::debug!(sub = claims.sub, "session token rejected: expired");
            return Err(AppError::Unauthorized(INVALID_TOKEN));
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0);
        let expires_at = DateTime::from_timestamp(claims.exp, 0);
        match (issued_at, expires_at) {
            (Some(issued_at), Some(expires_at)) => Ok(IdentityClaim {
                subject_id: claims.sub,
                is_privileged: claims.adm,
                issued_at,
                expires_at,
            }),
            _ => {
                tracing::debug!(sub = claims.sub, "session token rejected: timestamp out of range");
                Err(AppError::Unauthorized(INVALID_TOKEN))
            }
        }
    }
}

