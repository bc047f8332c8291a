use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{IdentityClaim, TokenIssuer, session_token};
use crate::error::AppError;

/// require_session
///
/// Session verifier. Rejects the request with 401 when the `access_token` cookie is
/// missing or fails verification; otherwise stores the decoded `IdentityClaim` in the
/// request extensions for the layers and handlers below. No store access.
pub async fn require_session(
    State(tokens): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claim = {
        let token = session_token(request.headers())
            .ok_or(AppError::Unauthorized("missing session token"))?;
        tokens.verify(token)?
    };

    request.extensions_mut().insert(claim);
    Ok(next.run(request).await)
}

/// require_role
///
/// The role gate predicate. Only a `required` privilege can fail, and only for a
/// non-privileged claim.
pub fn require_role(claim: &IdentityClaim, required: bool) -> Result<(), AppError> {
    if required && !claim.is_privileged {
        return Err(AppError::Forbidden("admin privileges required"));
    }
    Ok(())
}

/// require_admin
///
/// Role gate middleware for the `/admin` router. It extracts the claim attached by
/// `require_session`, so it must be layered inside it; if the verifier did not run the
/// extractor answers 401 before the gate is consulted.
pub async fn require_admin(
    claim: IdentityClaim,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&claim, true)?;
    Ok(next.run(request).await)
}
