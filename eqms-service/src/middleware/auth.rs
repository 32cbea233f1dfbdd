use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use eqms_core::error::AppError;

use crate::services::{SessionClaims, TokenService};

/// Middleware requiring a valid session token.
///
/// A missing or malformed `Authorization` header is 401; a header that
/// is present but carries an invalid or expired token is 403. No
/// database read happens here - authentication is stateless after
/// issuance.
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = token.ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

    let claims = tokens
        .verify_session(token)
        .map_err(|_| AppError::InvalidToken("Invalid or expired token".to_string()))?;

    // Downstream guards and handlers read the claims from extensions
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated identity's claims.
pub struct CurrentUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<SessionClaims>()
            .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

        Ok(CurrentUser(claims.clone()))
    }
}
