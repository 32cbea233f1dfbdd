use axum::{extract::Request, middleware::Next, response::Response};
use eqms_core::error::AppError;

use crate::services::SessionClaims;

/// Role allow-list guard. Admits the request iff the authenticated
/// identity's role set intersects `allowed`; matching is case-sensitive
/// against the role names carried in the token, so a role revoked after
/// issuance stays effective until expiry or refresh.
///
/// Used as `from_fn(|req, next| authorize_roles(req, next, &["ADMIN"]))`.
pub async fn authorize_roles(
    req: Request,
    next: Next,
    allowed: &'static [&'static str],
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<SessionClaims>()
        .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

    if claims.roles.iter().any(|r| allowed.contains(&r.as_str())) {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Forbidden(
            "Access denied: insufficient permissions".to_string(),
        ))
    }
}
