//! Dual-scheme authentication: regular sessions and time-boxed auditor
//! tokens share one entry point, dispatched by a typed scheme rather
//! than header prefix matching.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use eqms_core::error::AppError;
use std::str::FromStr;
use std::sync::Arc;

use crate::services::{AuditorClaims, SessionClaims, TokenService};

/// Authorization schemes the dispatcher understands. Parsing is
/// case-sensitive: `Bearer` and `AuditorToken` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    AuditorToken,
}

impl FromStr for AuthScheme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bearer" => Ok(AuthScheme::Bearer),
            "AuditorToken" => Ok(AuthScheme::AuditorToken),
            _ => Err(()),
        }
    }
}

/// The resolved caller: either a regular identity or an external
/// auditor restricted to an explicit resource scope.
#[derive(Debug, Clone)]
pub enum Principal {
    User(SessionClaims),
    Auditor(AuditorClaims),
}

impl Principal {
    /// Whether this principal may read the given equipment id.
    pub fn may_read_equipment(&self, id: uuid::Uuid) -> bool {
        match self {
            Principal::User(_) => true,
            Principal::Auditor(claims) => claims.scope.contains(&id),
        }
    }
}

/// A credential validator for one scheme.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credential: &str) -> Result<Principal, AppError>;
}

/// Validates session tokens (the `Bearer` scheme).
pub struct SessionAuthenticator {
    tokens: TokenService,
}

impl Authenticator for SessionAuthenticator {
    fn authenticate(&self, credential: &str) -> Result<Principal, AppError> {
        let claims = self
            .tokens
            .verify_session(credential)
            .map_err(|_| AppError::InvalidToken("Invalid or expired token".to_string()))?;
        Ok(Principal::User(claims))
    }
}

/// Validates auditor access tokens (the `AuditorToken` scheme).
pub struct AuditorAuthenticator {
    tokens: TokenService,
}

impl Authenticator for AuditorAuthenticator {
    fn authenticate(&self, credential: &str) -> Result<Principal, AppError> {
        let claims = self
            .tokens
            .verify_auditor(credential)
            .map_err(|_| AppError::InvalidToken("Invalid or expired auditor token".to_string()))?;
        Ok(Principal::Auditor(claims))
    }
}

/// Strategy lookup from scheme to validator.
#[derive(Clone)]
pub struct FlexibleAuth {
    session: Arc<SessionAuthenticator>,
    auditor: Arc<AuditorAuthenticator>,
}

impl FlexibleAuth {
    pub fn new(tokens: TokenService) -> Self {
        Self {
            session: Arc::new(SessionAuthenticator {
                tokens: tokens.clone(),
            }),
            auditor: Arc::new(AuditorAuthenticator { tokens }),
        }
    }

    fn for_scheme(&self, scheme: AuthScheme) -> &dyn Authenticator {
        match scheme {
            AuthScheme::Bearer => self.session.as_ref(),
            AuthScheme::AuditorToken => self.auditor.as_ref(),
        }
    }
}

/// Middleware admitting either scheme. Missing header, malformed
/// header, or an unknown scheme is 401; a parsed credential that fails
/// validation is 403.
pub async fn flexible_auth(
    State(auth): State<FlexibleAuth>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

    let (scheme, credential) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthenticated("Invalid authorization header format".to_string()))?;

    let scheme: AuthScheme = scheme
        .parse()
        .map_err(|_| AppError::Unauthenticated("Unsupported authorization scheme".to_string()))?;

    let principal = auth.for_scheme(scheme).authenticate(credential.trim())?;

    if let Principal::User(claims) = &principal {
        req.extensions_mut().insert(claims.clone());
    }
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extractor for the resolved principal on flexible routes.
pub struct CurrentPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

        Ok(CurrentPrincipal(principal.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_parsing_is_case_sensitive() {
        assert_eq!("Bearer".parse::<AuthScheme>(), Ok(AuthScheme::Bearer));
        assert_eq!(
            "AuditorToken".parse::<AuthScheme>(),
            Ok(AuthScheme::AuditorToken)
        );
        assert!("bearer".parse::<AuthScheme>().is_err());
        assert!("AUDITORTOKEN".parse::<AuthScheme>().is_err());
        assert!("Basic".parse::<AuthScheme>().is_err());
    }

    #[test]
    fn auditor_scope_bounds_equipment_reads() {
        let in_scope = uuid::Uuid::new_v4();
        let out_of_scope = uuid::Uuid::new_v4();
        let principal = Principal::Auditor(AuditorClaims {
            sub: "external auditor".to_string(),
            scope: vec![in_scope],
            iat: 0,
            exp: i64::MAX,
        });

        assert!(principal.may_read_equipment(in_scope));
        assert!(!principal.may_read_equipment(out_of_scope));
    }
}
