use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::models::{Role, User};

/// Token service: signs and verifies session tokens and the separately
/// keyed auditor access tokens. Validity is purely cryptographic and
/// time-based; nothing is persisted server-side.
#[derive(Clone)]
pub struct TokenService {
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    session_ttl: Duration,
    auditor_encoding: EncodingKey,
    auditor_decoding: DecodingKey,
    auditor_ttl: Duration,
}

/// Claims embedded in a session token. Role names and ids are captured
/// at issue time; a role revoked mid-session takes effect only on the
/// next refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub role_ids: Vec<Uuid>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims embedded in an auditor access token: an explicit resource
/// scope instead of roles, and an independent, shorter expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditorClaims {
    /// Auditor label (name or organization), not a user id
    pub sub: String,
    /// Equipment ids this token may read
    pub scope: Vec<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            session_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            session_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            session_ttl: config.jwt_expires_in,
            auditor_encoding: EncodingKey::from_secret(config.auditor_secret.as_bytes()),
            auditor_decoding: DecodingKey::from_secret(config.auditor_secret.as_bytes()),
            auditor_ttl: config.auditor_expires_in,
        }
    }

    /// Mint a session token embedding the user's current role set.
    pub fn issue_session(&self, user: &User, roles: &[Role]) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + self.session_ttl;

        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles: roles.iter().map(|r| r.name.clone()).collect(),
            role_ids: roles.iter().map(|r| r.id).collect(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.session_encoding)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify a session token. Fails on signature mismatch, malformed
    /// structure, or expiry.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<SessionClaims>(token, &self.session_decoding, &validation)?;
        Ok(token_data.claims)
    }

    /// Mint an auditor token scoped to specific equipment ids. The TTL
    /// defaults to the configured auditor expiry but may be overridden
    /// per token.
    pub fn issue_auditor(
        &self,
        subject: &str,
        scope: Vec<Uuid>,
        ttl: Option<Duration>,
    ) -> Result<(String, chrono::DateTime<Utc>), anyhow::Error> {
        let now = Utc::now();
        let exp = now + ttl.unwrap_or(self.auditor_ttl);

        let claims = AuditorClaims {
            sub: subject.to_string(),
            scope,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.auditor_encoding)
            .map_err(|e| anyhow::anyhow!("Failed to encode auditor token: {}", e))?;

        Ok((token, exp))
    }

    /// Verify an auditor token.
    pub fn verify_auditor(&self, token: &str) -> Result<AuditorClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<AuditorClaims>(token, &self.auditor_decoding, &validation)?;
        Ok(token_data.claims)
    }

    /// Session token lifetime in seconds (for client info).
    pub fn session_expiry_seconds(&self) -> i64 {
        self.session_ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config(session_ttl: Duration) -> TokenConfig {
        TokenConfig {
            jwt_secret: "unit-test-session-secret".to_string(),
            jwt_expires_in: session_ttl,
            auditor_secret: "unit-test-auditor-secret".to_string(),
            auditor_expires_in: Duration::hours(4),
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "qa@example.com".to_string(),
            first_name: "Quinn".to_string(),
            last_name: "Ashford".to_string(),
            department: Some("Quality".to_string()),
            active: true,
            must_change_password: false,
            password_hash: "irrelevant".to_string(),
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_role(name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: name.to_string(),
            is_super_user: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn session_token_round_trip() {
        let service = TokenService::new(&test_config(Duration::hours(24)));
        let user = test_user();
        let roles = vec![test_role("ADMIN"), test_role("MANAGER")];

        let token = service.issue_session(&user, &roles).unwrap();
        let claims = service.verify_session(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.roles, vec!["ADMIN", "MANAGER"]);
        assert_eq!(claims.role_ids, vec![roles[0].id, roles[1].id]);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let service = TokenService::new(&test_config(Duration::seconds(-1)));
        let token = service.issue_session(&test_user(), &[]).unwrap();

        assert!(service.verify_session(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = TokenService::new(&test_config(Duration::hours(1)));
        let mut token = service.issue_session(&test_user(), &[]).unwrap();
        token.push('x');

        assert!(service.verify_session(&token).is_err());
    }

    #[test]
    fn session_token_does_not_pass_as_auditor_token() {
        let service = TokenService::new(&test_config(Duration::hours(1)));
        let token = service.issue_session(&test_user(), &[]).unwrap();

        assert!(service.verify_auditor(&token).is_err());
    }

    #[test]
    fn auditor_token_round_trip_with_scope() {
        let service = TokenService::new(&test_config(Duration::hours(1)));
        let scope = vec![Uuid::new_v4(), Uuid::new_v4()];

        let (token, exp) = service
            .issue_auditor("Lloyd's Register", scope.clone(), None)
            .unwrap();
        let claims = service.verify_auditor(&token).unwrap();

        assert_eq!(claims.sub, "Lloyd's Register");
        assert_eq!(claims.scope, scope);
        assert_eq!(claims.exp, exp.timestamp());
    }

    #[test]
    fn refresh_yields_independently_valid_tokens() {
        let service = TokenService::new(&test_config(Duration::hours(24)));
        let user = test_user();
        let roles = vec![test_role("MANAGER")];

        let first = service.issue_session(&user, &roles).unwrap();
        let second = service.issue_session(&user, &roles).unwrap();

        assert!(service.verify_session(&first).is_ok());
        assert!(service.verify_session(&second).is_ok());
    }
}
