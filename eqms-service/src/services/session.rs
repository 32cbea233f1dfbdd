use eqms_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::auth::{InitialSuperuserRequest, LoginRequest, SessionResponse},
    models::{NewAuditLog, UserResponse},
    services::{AuditRecorder, Database, SessionClaims, TokenService},
    utils::{hash_password, verify_password, Password},
};

/// Session issuer: orchestrates login, refresh, and the bootstrap
/// superuser flow. Exactly one audit entry is written per login
/// attempt, success or failure.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    tokens: TokenService,
    audit: AuditRecorder,
}

impl SessionService {
    pub fn new(db: Database, tokens: TokenService, audit: AuditRecorder) -> Self {
        Self { db, tokens, audit }
    }

    /// Login with email and password. All failure modes return the same
    /// generic `Invalid credentials` so the caller cannot tell which
    /// field was wrong.
    pub async fn login(&self, req: LoginRequest) -> Result<SessionResponse, AppError> {
        let user = match self.db.find_user_by_email(&req.email).await? {
            Some(user) if user.active => user,
            _ => {
                self.audit.submit(NewAuditLog::auth_event(
                    None,
                    "login",
                    Some(req.email.clone()),
                    false,
                    Some("Invalid credentials".to_string()),
                    401,
                ));
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(&Password::new(req.password), &user.password_hash) {
            self.audit.submit(NewAuditLog::auth_event(
                Some(user.id),
                "login",
                Some(user.email.clone()),
                false,
                Some("Invalid credentials".to_string()),
                401,
            ));
            return Err(AppError::InvalidCredentials);
        }

        let roles = self.db.active_roles_for_user(user.id).await?;
        self.db.update_last_login(user.id).await?;

        let token = self
            .tokens
            .issue_session(&user, &roles)
            .map_err(AppError::InternalError)?;

        tracing::info!(user_id = %user.id, "User logged in");

        self.audit.submit(NewAuditLog::auth_event(
            Some(user.id),
            "login",
            Some(user.email.clone()),
            true,
            None,
            200,
        ));

        Ok(SessionResponse {
            token,
            user: UserResponse::from_user(user, &roles),
        })
    }

    /// Re-mint a token from a fresh read of the identity. Honors role
    /// changes made since the original token was issued; fails with 404
    /// if the identity was deactivated or removed in the meantime.
    pub async fn refresh(&self, claims: &SessionClaims) -> Result<SessionResponse, AppError> {
        let user = self
            .db
            .find_user_by_id(claims.sub)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

        let roles = self.db.active_roles_for_user(user.id).await?;

        let token = self
            .tokens
            .issue_session(&user, &roles)
            .map_err(AppError::InternalError)?;

        tracing::info!(user_id = %user.id, "Session token refreshed");

        self.audit.submit(NewAuditLog::auth_event(
            Some(user.id),
            "refresh",
            Some(user.email.clone()),
            true,
            None,
            200,
        ));

        Ok(SessionResponse {
            token,
            user: UserResponse::from_user(user, &roles),
        })
    }

    /// Logout is declarative: there is no server-side token state to
    /// clear, so the token stays valid until natural expiry.
    pub async fn logout(&self, claims: &SessionClaims) {
        tracing::info!(user_id = %claims.sub, "User logged out");

        self.audit.submit(NewAuditLog::auth_event(
            Some(claims.sub),
            "logout",
            Some(claims.email.clone()),
            true,
            None,
            200,
        ));
    }

    /// Current profile for an authenticated identity.
    pub async fn profile(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        let user = self
            .db
            .find_user_by_id(user_id)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

        let roles = self.db.active_roles_for_user(user.id).await?;

        Ok(UserResponse::from_user(user, &roles))
    }

    pub async fn has_superusers(&self) -> Result<bool, AppError> {
        Ok(self.db.count_superusers().await? > 0)
    }

    /// Bootstrap the first superuser. Refused once any superuser
    /// exists; from then on, superuser roles move only through the
    /// role-assignment endpoints.
    pub async fn create_initial_superuser(
        &self,
        req: InitialSuperuserRequest,
    ) -> Result<Uuid, AppError> {
        if self.has_superusers().await? {
            return Err(AppError::Forbidden(
                "Initial superuser has already been provisioned".to_string(),
            ));
        }

        let role = self
            .db
            .find_role_by_name("SUPERUSER")
            .await?
            .ok_or_else(|| anyhow::anyhow!("SUPERUSER role missing from reference data"))?;

        let password_hash = hash_password(&Password::new(req.password))
            .map_err(AppError::InternalError)?;

        let user = self
            .db
            .insert_user(&crate::services::database::NewUser {
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                department: None,
                password_hash,
                must_change_password: false,
            })
            .await?;

        self.db.assign_role(user.id, role.id, user.id, None).await?;

        tracing::info!(user_id = %user.id, "Initial superuser created");

        self.audit.log_create(
            Some(user.id),
            "user",
            Some(user.id),
            Some(user.email.clone()),
            Some(serde_json::json!({
                "email": user.email,
                "roles": ["SUPERUSER"],
            })),
        );

        Ok(user.id)
    }
}
