//! Database service: connection pool plus per-entity queries.

use chrono::{DateTime, Utc};
use eqms_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{AuditLogEntry, Equipment, NewAuditLog, Role, User};

/// Input for creating a user.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub password_hash: String,
    pub must_change_password: bool,
}

/// Input for updating a user; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub active: Option<bool>,
    pub must_change_password: Option<bool>,
}

/// Input for creating equipment.
#[derive(Debug)]
pub struct NewEquipment {
    pub name: String,
    pub serial_number: String,
    pub location: String,
    pub department: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
}

/// Input for updating equipment; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct EquipmentChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
}

/// Filters for the audit log query endpoint.
#[derive(Debug, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "eqms-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load user: {}", e)))
    }

    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load user: {}", e)))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY last_name, first_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list users: {}", e)))
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn insert_user(&self, input: &NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, first_name, last_name, department, password_hash, must_change_password)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.department)
        .bind(&input.password_hash)
        .bind(input.must_change_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        info!(user_id = %user.id, "User created");

        Ok(user)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                department = COALESCE($4, department),
                active = COALESCE($5, active),
                must_change_password = COALESCE($6, must_change_password),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.department)
        .bind(changes.active)
        .bind(changes.must_change_password)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update user: {}", e)))
    }

    /// Soft-delete: identities are deactivated, never removed.
    pub async fn deactivate_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET active = false, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to deactivate user: {}", e))
                })?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to record login time: {}", e))
            })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Role Operations
    // -------------------------------------------------------------------------

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list roles: {}", e)))
    }

    pub async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load role: {}", e)))
    }

    /// Roles currently in effect for a user: assignment active and not
    /// past its expiry.
    pub async fn active_roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
              AND ur.active
              AND (ur.expires_at IS NULL OR ur.expires_at > now())
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load user roles: {}", e)))
    }

    /// Whether the user currently holds any superuser-flagged role.
    pub async fn user_has_superuser_role(&self, user_id: Uuid) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
              AND r.is_super_user
              AND ur.active
              AND (ur.expires_at IS NULL OR ur.expires_at > now())
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check superuser role: {}", e))
        })?;

        Ok(count > 0)
    }

    /// Count active users holding an active superuser-flagged role.
    pub async fn count_superusers(&self) -> Result<i64, AppError> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT u.id) FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id
            WHERE u.active
              AND r.is_super_user
              AND ur.active
              AND (ur.expires_at IS NULL OR ur.expires_at > now())
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count superusers: {}", e)))
    }

    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load role: {}", e)))
    }

    /// Assign a role. Re-assigning an existing pair reactivates it with
    /// fresh assignment metadata.
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_by, assigned_at, active, expires_at)
            VALUES ($1, $2, $3, now(), true, $4)
            ON CONFLICT (user_id, role_id) DO UPDATE
                SET assigned_by = $3, assigned_at = now(), active = true, expires_at = $4
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .bind(assigned_by)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to assign role: {}", e)))?;

        info!(user_id = %user_id, role_id = %role_id, "Role assigned");
        Ok(())
    }

    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE user_roles SET active = false WHERE user_id = $1 AND role_id = $2 AND active",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to remove role: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Equipment Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(serial_number = %input.serial_number))]
    pub async fn insert_equipment(&self, input: &NewEquipment) -> Result<Equipment, AppError> {
        let equipment = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (id, name, serial_number, location, department, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.serial_number)
        .bind(&input.location)
        .bind(&input.department)
        .bind(&input.status)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Equipment with serial number '{}' already exists",
                    input.serial_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create equipment: {}", e)),
        })?;

        info!(equipment_id = %equipment.id, "Equipment created");

        Ok(equipment)
    }

    pub async fn find_equipment_by_id(&self, id: Uuid) -> Result<Option<Equipment>, AppError> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load equipment: {}", e)))
    }

    pub async fn list_equipment(&self) -> Result<Vec<Equipment>, AppError> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list equipment: {}", e))
            })
    }

    /// Restricted listing for auditor tokens: only ids in scope.
    pub async fn list_equipment_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Equipment>, AppError> {
        sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list equipment: {}", e)))
    }

    pub async fn update_equipment(
        &self,
        id: Uuid,
        changes: &EquipmentChanges,
    ) -> Result<Option<Equipment>, AppError> {
        sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment SET
                name = COALESCE($2, name),
                location = COALESCE($3, location),
                department = COALESCE($4, department),
                status = COALESCE($5, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.location)
        .bind(&changes.department)
        .bind(&changes.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update equipment: {}", e)))
    }

    pub async fn delete_equipment(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete equipment: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Audit Log Operations
    // -------------------------------------------------------------------------

    /// Append an audit log entry. Entries are never mutated or deleted
    /// through the API.
    pub async fn insert_audit_log(&self, entry: &NewAuditLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log
                (id, actor_id, action, action_category, entity_type, entity_id,
                 entity_identifier, old_values, new_values, success, error_message, status_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.action_category)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.entity_identifier)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.status_code)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to write audit log: {}", e))
        })?;

        Ok(())
    }

    pub async fn query_audit_logs(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<(Vec<AuditLogEntry>, i64), AppError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE ($1::uuid IS NULL OR actor_id = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::text IS NULL OR entity_type = $3)
              AND ($4::uuid IS NULL OR entity_id = $4)
              AND ($5::timestamptz IS NULL OR timestamp >= $5)
              AND ($6::timestamptz IS NULL OR timestamp <= $6)
            ORDER BY timestamp DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(filter.actor_id)
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(filter.from_utc)
        .bind(filter.to_utc)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to query audit log: {}", e)))?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM audit_log
            WHERE ($1::uuid IS NULL OR actor_id = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::text IS NULL OR entity_type = $3)
              AND ($4::uuid IS NULL OR entity_id = $4)
              AND ($5::timestamptz IS NULL OR timestamp >= $5)
              AND ($6::timestamptz IS NULL OR timestamp <= $6)
            "#,
        )
        .bind(filter.actor_id)
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(filter.from_utc)
        .bind(filter.to_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count audit log: {}", e)))?;

        Ok((entries, total))
    }
}
