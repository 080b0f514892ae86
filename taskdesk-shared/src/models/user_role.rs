/// Audited user-role links
///
/// Every role grant is also recorded here with who assigned it and when.
/// Links are soft-deleted by clearing `is_active`; a partial unique index
/// keeps at most one active link per (user, role).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
///     assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     assigned_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     notes TEXT
/// );
///
/// CREATE UNIQUE INDEX user_roles_active_link_idx
///     ON user_roles(user_id, role_id) WHERE is_active;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Note attached to links created by the registration pipeline
pub const REGISTRATION_NOTE: &str = "Assigned on registration";

/// A user-role link row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRoleLink {
    /// Link ID
    pub id: Uuid,

    /// User holding the role
    pub user_id: Uuid,

    /// Role granted
    pub role_id: Uuid,

    /// When the role was granted
    pub assigned_at: DateTime<Utc>,

    /// Who granted it (None for system grants)
    pub assigned_by: Option<Uuid>,

    /// Whether the link is in effect
    pub is_active: bool,

    /// Free-form notes
    pub notes: Option<String>,
}

/// Input for creating an active link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRoleLink {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl UserRoleLink {
    /// Inserts an active link
    ///
    /// # Errors
    ///
    /// Returns a unique-constraint violation (`user_roles_active_link_idx`)
    /// if an active link for the same pair already exists.
    pub async fn create<'e, E>(executor: E, data: CreateUserRoleLink) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let link = sqlx::query_as::<_, UserRoleLink>(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_by, is_active, notes)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING id, user_id, role_id, assigned_at, assigned_by, is_active, notes
            "#,
        )
        .bind(data.user_id)
        .bind(data.role_id)
        .bind(data.assigned_by)
        .bind(data.notes)
        .fetch_one(executor)
        .await?;

        Ok(link)
    }

    /// Checks whether an active link exists for the pair
    pub async fn has_active<'e, E>(
        executor: E,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles
                WHERE user_id = $1 AND role_id = $2 AND is_active
            )
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }
}
