/// Role model and identity-level role membership
///
/// Roles are named permission groupings. They are created lazily: the first
/// registration creates the [`COMPANY_MANAGER`] role if it does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name CITEXT NOT NULL UNIQUE,
///     description TEXT,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE identity_user_roles (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, role_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Default role granted to the first user of a company
pub const COMPANY_MANAGER: &str = "CompanyManager";

/// Description stored when [`COMPANY_MANAGER`] is created
pub const COMPANY_MANAGER_DESCRIPTION: &str = "Company manager";

/// Role model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Role name (case-insensitive, unique)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Whether the role is in use
    pub is_active: bool,

    /// When the role was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    /// Role name
    pub name: String,

    /// Optional description
    pub description: Option<String>,
}

impl Role {
    /// Creates a new role
    ///
    /// # Errors
    ///
    /// Returns a unique-constraint violation (`roles_name_key`) if a role
    /// with the same name already exists.
    pub async fn create<'e, E>(executor: E, data: CreateRole) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING id, name::TEXT AS name, description, is_active, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .fetch_one(executor)
        .await?;

        Ok(role)
    }

    /// Finds a role by name (case-insensitive)
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name::TEXT AS name, description, is_active, created_at
            FROM roles
            WHERE name = $1::CITEXT
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    /// Checks whether a user holds a role at the identity level
    pub async fn is_member<'e, E>(
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
                SELECT 1 FROM identity_user_roles
                WHERE user_id = $1 AND role_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Adds a user to a role at the identity level
    ///
    /// # Errors
    ///
    /// Returns a primary-key violation if the user already holds the role.
    pub async fn add_member<'e, E>(
        executor: E,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("INSERT INTO identity_user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Lists the names of every role a user holds, alphabetically
    pub async fn names_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name::TEXT
            FROM roles r
            JOIN identity_user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(names)
    }
}
