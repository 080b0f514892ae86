/// User model and database operations
///
/// This module provides the User model and the queries the identity layer
/// needs: creation, lookup by ID/email/username, last-login tracking and
/// password rotation. Every user belongs to exactly one company at creation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username CITEXT NOT NULL UNIQUE,
///     email CITEXT NOT NULL UNIQUE,
///     email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     password_hash VARCHAR(255) NOT NULL,
///     security_stamp VARCHAR(64) NOT NULL,
///     full_name VARCHAR(200),
///     company_id UUID REFERENCES companies(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// // Email lookup is case-insensitive (CITEXT)
/// if let Some(user) = User::find_by_email(&pool, "A@X.com").await? {
///     println!("Found user: {}", user.id);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Column list shared by every query returning a full user row.
///
/// CITEXT columns are cast so they decode as plain strings.
const USER_COLUMNS: &str = "id, username::TEXT AS username, email::TEXT AS email, \
    email_confirmed, password_hash, security_stamp, full_name, company_id, \
    is_active, created_at, last_login_at";

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The hash and
/// the security stamp are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name (case-insensitive, unique). Registration sets it to the email.
    pub username: String,

    /// Email address (case-insensitive, unique)
    pub email: String,

    /// Whether the email address has been confirmed
    pub email_confirmed: bool,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Random value rotated whenever credentials change
    ///
    /// Session tokens embed the stamp they were issued with; a mismatch
    /// invalidates the session.
    #[serde(skip_serializing, default)]
    pub security_stamp: String,

    /// Optional full name
    pub full_name: Option<String>,

    /// Owning company
    pub company_id: Option<Uuid>,

    /// Whether the account may sign in
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the user last signed in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
///
/// The password must already be hashed; see [`crate::identity::UserManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Initial security stamp
    pub security_stamp: String,

    /// Optional full name
    pub full_name: Option<String>,

    /// Owning company
    pub company_id: Option<Uuid>,

    /// Whether the email is considered confirmed at creation
    pub email_confirmed: bool,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or username already exists (unique constraint violation)
    /// - The referenced company does not exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, security_stamp,
                               full_name, company_id, email_confirmed, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.security_stamp)
            .bind(data.full_name)
            .bind(data.company_id)
            .bind(data.email_confirmed)
            .fetch_one(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// Email lookup is case-insensitive (via CITEXT column type).
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1::CITEXT");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by username (case-insensitive)
    pub async fn find_by_username<'e, E>(
        executor: E,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1::CITEXT");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Updates the last login timestamp for a user
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    pub async fn update_last_login<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and security stamp
    ///
    /// # Returns
    ///
    /// True if user was found and updated, false otherwise
    pub async fn update_password<'e, E>(
        executor: E,
        id: Uuid,
        password_hash: &str,
        security_stamp: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, security_stamp = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(security_stamp)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
