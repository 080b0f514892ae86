/// Company (tenant) model and database operations
///
/// A company is the unit of tenant isolation. Exactly one company is created
/// by every successful registration, and the registering user becomes its
/// first manager.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL,
///     description TEXT,
///     phone VARCHAR(32),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::company::{Company, CreateCompany};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let company = Company::create(&pool, CreateCompany {
///     name: "Acme".to_string(),
///     description: None,
///     phone: Some("+1 555 0100".to_string()),
/// }).await?;
/// println!("Created company: {}", company.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Company model representing a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    /// Unique company ID (UUID v4)
    pub id: Uuid,

    /// Display name, stored trimmed
    pub name: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Optional contact phone number
    pub phone: Option<String>,

    /// Whether the tenant is active
    pub is_active: bool,

    /// When the company was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new company
///
/// New companies are always created active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    /// Company name (callers trim before inserting)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional phone number
    pub phone: Option<String>,
}

impl Company {
    /// Inserts a new company and returns it with its generated ID
    ///
    /// Accepts any Postgres executor, so it can run on the pool or inside
    /// an open transaction (`&mut *tx`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateCompany) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, description, phone, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, name, description, phone, is_active, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.phone)
        .fetch_one(executor)
        .await?;

        Ok(company)
    }

    /// Finds a company by ID
    ///
    /// # Returns
    ///
    /// The company if found, None otherwise
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, description, phone, is_active, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(company)
    }
}
