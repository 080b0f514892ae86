/// Persistence seam for accounts
///
/// The identity layer and the registration pipeline talk to storage only
/// through these traits. [`IdentityStore`] covers pool-level reads and
/// single-statement writes; [`StoreTransaction`] covers everything that must
/// commit or roll back as a unit.
///
/// # Implementations
///
/// - [`postgres::PgIdentityStore`]: sqlx/PostgreSQL, used by the server
/// - [`memory::MemoryIdentityStore`]: in-process, used by tests and local runs
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::store::{IdentityStore, postgres::PgIdentityStore};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgIdentityStore::new(pool);
/// let mut tx = store.begin().await?;
/// // ... writes ...
/// tx.rollback().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    company::{Company, CreateCompany},
    role::{CreateRole, Role},
    user::{CreateUser, User},
    user_role::{CreateUserRoleLink, UserRoleLink},
};

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint (or index) name
        constraint: String,
    },

    /// A row the operation depends on does not exist
    #[error("Record not found")]
    NotFound,

    /// Database driver error
    #[error("Database error: {0}")]
    Database(String),

    /// Any other backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True if this is a unique violation on a constraint whose name contains `needle`
    pub fn is_unique_violation_on(&self, needle: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint.contains(needle))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    StoreError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or_default().to_string(),
                    }
                } else {
                    StoreError::Database(db_err.to_string())
                }
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Pool-level account storage
///
/// Lookups on email and username are case-insensitive.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds a user by ID
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Finds a user by email (case-insensitive)
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user by username (case-insensitive)
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Finds a company by ID
    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>>;

    /// Names of the roles a user holds, alphabetically
    async fn role_names_for_user(&self, user_id: Uuid) -> StoreResult<Vec<String>>;

    /// Sets `last_login_at` to now
    async fn record_login(&self, user_id: Uuid) -> StoreResult<()>;

    /// Replaces the password hash and security stamp
    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        security_stamp: &str,
    ) -> StoreResult<()>;

    /// Cheap liveness probe for health checks
    async fn ping(&self) -> StoreResult<()>;

    /// Opens a transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Writes and reads that share one all-or-nothing transaction
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Inserts a company
    async fn insert_company(&mut self, data: CreateCompany) -> StoreResult<Company>;

    /// Inserts a user
    ///
    /// Fails with `UniqueViolation` on `users_email_key` or `users_username_key`.
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User>;

    /// Finds a user by email as seen inside this transaction
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user by username as seen inside this transaction
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;

    /// Finds a role by name (case-insensitive)
    async fn find_role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>>;

    /// Inserts a role
    ///
    /// Fails with `UniqueViolation` on `roles_name_key`.
    async fn insert_role(&mut self, data: CreateRole) -> StoreResult<Role>;

    /// Whether the user holds the role at the identity level
    async fn is_in_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool>;

    /// Grants the role at the identity level
    async fn add_to_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<()>;

    /// Whether an active audited link exists for the pair
    async fn has_active_link(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool>;

    /// Inserts an active audited link
    ///
    /// Fails with `UniqueViolation` on `user_roles_active_link_idx`.
    async fn insert_link(&mut self, data: CreateUserRoleLink) -> StoreResult<UserRoleLink>;

    /// Makes every write visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
