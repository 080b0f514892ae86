/// PostgreSQL-backed account store
///
/// Thin adapter from the store traits onto the model queries. Transactions
/// wrap a `sqlx::Transaction<'static, Postgres>`; dropping one without
/// committing rolls it back.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{IdentityStore, StoreError, StoreResult, StoreTransaction};
use crate::db::pool::health_check;
use crate::models::{
    company::{Company, CreateCompany},
    role::{CreateRole, Role},
    user::{CreateUser, User},
    user_role::{CreateUserRoleLink, UserRoleLink},
};

/// Account store on a PostgreSQL pool
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(Company::find_by_id(&self.pool, id).await?)
    }

    async fn role_names_for_user(&self, user_id: Uuid) -> StoreResult<Vec<String>> {
        Ok(Role::names_for_user(&self.pool, user_id).await?)
    }

    async fn record_login(&self, user_id: Uuid) -> StoreResult<()> {
        if User::update_last_login(&self.pool, user_id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        security_stamp: &str,
    ) -> StoreResult<()> {
        if User::update_password(&self.pool, user_id, password_hash, security_stamp).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

/// An open PostgreSQL transaction
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn insert_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        Ok(Company::create(&mut *self.tx, data).await?)
    }

    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&mut *self.tx, email).await?)
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&mut *self.tx, username).await?)
    }

    async fn find_role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>> {
        Ok(Role::find_by_name(&mut *self.tx, name).await?)
    }

    async fn insert_role(&mut self, data: CreateRole) -> StoreResult<Role> {
        Ok(Role::create(&mut *self.tx, data).await?)
    }

    async fn is_in_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        Ok(Role::is_member(&mut *self.tx, user_id, role_id).await?)
    }

    async fn add_to_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        Ok(Role::add_member(&mut *self.tx, user_id, role_id).await?)
    }

    async fn has_active_link(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        Ok(UserRoleLink::has_active(&mut *self.tx, user_id, role_id).await?)
    }

    async fn insert_link(&mut self, data: CreateUserRoleLink) -> StoreResult<UserRoleLink> {
        Ok(UserRoleLink::create(&mut *self.tx, data).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(self.tx.rollback().await?)
    }
}
