/// In-process account store
///
/// Keeps every table in a `Vec` behind a `tokio::sync::Mutex`. A transaction
/// holds the owned lock for its whole lifetime and works on a staged copy
/// of the state: commit swaps the copy in, rollback (or drop) discards it.
/// Transactions are therefore fully serialized.
///
/// Unique constraints mirror the PostgreSQL schema, including constraint
/// names, so callers see the same `StoreError::UniqueViolation` either way.
///
/// [`FaultPlan`] injects failures at specific steps; tests use it to drive
/// the rollback paths.
///
/// # Example
///
/// ```
/// use taskdesk_shared::store::{IdentityStore, memory::MemoryIdentityStore};
/// use taskdesk_shared::models::company::CreateCompany;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryIdentityStore::new();
///
/// let mut tx = store.begin().await?;
/// tx.insert_company(CreateCompany { name: "Acme".into(), description: None, phone: None }).await?;
/// tx.rollback().await?;
///
/// assert!(store.companies().await.is_empty());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{IdentityStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    company::{Company, CreateCompany},
    role::{CreateRole, Role},
    user::{CreateUser, User},
    user_role::{CreateUserRoleLink, UserRoleLink},
};

/// Failures to inject into an in-memory store
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// User lookups by email or username find nothing, as if a concurrent
    /// registration had not committed yet; inserts still hit the unique
    /// constraints
    pub hide_users_from_lookup: bool,

    /// Role inserts fail with a `roles_name_key` unique violation
    pub role_insert_conflict: bool,

    /// Identity-level role grants fail with a primary-key violation
    pub role_assignment_conflict: bool,

    /// Audited link inserts fail with a backend error
    pub link_insert_failure: bool,

    /// Last-login updates fail with a backend error
    pub record_login_failure: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    companies: Vec<Company>,
    users: Vec<User>,
    roles: Vec<Role>,
    memberships: Vec<(Uuid, Uuid)>,
    links: Vec<UserRoleLink>,
}

/// `VARCHAR(200)` columns: `companies.name`, `users.full_name`
const NAME_COLUMN_LENGTH: usize = 200;

/// `companies.phone VARCHAR(32)`
const PHONE_COLUMN_LENGTH: usize = 32;

/// Equality under CITEXT, which compares `lower()` of both sides
fn citext_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn check_length(column: &str, value: Option<&str>, max: usize) -> StoreResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(StoreError::Database(format!(
            "value too long for type character varying({}): {}",
            max, column
        ))),
        _ => Ok(()),
    }
}

impl MemoryState {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| citext_eq(&u.email, email))
    }

    fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| citext_eq(&u.username, username))
    }

    fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| citext_eq(&r.name, name))
    }

    fn has_active_link(&self, user_id: Uuid, role_id: Uuid) -> bool {
        self.links
            .iter()
            .any(|l| l.user_id == user_id && l.role_id == role_id && l.is_active)
    }
}

/// In-process implementation of [`IdentityStore`]
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    state: Arc<Mutex<MemoryState>>,
    faults: FaultPlan,
}

impl MemoryIdentityStore {
    /// Creates an empty store with no injected faults
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that fails as described by `faults`
    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            state: Arc::default(),
            faults,
        }
    }

    /// Committed companies
    pub async fn companies(&self) -> Vec<Company> {
        self.state.lock().await.companies.clone()
    }

    /// Committed users
    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.clone()
    }

    /// Committed roles
    pub async fn roles(&self) -> Vec<Role> {
        self.state.lock().await.roles.clone()
    }

    /// Committed audited links, active or not
    pub async fn links(&self) -> Vec<UserRoleLink> {
        self.state.lock().await.links.clone()
    }

    /// Deactivates or reactivates a user
    pub async fn set_user_active(&self, user_id: Uuid, active: bool) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.is_active = active;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        if self.faults.hide_users_from_lookup {
            return Ok(None);
        }
        let state = self.state.lock().await;
        Ok(state.user_by_email(email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        if self.faults.hide_users_from_lookup {
            return Ok(None);
        }
        let state = self.state.lock().await;
        Ok(state.user_by_username(username).cloned())
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        let state = self.state.lock().await;
        Ok(state.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn role_names_for_user(&self, user_id: Uuid) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state
            .memberships
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| state.roles.iter().find(|r| r.id == *rid))
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn record_login(&self, user_id: Uuid) -> StoreResult<()> {
        if self.faults.record_login_failure {
            return Err(StoreError::Backend("injected last-login failure".to_string()));
        }
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        security_stamp: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.security_stamp = security_stamp.to_string();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            faults: self.faults.clone(),
        }))
    }
}

/// Open in-memory transaction
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    faults: FaultPlan,
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        check_length("companies.name", Some(&data.name), NAME_COLUMN_LENGTH)?;
        check_length("companies.phone", data.phone.as_deref(), PHONE_COLUMN_LENGTH)?;

        let company = Company {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            phone: data.phone,
            is_active: true,
            created_at: Utc::now(),
        };
        self.staged.companies.push(company.clone());
        Ok(company)
    }

    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        check_length("users.full_name", data.full_name.as_deref(), NAME_COLUMN_LENGTH)?;
        if self.staged.user_by_username(&data.username).is_some() {
            return Err(unique_violation("users_username_key"));
        }
        if self.staged.user_by_email(&data.email).is_some() {
            return Err(unique_violation("users_email_key"));
        }
        if let Some(company_id) = data.company_id {
            if !self.staged.companies.iter().any(|c| c.id == company_id) {
                return Err(StoreError::Database(
                    "foreign key violation: users_company_id_fkey".to_string(),
                ));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            email_confirmed: data.email_confirmed,
            password_hash: data.password_hash,
            security_stamp: data.security_stamp,
            full_name: data.full_name,
            company_id: data.company_id,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.staged.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        if self.faults.hide_users_from_lookup {
            return Ok(None);
        }
        Ok(self.staged.user_by_email(email).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        if self.faults.hide_users_from_lookup {
            return Ok(None);
        }
        Ok(self.staged.user_by_username(username).cloned())
    }

    async fn find_role_by_name(&mut self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.staged.role_by_name(name).cloned())
    }

    async fn insert_role(&mut self, data: CreateRole) -> StoreResult<Role> {
        if self.faults.role_insert_conflict || self.staged.role_by_name(&data.name).is_some() {
            return Err(unique_violation("roles_name_key"));
        }

        let role = Role {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            is_active: true,
            created_at: Utc::now(),
        };
        self.staged.roles.push(role.clone());
        Ok(role)
    }

    async fn is_in_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        Ok(self.staged.memberships.contains(&(user_id, role_id)))
    }

    async fn add_to_role(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        if self.faults.role_assignment_conflict
            || self.staged.memberships.contains(&(user_id, role_id))
        {
            return Err(unique_violation("identity_user_roles_pkey"));
        }
        self.staged.memberships.push((user_id, role_id));
        Ok(())
    }

    async fn has_active_link(&mut self, user_id: Uuid, role_id: Uuid) -> StoreResult<bool> {
        Ok(self.staged.has_active_link(user_id, role_id))
    }

    async fn insert_link(&mut self, data: CreateUserRoleLink) -> StoreResult<UserRoleLink> {
        if self.faults.link_insert_failure {
            return Err(StoreError::Backend("injected link insert failure".to_string()));
        }
        if self.staged.has_active_link(data.user_id, data.role_id) {
            return Err(unique_violation("user_roles_active_link_idx"));
        }

        let link = UserRoleLink {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            role_id: data.role_id,
            assigned_at: Utc::now(),
            assigned_by: data.assigned_by,
            is_active: true,
            notes: data.notes,
        };
        self.staged.links.push(link.clone());
        Ok(link)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
