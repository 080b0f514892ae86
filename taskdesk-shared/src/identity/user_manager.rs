/// User account operations
///
/// # Example
///
/// ```
/// use taskdesk_shared::identity::user_manager::{NewUser, UserManager};
/// use taskdesk_shared::store::{IdentityStore, memory::MemoryIdentityStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryIdentityStore::new();
/// let users = UserManager::default();
///
/// let mut tx = store.begin().await?;
/// let user = users
///     .create(tx.as_mut(), NewUser::with_email("a@x.com"), "Str0ng!Pass")
///     .await?;
/// tx.commit().await?;
///
/// assert!(users.check_password(&user, "Str0ng!Pass")?);
/// # Ok(())
/// # }
/// ```

use tracing::{debug, info};
use uuid::Uuid;

use super::{codes, messages, IdentityError, IdentityRejection, IdentityResult};
use crate::auth::password::{hash_password, verify_password, PasswordPolicy};
use crate::models::user::{CreateUser, User};
use crate::store::{IdentityStore, StoreError, StoreTransaction};

/// Characters allowed in a username besides letters and digits
const USER_NAME_EXTRA_CHARS: &str = "-._@+";

/// Fields of a user about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub company_id: Option<Uuid>,
    pub email_confirmed: bool,
}

impl NewUser {
    /// User whose username is their email
    pub fn with_email(email: &str) -> Self {
        Self {
            username: email.to_string(),
            email: email.to_string(),
            full_name: None,
            company_id: None,
            email_confirmed: false,
        }
    }
}

/// Generates a fresh security stamp
pub fn new_security_stamp() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Creates users, changes passwords and grants roles
#[derive(Debug, Clone, Default)]
pub struct UserManager {
    policy: PasswordPolicy,
}

impl UserManager {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// One rejection per password rule the candidate breaks
    pub fn validate_password(&self, password: &str) -> Vec<IdentityRejection> {
        self.policy
            .violations(password)
            .into_iter()
            .map(|v| IdentityRejection::new(codes::PASSWORD_POLICY, format!("{}.", v)))
            .collect()
    }

    /// Creates a user inside `tx`
    ///
    /// Checks the username, email and password policy, then uniqueness as
    /// seen by the transaction, and reports every problem at once. A unique
    /// violation on insert (a concurrent registration that committed after
    /// the lookup) is reported as the matching duplicate rejection.
    ///
    /// # Errors
    ///
    /// - `IdentityError::Rejected` for invalid or duplicate input
    /// - `IdentityError::Store` / `IdentityError::Password` for failures
    pub async fn create(
        &self,
        tx: &mut dyn StoreTransaction,
        user: NewUser,
        password: &str,
    ) -> IdentityResult<User> {
        let mut rejections = Vec::new();

        if !is_valid_user_name(&user.username) {
            rejections.push(IdentityRejection::new(
                codes::INVALID_USER_NAME,
                format!("User name '{}' is invalid.", user.username),
            ));
        }
        if !is_plausible_email(&user.email) {
            rejections.push(IdentityRejection::new(
                codes::INVALID_EMAIL,
                messages::EMAIL_INVALID,
            ));
        }
        rejections.extend(self.validate_password(password));

        if tx.find_user_by_username(&user.username).await?.is_some() {
            rejections.push(IdentityRejection::new(
                codes::DUPLICATE_USER_NAME,
                messages::duplicate_user_name(&user.username),
            ));
        }
        if tx.find_user_by_email(&user.email).await?.is_some() {
            rejections.push(IdentityRejection::new(
                codes::DUPLICATE_EMAIL,
                messages::duplicate_email(&user.email),
            ));
        }

        if !rejections.is_empty() {
            debug!(count = rejections.len(), "User creation rejected");
            return Err(IdentityError::Rejected(rejections));
        }

        let password_hash = hash_password(password)?;
        let data = CreateUser {
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash,
            security_stamp: new_security_stamp(),
            full_name: user.full_name,
            company_id: user.company_id,
            email_confirmed: user.email_confirmed,
        };

        match tx.insert_user(data).await {
            Ok(created) => {
                info!(user_id = %created.id, "User created");
                Ok(created)
            }
            Err(e) if e.is_unique_violation_on("username") => Err(IdentityError::rejected(
                codes::DUPLICATE_USER_NAME,
                messages::duplicate_user_name(&user.username),
            )),
            Err(e) if e.is_unique_violation_on("email") => Err(IdentityError::rejected(
                codes::DUPLICATE_EMAIL,
                messages::duplicate_email(&user.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Grants the named role to a user inside `tx`
    ///
    /// # Errors
    ///
    /// Rejected with `RoleNotFound` or `UserAlreadyInRole`.
    pub async fn add_to_role(
        &self,
        tx: &mut dyn StoreTransaction,
        user_id: Uuid,
        role_name: &str,
    ) -> IdentityResult<()> {
        let role = tx.find_role_by_name(role_name).await?.ok_or_else(|| {
            IdentityError::rejected(codes::ROLE_NOT_FOUND, messages::role_not_found(role_name))
        })?;

        let already_in_role = IdentityError::rejected(
            codes::USER_ALREADY_IN_ROLE,
            messages::user_already_in_role(&role.name),
        );

        if tx.is_in_role(user_id, role.id).await? {
            return Err(already_in_role);
        }

        match tx.add_to_role(user_id, role.id).await {
            Ok(()) => Ok(()),
            Err(StoreError::UniqueViolation { .. }) => Err(already_in_role),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `password` matches the user's stored hash
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Password` if the stored hash is corrupt.
    pub fn check_password(&self, user: &User, password: &str) -> IdentityResult<bool> {
        Ok(verify_password(password, &user.password_hash)?)
    }

    /// Replaces the user's password
    ///
    /// Verifies the current password, applies the policy to the new one,
    /// stores the new hash and rotates the security stamp. Returns the user
    /// as it now stands.
    ///
    /// # Errors
    ///
    /// Rejected with `PasswordMismatch` when the current password is wrong,
    /// or with one `PasswordPolicy` entry per broken rule.
    pub async fn change_password(
        &self,
        store: &dyn IdentityStore,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> IdentityResult<User> {
        if !self.check_password(user, current_password)? {
            return Err(IdentityError::rejected(
                codes::PASSWORD_MISMATCH,
                messages::INCORRECT_PASSWORD,
            ));
        }

        let violations = self.validate_password(new_password);
        if !violations.is_empty() {
            return Err(IdentityError::Rejected(violations));
        }

        let password_hash = hash_password(new_password)?;
        let security_stamp = new_security_stamp();
        store
            .update_password(user.id, &password_hash, &security_stamp)
            .await?;

        info!(user_id = %user.id, "Password changed");

        Ok(User {
            password_hash,
            security_stamp,
            ..user.clone()
        })
    }
}

fn is_valid_user_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || USER_NAME_EXTRA_CHARS.contains(c))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::CreateRole;
    use crate::store::memory::MemoryIdentityStore;

    const PASSWORD: &str = "Str0ng!Pass";

    async fn seed(store: &MemoryIdentityStore, email: &str) -> User {
        let mut tx = store.begin().await.unwrap();
        let user = UserManager::default()
            .create(tx.as_mut(), NewUser::with_email(email), PASSWORD)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    #[test]
    fn test_user_name_rules() {
        assert!(is_valid_user_name("a.b-c_d+e@x.com"));
        assert!(!is_valid_user_name(""));
        assert!(!is_valid_user_name("has space"));
    }

    #[test]
    fn test_email_plausibility() {
        assert!(is_plausible_email("a@x.com"));
        assert!(!is_plausible_email("a.x.com"));
        assert!(!is_plausible_email("@x.com"));
        assert!(!is_plausible_email("a@b@c"));
    }

    #[test]
    fn test_security_stamps_are_unique() {
        assert_ne!(new_security_stamp(), new_security_stamp());
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let store = MemoryIdentityStore::new();
        let user = seed(&store, "a@x.com").await;

        assert!(user.password_hash.starts_with("$argon2id$"));
        assert!(!user.security_stamp.is_empty());
        assert!(UserManager::default().check_password(&user, PASSWORD).unwrap());
    }

    #[tokio::test]
    async fn test_create_reports_duplicates_case_insensitively() {
        let store = MemoryIdentityStore::new();
        seed(&store, "a@x.com").await;

        let mut tx = store.begin().await.unwrap();
        let err = UserManager::default()
            .create(tx.as_mut(), NewUser::with_email("A@X.com"), PASSWORD)
            .await
            .unwrap_err();

        let rejections = err.rejections();
        assert_eq!(rejections.len(), 2);
        assert!(rejections.iter().all(|r| r.is_duplicate_identity()));
    }

    #[tokio::test]
    async fn test_create_reports_every_policy_violation() {
        let store = MemoryIdentityStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = UserManager::default()
            .create(tx.as_mut(), NewUser::with_email("a@x.com"), "short")
            .await
            .unwrap_err();

        let rejections = err.rejections();
        assert_eq!(rejections.len(), 4);
        assert!(rejections.iter().all(|r| r.code == codes::PASSWORD_POLICY));
    }

    #[tokio::test]
    async fn test_add_to_role() {
        let store = MemoryIdentityStore::new();
        let users = UserManager::default();
        let mut tx = store.begin().await.unwrap();

        let user = users
            .create(tx.as_mut(), NewUser::with_email("a@x.com"), PASSWORD)
            .await
            .unwrap();

        let err = users.add_to_role(tx.as_mut(), user.id, "Missing").await.unwrap_err();
        assert_eq!(err.rejections()[0].code, codes::ROLE_NOT_FOUND);

        tx.insert_role(CreateRole {
            name: "Auditor".to_string(),
            description: None,
        })
        .await
        .unwrap();

        users.add_to_role(tx.as_mut(), user.id, "auditor").await.unwrap();
        let err = users.add_to_role(tx.as_mut(), user.id, "Auditor").await.unwrap_err();
        assert_eq!(err.rejections()[0].code, codes::USER_ALREADY_IN_ROLE);
    }

    #[tokio::test]
    async fn test_change_password_rotates_stamp() {
        let store = MemoryIdentityStore::new();
        let users = UserManager::default();
        let user = seed(&store, "a@x.com").await;

        let updated = users
            .change_password(&store, &user, PASSWORD, "N3w!Password")
            .await
            .unwrap();

        assert_ne!(updated.security_stamp, user.security_stamp);
        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.security_stamp, updated.security_stamp);
        assert!(users.check_password(&stored, "N3w!Password").unwrap());
        assert!(!users.check_password(&stored, PASSWORD).unwrap());
    }

    #[tokio::test]
    async fn test_change_password_rejections() {
        let store = MemoryIdentityStore::new();
        let users = UserManager::default();
        let user = seed(&store, "a@x.com").await;

        let err = users
            .change_password(&store, &user, "Wr0ng!Pass", "N3w!Password")
            .await
            .unwrap_err();
        assert_eq!(err.rejections()[0].description, messages::INCORRECT_PASSWORD);

        let err = users
            .change_password(&store, &user, PASSWORD, "weak")
            .await
            .unwrap_err();
        assert!(err.rejections().iter().all(|r| r.code == codes::PASSWORD_POLICY));

        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.security_stamp, user.security_stamp);
    }
}
