/// Role lookup and creation

use tracing::info;

use super::{codes, messages, IdentityError, IdentityResult};
use crate::models::role::{CreateRole, Role};
use crate::store::StoreTransaction;

/// Finds and creates roles
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleManager;

impl RoleManager {
    pub fn new() -> Self {
        Self
    }

    /// Finds a role by name (case-insensitive)
    pub async fn find_by_name(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &str,
    ) -> IdentityResult<Option<Role>> {
        Ok(tx.find_role_by_name(name).await?)
    }

    /// Creates a role
    ///
    /// # Errors
    ///
    /// Rejected with `InvalidRoleName` for a blank name and with
    /// `DuplicateRoleName` when the name is taken.
    pub async fn create(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &str,
        description: Option<&str>,
    ) -> IdentityResult<Role> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::rejected(
                codes::INVALID_ROLE_NAME,
                messages::ROLE_NAME_REQUIRED,
            ));
        }

        let duplicate = || {
            IdentityError::rejected(codes::DUPLICATE_ROLE_NAME, messages::duplicate_role_name(name))
        };

        if tx.find_role_by_name(name).await?.is_some() {
            return Err(duplicate());
        }

        let data = CreateRole {
            name: name.to_string(),
            description: description.map(str::to_string),
        };

        match tx.insert_role(data).await {
            Ok(role) => {
                info!(role_id = %role.id, role = %role.name, "Role created");
                Ok(role)
            }
            Err(e) if e.is_unique_violation_on("roles_name") => Err(duplicate()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{FaultPlan, MemoryIdentityStore};
    use crate::store::IdentityStore;

    #[tokio::test]
    async fn test_create_then_find() {
        let store = MemoryIdentityStore::new();
        let roles = RoleManager::new();
        let mut tx = store.begin().await.unwrap();

        assert!(roles.find_by_name(tx.as_mut(), "Auditor").await.unwrap().is_none());

        let role = roles
            .create(tx.as_mut(), " Auditor ", Some("Reads everything"))
            .await
            .unwrap();
        assert_eq!(role.name, "Auditor");

        let found = roles.find_by_name(tx.as_mut(), "AUDITOR").await.unwrap();
        assert_eq!(found, Some(role));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_duplicate_names() {
        let store = MemoryIdentityStore::new();
        let roles = RoleManager::new();
        let mut tx = store.begin().await.unwrap();

        let err = roles.create(tx.as_mut(), "  ", None).await.unwrap_err();
        assert_eq!(err.rejections()[0].code, codes::INVALID_ROLE_NAME);

        roles.create(tx.as_mut(), "Auditor", None).await.unwrap();
        let err = roles.create(tx.as_mut(), "auditor", None).await.unwrap_err();
        assert_eq!(err.rejections()[0].code, codes::DUPLICATE_ROLE_NAME);
    }

    #[tokio::test]
    async fn test_constraint_violation_is_a_rejection() {
        let store = MemoryIdentityStore::with_faults(FaultPlan {
            role_insert_conflict: true,
            ..Default::default()
        });
        let mut tx = store.begin().await.unwrap();

        let err = RoleManager::new()
            .create(tx.as_mut(), "Auditor", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }
}
