/// Registration pipeline
///
/// Steps, in order:
///
/// 1. Reject emails that are already registered (outside the transaction)
/// 2. Create the company
/// 3. Create the user, pointing at the company
/// 4. Make sure the company-manager role exists
/// 5. Grant the role
/// 6. Make sure exactly one active audited link exists for the grant
/// 7. Commit
///
/// Steps 2 to 7 share one transaction. Any rejection or failure rolls all
/// of it back, so a company never exists without its user and vice versa.
///
/// Rejections keep the identity layer's descriptions. A duplicate email is
/// always reported under the `Email` key, whether the pre-check caught it or
/// a unique constraint did. Unexpected failures produce a generic message
/// plus an `Exception` entry carrying the error text, which is for logs
/// only.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskdesk_shared::registration::{RegisterPipeline, RegistrationModel};
/// use taskdesk_shared::store::memory::MemoryIdentityStore;
///
/// # async fn example() {
/// let pipeline = RegisterPipeline::new(Arc::new(MemoryIdentityStore::new()));
///
/// let outcome = pipeline
///     .run(&RegistrationModel {
///         email: "owner@acme.test".to_string(),
///         password: "Str0ng!Pass".to_string(),
///         company_name: "Acme".to_string(),
///         full_name: "Olivia Owner".to_string(),
///         ..Default::default()
///     })
///     .await;
///
/// assert!(outcome.is_registered());
/// # }
/// ```

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::RegistrationModel;
use crate::identity::{
    messages,
    role_manager::RoleManager,
    user_manager::{NewUser, UserManager},
    IdentityError,
};
use crate::models::{
    company::{Company, CreateCompany},
    role::{COMPANY_MANAGER, COMPANY_MANAGER_DESCRIPTION},
    user::User,
    user_role::{CreateUserRoleLink, REGISTRATION_NOTE},
};
use crate::store::{IdentityStore, StoreError, StoreResult, StoreTransaction};

/// Key for errors about the email field
pub const EMAIL_KEY: &str = "Email";

/// Key for the diagnostic entry of an unexpected failure
pub const EXCEPTION_KEY: &str = "Exception";

/// One registration error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineError {
    /// Field the error belongs to; empty for form-level errors
    pub key: String,

    pub message: String,
}

impl PipelineError {
    pub fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Diagnostic entries must not be shown to users
    pub fn is_exception(&self) -> bool {
        self.key == EXCEPTION_KEY
    }

    fn email_taken() -> Self {
        Self::new(EMAIL_KEY, messages::EMAIL_ALREADY_REGISTERED)
    }
}

/// Result of one registration attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// Everything was committed
    Registered { user: User, company: Company },

    /// Nothing was committed
    Rejected { errors: Vec<PipelineError> },
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered { .. })
    }

    /// Errors of a rejected attempt, empty on success
    pub fn errors(&self) -> &[PipelineError] {
        match self {
            RegistrationOutcome::Registered { .. } => &[],
            RegistrationOutcome::Rejected { errors } => errors,
        }
    }

    /// True when the attempt failed for an unexpected reason rather than
    /// because of the input
    pub fn is_fault(&self) -> bool {
        self.errors().iter().any(PipelineError::is_exception)
    }
}

/// Why a step stopped the pipeline
enum StepFailure {
    Rejected(Vec<PipelineError>),
    Fault(String),
}

impl From<StoreError> for StepFailure {
    fn from(err: StoreError) -> Self {
        StepFailure::Fault(err.to_string())
    }
}

impl From<IdentityError> for StepFailure {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(rejections) => {
                let mut errors = Vec::new();
                for rejection in rejections {
                    if rejection.is_duplicate_identity() {
                        if !errors.iter().any(|e: &PipelineError| e.key == EMAIL_KEY) {
                            errors.push(PipelineError::email_taken());
                        }
                    } else {
                        errors.push(PipelineError::new("", rejection.description));
                    }
                }
                StepFailure::Rejected(errors)
            }
            other => StepFailure::Fault(other.to_string()),
        }
    }
}

/// Makes sure one active audited link exists for `(user_id, role_id)`
///
/// Returns `true` if a link was inserted, `false` if one was already
/// active. Calling it repeatedly never produces a second active link.
pub async fn ensure_active_link(
    tx: &mut dyn StoreTransaction,
    user_id: Uuid,
    role_id: Uuid,
    assigned_by: Option<Uuid>,
    notes: &str,
) -> StoreResult<bool> {
    if tx.has_active_link(user_id, role_id).await? {
        return Ok(false);
    }

    tx.insert_link(CreateUserRoleLink {
        user_id,
        role_id,
        assigned_by,
        notes: Some(notes.to_string()),
    })
    .await?;

    Ok(true)
}

/// Runs registrations against an account store
#[derive(Clone)]
pub struct RegisterPipeline {
    store: Arc<dyn IdentityStore>,
    users: UserManager,
    roles: RoleManager,
}

impl RegisterPipeline {
    /// Pipeline with the default password policy
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self::with_user_manager(store, UserManager::default())
    }

    pub fn with_user_manager(store: Arc<dyn IdentityStore>, users: UserManager) -> Self {
        Self {
            store,
            users,
            roles: RoleManager::new(),
        }
    }

    /// Registers a company and its first user
    ///
    /// Never panics and never returns an error: every failure is folded into
    /// [`RegistrationOutcome::Rejected`].
    pub async fn run(&self, model: &RegistrationModel) -> RegistrationOutcome {
        let email = model.email.trim();

        match self.store.find_user_by_email(email).await {
            Ok(Some(_)) => {
                info!("Registration rejected: email already registered");
                return RegistrationOutcome::Rejected {
                    errors: vec![PipelineError::email_taken()],
                };
            }
            Ok(None) => {}
            Err(e) => return fault(e.to_string()),
        }

        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => return fault(e.to_string()),
        };

        let failure = match self.execute(tx.as_mut(), email, model).await {
            Ok((user, company)) => {
                return match tx.commit().await {
                    Ok(()) => {
                        info!(user_id = %user.id, company_id = %company.id, "Registration completed");
                        RegistrationOutcome::Registered { user, company }
                    }
                    Err(e) => fault(e.to_string()),
                };
            }
            Err(failure) => failure,
        };

        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Registration rollback failed");
        }

        match failure {
            StepFailure::Rejected(errors) => {
                info!(count = errors.len(), "Registration rejected");
                RegistrationOutcome::Rejected { errors }
            }
            StepFailure::Fault(message) => fault(message),
        }
    }

    async fn execute(
        &self,
        tx: &mut dyn StoreTransaction,
        email: &str,
        model: &RegistrationModel,
    ) -> Result<(User, Company), StepFailure> {
        let company = tx
            .insert_company(CreateCompany {
                name: model.company_name.trim().to_string(),
                description: model.description.clone(),
                phone: model.phone.clone(),
            })
            .await?;

        let user = self
            .users
            .create(
                &mut *tx,
                NewUser {
                    username: email.to_string(),
                    email: email.to_string(),
                    full_name: Some(model.full_name.trim().to_string()),
                    company_id: Some(company.id),
                    email_confirmed: true,
                },
                &model.password,
            )
            .await?;

        let role = match self.roles.find_by_name(&mut *tx, COMPANY_MANAGER).await? {
            Some(role) => role,
            None => {
                self.roles
                    .create(&mut *tx, COMPANY_MANAGER, Some(COMPANY_MANAGER_DESCRIPTION))
                    .await?
            }
        };

        self.users
            .add_to_role(&mut *tx, user.id, COMPANY_MANAGER)
            .await?;

        ensure_active_link(&mut *tx, user.id, role.id, None, REGISTRATION_NOTE).await?;

        Ok((user, company))
    }
}

fn fault(message: String) -> RegistrationOutcome {
    error!(error = %message, "Registration failed unexpectedly");
    RegistrationOutcome::Rejected {
        errors: vec![
            PipelineError::new("", messages::REGISTRATION_FAILED),
            PipelineError::new(EXCEPTION_KEY, message),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{FaultPlan, MemoryIdentityStore};

    fn model(email: &str) -> RegistrationModel {
        RegistrationModel {
            email: email.to_string(),
            password: "Str0ng!Pass".to_string(),
            company_name: "  Acme  ".to_string(),
            description: Some("Widgets".to_string()),
            phone: None,
            full_name: " Olivia Owner ".to_string(),
        }
    }

    fn pipeline(store: &MemoryIdentityStore) -> RegisterPipeline {
        RegisterPipeline::new(Arc::new(store.clone()))
    }

    async fn assert_nothing_persisted(store: &MemoryIdentityStore) {
        assert!(store.companies().await.is_empty());
        assert!(store.users().await.is_empty());
        assert!(store.links().await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_registration() {
        let store = MemoryIdentityStore::new();

        let outcome = pipeline(&store).run(&model(" owner@acme.test ")).await;

        let RegistrationOutcome::Registered { user, company } = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(user.company_id, Some(company.id));
        assert_eq!(user.email, "owner@acme.test");
        assert_eq!(user.username, "owner@acme.test");
        assert_eq!(user.full_name.as_deref(), Some("Olivia Owner"));
        assert!(user.email_confirmed);
        assert!(user.is_active);
        assert_eq!(company.name, "Acme");
        assert!(company.is_active);

        assert_eq!(store.companies().await.len(), 1);
        assert_eq!(store.users().await.len(), 1);

        let links = store.links().await;
        assert_eq!(links.len(), 1);
        assert!(links[0].is_active);
        assert_eq!(links[0].user_id, user.id);
        assert_eq!(links[0].assigned_by, None);
        assert_eq!(links[0].notes.as_deref(), Some(REGISTRATION_NOTE));

        let roles = store.role_names_for_user(user.id).await.unwrap();
        assert_eq!(roles, vec![COMPANY_MANAGER.to_string()]);
    }

    #[tokio::test]
    async fn test_role_is_created_once() {
        let store = MemoryIdentityStore::new();
        let pipeline = pipeline(&store);

        assert!(pipeline.run(&model("a@acme.test")).await.is_registered());
        assert!(pipeline.run(&model("b@acme.test")).await.is_registered());

        let roles = store.roles().await;
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].description.as_deref(), Some(COMPANY_MANAGER_DESCRIPTION));
        assert_eq!(store.companies().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_before_any_write() {
        let store = MemoryIdentityStore::new();
        let pipeline = pipeline(&store);
        assert!(pipeline.run(&model("owner@acme.test")).await.is_registered());

        let outcome = pipeline.run(&model("OWNER@Acme.test")).await;

        assert_eq!(
            outcome.errors(),
            &[PipelineError::new(EMAIL_KEY, messages::EMAIL_ALREADY_REGISTERED)]
        );
        assert_eq!(store.companies().await.len(), 1);
        assert_eq!(store.users().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_maps_to_email_error() {
        // Lookups miss the existing user; only the unique constraint sees it
        let store = MemoryIdentityStore::with_faults(FaultPlan {
            hide_users_from_lookup: true,
            ..Default::default()
        });
        let pipeline = pipeline(&store);
        assert!(pipeline.run(&model("owner@acme.test")).await.is_registered());

        let outcome = pipeline.run(&model("owner@acme.test")).await;

        assert_eq!(
            outcome.errors(),
            &[PipelineError::new(EMAIL_KEY, messages::EMAIL_ALREADY_REGISTERED)]
        );
        assert!(!outcome.is_fault());
        assert_eq!(store.companies().await.len(), 1);
    }

    #[tokio::test]
    async fn test_password_policy_rejection_rolls_back_company() {
        let store = MemoryIdentityStore::new();

        let outcome = pipeline(&store)
            .run(&RegistrationModel {
                password: "weak".to_string(),
                ..model("owner@acme.test")
            })
            .await;

        let errors = outcome.errors();
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| e.key.is_empty()));
        assert!(!outcome.is_fault());
        assert_nothing_persisted(&store).await;
    }

    #[tokio::test]
    async fn test_role_creation_failure_rolls_back() {
        let store = MemoryIdentityStore::with_faults(FaultPlan {
            role_insert_conflict: true,
            ..Default::default()
        });

        let outcome = pipeline(&store).run(&model("owner@acme.test")).await;

        assert_eq!(outcome.errors().len(), 1);
        assert_eq!(outcome.errors()[0].key, "");
        assert_nothing_persisted(&store).await;
    }

    #[tokio::test]
    async fn test_role_assignment_failure_rolls_back() {
        let store = MemoryIdentityStore::with_faults(FaultPlan {
            role_assignment_conflict: true,
            ..Default::default()
        });

        let outcome = pipeline(&store).run(&model("owner@acme.test")).await;

        assert_eq!(
            outcome.errors(),
            &[PipelineError::new("", messages::user_already_in_role(COMPANY_MANAGER))]
        );
        assert_nothing_persisted(&store).await;
        assert!(store.roles().await.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_failure_reports_generic_and_exception() {
        let store = MemoryIdentityStore::with_faults(FaultPlan {
            link_insert_failure: true,
            ..Default::default()
        });

        let outcome = pipeline(&store).run(&model("owner@acme.test")).await;

        let errors = outcome.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], PipelineError::new("", messages::REGISTRATION_FAILED));
        assert!(errors[1].is_exception());
        assert!(errors[1].message.contains("injected link insert failure"));
        assert!(outcome.is_fault());
        assert_nothing_persisted(&store).await;
    }

    #[tokio::test]
    async fn test_ensure_active_link_is_idempotent() {
        let store = MemoryIdentityStore::new();
        let (user_id, role_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut tx = store.begin().await.unwrap();
        assert!(ensure_active_link(tx.as_mut(), user_id, role_id, None, REGISTRATION_NOTE)
            .await
            .unwrap());
        assert!(!ensure_active_link(tx.as_mut(), user_id, role_id, None, REGISTRATION_NOTE)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let active = store.links().await.into_iter().filter(|l| l.is_active).count();
        assert_eq!(active, 1);
    }
}
