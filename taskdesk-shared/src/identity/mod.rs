/// Identity subsystem
///
/// Account operations above the raw store: creating users under the
/// password policy, changing passwords, granting roles and signing in.
/// Plaintext passwords never leave this module; only Argon2id hashes reach
/// the store.
///
/// # Modules
///
/// - [`user_manager`]: create, change password, add to role
/// - [`role_manager`]: find and create roles
/// - [`sign_in`]: identity resolution and password sign-in
/// - [`messages`]: user-facing wording
///
/// # Errors
///
/// Operations fail with [`IdentityError::Rejected`] when the request itself
/// is unacceptable (policy, duplicates, wrong current password). Those
/// carry one [`IdentityRejection`] per problem. Anything else is an
/// infrastructure failure.

pub mod messages;
pub mod role_manager;
pub mod sign_in;
pub mod user_manager;

use serde::Serialize;

use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Machine-readable rejection codes
pub mod codes {
    pub const DUPLICATE_EMAIL: &str = "DuplicateEmail";
    pub const DUPLICATE_USER_NAME: &str = "DuplicateUserName";
    pub const INVALID_EMAIL: &str = "InvalidEmail";
    pub const INVALID_USER_NAME: &str = "InvalidUserName";
    pub const PASSWORD_POLICY: &str = "PasswordPolicy";
    pub const PASSWORD_MISMATCH: &str = "PasswordMismatch";
    pub const DUPLICATE_ROLE_NAME: &str = "DuplicateRoleName";
    pub const INVALID_ROLE_NAME: &str = "InvalidRoleName";
    pub const ROLE_NOT_FOUND: &str = "RoleNotFound";
    pub const USER_ALREADY_IN_ROLE: &str = "UserAlreadyInRole";
}

/// One reason an identity operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRejection {
    /// Stable code from [`codes`]
    pub code: String,

    /// Human-readable description
    pub description: String,
}

impl IdentityRejection {
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
        }
    }

    /// True for rejections caused by an email or username already in use
    pub fn is_duplicate_identity(&self) -> bool {
        self.code == codes::DUPLICATE_EMAIL || self.code == codes::DUPLICATE_USER_NAME
    }
}

/// Identity operation error
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The request was refused
    #[error("Identity operation rejected: {}", describe(.0))]
    Rejected(Vec<IdentityRejection>),

    /// The store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hashing or verification failed
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl IdentityError {
    /// Shorthand for a single rejection
    pub fn rejected(code: &str, description: impl Into<String>) -> Self {
        IdentityError::Rejected(vec![IdentityRejection::new(code, description)])
    }

    /// Rejections carried by this error, empty for infrastructure failures
    pub fn rejections(&self) -> &[IdentityRejection] {
        match self {
            IdentityError::Rejected(rejections) => rejections,
            _ => &[],
        }
    }
}

fn describe(rejections: &[IdentityRejection]) -> String {
    rejections
        .iter()
        .map(|r| r.description.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;
