/// Password sign-in
///
/// The caller gets a bare [`SignInResult::Failed`] for every kind of
/// failure: unknown account, wrong password, inactive account or an
/// unreadable stored hash. Unknown accounts still pay for one hash
/// verification so timing does not give them away. There is no lockout.

use tracing::{debug, warn};

use super::user_manager::UserManager;
use super::IdentityResult;
use crate::auth::password::verify_against_dummy;
use crate::models::user::User;
use crate::store::{IdentityStore, StoreResult};

/// Outcome of a sign-in attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SignInResult {
    /// Credentials accepted
    Succeeded(User),

    /// Credentials refused, for whatever reason
    Failed,
}

/// Finds the account a login name refers to
///
/// Input containing `@` is tried as an email first. Anything not found
/// that way is tried as a username.
pub async fn resolve_identity(
    store: &dyn IdentityStore,
    user_name_or_email: &str,
) -> StoreResult<Option<User>> {
    let input = user_name_or_email.trim();
    if input.is_empty() {
        return Ok(None);
    }

    if input.contains('@') {
        if let Some(user) = store.find_user_by_email(input).await? {
            return Ok(Some(user));
        }
    }

    store.find_user_by_username(input).await
}

/// Checks a login name and password
///
/// On success the last-login time is recorded. Failing to record it is
/// logged and otherwise ignored.
///
/// # Errors
///
/// Only store failures during lookup surface as errors.
pub async fn password_sign_in(
    store: &dyn IdentityStore,
    users: &UserManager,
    user_name_or_email: &str,
    password: &str,
) -> IdentityResult<SignInResult> {
    let Some(user) = resolve_identity(store, user_name_or_email).await? else {
        verify_against_dummy(password);
        debug!("Sign-in failed: unknown account");
        return Ok(SignInResult::Failed);
    };

    let password_ok = match users.check_password(&user, password) {
        Ok(ok) => ok,
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            false
        }
    };

    if !password_ok || !user.is_active {
        debug!(user_id = %user.id, active = user.is_active, "Sign-in failed");
        return Ok(SignInResult::Failed);
    }

    if let Err(e) = store.record_login(user.id).await {
        warn!(user_id = %user.id, error = %e, "Failed to record last login");
    }

    Ok(SignInResult::Succeeded(user))
}
