/// Account endpoints
///
/// # Endpoints
///
/// - `POST /account/login` - Sign in with username or email
/// - `POST /account/logout` - Sign out
/// - `GET /account/profile` - Current user, company and roles (session)
/// - `POST /account/change-password` - Change password (session)
///
/// Every failed sign-in produces the same 401 response, whatever the cause.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    session::{clear_session, issue_session, AuthSession},
};
use axum::{extract::State, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    identity::{
        messages,
        sign_in::{password_sign_in, SignInResult},
    },
    models::{company::Company, user::User},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1, message = "Username or email is required."))]
    pub user_name: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,

    /// Keep the session after the browser closes
    #[serde(default)]
    pub remember_me: bool,

    /// Where to go after signing in; ignored unless local
    pub return_url: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub redirect_to: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
    pub redirect_to: String,
}

/// Profile response
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    pub company: Option<Company>,
    pub roles: Vec<String>,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub new_password: String,

    #[validate(must_match(
        other = "new_password",
        message = "The password and confirmation password do not match."
    ))]
    pub confirm_password: String,
}

/// Change password response
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordResponse {
    pub message: String,
}

/// Whether `url` stays on this site
///
/// Accepts paths starting with a single `/` (not `//` or `/\`, which
/// browsers treat as another host) and app-relative `~/` paths.
pub fn is_local_url(url: &str) -> bool {
    if let Some(rest) = url.strip_prefix('/') {
        return !rest.starts_with('/') && !rest.starts_with('\\');
    }

    url.starts_with("~/")
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /account/login
/// Content-Type: application/json
///
/// {
///   "user_name": "owner@acme.test",
///   "password": "Str0ng!Pass",
///   "remember_me": true,
///   "return_url": "/tasks"
/// }
/// ```
///
/// # Response
///
/// Sets the session cookie.
///
/// ```json
/// { "user_id": "uuid", "company_id": "uuid", "redirect_to": "/tasks" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid username/email or password
/// - `422 Unprocessable Entity`: Missing fields
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    req.validate()?;

    let result =
        password_sign_in(state.store.as_ref(), &state.users, &req.user_name, &req.password).await?;

    let user = match result {
        SignInResult::Succeeded(user) => user,
        SignInResult::Failed => {
            return Err(ApiError::Unauthorized(messages::INVALID_LOGIN.to_string()))
        }
    };

    let jar = issue_session(jar, &state.config.session, &user, req.remember_me)?;
    info!(user_id = %user.id, persistent = req.remember_me, "User signed in");

    let redirect_to = match req.return_url {
        Some(url) if is_local_url(&url) => url,
        _ => state.config.api.landing_path.clone(),
    };

    Ok((
        jar,
        Json(LoginResponse {
            user_id: user.id,
            company_id: user.company_id,
            redirect_to,
        }),
    ))
}

/// Logout endpoint
///
/// Clears the session cookie. Succeeds whether or not a session exists.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let jar = clear_session(jar, &state.config.session);

    (
        jar,
        Json(LogoutResponse {
            message: messages::SIGNED_OUT.to_string(),
            redirect_to: state.config.api.landing_path.clone(),
        }),
    )
}

/// Profile endpoint
pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = session.user;

    let company = match user.company_id {
        Some(company_id) => state.store.find_company(company_id).await?,
        None => None,
    };
    let roles = state.store.role_names_for_user(user.id).await?;

    Ok(Json(ProfileResponse {
        user,
        company,
        roles,
    }))
}

/// Change password endpoint
///
/// On success the session cookie is reissued against the new security
/// stamp, keeping its persistence. Other sessions of the user stop working.
///
/// # Errors
///
/// - `401 Unauthorized`: No valid session
/// - `422 Unprocessable Entity`: Wrong current password, mismatched
///   confirmation, or a new password that breaks the policy
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    jar: CookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<(CookieJar, Json<ChangePasswordResponse>)> {
    req.validate()?;

    let user = state
        .users
        .change_password(
            state.store.as_ref(),
            &session.user,
            &req.current_password,
            &req.new_password,
        )
        .await?;

    let jar = issue_session(jar, &state.config.session, &user, session.persistent)?;

    Ok((
        jar,
        Json(ChangePasswordResponse {
            message: messages::PASSWORD_CHANGED.to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_urls() {
        for url in ["/", "/tasks", "/tasks?id=1", "~/tasks"] {
            assert!(is_local_url(url), "{} should be local", url);
        }
    }

    #[test]
    fn test_non_local_urls() {
        for url in [
            "",
            "//evil.test",
            "/\\evil.test",
            "https://evil.test/",
            "http:/evil.test",
            "tasks",
            "~evil",
        ] {
            assert!(!is_local_url(url), "{} should not be local", url);
        }
    }

    #[test]
    fn test_change_password_request_validation() {
        let req = ChangePasswordRequest {
            current_password: "Old!Pass1".to_string(),
            new_password: "N3w!Password".to_string(),
            confirm_password: "different".to_string(),
        };

        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("confirm_password"));
    }
}
