/// Session authentication middleware
///
/// Reads the session cookie, validates the token and loads the user. The
/// request is refused with 401 when the cookie is missing or invalid, the
/// user no longer exists or is inactive, or the user's security stamp has
/// changed since the session was issued (for example after a password
/// change). On success an [`AuthSession`] is inserted into the request
/// extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use taskdesk_shared::auth::session::validate_token;
use tracing::debug;

use crate::{app::AppState, error::ApiError, session::AuthSession};

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_config = &state.config.session;

    let token = jar
        .get(&session_config.cookie_name)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;

    let claims = validate_token(token, &session_config.secret)?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active && user.security_stamp == claims.stamp)
        .ok_or_else(|| {
            debug!(user_id = %claims.sub, "Session no longer valid");
            ApiError::Unauthorized("Session is no longer valid".to_string())
        })?;

    req.extensions_mut().insert(AuthSession {
        user,
        persistent: claims.persistent,
    });

    Ok(next.run(req).await)
}
