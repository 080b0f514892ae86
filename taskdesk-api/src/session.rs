/// Session cookie handling
///
/// The session cookie carries a signed session token. It is always
/// `HttpOnly` and `SameSite=Lax`, scoped to `/`, and `Secure` when
/// configured. "Remember me" sessions get a `Max-Age` equal to the session
/// lifetime; other sessions end with the browser. Clearing the session
/// overwrites the cookie with an empty value and `Max-Age=0`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taskdesk_shared::{
    auth::session::{create_token, SessionClaims, SessionError},
    models::user::User,
};
use time::Duration;

use crate::config::SessionConfig;

/// The signed-in user, placed in request extensions by the session
/// middleware
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,

    /// Whether the session cookie outlives the browser session
    pub persistent: bool,
}

/// Signs a session for `user` and adds its cookie to the jar
///
/// # Errors
///
/// Returns `SessionError::CreateError` if the token cannot be signed.
pub fn issue_session(
    jar: CookieJar,
    config: &SessionConfig,
    user: &User,
    persistent: bool,
) -> Result<CookieJar, SessionError> {
    let claims = SessionClaims::new(
        user.id,
        user.company_id,
        user.security_stamp.clone(),
        persistent,
        config.lifetime(),
    );
    let token = create_token(&claims, &config.secret)?;

    Ok(jar.add(session_cookie(config, token, persistent)))
}

/// Replaces the session cookie with an expired one
pub fn clear_session(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    let mut cookie = base_cookie(config, String::new());
    cookie.set_max_age(Duration::ZERO);
    jar.add(cookie)
}

/// Builds the session cookie for a signed token
pub fn session_cookie(config: &SessionConfig, token: String, persistent: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(config, token);
    if persistent {
        cookie.set_max_age(Duration::hours(config.lifetime_hours));
    }
    cookie
}

fn base_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}
