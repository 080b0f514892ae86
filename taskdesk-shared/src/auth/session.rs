/// Session token generation and validation
///
/// Signed-in users carry a session token in an HttpOnly cookie. The token is
/// a JWT signed with HS256 and holds the user's identity, company and the
/// security stamp it was issued against.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Revocation**: Tokens whose `stamp` no longer matches the user's
///   current security stamp are rejected by the session middleware
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::session::{create_token, validate_token, SessionClaims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = SessionClaims::new(user_id, None, "stamp".to_string(), false, Duration::hours(1));
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer embedded in every session token
pub const ISSUER: &str = "taskdesk";

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to create token
    #[error("Failed to create session token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate session token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Session has expired")]
    Expired,
}

/// Session token claims
///
/// # Standard Claims
///
/// - `sub`: User ID
/// - `iss`: Always "taskdesk"
/// - `iat` / `nbf` / `exp`: Issue, not-before and expiry timestamps
///
/// # Custom Claims
///
/// - `company_id`: Tenant the user belongs to
/// - `stamp`: Security stamp at issue time
/// - `persistent`: Whether the session was created with "remember me"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskdesk"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Owning company
    pub company_id: Option<Uuid>,

    /// Security stamp the session was issued against
    pub stamp: String,

    /// "Remember me" sessions get a persistent cookie
    pub persistent: bool,
}

impl SessionClaims {
    /// Creates claims valid for `lifetime` from now
    pub fn new(
        user_id: Uuid,
        company_id: Option<Uuid>,
        stamp: String,
        persistent: bool,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + lifetime;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            company_id,
            stamp,
            persistent,
        }
    }

    /// Checks if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into a session token
///
/// # Errors
///
/// Returns `SessionError::CreateError` if encoding fails
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a session token and extracts its claims
///
/// Verifies signature, expiry, not-before and issuer. Does NOT check the
/// security stamp; that needs the current user record.
///
/// # Errors
///
/// Returns `SessionError::Expired` for expired tokens and
/// `SessionError::ValidationError` for anything else
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
        _ => SessionError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims_for(lifetime: Duration) -> SessionClaims {
        SessionClaims::new(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            "stamp-1".to_string(),
            true,
            lifetime,
        )
    }

    #[test]
    fn test_claims_creation() {
        let claims = claims_for(Duration::hours(1));

        assert_eq!(claims.iss, "taskdesk");
        assert_eq!(claims.stamp, "stamp-1");
        assert!(claims.persistent);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = claims_for(Duration::hours(1));
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&claims_for(Duration::hours(1)), SECRET).unwrap();

        let result = validate_token(&token, "a-different-secret-that-is-long-enough");
        assert!(matches!(result, Err(SessionError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        // Expired an hour ago, well past the default leeway
        let claims = claims_for(Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET);

        assert!(matches!(result, Err(SessionError::Expired)));
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("not-a-token", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let mut claims = claims_for(Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(validate_token(&token, SECRET).is_err());
    }
}
