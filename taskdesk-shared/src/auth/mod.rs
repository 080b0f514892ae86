/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing, verification and the password policy
/// - [`session`]: Signed session tokens carried in the session cookie
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod session;
