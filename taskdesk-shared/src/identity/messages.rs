/// User-facing messages
///
/// Kept in one place so the HTTP layer and the pipeline agree on wording.
/// Login failures share a single message so callers cannot tell an unknown
/// account from a wrong password.

/// Every failed sign-in
pub const INVALID_LOGIN: &str = "Invalid username/email or password.";

/// Email taken, from the pre-check or from a unique constraint
pub const EMAIL_ALREADY_REGISTERED: &str = "This email is already registered.";

/// Unexpected failure during registration
pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

pub const PASSWORD_CHANGED: &str = "Password changed successfully.";

pub const INCORRECT_PASSWORD: &str = "Incorrect password.";

pub const PASSWORDS_DO_NOT_MATCH: &str = "The password and confirmation password do not match.";

pub const EMAIL_REQUIRED: &str = "Email is required.";

pub const EMAIL_INVALID: &str = "Email is invalid.";

pub const USER_NAME_REQUIRED: &str = "Username or email is required.";

pub const PASSWORD_REQUIRED: &str = "Password is required.";

pub const CONFIRM_PASSWORD_REQUIRED: &str = "Password confirmation is required.";

pub const COMPANY_NAME_REQUIRED: &str = "Company name is required.";

pub const FULL_NAME_REQUIRED: &str = "Full name is required.";

pub const SIGNED_OUT: &str = "You have been signed out.";

pub const ROLE_NAME_REQUIRED: &str = "Role name is required.";

/// "User name 'x' is already taken."
pub fn duplicate_user_name(user_name: &str) -> String {
    format!("User name '{}' is already taken.", user_name)
}

/// "Email 'x' is already taken."
pub fn duplicate_email(email: &str) -> String {
    format!("Email '{}' is already taken.", email)
}

/// "Role name 'x' is already taken."
pub fn duplicate_role_name(name: &str) -> String {
    format!("Role name '{}' is already taken.", name)
}

/// "Role 'x' does not exist."
pub fn role_not_found(name: &str) -> String {
    format!("Role '{}' does not exist.", name)
}

/// "User already in role 'x'."
pub fn user_already_in_role(name: &str) -> String {
    format!("User already in role '{}'.", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_messages() {
        assert_eq!(
            duplicate_email("a@x.com"),
            "Email 'a@x.com' is already taken."
        );
        assert_eq!(
            user_already_in_role("CompanyManager"),
            "User already in role 'CompanyManager'."
        );
    }
}
