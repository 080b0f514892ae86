/// Company registration
///
/// A registration creates a company, its first user, and grants that user
/// the company-manager role, all in one transaction. See
/// [`pipeline::RegisterPipeline`].

pub mod pipeline;

use serde::Deserialize;
use std::fmt;

pub use pipeline::{PipelineError, RegisterPipeline, RegistrationOutcome};

/// Everything a registration needs
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationModel {
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub full_name: String,
}

impl fmt::Debug for RegistrationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationModel")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("company_name", &self.company_name)
            .field("description", &self.description)
            .field("phone", &self.phone)
            .field("full_name", &self.full_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let model = RegistrationModel {
            email: "a@x.com".to_string(),
            password: "Str0ng!Pass".to_string(),
            ..Default::default()
        };

        let printed = format!("{:?}", model);
        assert!(printed.contains("a@x.com"));
        assert!(!printed.contains("Str0ng!Pass"));
    }
}
