/// Registration endpoints
///
/// The registration wizard keeps no state on the server. The client walks
/// the user through the email, password and company screens, checking each
/// one with a step endpoint, then submits everything to `POST
/// /account/register`.
///
/// # Endpoints
///
/// - `POST /account/register` - Create a company and its first user
/// - `GET /account/check-email?email=` - Live email availability check
/// - `POST /account/register/steps/email` - Validate the email screen
/// - `POST /account/register/steps/password` - Validate the password screen
/// - `POST /account/register/steps/company` - Validate the company screen

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    session::issue_session,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use taskdesk_shared::{
    identity::messages,
    registration::{RegistrationModel, RegistrationOutcome},
};
use tracing::{error, info};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

/// Where the client goes after a successful registration
pub const REGISTRATION_COMPLETE_PATH: &str = "/account/register/complete";

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_email_field"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,

    #[validate(must_match(
        other = "password",
        message = "The password and confirmation password do not match."
    ))]
    pub confirm_password: String,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Company name is required and cannot exceed 200 characters."
    ))]
    pub company_name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Full name is required and cannot exceed 200 characters."
    ))]
    pub full_name: String,
}

impl RegisterRequest {
    /// Trims the fields whose surrounding whitespace is never meaningful
    fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.company_name = self.company_name.trim().to_string();
        self.full_name = self.full_name.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    fn into_model(self) -> RegistrationModel {
        RegistrationModel {
            email: self.email,
            password: self.password,
            company_name: self.company_name,
            description: self.description,
            phone: self.phone,
            full_name: self.full_name,
        }
    }
}

/// Registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub redirect_to: String,
}

/// Email screen
#[derive(Debug, Deserialize, Validate)]
pub struct EmailStepRequest {
    #[validate(custom(function = "validate_email_field"))]
    pub email: String,
}

/// Password screen
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordStepRequest {
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Password confirmation is required."),
        must_match(
            other = "password",
            message = "The password and confirmation password do not match."
        )
    )]
    pub confirm_password: String,
}

/// Company screen
#[derive(Debug, Deserialize, Validate)]
pub struct CompanyStepRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Company name is required and cannot exceed 200 characters."
    ))]
    pub company_name: String,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Full name is required and cannot exceed 200 characters."
    ))]
    pub full_name: String,
}

/// A step passed validation
#[derive(Debug, Serialize, Deserialize)]
pub struct StepResponse {
    pub valid: bool,
}

/// Email availability query
#[derive(Debug, Deserialize)]
pub struct CheckEmailQuery {
    #[serde(default)]
    pub email: String,
}

/// Email availability answer
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckEmailResponse {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn validate_email_field(email: &str) -> Result<(), ValidationError> {
    match email_problem(email) {
        Some(message) => Err(ValidationError::new("email").with_message(Cow::Borrowed(message))),
        None => Ok(()),
    }
}

/// Why an email is unacceptable on format alone, if it is
fn email_problem(email: &str) -> Option<&'static str> {
    let email = email.trim();
    if email.is_empty() {
        Some(messages::EMAIL_REQUIRED)
    } else if !email.validate_email() {
        Some(messages::EMAIL_INVALID)
    } else {
        None
    }
}

fn email_taken() -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail::new(
        "email",
        messages::EMAIL_ALREADY_REGISTERED,
    )])
}

/// Registration endpoint
///
/// # Endpoint
///
/// ```text
/// POST /account/register
/// Content-Type: application/json
///
/// {
///   "email": "owner@acme.test",
///   "password": "Str0ng!Pass",
///   "confirm_password": "Str0ng!Pass",
///   "company_name": "Acme",
///   "description": "Widgets",
///   "phone": "+1 555 0100",
///   "full_name": "Olivia Owner"
/// }
/// ```
///
/// # Response
///
/// `201 Created`, signs the new user in (browser-session cookie).
///
/// ```json
/// { "user_id": "uuid", "company_id": "uuid", "redirect_to": "/account/register/complete" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid input, email taken, password policy
/// - `500 Internal Server Error`: Registration failed unexpectedly
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<RegisterResponse>)> {
    let req = req.normalized();
    req.validate()?;

    let outcome = state.registration.run(&req.into_model()).await;

    match outcome {
        RegistrationOutcome::Registered { user, company } => {
            let jar = issue_session(jar, &state.config.session, &user, false)?;
            info!(user_id = %user.id, company_id = %company.id, "Registered and signed in");

            Ok((
                StatusCode::CREATED,
                jar,
                Json(RegisterResponse {
                    user_id: user.id,
                    company_id: company.id,
                    redirect_to: REGISTRATION_COMPLETE_PATH.to_string(),
                }),
            ))
        }
        RegistrationOutcome::Rejected { errors } => {
            let is_fault = errors.iter().any(|e| e.is_exception());
            let mut details = Vec::with_capacity(errors.len());

            for err in errors {
                if err.is_exception() {
                    error!(error = %err.message, "Registration exception");
                } else {
                    details.push(ValidationErrorDetail {
                        field: err.key,
                        message: err.message,
                    });
                }
            }

            if is_fault {
                Err(ApiError::OperationFailed(details))
            } else {
                Err(ApiError::ValidationError(details))
            }
        }
    }
}

/// Email availability check
///
/// Always answers 200; `valid` says whether the email can be used.
pub async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<CheckEmailQuery>,
) -> ApiResult<Json<CheckEmailResponse>> {
    if let Some(message) = email_problem(&query.email) {
        return Ok(Json(CheckEmailResponse {
            valid: false,
            message: Some(message.to_string()),
        }));
    }

    let taken = state
        .store
        .find_user_by_email(query.email.trim())
        .await?
        .is_some();

    Ok(Json(CheckEmailResponse {
        valid: !taken,
        message: taken.then(|| messages::EMAIL_ALREADY_REGISTERED.to_string()),
    }))
}

/// Email screen: format and availability
pub async fn validate_email_step(
    State(state): State<AppState>,
    Json(req): Json<EmailStepRequest>,
) -> ApiResult<Json<StepResponse>> {
    req.validate()?;

    if state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .is_some()
    {
        return Err(email_taken());
    }

    Ok(Json(StepResponse { valid: true }))
}

/// Password screen: confirmation and password policy
pub async fn validate_password_step(
    State(state): State<AppState>,
    Json(req): Json<PasswordStepRequest>,
) -> ApiResult<Json<StepResponse>> {
    req.validate()?;

    let violations = state.users.validate_password(&req.password);
    if !violations.is_empty() {
        return Err(ApiError::ValidationError(
            violations
                .into_iter()
                .map(|v| ValidationErrorDetail::new("password", v.description))
                .collect(),
        ));
    }

    Ok(Json(StepResponse { valid: true }))
}

/// Company screen: required fields
pub async fn validate_company_step(
    Json(req): Json<CompanyStepRequest>,
) -> ApiResult<Json<StepResponse>> {
    CompanyStepRequest {
        company_name: req.company_name.trim().to_string(),
        full_name: req.full_name.trim().to_string(),
    }
    .validate()?;

    Ok(Json(StepResponse { valid: true }))
}
