/// API route handlers
///
/// Handlers are grouped by resource:
///
/// - `health`: Health check endpoint
/// - `account`: Sign-in, sign-out, profile and password changes
/// - `registration`: Company registration and the wizard step checks
/// - `analytics`: Clarity snippet and settings

pub mod account;
pub mod analytics;
pub mod health;
pub mod registration;
