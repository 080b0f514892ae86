/// Database models for TaskDesk
///
/// This module contains the account-related models and their SQL operations.
/// Every operation is generic over `sqlx::PgExecutor`, so the same query runs
/// against the pool or inside a registration transaction.
///
/// # Models
///
/// - `company`: Tenants
/// - `user`: User accounts and credentials
/// - `role`: Roles and identity-level role membership
/// - `user_role`: Audited, soft-deletable user-role links

pub mod company;
pub mod role;
pub mod user;
pub mod user_role;
