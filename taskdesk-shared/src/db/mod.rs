/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health check
/// - `migrations`: embedded schema migrations
///
/// Queries live on the models in [`crate::models`]; the account store in
/// [`crate::store::postgres`] wraps them.

pub mod migrations;
pub mod pool;
