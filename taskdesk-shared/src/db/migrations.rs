/// Embedded schema migrations
///
/// The `migrations/` directory of this crate is compiled in with
/// `sqlx::migrate!`. Each migration is a reversible
/// `{version}_{name}.up.sql` / `{version}_{name}.down.sql` pair.

use sqlx::postgres::PgPool;
use tracing::{error, info};

/// Applies every pending migration
///
/// # Errors
///
/// Returns the migrator's error if a migration is malformed, fails to
/// apply, or was modified after being applied.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_migrations_are_embedded() {
        let migrator = sqlx::migrate!("./migrations");

        for table in ["companies", "users", "roles"] {
            assert!(
                migrator.iter().any(|m| m.description.ends_with(table)),
                "missing migration for {}",
                table
            );
        }
    }
}
