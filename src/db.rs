//! Database module
//!
//! Connection and schema verification utilities. Migrations are raw SQL
//! files in the migrations/ directory.

use sqlx::PgPool;

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = vec![
        "users",
        "auth_tokens",
        "accounts",
        "transfers",
        "bizums",
        "loans",
        "cards",
        "notifications",
    ];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    check_admin_provisioned(pool).await?;

    Ok(true)
}

/// Warn when no admin user has been provisioned. Admins are created by the
/// seed step, never by self-registration, so a missing admin means the
/// back-office (loan decisions, user management) is unreachable.
async fn check_admin_provisioned(pool: &PgPool) -> Result<(), sqlx::Error> {
    let admin_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'ADMIN')")
            .fetch_one(pool)
            .await?;

    if !admin_exists {
        tracing::warn!("No ADMIN user provisioned; loan decisions will be unavailable");
    }

    Ok(())
}
