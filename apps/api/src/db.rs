use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, Role};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the bootstrap admin account when it does not exist yet.
/// An existing user with the same name is left untouched.
pub async fn ensure_admin(pool: &PgPool, username: &str, password: &str) -> Result<()> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        info!("Bootstrap admin '{username}' already present");
        return Ok(());
    }

    sqlx::query("INSERT INTO users (id, username, hashed_password, role) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hash_password(password)?)
        .bind(Role::Admin.as_str())
        .execute(pool)
        .await?;

    info!("Bootstrap admin '{username}' created");
    Ok(())
}
