use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Create a new user with a hashed password. The unique index on email
    /// backs the duplicate check; see [`is_unique_violation`].
    pub async fn create(
        db: &PgPool,
        nombre: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (nombre, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, nombre, email, password_hash, profile_image_url, created_at, updated_at
            "#,
        )
        .bind(nombre)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, nombre, email, password_hash, profile_image_url, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by ID.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, nombre, email, password_hash, profile_image_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Update the display name, returning the updated row or `None` when the
    /// user no longer exists.
    pub async fn update_nombre(
        db: &PgPool,
        id: Uuid,
        nombre: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET nombre = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, nombre, email, password_hash, profile_image_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(nombre)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Update the profile image URL, returning the updated row or `None`
    /// when the user no longer exists.
    pub async fn update_image_url(
        db: &PgPool,
        id: Uuid,
        url: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET profile_image_url = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, nombre, email, password_hash, profile_image_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

/// True when the error is a Postgres unique-constraint violation, i.e. a
/// concurrent register slipped past the pre-insert email check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|d| d.code())
        .map(|c| c == "23505")
        .unwrap_or(false)
}
