use sqlx::PgPool;
use uuid::Uuid;

use crate::chat::repo_types::{MessageRole, StoredMessage};

/// Append one message to a user's conversation log. A single INSERT is the
/// atomic append; concurrent consultations for the same user interleave but
/// never lose rows.
pub async fn append(
    db: &PgPool,
    user_id: Uuid,
    role: MessageRole,
    content: &str,
) -> anyhow::Result<StoredMessage> {
    let message = sqlx::query_as::<_, StoredMessage>(
        r#"
        INSERT INTO messages (user_id, role, content)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, role, content, created_at
        "#,
    )
    .bind(user_id)
    .bind(role.as_str())
    .bind(content)
    .fetch_one(db)
    .await?;
    Ok(message)
}

/// Full conversation for a user, in insertion order.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<StoredMessage>> {
    let rows = sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT id, user_id, role, content, created_at
        FROM messages
        WHERE user_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
