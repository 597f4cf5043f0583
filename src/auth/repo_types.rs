use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub nombre: String,
    pub email: String, // stored lowercase-trimmed, unique
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, not exposed in JSON
    pub profile_image_url: String, // empty until a photo is uploaded
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
