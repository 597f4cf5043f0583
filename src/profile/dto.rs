use serde::{Deserialize, Serialize};

/// Public part of the profile returned to the client.
#[derive(Debug, Serialize)]
pub struct PerfilResponse {
    pub nombre: String,
    pub email: String,
    #[serde(rename = "profileImageUrl")]
    pub profile_image_url: String,
}

/// Request body for a profile update.
#[derive(Debug, Deserialize)]
pub struct UpdatePerfilRequest {
    pub nombre: Option<String>,
}

/// Response after a photo upload.
#[derive(Debug, Serialize)]
pub struct FotoResponse {
    pub message: String,
    #[serde(rename = "profileImageUrl")]
    pub profile_image_url: String,
}
