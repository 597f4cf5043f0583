use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use super::dto::{FotoResponse, PerfilResponse, UpdatePerfilRequest};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/perfil", get(get_perfil).put(update_perfil))
        .route(
            "/perfil/foto",
            post(upload_foto).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
}

#[instrument(skip(state))]
pub async fn get_perfil(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PerfilResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".into()))?;

    Ok(Json(PerfilResponse {
        nombre: user.nombre,
        email: user.email,
        profile_image_url: user.profile_image_url,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_perfil(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePerfilRequest>,
) -> Result<Json<PerfilResponse>, ApiError> {
    let nombre = match payload.nombre {
        Some(n) if !n.trim().is_empty() => n,
        _ => {
            warn!(user_id = %user_id, "update without nombre");
            return Err(ApiError::Validation(
                "El campo \"nombre\" es obligatorio".into(),
            ));
        }
    };

    let user = User::update_nombre(&state.db, user_id, nombre.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(PerfilResponse {
        nombre: user.nombre,
        email: user.email,
        profile_image_url: user.profile_image_url,
    }))
}

/// POST /perfil/foto (multipart, field `profileImage`). The stored user
/// record is only touched after the image host accepts the upload.
#[instrument(skip(state, mp))]
pub async fn upload_foto(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<FotoResponse>, ApiError> {
    let mut file: Option<(Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("profileImage") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
            file = Some((data, content_type));
        }
    }

    let (body, content_type) = file.ok_or_else(|| {
        warn!(user_id = %user_id, "foto upload without file");
        ApiError::Validation("No se ha proporcionado ninguna imagen".into())
    })?;

    let url = state.images.upload(body, &content_type).await?;

    let user = User::update_image_url(&state.db, user_id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".into()))?;

    info!(user_id = %user.id, "profile photo updated");
    Ok(Json(FotoResponse {
        message: "Imagen de perfil actualizada".into(),
        profile_image_url: user.profile_image_url,
    }))
}
