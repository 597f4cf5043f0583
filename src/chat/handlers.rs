use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{ConsultaRequest, ConsultaResponse};
use super::repo;
use super::repo_types::StoredMessage;
use super::services;
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/consulta", post(consulta))
        .route("/historial", get(historial))
}

#[instrument(skip(state, payload))]
pub async fn consulta(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ConsultaRequest>,
) -> Result<Json<ConsultaResponse>, ApiError> {
    let prompt = match payload.prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            warn!(user_id = %user_id, "consulta without prompt");
            return Err(ApiError::Validation(
                "El campo \"prompt\" es obligatorio".into(),
            ));
        }
    };

    let response = services::relay(&state, user_id, &prompt).await?;
    Ok(Json(ConsultaResponse { response }))
}

#[instrument(skip(state))]
pub async fn historial(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("Usuario no encontrado".into()));
    }

    let messages = repo::list_for_user(&state.db, user_id).await?;
    Ok(Json(messages))
}
