use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{error, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use super::repo_types::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and validates the bearer token, then confirms the user still
/// exists, yielding the verified user ID. Any failure short-circuits the
/// handler with a 401 and no further side effects.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

fn unauthorized() -> ApiError {
    ApiError::Auth("Por favor, autentíquese.".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                unauthorized()
            })?;

        let token = auth.strip_prefix("Bearer ").ok_or_else(|| {
            warn!("invalid auth scheme");
            unauthorized()
        })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            unauthorized()
        })?;

        // any failure in the gate answers 401, lookup errors included
        let user = User::find_by_id(&state.db, claims.sub).await.map_err(|e| {
            error!(error = %e, user_id = %claims.sub, "auth lookup failed");
            unauthorized()
        })?;
        if user.is_none() {
            warn!(user_id = %claims.sub, "token for unknown user");
            return Err(unauthorized());
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/perfil");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Token abc123"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer not.a.token"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
