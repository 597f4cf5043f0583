use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::is_unique_violation,
        repo_types::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (nombre, email, password) = match (payload.nombre, payload.email, payload.password) {
        (Some(n), Some(e), Some(p)) if !n.trim().is_empty() && !e.trim().is_empty() && !p.is_empty() => {
            (n, e, p)
        }
        _ => {
            warn!("register with missing fields");
            return Err(ApiError::Validation(
                "Todos los campos son obligatorios".into(),
            ));
        }
    };

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation(
            "El correo electrónico no es válido".into(),
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Validation("El correo ya está en uso".into()));
    }

    let hash = hash_password(&password)?;

    let user = match User::create(&state.db, nombre.trim(), &email, &hash).await {
        Ok(u) => u,
        // concurrent register with the same email loses the race on the
        // unique index and gets the same 400 as the pre-check
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %email, "email already registered (unique index)");
            return Err(ApiError::Validation("El correo ya está en uso".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Usuario registrado exitosamente".into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // missing credentials get the same answer as wrong ones
    let (email, password) = match (payload.email, payload.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            warn!("login with missing fields");
            return Err(ApiError::Auth("Credenciales Incorrectas".into()));
        }
    };

    let email = email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Auth("Credenciales Incorrectas".into()));
        }
    };

    let ok = verify_password(&password, &user.password_hash)?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth("Credenciales Incorrectas".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login exitoso".into(),
        token,
    }))
}
